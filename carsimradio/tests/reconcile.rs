use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use carsimradio::service::reconcile_until_stopped;
use carsimradio::{
    Catalog, ControlState, RadioControl, RadioError, RadioEvent, Reconciler, SONG_OFF, SongTiming,
};
use crossbeam_channel::{Receiver, Sender, unbounded};
use rand::SeedableRng;
use rand::rngs::StdRng;

const TIMEOUT: Duration = Duration::from_secs(2);

fn reconciler(seed: u64) -> Reconciler<StdRng> {
    Reconciler::new(
        Arc::new(Catalog::builtin()),
        50,
        30,
        SongTiming::default(),
        StdRng::seed_from_u64(seed),
    )
}

fn channel() -> (Sender<RadioEvent>, Receiver<RadioEvent>) {
    unbounded()
}

fn drain(rx: &Receiver<RadioEvent>) -> Vec<RadioEvent> {
    rx.try_iter().collect()
}

fn volumes(events: &[RadioEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            RadioEvent::VolumeChanged(v) => Some(*v),
            _ => None,
        })
        .collect()
}

fn songs(events: &[RadioEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RadioEvent::SongChanged(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_first_wake_announces_station_and_off() {
    let (tx, rx) = channel();
    let mut rec = reconciler(1);
    let mut control = ControlState::default();

    let deadline = rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    assert_eq!(deadline, None);
    assert_eq!(
        drain(&rx),
        vec![
            RadioEvent::StationChanged("Radio Baroque".to_string()),
            RadioEvent::SongChanged(SONG_OFF.to_string()),
            RadioEvent::ArtistChanged(String::new()),
        ]
    );
}

#[test]
fn test_off_is_published_on_every_wake() {
    let (tx, rx) = channel();
    let mut rec = reconciler(1);
    let mut control = ControlState::default();

    for _ in 0..3 {
        rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    }
    let events = drain(&rx);
    assert_eq!(songs(&events), vec![SONG_OFF; 3]);
}

#[test]
fn test_start_playing_picks_song_with_deadline() {
    let (tx, rx) = channel();
    let mut rec = reconciler(2);
    let mut control = ControlState::default();
    control.desired_playing = true;

    let now = Instant::now();
    let deadline = rec.reconcile(&mut control, now, &tx).unwrap().unwrap();
    assert!(deadline >= now + Duration::from_secs(3));
    assert!(deadline < now + Duration::from_secs(6));

    let events = drain(&rx);
    let song = rec.current_song().unwrap().clone();
    assert_eq!(
        events,
        vec![
            RadioEvent::StationChanged("Radio Baroque".to_string()),
            RadioEvent::SongChanged(song.title.clone()),
            RadioEvent::ArtistChanged(song.artist.clone()),
        ]
    );
    assert!(rec.playback().currently_playing);
}

#[test]
fn test_song_never_repeats_on_timeout() {
    let (tx, rx) = channel();
    let mut rec = reconciler(3);
    let mut control = ControlState::default();
    control.desired_playing = true;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();

    let mut previous = rec.current_song().unwrap().title.clone();
    for _ in 0..20 {
        rec.song_timed_out();
        rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
        let current = rec.current_song().unwrap().title.clone();
        assert_ne!(current, previous);
        previous = current;
    }
    drop(drain(&rx));
}

#[test]
fn test_wake_without_change_keeps_song_and_deadline() {
    let (tx, rx) = channel();
    let mut rec = reconciler(4);
    let mut control = ControlState::default();
    control.desired_playing = true;

    let first = rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    drop(drain(&rx));
    let second = rec
        .reconcile(&mut control, Instant::now() + Duration::from_millis(10), &tx)
        .unwrap();

    assert_eq!(first, second);
    assert!(drain(&rx).is_empty());
}

#[test]
fn test_reverse_ducks_then_restores_volume() {
    let (tx, rx) = channel();
    let mut rec = reconciler(5);
    let mut control = ControlState::default();
    control.desired_playing = true;
    control.desired_volume = 80;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    assert_eq!(volumes(&drain(&rx)), vec![80]);

    control.desired_reversed = true;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    let events = drain(&rx);
    assert_eq!(volumes(&events), vec![30]);
    assert!(rec.playback().volume_is_auto);
    assert_eq!(rec.playback().saved_volume, 80);
    assert!(!control.volume_is_auto);

    control.desired_reversed = false;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    assert_eq!(volumes(&drain(&rx)), vec![80]);
    assert_eq!(control.desired_volume, 80);
    assert!(!rec.playback().volume_is_auto);
}

#[test]
fn test_user_volume_during_reverse_is_kept() {
    let (tx, rx) = channel();
    let mut rec = reconciler(6);
    let mut control = ControlState::default();
    control.desired_volume = 80;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();

    control.desired_reversed = true;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();

    // User turns the volume up while reversing
    control.desired_volume = 40;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    assert!(!rec.playback().volume_is_auto);

    drop(drain(&rx));
    control.desired_reversed = false;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    assert!(volumes(&drain(&rx)).is_empty());
    assert_eq!(rec.playback().current_volume, 40);
}

#[test]
fn test_reverse_at_reverse_volume_emits_nothing() {
    let (tx, rx) = channel();
    let mut rec = reconciler(7);
    let mut control = ControlState::new(30);
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    assert_eq!(volumes(&drain(&rx)), vec![30]);

    control.desired_reversed = true;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    assert!(volumes(&drain(&rx)).is_empty());
    assert!(!control.volume_is_auto);
    assert!(!rec.playback().volume_is_auto);
}

#[test]
fn test_station_change_repicks_song() {
    let (tx, rx) = channel();
    let mut rec = reconciler(8);
    let mut control = ControlState::default();
    control.desired_playing = true;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    drop(drain(&rx));

    control.desired_station = 3;
    rec.reconcile(&mut control, Instant::now(), &tx).unwrap();
    let events = drain(&rx);
    assert_eq!(events[0], RadioEvent::StationChanged("Ragtime Drive".to_string()));
    let song = rec.current_song().unwrap();
    assert_eq!(events[1], RadioEvent::SongChanged(song.title.clone()));

    let station = Catalog::builtin();
    assert!(station.station(3).unwrap().songs.contains(song));
}

#[test]
fn test_unknown_station_is_an_error() {
    let (tx, _rx) = channel();
    let mut rec = reconciler(9);
    let mut control = ControlState::default();
    control.desired_station = 12;

    match rec.reconcile(&mut control, Instant::now(), &tx) {
        Err(RadioError::UnknownStation(12)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_loop_thread_follows_control() {
    let catalog = Arc::new(Catalog::builtin());
    let control = RadioControl::new(ControlState::default(), catalog.len());
    let timing = SongTiming {
        min: Duration::from_millis(50),
        jitter: Duration::from_millis(50),
    };
    let mut rec = Reconciler::new(catalog, 50, 30, timing, StdRng::seed_from_u64(10));
    let (tx, rx) = channel();

    let loop_control = control.clone();
    let handle = thread::spawn(move || reconcile_until_stopped(&loop_control, &mut rec, &tx));

    assert_eq!(
        rx.recv_timeout(TIMEOUT).unwrap(),
        RadioEvent::StationChanged("Radio Baroque".to_string())
    );
    assert_eq!(
        rx.recv_timeout(TIMEOUT).unwrap(),
        RadioEvent::SongChanged(SONG_OFF.to_string())
    );
    rx.recv_timeout(TIMEOUT).unwrap();

    control.set_playing(true);
    let first = loop {
        if let RadioEvent::SongChanged(title) = rx.recv_timeout(TIMEOUT).unwrap() {
            break title;
        }
    };
    assert_ne!(first, SONG_OFF);

    // Short timing: the loop moves on to the other song by itself
    let second = loop {
        if let RadioEvent::SongChanged(title) = rx.recv_timeout(TIMEOUT).unwrap() {
            break title;
        }
    };
    assert_ne!(first, second);

    control.request_stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_zero_timing_keeps_control_responsive() {
    let catalog = Arc::new(Catalog::builtin());
    let control = RadioControl::new(ControlState::default(), catalog.len());
    let timing = SongTiming {
        min: Duration::ZERO,
        jitter: Duration::ZERO,
    };
    let mut rec = Reconciler::new(catalog, 50, 30, timing, StdRng::seed_from_u64(12));
    let (tx, rx) = channel();

    let loop_control = control.clone();
    let handle = thread::spawn(move || reconcile_until_stopped(&loop_control, &mut rec, &tx));

    control.set_playing(true);
    let first = loop {
        if let RadioEvent::SongChanged(title) = rx.recv_timeout(TIMEOUT).unwrap() {
            if title != SONG_OFF {
                break title;
            }
        }
    };
    assert!(!first.is_empty());
    thread::sleep(Duration::from_millis(100));

    // Commands and stop still get the lock while songs roll over
    assert_eq!(control.change_volume(10), 60);
    control.request_stop();
    handle.join().unwrap().unwrap();
}

