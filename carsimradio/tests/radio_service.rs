use std::sync::Arc;
use std::time::{Duration, Instant};

use carsimbus::ids::{engine, radio};
use carsimbus::{
    Bus, BusError, ClientId, Event, LocalBus, Payload, Request, event_handler, request_handler,
};
use carsimradio::{
    Catalog, RadioError, RadioEvent, RadioProxy, RadioService, RadioSettings, SONG_OFF,
    ServiceState,
};
use crossbeam_channel::{Receiver, unbounded};

const TIMEOUT: Duration = Duration::from_secs(2);

struct Harness {
    bus: Arc<LocalBus>,
    radio: RadioService,
    proxy: RadioProxy,
    events: Receiver<RadioEvent>,
}

fn harness(settings: RadioSettings) -> Harness {
    let bus = LocalBus::new();
    let dyn_bus: Arc<dyn Bus> = bus.clone();

    let (tx, events) = unbounded();
    for event in radio::EVENTS {
        let tx = tx.clone();
        dyn_bus.subscribe(
            radio::SERVICE,
            event,
            event_handler(move |ev: &Event| {
                if let Some(decoded) = RadioEvent::from_event(ev) {
                    let _ = tx.send(decoded);
                }
            }),
        );
    }

    let radio = RadioService::new(
        Arc::clone(&dyn_bus),
        Arc::new(Catalog::builtin()),
        settings,
    );
    let proxy = RadioProxy::new(dyn_bus, ClientId(0x20));
    Harness {
        bus,
        radio,
        proxy,
        events,
    }
}

fn seeded() -> RadioSettings {
    RadioSettings {
        rng_seed: Some(11),
        ..RadioSettings::default()
    }
}

fn offer_engine(bus: &LocalBus) {
    bus.offer(
        engine::SERVICE,
        request_handler(|_req: &Request| Ok(Payload::from_bool(false))),
    )
    .unwrap();
}

fn reverse(bus: &LocalBus, reversed: bool) {
    bus.notify(
        engine::SERVICE,
        engine::REVERSE_EVENT,
        Payload::from_bool(reversed),
    );
}

/// Waits for the first event accepted by `pick`, skipping the others.
fn next_matching<T>(
    rx: &Receiver<RadioEvent>,
    timeout: Duration,
    mut pick: impl FnMut(&RadioEvent) -> Option<T>,
) -> T {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        let event = rx
            .recv_timeout(left)
            .unwrap_or_else(|_| panic!("no matching event within {timeout:?}"));
        if let Some(value) = pick(&event) {
            return value;
        }
    }
}

fn next_song(rx: &Receiver<RadioEvent>, timeout: Duration) -> String {
    next_matching(rx, timeout, |e| match e {
        RadioEvent::SongChanged(title) if title != SONG_OFF => Some(title.clone()),
        _ => None,
    })
}

fn next_volume(rx: &Receiver<RadioEvent>) -> u32 {
    next_matching(rx, TIMEOUT, |e| match e {
        RadioEvent::VolumeChanged(v) => Some(*v),
        _ => None,
    })
}

#[test]
fn test_play_duck_and_restore_scenario() {
    let h = harness(seeded());
    h.radio.start().unwrap();
    assert_eq!(h.radio.state(), ServiceState::Running);
    assert!(h.proxy.is_available());

    assert_eq!(
        h.events.recv_timeout(TIMEOUT).unwrap(),
        RadioEvent::StationChanged("Radio Baroque".to_string())
    );
    assert_eq!(
        h.events.recv_timeout(TIMEOUT).unwrap(),
        RadioEvent::SongChanged(SONG_OFF.to_string())
    );
    assert_eq!(
        h.events.recv_timeout(TIMEOUT).unwrap(),
        RadioEvent::ArtistChanged(String::new())
    );

    assert!(!h.proxy.set_playing(true).unwrap());
    assert!(h.proxy.is_playing().unwrap());
    let first = next_song(&h.events, TIMEOUT);
    let baroque = ["Air on the G String", "Spring"];
    assert!(baroque.contains(&first.as_str()));

    offer_engine(&h.bus);
    reverse(&h.bus, true);
    assert_eq!(next_volume(&h.events), 30);
    assert_eq!(h.proxy.get_volume().unwrap(), 30);

    // Station 0 has two songs, so the next one is the other one. The
    // current song is re-announced along with the volume change.
    let second = next_matching(&h.events, Duration::from_secs(7), |e| match e {
        RadioEvent::SongChanged(title) if title != SONG_OFF && *title != first => {
            Some(title.clone())
        }
        _ => None,
    });
    assert!(baroque.contains(&second.as_str()));

    reverse(&h.bus, false);
    assert_eq!(next_volume(&h.events), 50);

    h.radio.stop();
    assert_eq!(h.radio.state(), ServiceState::Stopped);
    assert!(!h.proxy.is_available());
    assert_eq!(
        h.proxy.get_volume().unwrap_err(),
        BusError::ServiceUnavailable(radio::SERVICE)
    );
}

#[test]
fn test_commands_through_proxy() {
    let h = harness(seeded());
    h.radio.start().unwrap();

    assert_eq!(h.proxy.change_volume(70).unwrap(), 100);
    assert_eq!(h.proxy.change_volume(-130).unwrap(), 0);
    assert_eq!(h.proxy.get_volume().unwrap(), 0);

    h.proxy.switch_station().unwrap();
    let station = next_matching(&h.events, TIMEOUT, |e| match e {
        RadioEvent::StationChanged(name) if name != "Radio Baroque" => Some(name.clone()),
        _ => None,
    });
    assert_eq!(station, "Romantic FM");

    assert!(!h.proxy.set_playing(true).unwrap());
    assert!(h.proxy.set_playing(false).unwrap());
    assert!(!h.proxy.is_playing().unwrap());

    h.radio.stop();
}

#[test]
fn test_engine_loss_cancels_reverse() {
    let h = harness(seeded());
    offer_engine(&h.bus);
    h.radio.start().unwrap();

    reverse(&h.bus, true);
    assert_eq!(next_volume(&h.events), 30);
    assert!(h.radio.is_engine_available());

    h.bus.stop_offer(engine::SERVICE);
    assert_eq!(next_volume(&h.events), 50);
    assert!(!h.radio.is_engine_available());
    assert!(!h.radio.control().snapshot().desired_reversed);

    h.radio.stop();
}

#[test]
fn test_autoplay_starts_without_command() {
    let h = harness(RadioSettings {
        autoplay: true,
        ..seeded()
    });
    h.radio.start().unwrap();

    let title = next_song(&h.events, TIMEOUT);
    assert!(!title.is_empty());
    assert!(h.proxy.is_playing().unwrap());

    h.radio.stop();
}

#[test]
fn test_lifecycle_transitions() {
    let h = harness(seeded());
    assert_eq!(h.radio.state(), ServiceState::WaitingToStart);
    h.radio.init().unwrap();
    h.radio.init().unwrap();

    h.radio.start().unwrap();
    assert!(matches!(
        h.radio.start(),
        Err(RadioError::InvalidTransition("start", ServiceState::Running))
    ));

    h.radio.stop();
    h.radio.stop();
    assert_eq!(h.radio.state(), ServiceState::Stopped);
    assert!(matches!(
        h.radio.init(),
        Err(RadioError::InvalidTransition("init", ServiceState::Stopped))
    ));
}

#[test]
fn test_second_radio_cannot_offer() {
    let h = harness(seeded());
    h.radio.start().unwrap();

    let other = RadioService::new(
        h.bus.clone(),
        Arc::new(Catalog::builtin()),
        RadioSettings::default(),
    );
    assert!(matches!(
        other.start(),
        Err(RadioError::Bus(BusError::AlreadyOffered(_)))
    ));
    assert_eq!(other.state(), ServiceState::Stopped);

    // The first radio still answers
    assert_eq!(h.proxy.get_volume().unwrap(), 50);
    h.radio.stop();
}
