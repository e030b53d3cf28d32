use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use carsimbus::ids::engine;
use carsimbus::{Bus, BusError, ClientId, LocalBus, Payload, Request, request_handler};
use carsimclient::{CONNECTING, ClientState, Command, RadioClient};
use carsimradio::{Catalog, RadioService, RadioSettings, SONG_OFF};

fn wait_for(client: &RadioClient, what: &str, check: impl Fn(&ClientState) -> bool) -> ClientState {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let state = client.state();
        if check(&state) {
            return state;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}: {state:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn radio(bus: &Arc<LocalBus>) -> RadioService {
    RadioService::new(
        bus.clone(),
        Arc::new(Catalog::builtin()),
        RadioSettings {
            rng_seed: Some(3),
            ..RadioSettings::default()
        },
    )
}

#[test]
fn test_client_follows_radio() {
    let bus = LocalBus::new();
    let client = RadioClient::connect(bus.clone(), ClientId(0x40));

    let state = wait_for(&client, "initial availability", |s| !s.radio_available);
    assert_eq!(state.render(), vec![CONNECTING.to_string()]);
    assert_eq!(
        client.execute(Command::SwitchStation).unwrap_err(),
        BusError::ServiceUnavailable(carsimbus::ids::radio::SERVICE)
    );

    let radio = radio(&bus);
    radio.start().unwrap();
    let state = wait_for(&client, "first station", |s| {
        s.radio_available && s.station == "Radio Baroque" && s.song == SONG_OFF
    });
    assert_eq!(state.render()[0], "Station: Radio Baroque");

    assert!(!client.execute(Command::ChangeVolume(10)).unwrap());
    wait_for(&client, "volume 60", |s| s.volume == 60);

    assert!(!client.execute(Command::SwitchStation).unwrap());
    wait_for(&client, "next station", |s| s.station == "Romantic FM");

    // First ESC switches off, second switches on
    client.execute(Command::TogglePower).unwrap();
    assert!(!radio.control().is_playing());
    client.execute(Command::TogglePower).unwrap();
    assert!(radio.control().is_playing());
    wait_for(&client, "a song", |s| s.song != SONG_OFF && !s.artist.is_empty());

    assert!(client.execute(Command::Quit).unwrap());

    radio.stop();
    let state = wait_for(&client, "radio gone", |s| !s.radio_available);
    assert_eq!(state.render(), vec![CONNECTING.to_string()]);
}

#[test]
fn test_client_tracks_engine_reverse() {
    let bus = LocalBus::new();
    let client = RadioClient::connect(bus.clone(), ClientId(0x41));

    bus.offer(
        engine::SERVICE,
        request_handler(|_req: &Request| Ok(Payload::from_bool(true))),
    )
    .unwrap();
    bus.notify(engine::SERVICE, engine::REVERSE_EVENT, Payload::from_bool(true));
    wait_for(&client, "reverse", |s| s.in_reverse);

    bus.stop_offer(engine::SERVICE);
    wait_for(&client, "reverse cleared", |s| !s.in_reverse);
}

#[test]
fn test_take_update_reports_changes_once() {
    let bus = LocalBus::new();
    let client = RadioClient::connect(bus.clone(), ClientId(0x42));
    wait_for(&client, "settled", |s| !s.radio_available);
    // Let the availability replays land
    thread::sleep(Duration::from_millis(50));

    assert!(client.take_update().is_some());
    assert!(client.take_update().is_none());

    bus.notify(engine::SERVICE, engine::REVERSE_EVENT, Payload::from_bool(true));
    wait_for(&client, "reverse", |s| s.in_reverse);
    let update = client.take_update().unwrap();
    assert!(update.in_reverse);

    client.close();
    client.close();
}
