use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use carsimbus::ids::{engine, radio};
use carsimbus::{
    Bus, BusError, ClientId, Event, HandlerId, ServiceKey, availability_handler, event_handler,
};
use carsimradio::{RadioEvent, RadioProxy};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::command::Command;
use crate::state::ClientState;

/// Interactive radio client: mirrors the radio and engine notifications in
/// a [`ClientState`] and turns commands into radio calls.
pub struct RadioClient {
    bus: Arc<dyn Bus>,
    proxy: RadioProxy,
    state: Arc<Mutex<ClientState>>,
    handlers: Mutex<Vec<HandlerId>>,
    sent_off: AtomicBool,
}

impl RadioClient {
    pub fn connect(bus: Arc<dyn Bus>, client: ClientId) -> Self {
        let state = Arc::new(Mutex::new(ClientState::new()));
        let mut handlers = Vec::new();

        for event in radio::EVENTS {
            let state = Arc::clone(&state);
            handlers.push(bus.subscribe(
                radio::SERVICE,
                event,
                event_handler(move |ev: &Event| {
                    if let Some(decoded) = RadioEvent::from_event(ev) {
                        state.lock().apply(&decoded);
                    }
                }),
            ));
        }

        let radio_state = Arc::clone(&state);
        handlers.push(bus.on_availability(
            radio::SERVICE,
            availability_handler(move |service: ServiceKey, available: bool| {
                debug!(service = %service, available, "Radio availability");
                radio_state.lock().set_radio_available(available);
            }),
        ));

        let reverse_state = Arc::clone(&state);
        handlers.push(bus.subscribe(
            engine::SERVICE,
            engine::REVERSE_EVENT,
            event_handler(move |ev: &Event| {
                reverse_state.lock().set_reverse(ev.payload.as_bool());
            }),
        ));

        let engine_state = Arc::clone(&state);
        handlers.push(bus.on_availability(
            engine::SERVICE,
            availability_handler(move |service: ServiceKey, available: bool| {
                debug!(service = %service, available, "Engine availability");
                engine_state.lock().set_engine_available(available);
            }),
        ));

        info!(client = client.0, "Radio client connected");
        Self {
            proxy: RadioProxy::new(Arc::clone(&bus), client),
            bus,
            state,
            handlers: Mutex::new(handlers),
            sent_off: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state.lock().clone()
    }

    /// Returns the state if it changed since the previous call.
    pub fn take_update(&self) -> Option<ClientState> {
        let mut state = self.state.lock();
        state.take_dirty().then(|| state.clone())
    }

    /// Runs `command`. Returns `true` when the client should quit.
    pub fn execute(&self, command: Command) -> Result<bool, BusError> {
        match command {
            Command::ChangeVolume(delta) => {
                let volume = self.proxy.change_volume(delta)?;
                debug!(delta, volume, "Volume requested");
            }
            Command::SwitchStation => self.proxy.switch_station()?,
            Command::TogglePower => {
                let turn_on = self.sent_off.load(Ordering::SeqCst);
                self.proxy.set_playing(turn_on)?;
                self.sent_off.store(!turn_on, Ordering::SeqCst);
                debug!(playing = turn_on, "Power toggled");
            }
            Command::Quit => return Ok(true),
        }
        Ok(false)
    }

    /// Drops every subscription. Idempotent.
    pub fn close(&self) {
        for id in self.handlers.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}

impl Drop for RadioClient {
    fn drop(&mut self) {
        self.close();
    }
}
