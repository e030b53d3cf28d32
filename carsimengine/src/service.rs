//! Engine service: alternates forward and reverse on a fixed schedule.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use carsimbus::ids::engine;
use carsimbus::{Bus, BusError, Payload, Request, ServiceState, request_handler};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    pub fn is_reverse(self) -> bool {
        self == Direction::Reverse
    }

    fn from_reverse(reversed: bool) -> Self {
        if reversed {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }
}

/// How long the engine stays in each direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub forward: Duration,
    pub reverse: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            forward: Duration::from_secs(10),
            reverse: Duration::from_secs(4),
        }
    }
}

impl EngineSettings {
    pub fn dwell(&self, direction: Direction) -> Duration {
        match direction {
            Direction::Forward => self.forward,
            Direction::Reverse => self.reverse,
        }
    }
}

pub struct EngineService {
    bus: Arc<dyn Bus>,
    settings: EngineSettings,
    reversed: Arc<AtomicBool>,
    state: Mutex<ServiceState>,
    offered: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl EngineService {
    pub fn new(bus: Arc<dyn Bus>, settings: EngineSettings) -> Self {
        Self {
            bus,
            settings,
            reversed: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(ServiceState::WaitingToStart),
            offered: AtomicBool::new(false),
            stop_tx: Mutex::new(None),
            loop_handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    pub fn direction(&self) -> Direction {
        Direction::from_reverse(self.reversed.load(Ordering::SeqCst))
    }

    /// Offers the engine, publishes the initial direction and starts the
    /// direction schedule.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if *state != ServiceState::WaitingToStart {
            return Err(EngineError::InvalidTransition("start", *state));
        }

        let reversed = Arc::clone(&self.reversed);
        self.bus.offer(
            engine::SERVICE,
            request_handler(move |request: &Request| match request.method {
                engine::GET_REVERSE => Ok(Payload::from_bool(reversed.load(Ordering::SeqCst))),
                other => Err(BusError::unknown_method(request.service, other)),
            }),
        )?;
        self.offered.store(true, Ordering::SeqCst);

        let direction = self.direction();
        self.bus.notify(
            engine::SERVICE,
            engine::REVERSE_EVENT,
            Payload::from_bool(direction.is_reverse()),
        );

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let bus = Arc::clone(&self.bus);
        let reversed = Arc::clone(&self.reversed);
        let settings = self.settings;
        let spawned = thread::Builder::new()
            .name("engine-loop".into())
            .spawn(move || engine_loop(bus, settings, reversed, stop_rx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.bus.stop_offer(engine::SERVICE);
                self.offered.store(false, Ordering::SeqCst);
                *state = ServiceState::Stopped;
                return Err(EngineError::Spawn(err.to_string()));
            }
        };

        *self.stop_tx.lock() = Some(stop_tx);
        *self.loop_handle.lock() = Some(handle);
        *state = ServiceState::Running;
        info!(
            forward_ms = self.settings.forward.as_millis() as u64,
            reverse_ms = self.settings.reverse.as_millis() as u64,
            "Engine service started"
        );
        Ok(())
    }

    /// Stops the schedule and withdraws the engine. Idempotent.
    pub fn stop(&self) {
        // Dropping the sender wakes the loop
        self.stop_tx.lock().take();

        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Engine loop thread panicked");
            }
        }

        if self.offered.swap(false, Ordering::SeqCst) {
            self.bus.stop_offer(engine::SERVICE);
        }

        let mut state = self.state.lock();
        if *state != ServiceState::Stopped {
            *state = ServiceState::Stopped;
            info!("Engine service stopped");
        }
    }
}

impl Drop for EngineService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn engine_loop(
    bus: Arc<dyn Bus>,
    settings: EngineSettings,
    reversed: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
) {
    let mut direction = Direction::from_reverse(reversed.load(Ordering::SeqCst));
    debug!(?direction, "Engine loop started");

    loop {
        match stop_rx.recv_timeout(settings.dwell(direction)) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        direction = direction.toggled();
        reversed.store(direction.is_reverse(), Ordering::SeqCst);
        match direction {
            Direction::Forward => info!("Driving"),
            Direction::Reverse => info!("Reversing"),
        }
        bus.notify(
            engine::SERVICE,
            engine::REVERSE_EVENT,
            Payload::from_bool(direction.is_reverse()),
        );
    }

    debug!("Engine loop exiting");
}
