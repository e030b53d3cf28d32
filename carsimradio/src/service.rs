//! Radio service lifecycle and its reconciliation loop thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use carsimbus::ids::{engine, radio};
use carsimbus::{
    Bus, Event, HandlerId, Request, ServiceKey, ServiceState, availability_handler, event_handler,
    request_handler,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::control::{ControlState, MAX_VOLUME, RadioControl};
use crate::emitter::{BusEmitter, EventEmitter};
use crate::errors::RadioError;
use crate::handlers::handle_request;
use crate::monitor::Wake;
use crate::playback::{Reconciler, SongTiming};

#[derive(Clone, Debug)]
pub struct RadioSettings {
    pub default_volume: u32,
    /// Volume applied while the engine is in reverse.
    pub reverse_volume: u32,
    /// Start playing as soon as the service starts.
    pub autoplay: bool,
    /// Log every inbound request at debug level.
    pub verbose: bool,
    pub song_timing: SongTiming,
    /// Fixed seed for song selection, `None` to seed from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            default_volume: 50,
            reverse_volume: 30,
            autoplay: false,
            verbose: false,
            song_timing: SongTiming::default(),
            rng_seed: None,
        }
    }
}

pub struct RadioService {
    bus: Arc<dyn Bus>,
    catalog: Arc<Catalog>,
    settings: RadioSettings,
    control: RadioControl,
    emitter: Arc<dyn EventEmitter>,
    state: Arc<Mutex<ServiceState>>,
    engine_available: Arc<AtomicBool>,
    initialized: AtomicBool,
    offered: Arc<AtomicBool>,
    handlers: Mutex<Vec<HandlerId>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RadioService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioService")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .field("control", &self.control)
            .field("engine_available", &self.is_engine_available())
            .finish()
    }
}

impl RadioService {
    /// Creates a radio publishing its notifications on `bus`.
    pub fn new(bus: Arc<dyn Bus>, catalog: Arc<Catalog>, settings: RadioSettings) -> Self {
        let emitter: Arc<dyn EventEmitter> = Arc::new(BusEmitter::new(Arc::clone(&bus)));
        Self::with_emitter(bus, catalog, settings, emitter)
    }

    /// Creates a radio publishing its notifications to `emitter`.
    pub fn with_emitter(
        bus: Arc<dyn Bus>,
        catalog: Arc<Catalog>,
        settings: RadioSettings,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        let mut settings = settings;
        settings.default_volume = settings.default_volume.min(MAX_VOLUME);
        settings.reverse_volume = settings.reverse_volume.min(MAX_VOLUME);

        let control = RadioControl::new(ControlState::new(settings.default_volume), catalog.len());

        Self {
            bus,
            catalog,
            settings,
            control,
            emitter,
            state: Arc::new(Mutex::new(ServiceState::WaitingToStart)),
            engine_available: Arc::new(AtomicBool::new(false)),
            initialized: AtomicBool::new(false),
            offered: Arc::new(AtomicBool::new(false)),
            handlers: Mutex::new(Vec::new()),
            loop_handle: Mutex::new(None),
        }
    }

    pub fn control(&self) -> &RadioControl {
        &self.control
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    pub fn is_engine_available(&self) -> bool {
        self.engine_available.load(Ordering::SeqCst)
    }

    /// Follows the engine: its reverse events and its availability.
    ///
    /// Idempotent. Only valid before `start`.
    pub fn init(&self) -> Result<(), RadioError> {
        let state = self.state();
        if state != ServiceState::WaitingToStart {
            return Err(RadioError::InvalidTransition("init", state));
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let control = self.control.clone();
        let reverse_id = self.bus.subscribe(
            engine::SERVICE,
            engine::REVERSE_EVENT,
            event_handler(move |event: &Event| {
                let reversed = event.payload.as_bool();
                debug!(
                    reversed,
                    "Received event: {}",
                    if reversed { "engine reversed" } else { "engine forward" }
                );
                control.set_reversed(reversed);
            }),
        );

        let control = self.control.clone();
        let engine_available = Arc::clone(&self.engine_available);
        let availability_id = self.bus.on_availability(
            engine::SERVICE,
            availability_handler(move |service: ServiceKey, available: bool| {
                let was_available = engine_available.swap(available, Ordering::SeqCst);
                if was_available != available {
                    info!(
                        service = %service,
                        "Engine service is {}",
                        if available { "available" } else { "NOT available" }
                    );
                }
                if !available {
                    // Last reported direction is stale once the engine is gone.
                    control.set_reversed(false);
                }
            }),
        );

        self.handlers.lock().extend([reverse_id, availability_id]);
        Ok(())
    }

    /// Spawns the reconciliation loop and offers the radio on the bus.
    pub fn start(&self) -> Result<(), RadioError> {
        let state = self.state();
        if state != ServiceState::WaitingToStart {
            return Err(RadioError::InvalidTransition("start", state));
        }
        self.init()?;

        if self.settings.autoplay {
            self.control.set_playing(true);
        }

        let reconciler = Reconciler::new(
            Arc::clone(&self.catalog),
            self.settings.default_volume,
            self.settings.reverse_volume,
            self.settings.song_timing,
            self.make_rng(),
        );

        let control = self.control.clone();
        let emitter = Arc::clone(&self.emitter);
        let offer = LoopOffer {
            bus: Arc::clone(&self.bus),
            state: Arc::clone(&self.state),
            offered: Arc::clone(&self.offered),
        };
        let handle = thread::Builder::new()
            .name("radio-loop".to_string())
            .spawn(move || run_loop(control, reconciler, emitter, offer))
            .map_err(|e| RadioError::Spawn(e.to_string()))?;
        *self.loop_handle.lock() = Some(handle);

        let control = self.control.clone();
        let verbose = self.settings.verbose;
        let offered = self.bus.offer(
            radio::SERVICE,
            request_handler(move |request: &Request| handle_request(&control, verbose, request)),
        );
        if let Err(err) = offered {
            error!(error = %err, "Couldn't offer radio service");
            self.stop();
            return Err(err.into());
        }

        let mut state = self.state.lock();
        if *state != ServiceState::WaitingToStart {
            // The loop already aborted, so nothing would serve the offer
            let aborted = *state;
            drop(state);
            self.bus.stop_offer(radio::SERVICE);
            self.stop();
            return Err(RadioError::InvalidTransition("start", aborted));
        }
        self.offered.store(true, Ordering::SeqCst);
        *state = ServiceState::Running;
        info!(stations = self.catalog.len(), "Radio service started");
        Ok(())
    }

    /// Stops the loop, drops every subscription and withdraws the service.
    ///
    /// Blocks until the loop thread has exited. Idempotent. A loop that
    /// aborted on its own only withdraws the offer; the engine
    /// subscriptions and the thread handle are released here.
    pub fn stop(&self) {
        self.control.request_stop();

        for id in self.handlers.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
        if self.offered.swap(false, Ordering::SeqCst) {
            self.bus.stop_offer(radio::SERVICE);
        }

        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Radio loop thread panicked");
            }
        }

        let mut state = self.state.lock();
        if *state != ServiceState::Stopped {
            *state = ServiceState::Stopped;
            info!("Radio service stopped");
        }
    }

    fn make_rng(&self) -> StdRng {
        match self.settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl Drop for RadioService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// What the loop thread needs to take the radio off the bus when it aborts.
struct LoopOffer {
    bus: Arc<dyn Bus>,
    state: Arc<Mutex<ServiceState>>,
    offered: Arc<AtomicBool>,
}

impl LoopOffer {
    fn abort(&self) {
        let mut state = self.state.lock();
        *state = ServiceState::Stopped;
        if self.offered.swap(false, Ordering::SeqCst) {
            self.bus.stop_offer(radio::SERVICE);
            warn!("Radio service withdrawn after loop failure");
        }
    }
}

fn run_loop(
    control: RadioControl,
    mut reconciler: Reconciler<StdRng>,
    emitter: Arc<dyn EventEmitter>,
    offer: LoopOffer,
) {
    info!("Started radio loop");
    if let Err(err) = reconcile_until_stopped(&control, &mut reconciler, emitter.as_ref()) {
        error!(error = %err, "Radio loop aborted");
        offer.abort();
    }
    info!("Radio loop exited");
}

/// Body of the radio loop: reconcile, then sleep until signaled or until
/// the song deadline, until a stop is requested.
pub fn reconcile_until_stopped<R: Rng>(
    control: &RadioControl,
    reconciler: &mut Reconciler<R>,
    emitter: &dyn EventEmitter,
) -> Result<(), RadioError> {
    let mut guard = control.lock();
    while guard.running {
        let deadline = reconciler.reconcile(&mut guard, Instant::now(), emitter)?;
        if guard.wait_until(deadline) == Wake::TimedOut && guard.desired_playing {
            reconciler.song_timed_out();
        }
    }
    Ok(())
}
