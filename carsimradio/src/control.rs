//! Shared control state and the command handlers writing it.
//!
//! Handlers run on any caller thread. Each one holds the lock only for an
//! O(1) update and signals the radio loop only when a desired value
//! actually changed.

use std::sync::Arc;

use tracing::debug;

use crate::monitor::{Monitor, MonitorGuard};

pub const MIN_VOLUME: u32 = 0;
pub const MAX_VOLUME: u32 = 100;

/// Intent side of the radio: the latest values requested by callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlState {
    /// Always within `[MIN_VOLUME, MAX_VOLUME]`.
    pub desired_volume: u32,
    /// Always below the catalog size.
    pub desired_station: u32,
    pub desired_playing: bool,
    pub desired_reversed: bool,
    /// Set when `desired_volume` was written by reverse ducking rather
    /// than by a caller. Cleared when the loop adopts the volume.
    pub volume_is_auto: bool,
    pub running: bool,
}

impl ControlState {
    pub fn new(default_volume: u32) -> Self {
        Self {
            desired_volume: default_volume.clamp(MIN_VOLUME, MAX_VOLUME),
            desired_station: 0,
            desired_playing: false,
            desired_reversed: false,
            volume_is_auto: false,
            running: true,
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(50)
    }
}

/// Command handlers over the shared [`ControlState`].
#[derive(Clone, Debug)]
pub struct RadioControl {
    monitor: Arc<Monitor<ControlState>>,
    station_count: u32,
}

impl RadioControl {
    pub fn new(state: ControlState, station_count: u32) -> Self {
        Self {
            monitor: Arc::new(Monitor::new(state)),
            station_count: station_count.max(1),
        }
    }

    pub(crate) fn lock(&self) -> MonitorGuard<'_, ControlState> {
        self.monitor.lock()
    }

    /// Copy of the current intent.
    pub fn snapshot(&self) -> ControlState {
        self.monitor.lock().clone()
    }

    /// Sets the desired playing flag and returns the previous desired value.
    pub fn set_playing(&self, playing: bool) -> bool {
        let mut state = self.monitor.lock();
        let previous = state.desired_playing;
        if previous != playing {
            state.desired_playing = playing;
            state.signal();
            debug!(playing, "Desired playing changed");
        }
        previous
    }

    /// Desired playing flag, not the applied one.
    pub fn is_playing(&self) -> bool {
        self.monitor.lock().desired_playing
    }

    /// Adds `delta` to the desired volume, clamped to `[0, 100]`, and
    /// returns the resulting desired volume.
    pub fn change_volume(&self, delta: i32) -> u32 {
        let mut state = self.monitor.lock();
        let volume = (i64::from(state.desired_volume) + i64::from(delta))
            .clamp(i64::from(MIN_VOLUME), i64::from(MAX_VOLUME)) as u32;

        if state.desired_volume != volume {
            state.desired_volume = volume;
            state.signal();
            debug!(delta, volume, "Desired volume changed");
        }
        volume
    }

    pub fn get_volume(&self) -> u32 {
        self.monitor.lock().desired_volume
    }

    /// Moves the desired station to the next one, wrapping around.
    pub fn switch_station(&self) {
        let mut state = self.monitor.lock();
        let station = (state.desired_station + 1) % self.station_count;
        if state.desired_station != station {
            state.desired_station = station;
            state.signal();
            debug!(station, "Desired station changed");
        }
    }

    pub fn station(&self) -> u32 {
        self.monitor.lock().desired_station
    }

    /// Applies the engine direction reported on the bus.
    pub fn set_reversed(&self, reversed: bool) {
        let mut state = self.monitor.lock();
        if state.desired_reversed != reversed {
            state.desired_reversed = reversed;
            state.signal();
            debug!(reversed, "Desired reverse changed");
        }
    }

    /// Asks the loop to exit at its next wake, and wakes it.
    pub fn request_stop(&self) {
        let mut state = self.monitor.lock();
        state.running = false;
        state.signal();
    }

    pub fn station_count(&self) -> u32 {
        self.station_count
    }
}
