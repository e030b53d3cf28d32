//! Reconciliation of desired control state against applied playback state.
//!
//! [`Reconciler::reconcile`] is one wake of the radio loop. It runs with
//! the control lock held and walks the fields in a fixed order: reverse,
//! volume, station, then playing/song. Later steps read what earlier
//! steps wrote.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::catalog::{Catalog, SongInfo, StationInfo};
use crate::control::ControlState;
use crate::emitter::{EventEmitter, RadioEvent, SONG_OFF};
use crate::errors::RadioError;

/// Shortest song the loop will schedule, whatever the timing says.
pub const MIN_SONG_DURATION: Duration = Duration::from_millis(10);

/// How long a song lasts: `min` plus a uniform share of `jitter`, never
/// less than [`MIN_SONG_DURATION`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SongTiming {
    pub min: Duration,
    pub jitter: Duration,
}

impl Default for SongTiming {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(3),
            jitter: Duration::from_secs(3),
        }
    }
}

/// Effect side of the radio, owned by the loop thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_volume: u32,
    /// `None` until the first station has been announced.
    pub current_station: Option<u32>,
    pub currently_playing: bool,
    pub current_reversed: bool,
    /// True iff `current_volume` comes from reverse ducking.
    pub volume_is_auto: bool,
    /// Volume to restore when reverse ends.
    pub saved_volume: u32,
    pub current_song: Option<usize>,
    pub next_song_deadline: Option<Instant>,
    pub repick_pending: bool,
}

impl PlaybackState {
    pub fn new(initial_volume: u32) -> Self {
        Self {
            current_volume: initial_volume,
            current_station: None,
            currently_playing: false,
            current_reversed: false,
            volume_is_auto: false,
            saved_volume: initial_volume,
            current_song: None,
            next_song_deadline: None,
            repick_pending: true,
        }
    }
}

pub struct Reconciler<R> {
    catalog: Arc<Catalog>,
    timing: SongTiming,
    reverse_volume: u32,
    rng: R,
    playback: PlaybackState,
}

impl<R: Rng> Reconciler<R> {
    pub fn new(
        catalog: Arc<Catalog>,
        initial_volume: u32,
        reverse_volume: u32,
        timing: SongTiming,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            timing,
            reverse_volume,
            rng,
            playback: PlaybackState::new(initial_volume),
        }
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    /// Song currently selected on the current station.
    pub fn current_song(&self) -> Option<&SongInfo> {
        let station = self.catalog.station(self.playback.current_station?)?;
        station.songs.get(self.playback.current_song?)
    }

    /// Called when the song deadline elapsed: the next wake picks a new song.
    pub fn song_timed_out(&mut self) {
        self.playback.repick_pending = true;
    }

    /// Runs one reconciliation pass and returns the deadline the loop
    /// should wait for, `None` meaning "until signaled".
    pub fn reconcile(
        &mut self,
        control: &mut ControlState,
        now: Instant,
        emitter: &dyn EventEmitter,
    ) -> Result<Option<Instant>, RadioError> {
        let mut changed = false;

        self.apply_reverse(control);
        changed |= self.apply_volume(control, emitter);
        changed |= self.apply_station(control, emitter)?;
        self.apply_playing(control, now, changed, emitter)?;

        Ok(if self.playback.currently_playing {
            self.playback.next_song_deadline
        } else {
            None
        })
    }

    fn apply_reverse(&mut self, control: &mut ControlState) {
        if control.desired_reversed == self.playback.current_reversed {
            return;
        }

        if control.desired_reversed {
            self.playback.saved_volume = self.playback.current_volume;
            control.desired_volume = self.reverse_volume;
            control.volume_is_auto = true;
            info!(
                saved_volume = self.playback.saved_volume,
                volume = self.reverse_volume,
                "Lowering volume due to reverse"
            );
        } else if self.playback.volume_is_auto {
            control.desired_volume = self.playback.saved_volume;
            info!(
                volume = self.playback.saved_volume,
                "Restoring volume due to cancelled reverse"
            );
        }

        self.playback.current_reversed = control.desired_reversed;
    }

    fn apply_volume(&mut self, control: &mut ControlState, emitter: &dyn EventEmitter) -> bool {
        let changed = control.desired_volume != self.playback.current_volume;
        if changed {
            self.playback.current_volume = control.desired_volume;
            self.playback.volume_is_auto = control.volume_is_auto;
            debug!(
                volume = self.playback.current_volume,
                auto = self.playback.volume_is_auto,
                "Volume changed"
            );
            emitter.emit(RadioEvent::VolumeChanged(self.playback.current_volume));
        }
        // A ducking request that did not move the volume must not tag the
        // next explicit change as automatic.
        control.volume_is_auto = false;
        changed
    }

    fn apply_station(
        &mut self,
        control: &ControlState,
        emitter: &dyn EventEmitter,
    ) -> Result<bool, RadioError> {
        if self.playback.current_station == Some(control.desired_station) {
            return Ok(false);
        }

        let station = self.station(control.desired_station)?;
        let name = station.name.clone();

        self.playback.current_station = Some(control.desired_station);
        self.playback.repick_pending = true;
        debug!(station = control.desired_station, name = %name, "Station changed");
        emitter.emit(RadioEvent::StationChanged(name));
        Ok(true)
    }

    fn apply_playing(
        &mut self,
        control: &ControlState,
        now: Instant,
        mut changed: bool,
        emitter: &dyn EventEmitter,
    ) -> Result<(), RadioError> {
        if !control.desired_playing {
            if self.playback.currently_playing {
                info!("Paused playing");
            }
            emitter.emit(RadioEvent::SongChanged(SONG_OFF.to_string()));
            emitter.emit(RadioEvent::ArtistChanged(String::new()));
            self.playback.currently_playing = false;
            return Ok(());
        }

        if !self.playback.currently_playing {
            info!("Started playing");
            self.playback.repick_pending = true;
        }
        self.playback.currently_playing = true;

        let station_id = self
            .playback
            .current_station
            .ok_or(RadioError::UnknownStation(control.desired_station))?;

        if self.playback.repick_pending {
            let count = self.station(station_id)?.songs.len();
            let song = pick_song(&mut self.rng, count, self.playback.current_song);
            self.playback.current_song = Some(song);
            self.playback.repick_pending = false;
            self.playback.next_song_deadline = Some(now + self.song_duration());
            changed = true;
        }

        if changed {
            let station = self.station(station_id)?;
            let index = self.playback.current_song.unwrap_or(0);
            let song = station
                .songs
                .get(index)
                .ok_or(RadioError::UnknownStation(station_id))?;

            emitter.emit(RadioEvent::SongChanged(song.title.clone()));
            emitter.emit(RadioEvent::ArtistChanged(song.artist.clone()));
            info!(
                song = %song.title,
                artist = %song.artist,
                station = %station.name,
                volume = self.playback.current_volume,
                "Playing song"
            );
        }
        Ok(())
    }

    fn station(&self, id: u32) -> Result<&StationInfo, RadioError> {
        self.catalog
            .station(id)
            .ok_or(RadioError::UnknownStation(id))
    }

    fn song_duration(&mut self) -> Duration {
        let jitter_ms = self.timing.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            self.rng.random_range(0..jitter_ms)
        };
        (self.timing.min + Duration::from_millis(extra)).max(MIN_SONG_DURATION)
    }
}

/// Uniform pick among `count` songs, never repeating `previous` when
/// another song exists.
fn pick_song<R: Rng>(rng: &mut R, count: usize, previous: Option<usize>) -> usize {
    match previous {
        Some(previous) if count > 1 && previous < count => {
            let index = rng.random_range(0..count - 1);
            if index >= previous { index + 1 } else { index }
        }
        _ => rng.random_range(0..count.max(1)),
    }
}
