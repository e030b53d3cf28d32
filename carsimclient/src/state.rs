//! What the client displays, fed by radio and engine notifications.

use carsimradio::RadioEvent;

/// Number of cells of the volume meter, one per 5% step.
pub const METER_CELLS: u32 = 21;

pub const CONNECTING: &str = "Connecting to radio service";
const BANNER: &str = "------------------------------------------";
const BANNER_REVERSING: &str = "------------------------------[REVERSING]-";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientState {
    pub station: String,
    pub song: String,
    pub artist: String,
    pub volume: u32,
    pub in_reverse: bool,
    pub radio_available: bool,
    /// Set by every update, cleared by [`ClientState::take_dirty`].
    pub dirty: bool,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: &RadioEvent) {
        match event {
            RadioEvent::VolumeChanged(volume) => self.volume = *volume,
            RadioEvent::StationChanged(station) => self.station.clone_from(station),
            RadioEvent::SongChanged(song) => self.song.clone_from(song),
            RadioEvent::ArtistChanged(artist) => self.artist.clone_from(artist),
        }
        self.dirty = true;
    }

    pub fn set_radio_available(&mut self, available: bool) {
        self.radio_available = available;
        self.dirty = true;
    }

    pub fn set_reverse(&mut self, reversed: bool) {
        self.in_reverse = reversed;
        self.dirty = true;
    }

    /// A vanished engine cannot be reversing.
    pub fn set_engine_available(&mut self, available: bool) {
        if !available {
            self.set_reverse(false);
        }
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn render(&self) -> Vec<String> {
        if !self.radio_available {
            return vec![CONNECTING.to_string()];
        }
        vec![
            format!("Station: {}", self.station),
            format!("Song:    {}", self.song),
            format!("Artist:  {}", self.artist),
            format!("Volume:  [{}] ", volume_meter(self.volume)),
            if self.in_reverse {
                BANNER_REVERSING.to_string()
            } else {
                BANNER.to_string()
            },
        ]
    }
}

pub fn volume_meter(volume: u32) -> String {
    (0..METER_CELLS)
        .map(|i| if volume > i * 5 || volume == 100 { '#' } else { ' ' })
        .collect()
}
