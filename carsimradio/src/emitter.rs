//! Change notifications published by the radio.

use std::sync::Arc;

use carsimbus::ids::radio;
use carsimbus::{Bus, Event, EventId, Payload};
use crossbeam_channel::Sender;

/// Text published as the song title while the radio is off.
pub const SONG_OFF: &str = "-off-";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RadioEvent {
    VolumeChanged(u32),
    StationChanged(String),
    SongChanged(String),
    ArtistChanged(String),
}

impl RadioEvent {
    pub fn event_id(&self) -> EventId {
        match self {
            RadioEvent::VolumeChanged(_) => radio::VOLUME_EVENT,
            RadioEvent::StationChanged(_) => radio::STATION_EVENT,
            RadioEvent::SongChanged(_) => radio::SONG_EVENT,
            RadioEvent::ArtistChanged(_) => radio::ARTIST_EVENT,
        }
    }

    pub fn payload(&self) -> Payload {
        match self {
            RadioEvent::VolumeChanged(volume) => Payload::from_u32(*volume),
            RadioEvent::StationChanged(text)
            | RadioEvent::SongChanged(text)
            | RadioEvent::ArtistChanged(text) => Payload::from_string(text),
        }
    }

    /// Decodes a radio event received from the bus.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.service != radio::SERVICE {
            return None;
        }
        match event.event {
            radio::VOLUME_EVENT => Some(RadioEvent::VolumeChanged(event.payload.as_u32())),
            radio::STATION_EVENT => Some(RadioEvent::StationChanged(event.payload.as_string())),
            radio::SONG_EVENT => Some(RadioEvent::SongChanged(event.payload.as_string())),
            radio::ARTIST_EVENT => Some(RadioEvent::ArtistChanged(event.payload.as_string())),
            _ => None,
        }
    }
}

/// Sink the radio loop publishes to. Must not block.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: RadioEvent);
}

/// Publishes radio events as field events on the bus.
#[derive(Clone)]
pub struct BusEmitter {
    bus: Arc<dyn Bus>,
}

impl BusEmitter {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self { bus }
    }
}

impl EventEmitter for BusEmitter {
    fn emit(&self, event: RadioEvent) {
        self.bus
            .notify(radio::SERVICE, event.event_id(), event.payload());
    }
}

impl EventEmitter for Sender<RadioEvent> {
    fn emit(&self, event: RadioEvent) {
        let _ = self.send(event);
    }
}
