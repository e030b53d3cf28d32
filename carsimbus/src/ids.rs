//! Wire identifiers of the CarSim devices.
//!
//! These values are shared with the deployed devices and must not change.

use std::fmt;

pub type ServiceId = u16;
pub type InstanceId = u16;
pub type MethodId = u16;
pub type EventId = u16;
pub type EventgroupId = u16;

/// Identifies the client issuing a request on the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub u16);

/// A service instance addressable on the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub service: ServiceId,
    pub instance: InstanceId,
}

impl ServiceKey {
    pub const fn new(service: ServiceId, instance: InstanceId) -> Self {
        Self { service, instance }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}.{:04x}", self.service, self.instance)
    }
}

pub mod radio {
    use super::{EventId, EventgroupId, MethodId, ServiceKey};

    pub const SERVICE: ServiceKey = ServiceKey::new(0x1000, 1);

    pub const IS_PLAYING: MethodId = 1;
    pub const SET_PLAYING: MethodId = 2;
    pub const GET_VOLUME: MethodId = 3;
    pub const CHANGE_VOLUME: MethodId = 4;
    pub const SWITCH_STATION: MethodId = 5;

    pub const EVENTGROUP: EventgroupId = 0x4001;
    pub const VOLUME_EVENT: EventId = 0x8000 + 1;
    pub const STATION_EVENT: EventId = 0x8000 + 2;
    pub const SONG_EVENT: EventId = 0x8000 + 3;
    pub const ARTIST_EVENT: EventId = 0x8000 + 4;

    pub const EVENTS: [EventId; 4] = [VOLUME_EVENT, STATION_EVENT, SONG_EVENT, ARTIST_EVENT];
}

pub mod engine {
    use super::{EventId, EventgroupId, MethodId, ServiceKey};

    pub const SERVICE: ServiceKey = ServiceKey::new(0x1001, 1);

    pub const GET_REVERSE: MethodId = 1;

    pub const EVENTGROUP: EventgroupId = 0x4002;
    pub const REVERSE_EVENT: EventId = 0x8000 + 1;
}
