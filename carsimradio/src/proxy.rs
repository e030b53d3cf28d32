//! Typed caller side of the radio service.

use std::sync::Arc;

use carsimbus::ids::radio;
use carsimbus::{Bus, BusError, ClientId, Payload};

#[derive(Clone)]
pub struct RadioProxy {
    bus: Arc<dyn Bus>,
    client: ClientId,
}

impl RadioProxy {
    pub fn new(bus: Arc<dyn Bus>, client: ClientId) -> Self {
        Self { bus, client }
    }

    fn call(&self, method: u16, payload: Payload) -> Result<Payload, BusError> {
        self.bus.call(self.client, radio::SERVICE, method, payload)
    }

    pub fn is_available(&self) -> bool {
        self.bus.is_available(radio::SERVICE)
    }

    pub fn is_playing(&self) -> Result<bool, BusError> {
        Ok(self.call(radio::IS_PLAYING, Payload::empty())?.as_bool())
    }

    /// Returns the previously requested playing state.
    pub fn set_playing(&self, playing: bool) -> Result<bool, BusError> {
        Ok(self
            .call(radio::SET_PLAYING, Payload::from_bool(playing))?
            .as_bool())
    }

    pub fn get_volume(&self) -> Result<u32, BusError> {
        Ok(self.call(radio::GET_VOLUME, Payload::empty())?.as_u32())
    }

    /// Returns the resulting volume, clamped to `[0, 100]`.
    pub fn change_volume(&self, delta: i32) -> Result<u32, BusError> {
        Ok(self
            .call(radio::CHANGE_VOLUME, Payload::from_i32(delta))?
            .as_u32())
    }

    pub fn switch_station(&self) -> Result<(), BusError> {
        self.call(radio::SWITCH_STATION, Payload::from_u32(0))?;
        Ok(())
    }
}
