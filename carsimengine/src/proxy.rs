use std::sync::Arc;

use carsimbus::ids::engine;
use carsimbus::{Bus, BusError, ClientId, Payload};

/// Typed caller side of the engine service.
#[derive(Clone)]
pub struct EngineProxy {
    bus: Arc<dyn Bus>,
    client: ClientId,
}

impl EngineProxy {
    pub fn new(bus: Arc<dyn Bus>, client: ClientId) -> Self {
        Self { bus, client }
    }

    pub fn is_available(&self) -> bool {
        self.bus.is_available(engine::SERVICE)
    }

    pub fn get_reverse(&self) -> Result<bool, BusError> {
        let reply = self
            .bus
            .call(self.client, engine::SERVICE, engine::GET_REVERSE, Payload::empty())?;
        Ok(reply.as_bool())
    }
}
