use carsimbus::{BusError, ServiceState};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cannot {0} an engine that is {1}")]
    InvalidTransition(&'static str, ServiceState),
    #[error("Cannot spawn engine loop: {0}")]
    Spawn(String),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
