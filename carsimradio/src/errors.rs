use carsimbus::{BusError, ServiceState};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Station {0} is not in the catalog")]
    UnknownStation(u32),
    #[error("Catalog has no station")]
    EmptyCatalog,
    #[error("Station '{0}' has no song")]
    EmptyStation(String),
    #[error("Cannot read catalog {0}: {1}")]
    CatalogRead(String, String),
    #[error("Invalid catalog: {0}")]
    CatalogParse(String),
    #[error("Cannot {0} a radio that is {1}")]
    InvalidTransition(&'static str, ServiceState),
    #[error("Cannot spawn radio loop: {0}")]
    Spawn(String),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
