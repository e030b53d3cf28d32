//! The engine device of the car simulator.
//!
//! The engine alternates between driving forward and reversing on a fixed
//! schedule, publishes every change of direction as a field event and
//! answers `get_reverse` requests.

pub mod errors;
pub mod proxy;
pub mod service;

pub use carsimbus::ServiceState;
pub use errors::EngineError;
pub use proxy::EngineProxy;
pub use service::{Direction, EngineService, EngineSettings};
