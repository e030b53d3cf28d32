//! Transport layer shared by the CarSim devices.
//!
//! Devices talk to each other through the [`Bus`] capability only:
//! request/response calls, field events and availability tracking.
//! [`LocalBus`] implements it in-process.

pub mod bus;
pub mod errors;
pub mod ids;
pub mod lifecycle;
pub mod local;
pub mod payload;

pub use bus::{
    AvailabilityHandler, Bus, Event, EventHandler, HandlerId, Request, RequestHandler,
    availability_handler, event_handler, request_handler,
};
pub use errors::BusError;
pub use ids::{ClientId, EventId, InstanceId, MethodId, ServiceId, ServiceKey};
pub use lifecycle::ServiceState;
pub use local::LocalBus;
pub use payload::Payload;
