//! The transport capability used by every device.
//!
//! Devices never touch a concrete transport: they get an `Arc<dyn Bus>`
//! and use it to offer request handlers, call other services, publish
//! field events and follow the availability of their dependencies.

use std::sync::Arc;

use crate::errors::BusError;
use crate::ids::{ClientId, EventId, MethodId, ServiceKey};
use crate::payload::Payload;

/// An inbound request/response call.
#[derive(Clone, Debug)]
pub struct Request {
    pub client: ClientId,
    pub session: u16,
    pub service: ServiceKey,
    pub method: MethodId,
    pub payload: Payload,
}

/// A published event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub service: ServiceKey,
    pub event: EventId,
    pub payload: Payload,
}

pub type RequestHandler = Arc<dyn Fn(&Request) -> Result<Payload, BusError> + Send + Sync>;
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;
pub type AvailabilityHandler = Arc<dyn Fn(ServiceKey, bool) + Send + Sync>;

/// Handle returned by `subscribe` and `on_availability`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

pub trait Bus: Send + Sync {
    /// Registers the request handler of `service` and announces it as available.
    fn offer(&self, service: ServiceKey, handler: RequestHandler) -> Result<(), BusError>;

    /// Withdraws `service` and announces it as unavailable. No-op if not offered.
    fn stop_offer(&self, service: ServiceKey);

    fn is_available(&self, service: ServiceKey) -> bool;

    /// Synchronous request/response call.
    fn call(
        &self,
        client: ClientId,
        service: ServiceKey,
        method: MethodId,
        payload: Payload,
    ) -> Result<Payload, BusError>;

    /// Fire-and-forget multicast to the subscribers of `event`.
    fn notify(&self, service: ServiceKey, event: EventId, payload: Payload);

    /// Follows `event` of `service`. The last published value, if any, is
    /// delivered right after subscription.
    fn subscribe(&self, service: ServiceKey, event: EventId, handler: EventHandler) -> HandlerId;

    /// Follows the availability of `service`. The current state is
    /// delivered right after registration.
    fn on_availability(&self, service: ServiceKey, handler: AvailabilityHandler) -> HandlerId;

    /// Drops a subscription or availability handler.
    fn unsubscribe(&self, id: HandlerId);
}

pub fn request_handler<F>(f: F) -> RequestHandler
where
    F: Fn(&Request) -> Result<Payload, BusError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn event_handler<F>(f: F) -> EventHandler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn availability_handler<F>(f: F) -> AvailabilityHandler
where
    F: Fn(ServiceKey, bool) + Send + Sync + 'static,
{
    Arc::new(f)
}
