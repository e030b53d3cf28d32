//! In-process bus.
//!
//! Calls run on the caller thread. Events and availability changes are
//! queued and delivered by a single dispatcher thread, in publication
//! order, so a publisher holding its own lock never re-enters a subscriber.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::bus::{
    AvailabilityHandler, Bus, Event, EventHandler, HandlerId, Request, RequestHandler,
};
use crate::errors::BusError;
use crate::ids::{ClientId, EventId, MethodId, ServiceKey};
use crate::payload::Payload;

enum Subscription {
    Event {
        service: ServiceKey,
        event: EventId,
        handler: EventHandler,
    },
    Availability {
        service: ServiceKey,
        handler: AvailabilityHandler,
    },
}

enum Dispatch {
    Event(Event),
    Availability(ServiceKey, bool),
    /// Initial delivery to a single freshly registered handler.
    ReplayEvent(EventHandler, Event),
    ReplayAvailability(AvailabilityHandler, ServiceKey, bool),
    Shutdown,
}

struct Inner {
    services: RwLock<HashMap<ServiceKey, RequestHandler>>,
    subscriptions: Mutex<HashMap<HandlerId, Subscription>>,
    fields: Mutex<HashMap<(ServiceKey, EventId), Payload>>,
    next_handler: AtomicU64,
    next_session: AtomicU16,
    closed: AtomicBool,
    tx: Sender<Dispatch>,
}

pub struct LocalBus {
    inner: Arc<Inner>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBus")
            .field("services", &self.inner.services.read().keys().collect::<Vec<_>>())
            .field("subscriptions", &self.inner.subscriptions.lock().len())
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl LocalBus {
    pub fn new() -> Arc<LocalBus> {
        let (tx, rx) = unbounded::<Dispatch>();
        let inner = Arc::new(Inner {
            services: RwLock::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            fields: Mutex::new(HashMap::new()),
            next_handler: AtomicU64::new(1),
            next_session: AtomicU16::new(1),
            closed: AtomicBool::new(false),
            tx,
        });

        let inner_for_thread = Arc::clone(&inner);
        let dispatcher = thread::Builder::new()
            .name("bus-dispatch".to_string())
            .spawn(move || dispatch_loop(inner_for_thread, rx));

        let dispatcher = match dispatcher {
            Ok(handle) => Some(handle),
            Err(err) => {
                // Without a dispatcher the bus still serves calls.
                warn!(error = %err, "Cannot spawn bus dispatcher thread");
                inner.closed.store(true, Ordering::SeqCst);
                None
            }
        };

        Arc::new(LocalBus {
            inner,
            dispatcher: Mutex::new(dispatcher),
        })
    }

    /// Stops event delivery and withdraws every service. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Shutting down local bus");
        self.inner.services.write().clear();
        let _ = self.inner.tx.send(Dispatch::Shutdown);
        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    fn next_handler_id(&self) -> HandlerId {
        HandlerId(self.inner.next_handler.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, dispatch: Dispatch) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.tx.send(dispatch);
    }
}

impl Drop for LocalBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Bus for LocalBus {
    fn offer(&self, service: ServiceKey, handler: RequestHandler) -> Result<(), BusError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        {
            let mut services = self.inner.services.write();
            if services.contains_key(&service) {
                return Err(BusError::AlreadyOffered(service));
            }
            services.insert(service, handler);
            // Queued under the lock so availability replays stay ordered
            self.send(Dispatch::Availability(service, true));
        }
        debug!(service = %service, "Service offered");
        Ok(())
    }

    fn stop_offer(&self, service: ServiceKey) {
        let mut services = self.inner.services.write();
        if services.remove(&service).is_some() {
            self.send(Dispatch::Availability(service, false));
            drop(services);
            debug!(service = %service, "Service withdrawn");
        }
    }

    fn is_available(&self, service: ServiceKey) -> bool {
        self.inner.services.read().contains_key(&service)
    }

    fn call(
        &self,
        client: ClientId,
        service: ServiceKey,
        method: MethodId,
        payload: Payload,
    ) -> Result<Payload, BusError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        let handler = self
            .inner
            .services
            .read()
            .get(&service)
            .cloned()
            .ok_or(BusError::ServiceUnavailable(service))?;

        let request = Request {
            client,
            session: self.inner.next_session.fetch_add(1, Ordering::Relaxed),
            service,
            method,
            payload,
        };
        trace!(
            service = %service,
            method,
            client = client.0,
            session = request.session,
            "Dispatching call"
        );
        handler(&request)
    }

    fn notify(&self, service: ServiceKey, event: EventId, payload: Payload) {
        let mut fields = self.inner.fields.lock();
        fields.insert((service, event), payload.clone());
        self.send(Dispatch::Event(Event {
            service,
            event,
            payload,
        }));
    }

    fn subscribe(&self, service: ServiceKey, event: EventId, handler: EventHandler) -> HandlerId {
        let id = self.next_handler_id();
        self.inner.subscriptions.lock().insert(
            id,
            Subscription::Event {
                service,
                event,
                handler: Arc::clone(&handler),
            },
        );

        // Replay queued under the field lock: a concurrent notify lands
        // either before it with the same value or after it.
        let fields = self.inner.fields.lock();
        if let Some(payload) = fields.get(&(service, event)).cloned() {
            self.send(Dispatch::ReplayEvent(
                handler,
                Event {
                    service,
                    event,
                    payload,
                },
            ));
        }
        id
    }

    fn on_availability(&self, service: ServiceKey, handler: AvailabilityHandler) -> HandlerId {
        let id = self.next_handler_id();
        self.inner.subscriptions.lock().insert(
            id,
            Subscription::Availability {
                service,
                handler: Arc::clone(&handler),
            },
        );
        let services = self.inner.services.read();
        let available = services.contains_key(&service);
        self.send(Dispatch::ReplayAvailability(handler, service, available));
        drop(services);
        id
    }

    fn unsubscribe(&self, id: HandlerId) {
        self.inner.subscriptions.lock().remove(&id);
    }
}

fn dispatch_loop(inner: Arc<Inner>, rx: Receiver<Dispatch>) {
    while let Ok(dispatch) = rx.recv() {
        match dispatch {
            Dispatch::Event(event) => {
                let handlers: Vec<EventHandler> = inner
                    .subscriptions
                    .lock()
                    .values()
                    .filter_map(|sub| match sub {
                        Subscription::Event {
                            service,
                            event: id,
                            handler,
                        } if *service == event.service && *id == event.event => {
                            Some(Arc::clone(handler))
                        }
                        _ => None,
                    })
                    .collect();
                for handler in handlers {
                    handler(&event);
                }
            }
            Dispatch::Availability(service, available) => {
                let handlers: Vec<AvailabilityHandler> = inner
                    .subscriptions
                    .lock()
                    .values()
                    .filter_map(|sub| match sub {
                        Subscription::Availability {
                            service: key,
                            handler,
                        } if *key == service => Some(Arc::clone(handler)),
                        _ => None,
                    })
                    .collect();
                for handler in handlers {
                    handler(service, available);
                }
            }
            Dispatch::ReplayEvent(handler, event) => handler(&event),
            Dispatch::ReplayAvailability(handler, service, available) => {
                handler(service, available)
            }
            Dispatch::Shutdown => break,
        }
    }
    debug!("Bus dispatcher exiting");
}
