//! # carsimradio
//!
//! The radio device of the car simulator.
//!
//! Commands received on the bus only record *intent* in a shared
//! [`ControlState`](control::ControlState) and wake a single loop thread.
//! That thread owns the applied [`PlaybackState`](playback::PlaybackState),
//! reconciles it against the intent and publishes a field event for every
//! change it applies:
//!
//! ```text
//!  bus request ──► handlers ──► RadioControl ──signal──► radio-loop
//!                                                          │
//!  engine reverse event ──► set_reversed ──────────────────┤
//!                                                          ▼
//!                                   Reconciler ──► EventEmitter ──► bus
//! ```
//!
//! While the engine is in reverse the volume is lowered to a fixed level
//! and restored afterwards unless the user changed it in the meantime.

pub mod catalog;
pub mod control;
pub mod emitter;
pub mod errors;
pub mod handlers;
pub mod monitor;
pub mod playback;
pub mod proxy;
pub mod service;

pub use carsimbus::ServiceState;
pub use catalog::{Catalog, SongInfo, StationInfo};
pub use control::{ControlState, MAX_VOLUME, MIN_VOLUME, RadioControl};
pub use emitter::{BusEmitter, EventEmitter, RadioEvent, SONG_OFF};
pub use errors::RadioError;
pub use playback::{MIN_SONG_DURATION, PlaybackState, Reconciler, SongTiming};
pub use proxy::RadioProxy;
pub use service::{RadioService, RadioSettings};
