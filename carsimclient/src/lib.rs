//! Model of the interactive radio client: display state fed by bus
//! notifications, key bindings and the commands they send.

pub mod client;
pub mod command;
pub mod state;

pub use client::RadioClient;
pub use command::{Command, USAGE};
pub use state::{CONNECTING, ClientState, volume_meter};
