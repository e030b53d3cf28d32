/// Lifecycle of a device offering a service on the bus.
///
/// `WaitingToStart -> Running -> Stopped`, with no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceState {
    WaitingToStart,
    Running,
    Stopped,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServiceState::WaitingToStart => "waiting to start",
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
