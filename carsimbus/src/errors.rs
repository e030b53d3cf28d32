use thiserror::Error;

use crate::ids::{MethodId, ServiceKey};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Service {0} is not available")]
    ServiceUnavailable(ServiceKey),
    #[error("Service {0} is already offered")]
    AlreadyOffered(ServiceKey),
    #[error("Service {0} has no method {1}")]
    UnknownMethod(ServiceKey, MethodId),
    #[error("Bus is shut down")]
    Closed,
}

impl BusError {
    pub fn unknown_method(service: ServiceKey, method: MethodId) -> Self {
        BusError::UnknownMethod(service, method)
    }
}
