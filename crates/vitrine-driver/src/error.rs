use std::fmt;

use vitrine_dom::HostError;

/// Failures surfaced by hooks and the lifecycle controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverError {
    /// The host document rejected an operation.
    Host(HostError),
    /// A logical listener failed while handling an event.
    Listener { event: String, message: String },
    /// The element instance was written to after unmount.
    Unmounted,
}

impl DriverError {
    pub fn listener(event: impl Into<String>, message: impl Into<String>) -> Self {
        DriverError::Listener {
            event: event.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Host(error) => write!(f, "{error}"),
            DriverError::Listener { event, message } => {
                write!(f, "listener for {event} failed: {message}")
            }
            DriverError::Unmounted => write!(f, "element is no longer mounted"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Host(error) => Some(error),
            _ => None,
        }
    }
}

impl From<HostError> for DriverError {
    fn from(error: HostError) -> Self {
        DriverError::Host(error)
    }
}
