use std::fmt;

use crate::NodeId;

/// Failures raised by the host document and its capability surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The node handle does not refer to live storage.
    Missing { node: NodeId },
    /// The operation requires the node to be attached to the document.
    Detached { node: NodeId },
    /// A browsing-surface capability rejected the call.
    Capability {
        name: &'static str,
        message: String,
    },
}

impl HostError {
    pub fn capability(name: &'static str, message: impl Into<String>) -> Self {
        HostError::Capability {
            name,
            message: message.into(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { node } => write!(f, "node {node} missing"),
            HostError::Detached { node } => write!(f, "node {node} is not attached"),
            HostError::Capability { name, message } => {
                write!(f, "capability {name} failed: {message}")
            }
        }
    }
}

impl std::error::Error for HostError {}
