//! In-memory privileged document tree for the Vitrine browser chrome.
//!
//! This crate is the host side of the chrome: an arena of live nodes that
//! the reconciliation layer in `vitrine-driver` mutates through hooks. It
//! owns node structure and attributes, the document focus model, native
//! event subscriptions with capture/bubble propagation, the
//! privileged-browsing-surface capability set, and a single-shot deferral
//! queue for host calls that must not run inside the render pass that
//! requested them.

mod document;
mod error;
mod event;
mod surface;

pub use document::{Document, NodeId};
pub use error::HostError;
pub use event::{
    EventDetail, Phase, SubscriptionId, SurfaceEvent, BLUR, CHROME_SIGNAL, FOCUS,
    LOCATION_CHANGED, SELECT,
};
pub use surface::{
    Capability, InMemorySurface, NavigationCommand, SelectionBound, SelectionDirection,
    SelectionRange, Surface,
};
