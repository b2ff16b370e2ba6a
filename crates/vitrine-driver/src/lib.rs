//! Reconciliation core for the Vitrine browser chrome.
//!
//! View modules describe elements declaratively; this crate turns those
//! descriptions into imperative traffic against the live document in
//! `vitrine-dom`. The pieces are:
//!
//! - [`Hook`]: a capability attached to a named field of an element type.
//!   Plain attributes, pre-insertion-only attributes, virtual attributes
//!   (arbitrary host effects), event hooks (bubbled, captured and
//!   chrome-filtered) and virtual events (synthesized streams wired once
//!   per node).
//! - The listener registry inside each event hook: per-node ordered
//!   listener lists with exactly one native subscription per listened
//!   node, and a dispatch loop that survives re-entrant mutation and
//!   failing listeners.
//! - [`ElementInstance`]: the lifecycle controller sequencing
//!   mount → mounted → write* → unmount over the hooks of one element,
//!   splicing in replacement nodes whenever a hook swaps the live node.

mod element;
mod error;
mod events;
mod hooks;
mod value;

pub use element::{define_element, mount, ElementDescription, ElementInstance, ElementType};
pub use error::DriverError;
pub use events::{EventHook, EventTarget, VirtualDispatch, VirtualEventHook};
pub use hooks::{Hook, WriteOutcome};
pub use value::{FieldValue, Listener};
