use std::rc::Rc;

use crate::NodeId;

/// Native event type the platform fires at the chrome window for privileged
/// runtime notices. Individual notices are told apart by the nested
/// discriminator carried in [`EventDetail::Chrome`].
pub const CHROME_SIGNAL: &str = "chrome-signal";

/// Fired at a browsing surface when its presented location changes.
pub const LOCATION_CHANGED: &str = "surface-location-changed";

/// Fired at a node when it becomes the document's active element.
pub const FOCUS: &str = "focus";

/// Fired at a node when it stops being the document's active element.
pub const BLUR: &str = "blur";

/// Fired at an editable node when its selection range is set.
pub const SELECT: &str = "select";

/// Propagation phase a native subscription participates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Capture,
    Bubble,
}

/// Handle for one native event subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Payload carried by a native or synthesized event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventDetail {
    None,
    Flag(bool),
    Number(f64),
    Text(String),
    /// Privileged runtime notice; `kind` is the nested discriminator that
    /// chrome-filtered hooks match against.
    Chrome { kind: String, payload: String },
}

/// Event delivered to native subscriptions and, through the driver, to
/// logical listeners. Synthesized events use the same shape.
#[derive(Clone, Debug)]
pub struct SurfaceEvent {
    pub kind: String,
    pub target: NodeId,
    pub detail: EventDetail,
}

impl SurfaceEvent {
    pub fn new(kind: impl Into<String>, target: NodeId, detail: EventDetail) -> Self {
        Self {
            kind: kind.into(),
            target,
            detail,
        }
    }

    /// Nested discriminator of a chrome notice, if this is one.
    pub fn chrome_kind(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Chrome { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

pub(crate) type EventHandler = Rc<dyn Fn(&SurfaceEvent)>;
