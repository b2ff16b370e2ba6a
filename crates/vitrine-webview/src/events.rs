//! Event fields for browsing surfaces and the chrome window.
//!
//! Most surface events map one-to-one onto native events and only need a
//! bubbled hook. Location is special: the chrome must record where a
//! surface ended up before any listener observes the change, so it rides
//! a virtual event. The history streams do not exist natively at all and
//! are synthesized by polling the surface whenever its location moves.

use std::rc::Rc;

use vitrine_dom::{
    Document, EventDetail, HostError, NodeId, Phase, SurfaceEvent, LOCATION_CHANGED,
};
use vitrine_driver::Hook;

pub const TITLE_CHANGED: &str = "surface-title-changed";
pub const ICON_CHANGED: &str = "surface-icon-changed";
pub const LOAD_STARTED: &str = "surface-load-started";
pub const LOAD_ENDED: &str = "surface-load-ended";
pub const SECURITY_CHANGED: &str = "surface-security-changed";
pub const CONTEXT_MENU: &str = "surface-context-menu";
pub const PROMPT: &str = "surface-prompt";
pub const SURFACE_ERROR: &str = "surface-error";
pub const META_CHANGED: &str = "surface-meta-changed";

/// Synthesized on every location change, carrying whether the surface
/// can go back in its session history.
pub const HISTORY_BACK_CHANGED: &str = "surface-history-back-changed";
/// Synthesized on every location change, carrying whether the surface
/// can go forward in its session history.
pub const HISTORY_FORWARD_CHANGED: &str = "surface-history-forward-changed";

pub fn on_title_changed() -> Hook {
    Hook::bubbled(TITLE_CHANGED)
}

pub fn on_icon_changed() -> Hook {
    Hook::bubbled(ICON_CHANGED)
}

pub fn on_load_started() -> Hook {
    Hook::bubbled(LOAD_STARTED)
}

pub fn on_load_ended() -> Hook {
    Hook::bubbled(LOAD_ENDED)
}

pub fn on_security_changed() -> Hook {
    Hook::bubbled(SECURITY_CHANGED)
}

pub fn on_context_menu() -> Hook {
    Hook::bubbled(CONTEXT_MENU)
}

pub fn on_prompt() -> Hook {
    Hook::bubbled(PROMPT)
}

pub fn on_error() -> Hook {
    Hook::bubbled(SURFACE_ERROR)
}

pub fn on_meta_changed() -> Hook {
    Hook::bubbled(META_CHANGED)
}

/// Privileged runtime notice field; delivers only notices whose
/// discriminator matches `notice`.
pub fn on_chrome_notice(notice: &str) -> Hook {
    Hook::chrome_filtered(notice)
}

/// Location stream. Before the listener sees the event, the new location
/// is recorded on the node and mirrored into its `location` attribute, so
/// anything inspecting the node afterwards agrees with what the listener
/// was told.
pub fn on_location_changed() -> Hook {
    Hook::virtual_event(|document, node, dispatch| {
        let weak = Rc::downgrade(document);
        document.add_event_listener(node, LOCATION_CHANGED, Phase::Bubble, move |event| {
            let Some(document) = weak.upgrade() else {
                return;
            };
            if let EventDetail::Text(location) = &event.detail {
                if let Err(error) = record_location(&document, event.target, location) {
                    log::warn!("recording location of {} failed: {error}", event.target);
                    return;
                }
            }
            dispatch.dispatch(event);
        })?;
        Ok(node)
    })
}

fn record_location(document: &Rc<Document>, node: NodeId, location: &str) -> Result<(), HostError> {
    document.set_location(node, location)?;
    document.set_attribute(node, "location", location)
}

pub fn on_history_back_changed() -> Hook {
    history_stream(HISTORY_BACK_CHANGED, Document::can_go_back)
}

pub fn on_history_forward_changed() -> Hook {
    history_stream(HISTORY_FORWARD_CHANGED, Document::can_go_forward)
}

/// Polls one history capability on every location change and re-emits the
/// answer as a flag event. A failed poll is logged and nothing is
/// dispatched; a stale flag is worse than a late one.
fn history_stream(
    kind: &'static str,
    poll: fn(&Document, NodeId) -> Result<bool, HostError>,
) -> Hook {
    Hook::virtual_event(move |document, node, dispatch| {
        let weak = Rc::downgrade(document);
        document.add_event_listener(node, LOCATION_CHANGED, Phase::Bubble, move |event| {
            let Some(document) = weak.upgrade() else {
                return;
            };
            match poll(document.as_ref(), event.target) {
                Ok(flag) => {
                    dispatch.dispatch(&SurfaceEvent::new(
                        kind,
                        event.target,
                        EventDetail::Flag(flag),
                    ));
                }
                Err(error) => {
                    log::warn!("history poll on {} failed: {error}", event.target);
                }
            }
        })?;
        Ok(node)
    })
}
