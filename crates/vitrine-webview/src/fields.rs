//! Field bridges: hooks that translate described values into host calls.
//!
//! Capabilities split into two reliability classes. Cosmetic ones
//! (visibility, zoom) are allowed to be missing or broken on a given
//! surface; their bridges probe first, disable the node after the first
//! runtime failure and report through the log instead of failing the
//! write. Semantic ones (navigation, focus, selection) propagate their
//! errors.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use vitrine_dom::{Capability, Document, HostError, NodeId};
use vitrine_driver::{FieldValue, Hook};

// Virtual-attribute applies run on every write; each bridge owns its own
// unchanged-value comparison.
fn unchanged(current: &FieldValue, previous: Option<&FieldValue>) -> bool {
    previous == Some(current)
}

// A field that has never been described reads as null with no previous
// value; there is no preference to apply and nothing to undo.
fn undescribed(current: &FieldValue, previous: Option<&FieldValue>) -> bool {
    current.is_null() && previous.is_none()
}

/// Focus follows the described flag. Focusing only takes on attached
/// nodes, and a freshly described node may still be waiting for its
/// insertion to settle, so a focus that did not take is retried once
/// through the deferral queue.
pub fn focused() -> Hook {
    Hook::virtual_attribute(|document, node, current, previous| {
        let was = previous.map(FieldValue::truthy).unwrap_or(false);
        let now = current.truthy();
        if now == was {
            return Ok(());
        }
        if now {
            document.focus(node)?;
            if document.active_element() != Some(node) {
                document.defer(move |document| {
                    if let Err(error) = document.focus(node) {
                        log::warn!("deferred focus of {node} failed: {error}");
                    }
                });
            }
        } else {
            document.blur(node)?;
        }
        Ok(())
    })
}

/// Builds a bridge for a cosmetic capability: unsupported surfaces are
/// reported once and skipped, and a surface whose call fails is marked
/// broken and never called again.
fn cosmetic(
    name: &'static str,
    capability: Capability,
    apply: impl Fn(&Rc<Document>, NodeId, &FieldValue) -> Result<(), HostError> + 'static,
) -> Hook {
    let broken: RefCell<HashSet<NodeId>> = RefCell::new(HashSet::new());
    let unsupported: RefCell<HashSet<NodeId>> = RefCell::new(HashSet::new());
    Hook::virtual_attribute(move |document, node, current, previous| {
        if undescribed(current, previous)
            || unchanged(current, previous)
            || broken.borrow().contains(&node)
        {
            return Ok(());
        }
        if !document.supports(node, capability)? {
            if unsupported.borrow_mut().insert(node) {
                log::warn!("{name} is not supported on {node}");
            }
            return Ok(());
        }
        if let Err(error) = apply(document, node, current) {
            log::error!("{name} failed on {node}, disabling: {error}");
            broken.borrow_mut().insert(node);
        }
        Ok(())
    })
}

pub fn visible() -> Hook {
    cosmetic("visibility", Capability::SetVisible, |document, node, value| {
        document.set_visible(node, value.truthy())
    })
}

pub fn zoom() -> Hook {
    cosmetic("zoom", Capability::SetZoom, |document, node, value| {
        match value.as_float() {
            Some(level) => document.set_zoom(node, level),
            None => Ok(()),
        }
    })
}

/// Runs one navigation command per described change. Commands against a
/// surface that lacks the capability are dropped with a log entry; a
/// supported command that fails propagates.
pub fn navigation() -> Hook {
    Hook::virtual_attribute(|document, node, current, previous| {
        if unchanged(current, previous) {
            return Ok(());
        }
        let Some(command) = current.as_navigation() else {
            return Ok(());
        };
        if !document.supports(node, command.capability())? {
            log::warn!(
                "{} is not supported on {node}, dropping command",
                command.capability().name()
            );
            return Ok(());
        }
        document.navigate(node, command)?;
        Ok(())
    })
}

/// Described location. Loading re-enters the document (the surface fires
/// its location event synchronously here), so the load runs from the
/// deferral queue rather than inside the write that requested it. A
/// location the surface already presents is not reloaded.
pub fn uri() -> Hook {
    Hook::virtual_attribute(|document, node, current, previous| {
        if unchanged(current, previous) {
            return Ok(());
        }
        let Some(target) = current.as_text() else {
            return Ok(());
        };
        if document.location(node)?.as_deref() == Some(target) {
            return Ok(());
        }
        let target = target.to_owned();
        document.defer(move |document| {
            if let Err(error) = document.load(node, &target) {
                log::error!("loading {target} in {node} failed: {error}");
            }
        });
        Ok(())
    })
}

/// Editable text content.
pub fn value() -> Hook {
    Hook::virtual_attribute(|document, node, current, _previous| {
        let text = current.as_text().unwrap_or("");
        if document.value(node)? != text {
            document.set_value(node, text)?;
        }
        Ok(())
    })
}

/// Described selection range. Bounds resolve against the current content
/// length at apply time, and a range the node already holds is not
/// re-applied; applying unconditionally would fire a select event whose
/// handler describes the same range again, looping forever.
pub fn selection() -> Hook {
    Hook::virtual_attribute(|document, node, current, _previous| {
        let Some(range) = current.as_selection() else {
            return Ok(());
        };
        let length = document.value(node)?.chars().count();
        let start = range.start.resolve(length);
        let end = range.end.resolve(length).max(start);
        if document.selection(node)? == (start, end, range.direction) {
            return Ok(());
        }
        document.set_selection_range(node, start, end, range.direction)?;
        Ok(())
    })
}

/// Top-level window title.
pub fn window_title() -> Hook {
    Hook::virtual_attribute(|document, _node, current, previous| {
        if !undescribed(current, previous) && !unchanged(current, previous) {
            document.set_window_title(current.as_text().unwrap_or(""));
        }
        Ok(())
    })
}

/// Marks the node as a window drag handle.
pub fn drag_region() -> Hook {
    Hook::virtual_attribute(|document, node, current, previous| {
        if !undescribed(current, previous) && !unchanged(current, previous) {
            document.set_drag_region(node, current.truthy())?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use vitrine_dom::{Document, SelectionBound, SelectionDirection, SelectionRange};
    use vitrine_driver::FieldValue;

    use super::*;

    #[test]
    fn focused_retries_through_the_deferral_queue() {
        let document = Document::new();
        let input = document.create_element("text-input");
        let hook = focused();

        // Still detached; the focus cannot take yet.
        hook.mounted(&document, input, &FieldValue::from(true)).unwrap();
        assert_eq!(document.active_element(), None);
        assert!(document.has_deferred());

        document.append_child(document.root(), input).unwrap();
        document.run_deferred();
        assert_eq!(document.active_element(), Some(input));
    }

    #[test]
    fn focused_true_rewrite_does_not_steal_focus_back() {
        let document = Document::new();
        let input = document.create_element("text-input");
        let other = document.create_element("text-input");
        document.append_child(document.root(), input).unwrap();
        document.append_child(document.root(), other).unwrap();
        let hook = focused();

        hook.mounted(&document, input, &FieldValue::from(true)).unwrap();
        assert_eq!(document.active_element(), Some(input));

        // The user moved focus; re-describing the same flag must not pull
        // it back.
        document.focus(other).unwrap();
        hook.write(
            &document,
            input,
            &FieldValue::from(true),
            &FieldValue::from(true),
        )
        .unwrap();
        assert_eq!(document.active_element(), Some(other));
        assert!(!document.has_deferred());
    }

    #[test]
    fn focused_false_blurs() {
        let document = Document::new();
        let input = document.create_element("text-input");
        document.append_child(document.root(), input).unwrap();
        let hook = focused();

        hook.mounted(&document, input, &FieldValue::from(true)).unwrap();
        hook.write(
            &document,
            input,
            &FieldValue::from(false),
            &FieldValue::from(true),
        )
        .unwrap();
        assert_eq!(document.active_element(), None);
    }

    #[test]
    fn selection_resolves_end_against_content_length() {
        let document = Document::new();
        let input = document.create_element("text-input");
        document.append_child(document.root(), input).unwrap();
        document.set_value(input, "hello").unwrap();

        let range = SelectionRange {
            start: SelectionBound::Index(1),
            end: SelectionBound::End,
            direction: SelectionDirection::Forward,
        };
        selection()
            .mounted(&document, input, &FieldValue::from(range))
            .unwrap();
        assert_eq!(
            document.selection(input).unwrap(),
            (1, 5, SelectionDirection::Forward)
        );
    }

    #[test]
    fn selection_skips_ranges_the_node_already_holds() {
        let document = Document::new();
        let input = document.create_element("text-input");
        document.append_child(document.root(), input).unwrap();
        document.set_value(input, "hello").unwrap();

        let selects = Rc::new(std::cell::Cell::new(0));
        {
            let selects = selects.clone();
            document
                .add_event_listener(input, vitrine_dom::SELECT, vitrine_dom::Phase::Bubble, move |_| {
                    selects.set(selects.get() + 1);
                })
                .unwrap();
        }

        let hook = selection();
        let range = FieldValue::from(SelectionRange {
            start: SelectionBound::Index(0),
            end: SelectionBound::End,
            direction: SelectionDirection::None,
        });
        hook.mounted(&document, input, &range).unwrap();
        assert_eq!(selects.get(), 1);

        // A differently-spelled range resolving to the same bounds.
        let same = FieldValue::from(SelectionRange {
            start: SelectionBound::Index(0),
            end: SelectionBound::Index(5),
            direction: SelectionDirection::None,
        });
        hook.write(&document, input, &same, &range).unwrap();
        assert_eq!(selects.get(), 1);
    }

    #[test]
    fn window_title_follows_the_field() {
        let document = Document::new();
        let pane = document.create_element("shell-window");
        document.append_child(document.root(), pane).unwrap();
        let hook = window_title();

        hook.mounted(&document, pane, &FieldValue::from("Vitrine")).unwrap();
        assert_eq!(document.window_title(), "Vitrine");

        hook.write(&document, pane, &FieldValue::Null, &FieldValue::from("Vitrine"))
            .unwrap();
        assert_eq!(document.window_title(), "");
    }
}
