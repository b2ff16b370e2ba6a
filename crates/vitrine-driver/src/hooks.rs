use std::rc::Rc;

use vitrine_dom::{Document, NodeId};

use crate::events::{EventHook, VirtualEventHook};
use crate::{DriverError, FieldValue};

/// What a field write did to the live node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write applied in place.
    Kept,
    /// The hook produced a replacement node that must be spliced into the
    /// old node's tree position.
    Replaced(NodeId),
}

type ApplyFn =
    dyn Fn(&Rc<Document>, NodeId, &FieldValue, Option<&FieldValue>) -> Result<(), DriverError>;

pub struct AttributeHook {
    name: String,
}

impl AttributeHook {
    fn write(
        &self,
        document: &Rc<Document>,
        node: NodeId,
        value: &FieldValue,
    ) -> Result<(), DriverError> {
        match value.as_attribute() {
            Some(rendered) => document.set_attribute(node, &self.name, &rendered)?,
            None => document.remove_attribute(node, &self.name)?,
        }
        Ok(())
    }
}

/// Attribute the platform only reads at insertion time. Later writes
/// cannot take effect in place, so the hook clones the node, applies the
/// new value to the clone and hands it back for splicing.
pub struct PreInsertAttributeHook {
    name: String,
}

pub struct VirtualAttributeHook {
    apply: Rc<ApplyFn>,
}

/// One named capability of an element type. A hook owns the full
/// lifecycle of its field: applied before insertion ([`Hook::mount`]),
/// after insertion ([`Hook::mounted`]), on every later change
/// ([`Hook::write`]) and at teardown ([`Hook::unmount`]).
pub enum Hook {
    Attribute(AttributeHook),
    PreInsertAttribute(PreInsertAttributeHook),
    VirtualAttribute(VirtualAttributeHook),
    Event(EventHook),
    VirtualEvent(VirtualEventHook),
}

impl Hook {
    /// Plain host attribute, kept in sync with the field value.
    pub fn attribute(name: &str) -> Self {
        Hook::Attribute(AttributeHook {
            name: name.to_owned(),
        })
    }

    /// Attribute that only takes effect when set before node insertion.
    pub fn pre_insert_attribute(name: &str) -> Self {
        Hook::PreInsertAttribute(PreInsertAttributeHook {
            name: name.to_owned(),
        })
    }

    /// Field whose effect is an arbitrary host operation. `apply` receives
    /// the current value and the previous one (`None` on first mount).
    pub fn virtual_attribute(
        apply: impl Fn(&Rc<Document>, NodeId, &FieldValue, Option<&FieldValue>) -> Result<(), DriverError>
            + 'static,
    ) -> Self {
        Hook::VirtualAttribute(VirtualAttributeHook {
            apply: Rc::new(apply),
        })
    }

    /// Event field listening during the bubble phase.
    pub fn bubbled(kind: &str) -> Self {
        Hook::Event(EventHook::bubbled(kind))
    }

    /// Event field listening during the capture phase.
    pub fn captured(kind: &str) -> Self {
        Hook::Event(EventHook::captured(kind))
    }

    /// Bubble-phase event field whose native registration lives on the
    /// chrome window rather than the element.
    pub fn bubbled_on_window(kind: &str) -> Self {
        Hook::Event(EventHook::bubbled(kind).on_window())
    }

    /// Event field fed from the shared chrome notice stream, delivering
    /// only notices whose discriminator matches `notice`.
    pub fn chrome_filtered(notice: &str) -> Self {
        Hook::Event(EventHook::chrome_filtered(notice))
    }

    /// Synthesized event field; see [`VirtualEventHook`].
    pub fn virtual_event(
        setup: impl Fn(&Rc<Document>, NodeId, crate::VirtualDispatch) -> Result<NodeId, DriverError>
            + 'static,
    ) -> Self {
        Hook::VirtualEvent(VirtualEventHook::new(setup))
    }

    /// Applied while the node is still detached, before insertion.
    pub fn mount(
        &self,
        document: &Rc<Document>,
        node: NodeId,
        value: &FieldValue,
    ) -> Result<(), DriverError> {
        match self {
            Hook::PreInsertAttribute(hook) => {
                if let Some(rendered) = value.as_attribute() {
                    document.set_attribute(node, &hook.name, &rendered)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Applied once the node sits in the tree.
    pub fn mounted(
        &self,
        document: &Rc<Document>,
        node: NodeId,
        value: &FieldValue,
    ) -> Result<WriteOutcome, DriverError> {
        match self {
            Hook::Attribute(hook) => {
                if !value.is_null() {
                    hook.write(document, node, value)?;
                }
                Ok(WriteOutcome::Kept)
            }
            Hook::PreInsertAttribute(_) => Ok(WriteOutcome::Kept),
            Hook::VirtualAttribute(hook) => {
                (hook.apply)(document, node, value, None)?;
                Ok(WriteOutcome::Kept)
            }
            Hook::Event(hook) => {
                hook.write(document, node, value.as_listener(), None)?;
                Ok(WriteOutcome::Kept)
            }
            Hook::VirtualEvent(hook) => hook.write(document, node, value.as_listener()),
        }
    }

    /// Applied on every later write of the field. Attribute and event
    /// hooks short-circuit unchanged values themselves; a virtual
    /// attribute's `apply` always runs and owns that comparison.
    pub fn write(
        &self,
        document: &Rc<Document>,
        node: NodeId,
        current: &FieldValue,
        previous: &FieldValue,
    ) -> Result<WriteOutcome, DriverError> {
        match self {
            Hook::Attribute(hook) => {
                if current != previous {
                    hook.write(document, node, current)?;
                }
                Ok(WriteOutcome::Kept)
            }
            Hook::PreInsertAttribute(hook) => {
                if current == previous {
                    return Ok(WriteOutcome::Kept);
                }
                let replacement = document.clone_node(node)?;
                match current.as_attribute() {
                    Some(rendered) => document.set_attribute(replacement, &hook.name, &rendered)?,
                    None => document.remove_attribute(replacement, &hook.name)?,
                }
                Ok(WriteOutcome::Replaced(replacement))
            }
            Hook::VirtualAttribute(hook) => {
                (hook.apply)(document, node, current, Some(previous))?;
                Ok(WriteOutcome::Kept)
            }
            Hook::Event(hook) => {
                hook.write(
                    document,
                    node,
                    current.as_listener(),
                    previous.as_listener(),
                )?;
                Ok(WriteOutcome::Kept)
            }
            Hook::VirtualEvent(hook) => hook.write(document, node, current.as_listener()),
        }
    }

    /// Releases per-node state before the node leaves the document. Only
    /// event hooks hold any; attribute state dies with the node itself.
    pub fn unmount(&self, document: &Rc<Document>, node: NodeId) {
        match self {
            Hook::Event(hook) => hook.detach_node(document, node),
            Hook::VirtualEvent(hook) => hook.detach_node(node),
            _ => {}
        }
    }

    /// Carries per-node state from a replaced node onto its replacement.
    pub(crate) fn migrate(
        &self,
        document: &Rc<Document>,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), DriverError> {
        match self {
            Hook::Event(hook) => hook.migrate(document, old, new),
            Hook::VirtualEvent(hook) => hook.migrate(document, old, new),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn fixture() -> (Rc<Document>, NodeId) {
        let document = Document::new();
        let node = document.create_element("box");
        document.append_child(document.root(), node).unwrap();
        (document, node)
    }

    #[test]
    fn attribute_hook_tracks_field_value() {
        let (document, node) = fixture();
        let hook = Hook::attribute("title");

        hook.mounted(&document, node, &FieldValue::from("home")).unwrap();
        assert_eq!(
            document.attribute(node, "title").unwrap().as_deref(),
            Some("home")
        );

        hook.write(&document, node, &FieldValue::from("away"), &FieldValue::from("home"))
            .unwrap();
        assert_eq!(
            document.attribute(node, "title").unwrap().as_deref(),
            Some("away")
        );

        hook.write(&document, node, &FieldValue::Null, &FieldValue::from("away"))
            .unwrap();
        assert_eq!(document.attribute(node, "title").unwrap(), None);
    }

    #[test]
    fn attribute_hook_renders_booleans() {
        let (document, node) = fixture();
        let hook = Hook::attribute("muted");
        hook.mounted(&document, node, &FieldValue::from(true)).unwrap();
        assert_eq!(
            document.attribute(node, "muted").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn virtual_attribute_write_always_forwards() {
        let (document, node) = fixture();
        let hits = Rc::new(RefCell::new(0));
        let hook = {
            let hits = hits.clone();
            Hook::virtual_attribute(move |_, _, _, _| {
                *hits.borrow_mut() += 1;
                Ok(())
            })
        };

        // The apply function owns the unchanged-value comparison, so the
        // hook forwards even an identical value.
        hook.mounted(&document, node, &FieldValue::from(1_i64)).unwrap();
        hook.write(&document, node, &FieldValue::from(1_i64), &FieldValue::from(1_i64))
            .unwrap();
        hook.write(&document, node, &FieldValue::from(2_i64), &FieldValue::from(1_i64))
            .unwrap();
        assert_eq!(*hits.borrow(), 3);
    }

    #[test]
    fn virtual_attribute_distinguishes_first_application() {
        let (document, node) = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));
        let hook = {
            let log = log.clone();
            Hook::virtual_attribute(move |_, _, _, previous| {
                log.borrow_mut().push(previous.is_none());
                Ok(())
            })
        };

        hook.mounted(&document, node, &FieldValue::from(true)).unwrap();
        hook.write(&document, node, &FieldValue::from(false), &FieldValue::from(true))
            .unwrap();
        assert_eq!(&*log.borrow(), &[true, false]);
    }

    #[test]
    fn pre_insert_attribute_applies_before_insertion() {
        let document = Document::new();
        let node = document.create_element("surface");
        let hook = Hook::pre_insert_attribute("remote");

        hook.mount(&document, node, &FieldValue::from(true)).unwrap();
        assert_eq!(
            document.attribute(node, "remote").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn pre_insert_attribute_change_clones_the_node() {
        let (document, node) = fixture();
        document.set_attribute(node, "src", "about:home").unwrap();
        let hook = Hook::pre_insert_attribute("remote");
        hook.mount(&document, node, &FieldValue::from(false)).unwrap();

        let outcome = hook
            .write(&document, node, &FieldValue::from(true), &FieldValue::from(false))
            .unwrap();
        let WriteOutcome::Replaced(replacement) = outcome else {
            panic!("expected a replacement node");
        };
        assert_ne!(replacement, node);
        assert_eq!(
            document.attribute(replacement, "remote").unwrap().as_deref(),
            Some("true")
        );
        // Unrelated attributes survive the clone.
        assert_eq!(
            document.attribute(replacement, "src").unwrap().as_deref(),
            Some("about:home")
        );
    }
}
