use std::rc::Rc;

use indexmap::IndexMap;

use vitrine_dom::{Document, NodeId};

use crate::hooks::WriteOutcome;
use crate::{DriverError, FieldValue, Hook};

/// Immutable catalog of the hooks an element kind exposes, keyed by field
/// name. Hook state is per element type, so one catalog serves every
/// instance of its kind.
pub struct ElementType {
    tag: String,
    hooks: IndexMap<String, Hook>,
}

impl ElementType {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn hook(&self, field: &str) -> Option<&Hook> {
        self.hooks.get(field)
    }

    /// Starts an empty description of this element kind.
    pub fn describe(self: &Rc<Self>) -> ElementDescription {
        ElementDescription {
            element_type: self.clone(),
            fields: IndexMap::new(),
            children: Vec::new(),
        }
    }
}

pub fn define_element(
    tag: &str,
    hooks: impl IntoIterator<Item = (&'static str, Hook)>,
) -> Rc<ElementType> {
    Rc::new(ElementType {
        tag: tag.to_owned(),
        hooks: hooks
            .into_iter()
            .map(|(name, hook)| (name.to_owned(), hook))
            .collect(),
    })
}

/// Declarative snapshot of one element: its kind, field values and
/// children. Descriptions are plain data; [`mount`] and
/// [`ElementInstance::write`] turn them into document traffic.
#[derive(Clone)]
pub struct ElementDescription {
    element_type: Rc<ElementType>,
    fields: IndexMap<String, FieldValue>,
    children: Vec<ElementDescription>,
}

// Fields a description leaves out behave as if described null.
const ABSENT: FieldValue = FieldValue::Null;

impl ElementDescription {
    pub fn field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_owned(), value.into());
        self
    }

    pub fn child(mut self, child: ElementDescription) -> Self {
        self.children.push(child);
        self
    }

    fn field_value(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&ABSENT)
    }
}

fn warn_unknown_fields(element_type: &ElementType, description: &ElementDescription) {
    for name in description.fields.keys() {
        if element_type.hook(name).is_none() {
            log::warn!("element <{}> has no field {name}", element_type.tag());
        }
    }
}

/// Mounts `description` under `parent` and returns the live instance.
///
/// Order: the node is created detached, pre-insertion hooks run, the node
/// enters the tree, children mount, then post-insertion hooks run. A
/// post-insertion hook may replace the node; the replacement is spliced
/// into the same tree position and the remaining hooks see it.
///
/// Hooks always run in the element type's field-declaration order, not
/// the order the description happened to assemble its fields in.
pub fn mount(
    document: &Rc<Document>,
    parent: NodeId,
    description: &ElementDescription,
) -> Result<ElementInstance, DriverError> {
    let element_type = description.element_type.clone();
    let mut node = document.create_element(element_type.tag());

    warn_unknown_fields(&element_type, description);
    for (name, hook) in &element_type.hooks {
        hook.mount(document, node, description.field_value(name))?;
    }
    document.append_child(parent, node)?;

    let mut children = Vec::with_capacity(description.children.len());
    for child in &description.children {
        children.push(mount(document, node, child)?);
    }

    for (name, hook) in &element_type.hooks {
        if let WriteOutcome::Replaced(replacement) =
            hook.mounted(document, node, description.field_value(name))?
        {
            splice(document, &element_type, node, replacement)?;
            node = replacement;
        }
    }

    Ok(ElementInstance {
        document: document.clone(),
        element_type,
        node,
        fields: description.fields.clone(),
        children,
        mounted: true,
    })
}

/// Swaps `new` into `old`'s tree position: children move over, the node is
/// replaced in its parent, event registrations migrate, and `old` is
/// reclaimed.
fn splice(
    document: &Rc<Document>,
    element_type: &ElementType,
    old: NodeId,
    new: NodeId,
) -> Result<(), DriverError> {
    document.move_children(old, new)?;
    document.replace_child(new, old)?;
    for hook in element_type.hooks.values() {
        hook.migrate(document, old, new)?;
    }
    document.remove(old)?;
    Ok(())
}

/// Live counterpart of one mounted description. Holds the last written
/// field values so later writes can diff against them.
pub struct ElementInstance {
    document: Rc<Document>,
    element_type: Rc<ElementType>,
    node: NodeId,
    fields: IndexMap<String, FieldValue>,
    children: Vec<ElementInstance>,
    mounted: bool,
}

impl ElementInstance {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn element_type(&self) -> &Rc<ElementType> {
        &self.element_type
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Reconciles the instance against a new description.
    ///
    /// A description of a different element kind replaces the whole
    /// subtree in place; otherwise every hook is written in the type's
    /// field-declaration order (fields the description dropped read as
    /// null) and children are paired by position.
    pub fn write(&mut self, description: &ElementDescription) -> Result<(), DriverError> {
        if !self.mounted {
            return Err(DriverError::Unmounted);
        }
        if !Rc::ptr_eq(&self.element_type, &description.element_type) {
            return self.replace_with(description);
        }

        warn_unknown_fields(&self.element_type, description);
        let element_type = self.element_type.clone();
        for (name, hook) in &element_type.hooks {
            let current = description.field_value(name);
            let previous = self.fields.get(name.as_str()).unwrap_or(&ABSENT).clone();
            if let WriteOutcome::Replaced(replacement) =
                hook.write(&self.document, self.node, current, &previous)?
            {
                splice(&self.document, &element_type, self.node, replacement)?;
                self.node = replacement;
            }
        }
        self.fields = description.fields.clone();

        let shared = self.children.len().min(description.children.len());
        for (child, desc) in self.children.iter_mut().zip(&description.children) {
            child.write(desc)?;
        }
        for desc in &description.children[shared..] {
            self.children.push(mount(&self.document, self.node, desc)?);
        }
        while self.children.len() > shared.max(description.children.len()) {
            if let Some(mut child) = self.children.pop() {
                child.unmount()?;
            }
        }
        Ok(())
    }

    /// Tears this instance down and mounts `description` in its place,
    /// keeping the position among siblings.
    fn replace_with(&mut self, description: &ElementDescription) -> Result<(), DriverError> {
        let parent = self
            .document
            .parent(self.node)?
            .ok_or(vitrine_dom::HostError::Detached { node: self.node })?;
        let siblings = self.document.children(parent)?;
        let following = siblings
            .iter()
            .skip_while(|id| **id != self.node)
            .nth(1)
            .copied();

        self.unmount()?;
        let replacement = mount(&self.document, parent, description)?;
        if let Some(reference) = following {
            self.document
                .insert_before(parent, replacement.node, reference)?;
        }
        *self = replacement;
        Ok(())
    }

    /// Removes the instance from the document. Hook state is released
    /// top-down before the subtree is reclaimed in one sweep.
    pub fn unmount(&mut self) -> Result<(), DriverError> {
        if !self.mounted {
            return Ok(());
        }
        self.release();
        self.document.remove(self.node)?;
        Ok(())
    }

    fn release(&mut self) {
        self.mounted = false;
        for hook in self.element_type.hooks.values() {
            hook.unmount(&self.document, self.node);
        }
        for child in &mut self.children {
            child.release();
        }
    }
}
