use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::event::{EventHandler, Phase, SubscriptionId, SurfaceEvent};
use crate::surface::{Capability, NavigationCommand, SelectionDirection, Surface};
use crate::{event, EventDetail, HostError};

/// Handle to a live node. Handles are arena indices; storage is reclaimed
/// explicitly on removal, never by implicit collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct NodeData {
    tag: String,
    attributes: IndexMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    value: String,
    selection: (usize, usize, SelectionDirection),
    location: Option<String>,
    surface: Option<Rc<dyn Surface>>,
    drag_region: bool,
}

impl NodeData {
    fn new(tag: &str, surface: Option<Rc<dyn Surface>>) -> Self {
        Self {
            tag: tag.to_owned(),
            attributes: IndexMap::new(),
            parent: None,
            children: Vec::new(),
            value: String::new(),
            selection: (0, 0, SelectionDirection::None),
            location: None,
            surface,
            drag_region: false,
        }
    }
}

struct Subscription {
    id: SubscriptionId,
    node: NodeId,
    kind: String,
    phase: Phase,
    handler: EventHandler,
}

type DeferredTask = Box<dyn FnOnce(&Rc<Document>)>;
type SurfaceFactory = Box<dyn Fn(&str) -> Option<Rc<dyn Surface>>>;

/// The live chrome document. Single-threaded; shared as `Rc<Document>` with
/// interior mutability, so native event handlers and deferred tasks can
/// re-enter it.
pub struct Document {
    nodes: RefCell<Vec<Option<NodeData>>>,
    root: NodeId,
    active: Cell<Option<NodeId>>,
    window_title: RefCell<String>,
    subscriptions: RefCell<Vec<Subscription>>,
    next_subscription: Cell<u64>,
    deferred: RefCell<VecDeque<DeferredTask>>,
    surface_factory: RefCell<Option<SurfaceFactory>>,
}

impl Document {
    /// Creates a document whose root is the top-level chrome window.
    pub fn new() -> Rc<Self> {
        let root = NodeData::new("window", None);
        Rc::new(Self {
            nodes: RefCell::new(vec![Some(root)]),
            root: NodeId(0),
            active: Cell::new(None),
            window_title: RefCell::new(String::new()),
            subscriptions: RefCell::new(Vec::new()),
            next_subscription: Cell::new(1),
            deferred: RefCell::new(VecDeque::new()),
            surface_factory: RefCell::new(None),
        })
    }

    /// The top-level chrome window node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Installs the factory consulted by [`Document::create_element`] to
    /// decide which tags get a browsing surface and which implementation
    /// backs it.
    pub fn set_surface_factory(&self, factory: impl Fn(&str) -> Option<Rc<dyn Surface>> + 'static) {
        *self.surface_factory.borrow_mut() = Some(Box::new(factory));
    }

    fn with_node<R>(&self, id: NodeId, read: impl FnOnce(&NodeData) -> R) -> Result<R, HostError> {
        let nodes = self.nodes.borrow();
        let data = nodes
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .ok_or(HostError::Missing { node: id })?;
        Ok(read(data))
    }

    fn with_node_mut<R>(
        &self,
        id: NodeId,
        write: impl FnOnce(&mut NodeData) -> R,
    ) -> Result<R, HostError> {
        let mut nodes = self.nodes.borrow_mut();
        let data = nodes
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .ok_or(HostError::Missing { node: id })?;
        Ok(write(data))
    }

    fn allocate(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(Some(data));
        id
    }

    /// Creates a detached element. Tags registered with the surface factory
    /// come back with their browsing surface already attached.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let surface = self
            .surface_factory
            .borrow()
            .as_ref()
            .and_then(|factory| factory(tag));
        self.allocate(NodeData::new(tag, surface))
    }

    pub fn tag(&self, node: NodeId) -> Result<String, HostError> {
        self.with_node(node, |data| data.tag.clone())
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, HostError> {
        self.with_node(node, |data| data.parent)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>, HostError> {
        self.with_node(node, |data| data.children.clone())
    }

    /// Walks the parent chain; a node is attached when it reaches the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.with_node(current, |data| data.parent) {
                Ok(Some(parent)) => current = parent,
                _ => return false,
            }
        }
    }

    fn detach(&self, child: NodeId) -> Result<(), HostError> {
        let parent = self.with_node(child, |data| data.parent)?;
        if let Some(parent) = parent {
            self.with_node_mut(parent, |data| data.children.retain(|id| *id != child))?;
            self.with_node_mut(child, |data| data.parent = None)?;
        }
        Ok(())
    }

    /// Appends `child` to `parent`, detaching it from any previous parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        if !self.exists(parent) {
            return Err(HostError::Missing { node: parent });
        }
        self.detach(child)?;
        self.with_node_mut(parent, |data| data.children.push(child))?;
        self.with_node_mut(child, |data| data.parent = Some(parent))?;
        Ok(())
    }

    /// Inserts `child` into `parent` just before `reference`.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), HostError> {
        if !self.exists(parent) {
            return Err(HostError::Missing { node: parent });
        }
        self.detach(child)?;
        self.with_node_mut(parent, |data| {
            let index = data
                .children
                .iter()
                .position(|id| *id == reference)
                .unwrap_or(data.children.len());
            data.children.insert(index, child);
        })?;
        self.with_node_mut(child, |data| data.parent = Some(parent))?;
        Ok(())
    }

    /// Swaps `new` into the tree position currently held by `old`. `old` is
    /// left detached; the caller decides whether to reclaim it.
    pub fn replace_child(&self, new: NodeId, old: NodeId) -> Result<(), HostError> {
        let parent = self
            .with_node(old, |data| data.parent)?
            .ok_or(HostError::Detached { node: old })?;
        if !self.exists(new) {
            return Err(HostError::Missing { node: new });
        }
        self.detach(new)?;
        self.with_node_mut(parent, |data| {
            if let Some(slot) = data.children.iter_mut().find(|id| **id == old) {
                *slot = new;
            }
        })?;
        self.with_node_mut(new, |data| data.parent = Some(parent))?;
        self.with_node_mut(old, |data| data.parent = None)?;
        Ok(())
    }

    /// Reparents every child of `from` onto `to`, preserving order.
    pub fn move_children(&self, from: NodeId, to: NodeId) -> Result<(), HostError> {
        let children = self.with_node_mut(from, |data| std::mem::take(&mut data.children))?;
        for child in &children {
            self.with_node_mut(*child, |data| data.parent = Some(to))?;
        }
        self.with_node_mut(to, |data| data.children.extend(children))?;
        Ok(())
    }

    /// Removes a node and its subtree, dropping storage and any native
    /// subscriptions registered on the removed nodes.
    pub fn remove(&self, node: NodeId) -> Result<(), HostError> {
        if !self.exists(node) {
            return Err(HostError::Missing { node });
        }
        self.detach(node)?;
        let mut doomed = vec![node];
        let mut index = 0;
        while index < doomed.len() {
            let current = doomed[index];
            index += 1;
            let children = self.with_node(current, |data| data.children.clone())?;
            doomed.extend(children);
        }
        if let Some(active) = self.active.get() {
            if doomed.contains(&active) {
                self.active.set(None);
            }
        }
        self.subscriptions
            .borrow_mut()
            .retain(|subscription| !doomed.contains(&subscription.node));
        let mut nodes = self.nodes.borrow_mut();
        for id in doomed {
            nodes[id.0] = None;
        }
        Ok(())
    }

    /// Shallow clone: tag, attributes, value, location and surface carry
    /// over; identity, tree position and subscriptions do not.
    pub fn clone_node(&self, node: NodeId) -> Result<NodeId, HostError> {
        let data = self.with_node(node, |data| NodeData {
            tag: data.tag.clone(),
            attributes: data.attributes.clone(),
            parent: None,
            children: Vec::new(),
            value: data.value.clone(),
            selection: data.selection,
            location: data.location.clone(),
            surface: data.surface.clone(),
            drag_region: data.drag_region,
        })?;
        Ok(self.allocate(data))
    }

    // Attributes

    pub fn set_attribute(
        &self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        self.with_node_mut(node, |data| {
            data.attributes.insert(name.to_owned(), value.to_owned());
        })
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.with_node_mut(node, |data| {
            data.attributes.shift_remove(name);
        })
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError> {
        self.with_node(node, |data| data.attributes.get(name).cloned())
    }

    // Editable content

    pub fn value(&self, node: NodeId) -> Result<String, HostError> {
        self.with_node(node, |data| data.value.clone())
    }

    pub fn set_value(&self, node: NodeId, value: &str) -> Result<(), HostError> {
        self.with_node_mut(node, |data| data.value = value.to_owned())
    }

    pub fn selection(
        &self,
        node: NodeId,
    ) -> Result<(usize, usize, SelectionDirection), HostError> {
        self.with_node(node, |data| data.selection)
    }

    /// Records the selection and fires `select`, whether or not the range
    /// changed. Callers who need to avoid select feedback loops compare
    /// against [`Document::selection`] first.
    pub fn set_selection_range(
        self: &Rc<Self>,
        node: NodeId,
        start: usize,
        end: usize,
        direction: SelectionDirection,
    ) -> Result<(), HostError> {
        self.with_node_mut(node, |data| data.selection = (start, end, direction))?;
        self.emit(node, event::SELECT, EventDetail::None)
    }

    // Focus model

    pub fn active_element(&self) -> Option<NodeId> {
        self.active.get()
    }

    /// Focuses an attached node. Focusing a detached node has no effect,
    /// mirroring platform behavior; callers retry through the deferral
    /// queue when that matters.
    pub fn focus(self: &Rc<Self>, node: NodeId) -> Result<(), HostError> {
        if !self.exists(node) {
            return Err(HostError::Missing { node });
        }
        if !self.is_attached(node) || self.active.get() == Some(node) {
            return Ok(());
        }
        self.active.set(Some(node));
        self.emit(node, event::FOCUS, EventDetail::None)
    }

    pub fn blur(self: &Rc<Self>, node: NodeId) -> Result<(), HostError> {
        if !self.exists(node) {
            return Err(HostError::Missing { node });
        }
        if self.active.get() != Some(node) {
            return Ok(());
        }
        self.active.set(None);
        self.emit(node, event::BLUR, EventDetail::None)
    }

    // Window chrome

    pub fn window_title(&self) -> String {
        self.window_title.borrow().clone()
    }

    pub fn set_window_title(&self, title: &str) {
        *self.window_title.borrow_mut() = title.to_owned();
    }

    pub fn set_drag_region(&self, node: NodeId, draggable: bool) -> Result<(), HostError> {
        self.with_node_mut(node, |data| data.drag_region = draggable)
    }

    pub fn is_drag_region(&self, node: NodeId) -> Result<bool, HostError> {
        self.with_node(node, |data| data.drag_region)
    }

    // Location

    pub fn location(&self, node: NodeId) -> Result<Option<String>, HostError> {
        self.with_node(node, |data| data.location.clone())
    }

    pub fn set_location(&self, node: NodeId, uri: &str) -> Result<(), HostError> {
        self.with_node_mut(node, |data| data.location = Some(uri.to_owned()))
    }

    // Browsing-surface capabilities

    fn surface(&self, node: NodeId) -> Result<Option<Rc<dyn Surface>>, HostError> {
        self.with_node(node, |data| data.surface.clone())
    }

    fn require_surface(
        &self,
        node: NodeId,
        capability: Capability,
    ) -> Result<Rc<dyn Surface>, HostError> {
        self.surface(node)?.ok_or_else(|| {
            HostError::capability(capability.name(), format!("node {node} has no surface"))
        })
    }

    /// Capability probe; absent surfaces support nothing.
    pub fn supports(&self, node: NodeId, capability: Capability) -> Result<bool, HostError> {
        Ok(self
            .surface(node)?
            .map(|surface| surface.supports(capability))
            .unwrap_or(false))
    }

    pub fn set_visible(&self, node: NodeId, visible: bool) -> Result<(), HostError> {
        self.require_surface(node, Capability::SetVisible)?
            .set_visible(visible)
    }

    pub fn set_zoom(&self, node: NodeId, level: f64) -> Result<(), HostError> {
        self.require_surface(node, Capability::SetZoom)?
            .set_zoom(level)
    }

    pub fn can_go_back(&self, node: NodeId) -> Result<bool, HostError> {
        self.require_surface(node, Capability::CanGoBack)?.can_go_back()
    }

    pub fn can_go_forward(&self, node: NodeId) -> Result<bool, HostError> {
        self.require_surface(node, Capability::CanGoForward)?
            .can_go_forward()
    }

    /// Runs one navigation command and, if the surface lands somewhere,
    /// fires the location-changed event for it.
    pub fn navigate(
        self: &Rc<Self>,
        node: NodeId,
        command: NavigationCommand,
    ) -> Result<(), HostError> {
        let surface = self.require_surface(node, command.capability())?;
        surface.navigate(command)?;
        if let Some(location) = surface.current_location() {
            self.emit(node, event::LOCATION_CHANGED, EventDetail::Text(location))?;
        }
        Ok(())
    }

    /// Starts loading `uri` in the node's surface and fires the
    /// location-changed event. The node's own `location` record is left to
    /// the chrome's location-change wiring.
    pub fn load(self: &Rc<Self>, node: NodeId, uri: &str) -> Result<(), HostError> {
        let surface = self.require_surface(node, Capability::Load)?;
        surface.load(uri)?;
        self.emit(node, event::LOCATION_CHANGED, EventDetail::Text(uri.to_owned()))
    }

    // Native events

    pub fn add_event_listener(
        &self,
        node: NodeId,
        kind: &str,
        phase: Phase,
        handler: impl Fn(&SurfaceEvent) + 'static,
    ) -> Result<SubscriptionId, HostError> {
        if !self.exists(node) {
            return Err(HostError::Missing { node });
        }
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            node,
            kind: kind.to_owned(),
            phase,
            handler: Rc::new(handler),
        });
        Ok(id)
    }

    pub fn remove_event_listener(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        subscriptions.len() != before
    }

    /// Number of native subscriptions registered for `kind` on `node`,
    /// across both phases.
    pub fn subscription_count(&self, node: NodeId, kind: &str) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|subscription| subscription.node == node && subscription.kind == kind)
            .count()
    }

    /// Fires a native event: capture from the root down to the target, then
    /// bubble back up. Handlers are snapshotted first so they may freely
    /// mutate the subscription table while running.
    pub fn emit(
        self: &Rc<Self>,
        target: NodeId,
        kind: &str,
        detail: EventDetail,
    ) -> Result<(), HostError> {
        if !self.exists(target) {
            return Err(HostError::Missing { node: target });
        }
        let mut path = vec![target];
        let mut current = target;
        while let Ok(Some(parent)) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();

        let handlers: Vec<EventHandler> = {
            let subscriptions = self.subscriptions.borrow();
            let capture = path.iter().flat_map(|node| {
                subscriptions.iter().filter(move |subscription| {
                    subscription.node == *node
                        && subscription.kind == kind
                        && subscription.phase == Phase::Capture
                })
            });
            let bubble = path.iter().rev().flat_map(|node| {
                subscriptions.iter().filter(move |subscription| {
                    subscription.node == *node
                        && subscription.kind == kind
                        && subscription.phase == Phase::Bubble
                })
            });
            capture
                .chain(bubble)
                .map(|subscription| subscription.handler.clone())
                .collect()
        };

        let surface_event = SurfaceEvent::new(kind, target, detail);
        for handler in handlers {
            handler(&surface_event);
        }
        Ok(())
    }

    // Deferral queue

    /// Schedules a single-shot task for the next [`Document::run_deferred`]
    /// drain. Tasks for the same field on the same node run in call order;
    /// there is no cross-field guarantee.
    pub fn defer(&self, task: impl FnOnce(&Rc<Document>) + 'static) {
        self.deferred.borrow_mut().push_back(Box::new(task));
    }

    /// Drains the tasks queued so far. Tasks queued while draining wait for
    /// the next turn.
    pub fn run_deferred(self: &Rc<Self>) {
        let tasks: Vec<DeferredTask> = self.deferred.borrow_mut().drain(..).collect();
        for task in tasks {
            task(self);
        }
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.borrow().is_empty()
    }

    /// Debug rendering of the subtree under `root` (root defaults to the
    /// window), one node per line.
    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        fn render(document: &Document, node: NodeId, depth: usize, out: &mut String) {
            let indent = "  ".repeat(depth);
            let tag = document.tag(node).unwrap_or_else(|_| "?".to_owned());
            out.push_str(&format!("{indent}{node} <{tag}>\n"));
            if let Ok(children) = document.children(node) {
                for child in children {
                    render(document, child, depth + 1, out);
                }
            }
        }
        let mut out = String::new();
        render(self, root.unwrap_or(self.root), 0, &mut out);
        out
    }
}
