use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use vitrine_dom::{Document, NodeId, Phase, SubscriptionId, SurfaceEvent, CHROME_SIGNAL};

use crate::hooks::WriteOutcome;
use crate::{DriverError, Listener};

type Map<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// Where an event hook registers its native subscription. The registry is
/// always keyed by the described element's node regardless of the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventTarget {
    Element,
    Window,
}

struct NodeEntry {
    listeners: Vec<Listener>,
    subscription: SubscriptionId,
}

#[derive(Default)]
struct RegistryState {
    entries: Map<NodeId, NodeEntry>,
    listened_nodes: usize,
}

/// Bridges one native event type to any number of logical listeners per
/// node. One hook instance serves every element of its type; per-node
/// state lives in the registry and is removed explicitly on unmount.
///
/// Invariants: a node has exactly one native subscription while its
/// listener list is non-empty, and a listener identity appears at most
/// once per list.
pub struct EventHook {
    kind: String,
    phase: Phase,
    target: EventTarget,
    filter: Option<String>,
    registry: Rc<RefCell<RegistryState>>,
}

impl EventHook {
    /// Listens for `kind` during the bubble phase on the element itself.
    pub fn bubbled(kind: &str) -> Self {
        Self::with_phase(kind, Phase::Bubble)
    }

    /// Listens for `kind` during the capture phase on the element itself.
    pub fn captured(kind: &str) -> Self {
        Self::with_phase(kind, Phase::Capture)
    }

    /// Chrome notices share one native event type fired at the window;
    /// each filtered hook receives the raw notice and forwards only those
    /// whose nested discriminator matches `notice`.
    pub fn chrome_filtered(notice: &str) -> Self {
        let mut hook = Self::with_phase(CHROME_SIGNAL, Phase::Bubble);
        hook.target = EventTarget::Window;
        hook.filter = Some(notice.to_owned());
        hook
    }

    fn with_phase(kind: &str, phase: Phase) -> Self {
        Self {
            kind: kind.to_owned(),
            phase,
            target: EventTarget::Element,
            filter: None,
            registry: Rc::new(RefCell::new(RegistryState::default())),
        }
    }

    /// Redirects native registration to the chrome window instead of the
    /// element (for events the platform only fires at the window).
    pub fn on_window(mut self) -> Self {
        self.target = EventTarget::Window;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Listeners currently registered against `node`.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.registry
            .borrow()
            .entries
            .get(&node)
            .map(|entry| entry.listeners.len())
            .unwrap_or(0)
    }

    /// Nodes that currently hold a native subscription.
    pub fn listened_nodes(&self) -> usize {
        self.registry.borrow().listened_nodes
    }

    fn resolve_target(&self, document: &Rc<Document>, node: NodeId) -> NodeId {
        match self.target {
            EventTarget::Element => node,
            EventTarget::Window => document.root(),
        }
    }

    fn subscribe(
        &self,
        document: &Rc<Document>,
        node: NodeId,
    ) -> Result<SubscriptionId, DriverError> {
        let registry = Rc::downgrade(&self.registry);
        let filter = self.filter.clone();
        let target = self.resolve_target(document, node);
        let id = document.add_event_listener(target, &self.kind, self.phase, move |event| {
            if let Some(notice) = &filter {
                if event.chrome_kind() != Some(notice.as_str()) {
                    return;
                }
            }
            if let Some(registry) = registry.upgrade() {
                dispatch(&registry, node, event);
            }
        })?;
        Ok(id)
    }

    /// Registers `listener` for `node`. The native subscription is created
    /// on the 0→1 transition; a listener already present is not added
    /// twice.
    pub fn add_listener(
        &self,
        document: &Rc<Document>,
        node: NodeId,
        listener: Listener,
    ) -> Result<(), DriverError> {
        {
            let mut registry = self.registry.borrow_mut();
            if let Some(entry) = registry.entries.get_mut(&node) {
                if !entry.listeners.iter().any(|existing| existing.same(&listener)) {
                    entry.listeners.push(listener);
                }
                return Ok(());
            }
        }
        let subscription = self.subscribe(document, node)?;
        let mut registry = self.registry.borrow_mut();
        registry.entries.insert(
            node,
            NodeEntry {
                listeners: vec![listener],
                subscription,
            },
        );
        registry.listened_nodes += 1;
        Ok(())
    }

    /// Removes `listener` from `node`; the native subscription is dropped
    /// on the 1→0 transition together with the registry entry.
    pub fn remove_listener(&self, document: &Rc<Document>, node: NodeId, listener: &Listener) {
        let subscription = {
            let mut registry = self.registry.borrow_mut();
            let emptied = match registry.entries.get_mut(&node) {
                Some(entry) => {
                    entry.listeners.retain(|existing| !existing.same(listener));
                    entry.listeners.is_empty()
                }
                None => false,
            };
            if emptied {
                registry.listened_nodes -= 1;
                registry
                    .entries
                    .remove(&node)
                    .map(|entry| entry.subscription)
            } else {
                None
            }
        };
        if let Some(id) = subscription {
            document.remove_event_listener(id);
        }
    }

    /// Field write: swap the previous listener for the current one. Equal
    /// identities and double-`Null` are no-ops.
    pub fn write(
        &self,
        document: &Rc<Document>,
        node: NodeId,
        current: Option<&Listener>,
        previous: Option<&Listener>,
    ) -> Result<(), DriverError> {
        if let (Some(current), Some(previous)) = (current, previous) {
            if current.same(previous) {
                return Ok(());
            }
        }
        if let Some(previous) = previous {
            self.remove_listener(document, node, previous);
        }
        if let Some(current) = current {
            self.add_listener(document, node, current.clone())?;
        }
        Ok(())
    }

    /// Drops the node's entry entirely: remaining listeners, native
    /// subscription and bookkeeping. Called when the node leaves the
    /// document; the registry must never keep entries for dead nodes.
    pub fn detach_node(&self, document: &Rc<Document>, node: NodeId) {
        let subscription = {
            let mut registry = self.registry.borrow_mut();
            match registry.entries.remove(&node) {
                Some(entry) => {
                    registry.listened_nodes -= 1;
                    Some(entry.subscription)
                }
                None => None,
            }
        };
        if let Some(id) = subscription {
            document.remove_event_listener(id);
        }
    }

    /// Moves `old`'s listener list onto `new` after a node replacement,
    /// re-registering the native subscription against the new node.
    pub(crate) fn migrate(
        &self,
        document: &Rc<Document>,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), DriverError> {
        let moved = {
            let mut registry = self.registry.borrow_mut();
            match registry.entries.remove(&old) {
                Some(entry) => {
                    registry.listened_nodes -= 1;
                    Some(entry)
                }
                None => None,
            }
        };
        let Some(entry) = moved else {
            return Ok(());
        };
        document.remove_event_listener(entry.subscription);
        let subscription = self.subscribe(document, new)?;
        let mut registry = self.registry.borrow_mut();
        registry.entries.insert(
            new,
            NodeEntry {
                listeners: entry.listeners,
                subscription,
            },
        );
        registry.listened_nodes += 1;
        Ok(())
    }
}

/// Fan-out of one native event to a node's logical listeners.
///
/// The loop runs by index over the live list rather than a snapshot: a
/// listener may add or remove listeners on the same node while it runs,
/// and removals of not-yet-visited listeners must suppress their delivery.
/// A failing listener is reported and iteration resumes at the next index,
/// so one failure never aborts sibling delivery. The registry borrow is
/// released around every invocation to keep re-entry safe.
fn dispatch(registry: &Rc<RefCell<RegistryState>>, node: NodeId, event: &SurfaceEvent) {
    let mut index = 0;
    loop {
        let listener = {
            let state = registry.borrow();
            match state.entries.get(&node) {
                Some(entry) if index < entry.listeners.len() => entry.listeners[index].clone(),
                _ => break,
            }
        };
        if let Err(error) = listener.invoke(event) {
            log::error!("listener for {} on {node} failed: {error}", event.kind);
        }
        index += 1;
    }
}

pub(crate) type SetupFn =
    dyn Fn(&Rc<Document>, NodeId, VirtualDispatch) -> Result<NodeId, DriverError>;

struct VirtualBinding {
    listener: Option<Listener>,
    key: Rc<Cell<NodeId>>,
}

/// Dispatch handle given to a virtual event's `setup`. Invokes the
/// listener currently remembered for the node, or drops the event
/// silently when none is registered.
#[derive(Clone)]
pub struct VirtualDispatch {
    bindings: Weak<RefCell<Map<NodeId, VirtualBinding>>>,
    key: Rc<Cell<NodeId>>,
}

impl VirtualDispatch {
    pub fn dispatch(&self, event: &SurfaceEvent) {
        let Some(bindings) = self.bindings.upgrade() else {
            return;
        };
        let listener = bindings
            .borrow()
            .get(&self.key.get())
            .and_then(|binding| binding.listener.clone());
        if let Some(listener) = listener {
            if let Err(error) = listener.invoke(event) {
                log::error!("listener for {} on {} failed: {error}", event.kind, event.target);
            }
        }
    }
}

/// Hook for events that do not map onto a single native event. `setup`
/// runs once per node lifetime on the first non-null listener write and
/// performs arbitrary native wiring; it may hand back a replacement node.
/// Later writes only swap the remembered listener, and writing `Null`
/// clears it without tearing the wiring down.
pub struct VirtualEventHook {
    setup: Rc<SetupFn>,
    bindings: Rc<RefCell<Map<NodeId, VirtualBinding>>>,
}

impl VirtualEventHook {
    pub fn new(
        setup: impl Fn(&Rc<Document>, NodeId, VirtualDispatch) -> Result<NodeId, DriverError>
            + 'static,
    ) -> Self {
        Self {
            setup: Rc::new(setup),
            bindings: Rc::new(RefCell::new(Map::default())),
        }
    }

    pub fn is_wired(&self, node: NodeId) -> bool {
        self.bindings.borrow().contains_key(&node)
    }

    pub fn write(
        &self,
        document: &Rc<Document>,
        node: NodeId,
        current: Option<&Listener>,
    ) -> Result<WriteOutcome, DriverError> {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(&node) {
            binding.listener = current.cloned();
            return Ok(WriteOutcome::Kept);
        }
        let Some(listener) = current else {
            return Ok(WriteOutcome::Kept);
        };
        let key = Rc::new(Cell::new(node));
        self.bindings.borrow_mut().insert(
            node,
            VirtualBinding {
                listener: Some(listener.clone()),
                key: key.clone(),
            },
        );
        let dispatch = VirtualDispatch {
            bindings: Rc::downgrade(&self.bindings),
            key: key.clone(),
        };
        let wired = (self.setup)(document, node, dispatch)?;
        if wired != node {
            let mut bindings = self.bindings.borrow_mut();
            if let Some(binding) = bindings.remove(&node) {
                binding.key.set(wired);
                bindings.insert(wired, binding);
            }
            return Ok(WriteOutcome::Replaced(wired));
        }
        Ok(WriteOutcome::Kept)
    }

    /// Drops the node's binding. Wiring installed by `setup` lives on the
    /// host node and dies with it.
    pub fn detach_node(&self, node: NodeId) {
        self.bindings.borrow_mut().remove(&node);
    }

    /// Carries a binding across a node replacement performed by another
    /// hook. The replacement node has none of the old wiring, so `setup`
    /// runs again for it (a fresh node lifetime).
    pub(crate) fn migrate(
        &self,
        document: &Rc<Document>,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), DriverError> {
        let moved = self.bindings.borrow_mut().remove(&old);
        let Some(binding) = moved else {
            return Ok(());
        };
        binding.key.set(new);
        let key = binding.key.clone();
        self.bindings.borrow_mut().insert(new, binding);
        let dispatch = VirtualDispatch {
            bindings: Rc::downgrade(&self.bindings),
            key,
        };
        let wired = (self.setup)(document, new, dispatch)?;
        if wired != new {
            log::warn!("virtual event setup replaced {new} during migration; keeping {new}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use vitrine_dom::{Document, EventDetail, NodeId};

    use super::*;

    fn fixture() -> (Rc<Document>, NodeId) {
        let document = Document::new();
        let node = document.create_element("box");
        document.append_child(document.root(), node).unwrap();
        (document, node)
    }

    fn recording(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Listener {
        let log = log.clone();
        Listener::infallible(move |_| log.borrow_mut().push(label))
    }

    #[test]
    fn duplicate_add_keeps_one_listener_and_one_subscription() {
        let (document, node) = fixture();
        let hook = EventHook::bubbled("ping");
        let listener = Listener::infallible(|_| {});

        hook.add_listener(&document, node, listener.clone()).unwrap();
        hook.add_listener(&document, node, listener).unwrap();

        assert_eq!(hook.listener_count(node), 1);
        assert_eq!(hook.listened_nodes(), 1);
        assert_eq!(document.subscription_count(node, "ping"), 1);
    }

    #[test]
    fn removing_last_listener_drops_native_subscription() {
        let (document, node) = fixture();
        let hook = EventHook::bubbled("ping");
        let listener = Listener::infallible(|_| {});

        hook.add_listener(&document, node, listener.clone()).unwrap();
        hook.remove_listener(&document, node, &listener);

        assert_eq!(hook.listener_count(node), 0);
        assert_eq!(hook.listened_nodes(), 0);
        assert_eq!(document.subscription_count(node, "ping"), 0);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let (document, node) = fixture();
        let hook = EventHook::bubbled("ping");
        let log = Rc::new(RefCell::new(Vec::new()));

        hook.add_listener(&document, node, recording(&log, "first"))
            .unwrap();
        hook.add_listener(&document, node, recording(&log, "second"))
            .unwrap();
        document.emit(node, "ping", EventDetail::None).unwrap();

        assert_eq!(&*log.borrow(), &["first", "second"]);
        assert_eq!(document.subscription_count(node, "ping"), 1);
    }

    #[test]
    fn failing_listener_does_not_block_later_listeners() {
        let (document, node) = fixture();
        let hook = EventHook::bubbled("ping");
        let log = Rc::new(RefCell::new(Vec::new()));

        hook.add_listener(
            &document,
            node,
            Listener::new(|event| Err(DriverError::listener(event.kind.clone(), "boom"))),
        )
        .unwrap();
        hook.add_listener(&document, node, recording(&log, "second"))
            .unwrap();
        hook.add_listener(&document, node, recording(&log, "third"))
            .unwrap();

        document.emit(node, "ping", EventDetail::None).unwrap();
        assert_eq!(&*log.borrow(), &["second", "third"]);
    }

    #[test]
    fn listener_removing_a_later_listener_suppresses_it() {
        let (document, node) = fixture();
        let hook = Rc::new(EventHook::bubbled("ping"));
        let log = Rc::new(RefCell::new(Vec::new()));

        let second = recording(&log, "second");
        let first = {
            let hook = hook.clone();
            let document = document.clone();
            let second = second.clone();
            let log = log.clone();
            Listener::infallible(move |_| {
                log.borrow_mut().push("first");
                hook.remove_listener(&document, node, &second);
            })
        };
        hook.add_listener(&document, node, first).unwrap();
        hook.add_listener(&document, node, second).unwrap();
        hook.add_listener(&document, node, recording(&log, "third"))
            .unwrap();

        document.emit(node, "ping", EventDetail::None).unwrap();
        assert_eq!(&*log.borrow(), &["first", "third"]);
    }

    #[test]
    fn listener_registering_during_dispatch_is_reached_same_pass() {
        let (document, node) = fixture();
        let hook = Rc::new(EventHook::bubbled("ping"));
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = {
            let hook = hook.clone();
            let document = document.clone();
            let log = log.clone();
            Listener::infallible(move |_| {
                log.borrow_mut().push("first");
                let late = recording(&log, "late");
                hook.add_listener(&document, node, late).unwrap();
            })
        };
        hook.add_listener(&document, node, first).unwrap();

        document.emit(node, "ping", EventDetail::None).unwrap();
        assert_eq!(&*log.borrow(), &["first", "late"]);
        // The listener appended mid-dispatch stays registered afterwards.
        assert_eq!(hook.listener_count(node), 2);
    }

    #[test]
    fn chrome_filtered_hooks_see_only_matching_notices() {
        let (document, node) = fixture();
        let updates = EventHook::chrome_filtered("update-ready");
        let prompts = EventHook::chrome_filtered("debugger-prompt");
        let log = Rc::new(RefCell::new(Vec::new()));

        updates
            .add_listener(&document, node, recording(&log, "update"))
            .unwrap();
        prompts
            .add_listener(&document, node, recording(&log, "prompt"))
            .unwrap();
        // Each filtered hook holds its own native subscription on the window.
        assert_eq!(document.subscription_count(document.root(), CHROME_SIGNAL), 2);

        document
            .emit(
                document.root(),
                CHROME_SIGNAL,
                EventDetail::Chrome {
                    kind: "update-ready".to_owned(),
                    payload: String::new(),
                },
            )
            .unwrap();

        assert_eq!(&*log.borrow(), &["update"]);
    }

    #[test]
    fn write_swaps_listener_identity() {
        let (document, node) = fixture();
        let hook = EventHook::bubbled("ping");
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = recording(&log, "first");
        let second = recording(&log, "second");

        hook.write(&document, node, Some(&first), None).unwrap();
        hook.write(&document, node, Some(&second), Some(&first))
            .unwrap();
        document.emit(node, "ping", EventDetail::None).unwrap();
        assert_eq!(&*log.borrow(), &["second"]);

        hook.write(&document, node, None, Some(&second)).unwrap();
        assert_eq!(hook.listened_nodes(), 0);
        assert_eq!(document.subscription_count(node, "ping"), 0);
    }

    #[test]
    fn virtual_event_setup_runs_once_and_survives_listener_swaps() {
        let (document, node) = fixture();
        let setups = Rc::new(RefCell::new(0));
        let hook = {
            let setups = setups.clone();
            VirtualEventHook::new(move |document, node, dispatch| {
                *setups.borrow_mut() += 1;
                document.add_event_listener(node, "raw", vitrine_dom::Phase::Bubble, move |e| {
                    dispatch.dispatch(e);
                })?;
                Ok(node)
            })
        };
        let log = Rc::new(RefCell::new(Vec::new()));

        hook.write(&document, node, Some(&recording(&log, "a"))).unwrap();
        hook.write(&document, node, Some(&recording(&log, "b"))).unwrap();
        document.emit(node, "raw", EventDetail::None).unwrap();
        assert_eq!(*setups.borrow(), 1);
        assert_eq!(&*log.borrow(), &["b"]);

        // Clearing the listener keeps the wiring but drops the event.
        hook.write(&document, node, None).unwrap();
        document.emit(node, "raw", EventDetail::None).unwrap();
        assert_eq!(&*log.borrow(), &["b"]);
        assert!(hook.is_wired(node));
    }
}
