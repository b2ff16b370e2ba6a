//! Testing utilities and harness for Vitrine.

use std::cell::RefCell;
use std::rc::Rc;

use vitrine_dom::{
    Capability, Document, HostError, InMemorySurface, NavigationCommand, Surface,
};
use vitrine_driver::Listener;

/// A [`Surface`] with scriptable gaps: capabilities can be declared
/// unsupported or made to fail, and every invocation is recorded. The
/// working parts delegate to [`InMemorySurface`].
pub struct ScriptedSurface {
    inner: InMemorySurface,
    unsupported: RefCell<Vec<Capability>>,
    failing: RefCell<Vec<Capability>>,
    calls: RefCell<Vec<Capability>>,
}

impl ScriptedSurface {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            inner: InMemorySurface::new(),
            unsupported: RefCell::new(Vec::new()),
            failing: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
        })
    }

    /// Makes `supports` report false for `capability`.
    pub fn deny(&self, capability: Capability) {
        self.unsupported.borrow_mut().push(capability);
    }

    /// Keeps `capability` supported but makes every invocation fail.
    pub fn break_capability(&self, capability: Capability) {
        self.failing.borrow_mut().push(capability);
    }

    pub fn calls(&self) -> Vec<Capability> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, capability: Capability) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|recorded| **recorded == capability)
            .count()
    }

    pub fn inner(&self) -> &InMemorySurface {
        &self.inner
    }

    fn invoke(&self, capability: Capability) -> Result<(), HostError> {
        self.calls.borrow_mut().push(capability);
        if self.failing.borrow().contains(&capability) {
            return Err(HostError::capability(capability.name(), "scripted failure"));
        }
        Ok(())
    }
}

impl Surface for ScriptedSurface {
    fn supports(&self, capability: Capability) -> bool {
        !self.unsupported.borrow().contains(&capability)
    }

    fn set_visible(&self, visible: bool) -> Result<(), HostError> {
        self.invoke(Capability::SetVisible)?;
        self.inner.set_visible(visible)
    }

    fn set_zoom(&self, level: f64) -> Result<(), HostError> {
        self.invoke(Capability::SetZoom)?;
        self.inner.set_zoom(level)
    }

    fn navigate(&self, command: NavigationCommand) -> Result<(), HostError> {
        self.invoke(command.capability())?;
        self.inner.navigate(command)
    }

    fn can_go_back(&self) -> Result<bool, HostError> {
        self.invoke(Capability::CanGoBack)?;
        self.inner.can_go_back()
    }

    fn can_go_forward(&self) -> Result<bool, HostError> {
        self.invoke(Capability::CanGoForward)?;
        self.inner.can_go_forward()
    }

    fn load(&self, uri: &str) -> Result<(), HostError> {
        self.invoke(Capability::Load)?;
        self.inner.load(uri)
    }

    fn current_location(&self) -> Option<String> {
        self.inner.current_location()
    }
}

/// Document whose `webview` elements get a fresh [`InMemorySurface`].
pub fn test_document() -> Rc<Document> {
    let document = Document::new();
    document.set_surface_factory(|tag| {
        (tag == "webview").then(|| Rc::new(InMemorySurface::new()) as Rc<dyn Surface>)
    });
    document
}

/// Document whose `webview` elements all share `surface`, so a test can
/// hold the handle and script or inspect it.
pub fn document_with_surface(surface: Rc<ScriptedSurface>) -> Rc<Document> {
    let document = Document::new();
    document.set_surface_factory(move |tag| {
        (tag == "webview").then(|| surface.clone() as Rc<dyn Surface>)
    });
    document
}

/// Shared label log for asserting call and event order.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: impl Into<String>) {
        self.entries.borrow_mut().push(label.into());
    }

    /// Listener that records `label` on every delivery.
    pub fn listener(&self, label: &str) -> Listener {
        let entries = self.entries.clone();
        let label = label.to_owned();
        Listener::infallible(move |_| entries.borrow_mut().push(label.clone()))
    }

    /// Listener that records `label` plus the event's detail rendering.
    pub fn detail_listener(&self, label: &str) -> Listener {
        let entries = self.entries.clone();
        let label = label.to_owned();
        Listener::infallible(move |event| {
            entries.borrow_mut().push(format!("{label}:{:?}", event.detail));
        })
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut self.entries.borrow_mut())
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
