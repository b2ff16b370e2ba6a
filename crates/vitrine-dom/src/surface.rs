use std::cell::{Cell, RefCell};

use crate::HostError;

/// Imperative capabilities a privileged browsing surface may expose. Not
/// every surface implements every capability; callers probe with
/// [`Surface::supports`] before invoking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    SetVisible,
    SetZoom,
    Stop,
    Reload,
    GoBack,
    GoForward,
    CanGoBack,
    CanGoForward,
    Load,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Capability::SetVisible => "set_visible",
            Capability::SetZoom => "set_zoom",
            Capability::Stop => "stop",
            Capability::Reload => "reload",
            Capability::GoBack => "go_back",
            Capability::GoForward => "go_forward",
            Capability::CanGoBack => "can_go_back",
            Capability::CanGoForward => "can_go_forward",
            Capability::Load => "load",
        }
    }
}

/// One imperative navigation command for a browsing surface. Exactly one
/// command fires per described change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationCommand {
    Stop,
    Reload,
    GoBack,
    GoForward,
}

impl NavigationCommand {
    pub fn capability(self) -> Capability {
        match self {
            NavigationCommand::Stop => Capability::Stop,
            NavigationCommand::Reload => Capability::Reload,
            NavigationCommand::GoBack => Capability::GoBack,
            NavigationCommand::GoForward => Capability::GoForward,
        }
    }
}

/// Direction of an editable-text selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionDirection {
    Forward,
    Backward,
    None,
}

/// One end of a selection. `End` is the unbounded sentinel and resolves to
/// the current content length at apply time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionBound {
    Index(usize),
    End,
}

impl SelectionBound {
    pub fn resolve(self, length: usize) -> usize {
        match self {
            SelectionBound::Index(index) => index.min(length),
            SelectionBound::End => length,
        }
    }
}

/// Described selection state for an editable node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: SelectionBound,
    pub end: SelectionBound,
    pub direction: SelectionDirection,
}

/// Capability surface of a privileged browsing element.
///
/// Implementations are allowed to be partial (`supports` returns `false`)
/// and allowed to fail at runtime; the bridge layer decides which failures
/// are swallowed and which propagate.
pub trait Surface {
    fn supports(&self, capability: Capability) -> bool;

    fn set_visible(&self, visible: bool) -> Result<(), HostError>;

    fn set_zoom(&self, level: f64) -> Result<(), HostError>;

    fn navigate(&self, command: NavigationCommand) -> Result<(), HostError>;

    fn can_go_back(&self) -> Result<bool, HostError>;

    fn can_go_forward(&self) -> Result<bool, HostError>;

    fn load(&self, uri: &str) -> Result<(), HostError>;

    /// Location the surface is currently presenting, if any.
    fn current_location(&self) -> Option<String>;
}

/// Reference [`Surface`] backed by an in-memory history stack. Supports the
/// full capability set and never fails.
pub struct InMemorySurface {
    visible: Cell<bool>,
    zoom: Cell<f64>,
    history: RefCell<Vec<String>>,
    cursor: Cell<usize>,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self {
            visible: Cell::new(true),
            zoom: Cell::new(1.0),
            history: RefCell::new(Vec::new()),
            cursor: Cell::new(0),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom.get()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }
}

impl Default for InMemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for InMemorySurface {
    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    fn set_visible(&self, visible: bool) -> Result<(), HostError> {
        self.visible.set(visible);
        Ok(())
    }

    fn set_zoom(&self, level: f64) -> Result<(), HostError> {
        self.zoom.set(level);
        Ok(())
    }

    fn navigate(&self, command: NavigationCommand) -> Result<(), HostError> {
        match command {
            NavigationCommand::GoBack => {
                let cursor = self.cursor.get();
                if cursor > 0 {
                    self.cursor.set(cursor - 1);
                }
            }
            NavigationCommand::GoForward => {
                let cursor = self.cursor.get();
                if cursor + 1 < self.history.borrow().len() {
                    self.cursor.set(cursor + 1);
                }
            }
            NavigationCommand::Stop | NavigationCommand::Reload => {}
        }
        Ok(())
    }

    fn can_go_back(&self) -> Result<bool, HostError> {
        Ok(self.cursor.get() > 0)
    }

    fn can_go_forward(&self) -> Result<bool, HostError> {
        Ok(self.cursor.get() + 1 < self.history.borrow().len())
    }

    fn load(&self, uri: &str) -> Result<(), HostError> {
        let mut history = self.history.borrow_mut();
        if !history.is_empty() {
            history.truncate(self.cursor.get() + 1);
        }
        history.push(uri.to_owned());
        self.cursor.set(history.len() - 1);
        Ok(())
    }

    fn current_location(&self) -> Option<String> {
        self.history.borrow().get(self.cursor.get()).cloned()
    }
}
