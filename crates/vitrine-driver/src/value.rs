use std::fmt;
use std::rc::Rc;

use vitrine_dom::{NavigationCommand, SelectionRange, SurfaceEvent};

use crate::DriverError;

type ListenerFn = dyn Fn(&SurfaceEvent) -> Result<(), DriverError>;

/// Cloneable handle to a logical event listener. Identity (not closure
/// contents) decides equality, so a listener registered twice is stored
/// once and a re-render carrying the same handle is a no-op.
#[derive(Clone)]
pub struct Listener {
    callback: Rc<ListenerFn>,
}

impl Listener {
    pub fn new(callback: impl Fn(&SurfaceEvent) -> Result<(), DriverError> + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Wraps a listener that cannot fail.
    pub fn infallible(callback: impl Fn(&SurfaceEvent) + 'static) -> Self {
        Self::new(move |event| {
            callback(event);
            Ok(())
        })
    }

    pub fn invoke(&self, event: &SurfaceEvent) -> Result<(), DriverError> {
        (self.callback)(event)
    }

    pub fn same(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.callback))
    }
}

/// Value carried by one described field. `Null` plays the role of an
/// absent field; hooks treat it as "remove" or "no listener".
#[derive(Clone, Debug)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Selection(SelectionRange),
    Navigate(NavigationCommand),
    Listener(Listener),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(flag) => *flag,
            FieldValue::Int(value) => *value != 0,
            FieldValue::Float(value) => *value != 0.0,
            FieldValue::Text(text) => !text.is_empty(),
            FieldValue::Selection(_) | FieldValue::Navigate(_) | FieldValue::Listener(_) => true,
        }
    }

    /// Canonical attribute rendering; `None` means "attribute absent".
    /// Listener, selection and navigation values have no attribute form.
    pub fn as_attribute(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(flag) => Some(if *flag { "true" } else { "false" }.to_owned()),
            FieldValue::Int(value) => Some(value.to_string()),
            FieldValue::Float(value) => Some(value.to_string()),
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Selection(_) | FieldValue::Navigate(_) | FieldValue::Listener(_) => None,
        }
    }

    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            FieldValue::Listener(listener) => Some(listener),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(value) => Some(*value),
            FieldValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&SelectionRange> {
        match self {
            FieldValue::Selection(range) => Some(range),
            _ => None,
        }
    }

    pub fn as_navigation(&self) -> Option<NavigationCommand> {
        match self {
            FieldValue::Navigate(command) => Some(*command),
            _ => None,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(lhs), FieldValue::Bool(rhs)) => lhs == rhs,
            (FieldValue::Int(lhs), FieldValue::Int(rhs)) => lhs == rhs,
            (FieldValue::Float(lhs), FieldValue::Float(rhs)) => lhs.to_bits() == rhs.to_bits(),
            (FieldValue::Text(lhs), FieldValue::Text(rhs)) => lhs == rhs,
            (FieldValue::Selection(lhs), FieldValue::Selection(rhs)) => lhs == rhs,
            (FieldValue::Navigate(lhs), FieldValue::Navigate(rhs)) => lhs == rhs,
            (FieldValue::Listener(lhs), FieldValue::Listener(rhs)) => lhs.same(rhs),
            _ => false,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Bool(flag)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<SelectionRange> for FieldValue {
    fn from(range: SelectionRange) -> Self {
        FieldValue::Selection(range)
    }
}

impl From<NavigationCommand> for FieldValue {
    fn from(command: NavigationCommand) -> Self {
        FieldValue::Navigate(command)
    }
}

impl From<Listener> for FieldValue {
    fn from(listener: Listener) -> Self {
        FieldValue::Listener(listener)
    }
}
