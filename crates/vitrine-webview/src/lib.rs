//! Element definitions for the Vitrine browser chrome.
//!
//! This crate binds the generic hook machinery in `vitrine-driver` to the
//! host capabilities of `vitrine-dom`: field bridges for focus,
//! visibility, zoom, selection, navigation and the window chrome, the
//! synthesized location and history event streams, and the element types
//! (`webview`, `text-input`, `shell-window`) the chrome is built from.

pub mod element;
pub mod events;
pub mod fields;

pub use element::{shell_window, text_input, web_view};
