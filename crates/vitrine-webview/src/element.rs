//! The element types the Vitrine chrome is built from.
//!
//! Each definition is a hook catalog; hook state is shared by every
//! instance of the type, so the catalogs are built once and cached in
//! thread-local storage.

use std::rc::Rc;

use vitrine_driver::{define_element, ElementType, Hook};

use crate::{events, fields};

thread_local! {
    static WEB_VIEW: Rc<ElementType> = build_web_view();
    static TEXT_INPUT: Rc<ElementType> = build_text_input();
    static SHELL_WINDOW: Rc<ElementType> = build_shell_window();
}

/// Privileged browsing surface.
///
/// `remote` decides the process the surface runs in and is only read at
/// insertion; changing it swaps the underlying node.
pub fn web_view() -> Rc<ElementType> {
    WEB_VIEW.with(Rc::clone)
}

/// Editable single-line text field, used for the location bar.
pub fn text_input() -> Rc<ElementType> {
    TEXT_INPUT.with(Rc::clone)
}

/// Top-level chrome pane: window title, drag handles and runtime notices.
pub fn shell_window() -> Rc<ElementType> {
    SHELL_WINDOW.with(Rc::clone)
}

// Hooks run in catalog order, so listener fields come before the effect
// fields whose host calls fire events (uri, navigation, focused).
fn build_web_view() -> Rc<ElementType> {
    define_element(
        "webview",
        [
            ("remote", Hook::pre_insert_attribute("remote")),
            ("on_location_changed", events::on_location_changed()),
            ("on_history_back_changed", events::on_history_back_changed()),
            (
                "on_history_forward_changed",
                events::on_history_forward_changed(),
            ),
            ("on_title_changed", events::on_title_changed()),
            ("on_icon_changed", events::on_icon_changed()),
            ("on_load_started", events::on_load_started()),
            ("on_load_ended", events::on_load_ended()),
            ("on_security_changed", events::on_security_changed()),
            ("on_meta_changed", events::on_meta_changed()),
            ("on_context_menu", events::on_context_menu()),
            ("on_prompt", events::on_prompt()),
            ("on_error", events::on_error()),
            ("uri", fields::uri()),
            ("visible", fields::visible()),
            ("zoom", fields::zoom()),
            ("navigation", fields::navigation()),
            ("focused", fields::focused()),
        ],
    )
}

fn build_text_input() -> Rc<ElementType> {
    define_element(
        "text-input",
        [
            ("on_focus", Hook::bubbled(vitrine_dom::FOCUS)),
            ("on_blur", Hook::bubbled(vitrine_dom::BLUR)),
            ("on_select", Hook::bubbled(vitrine_dom::SELECT)),
            ("value", fields::value()),
            ("selection", fields::selection()),
            ("focused", fields::focused()),
            ("placeholder", Hook::attribute("placeholder")),
        ],
    )
}

fn build_shell_window() -> Rc<ElementType> {
    define_element(
        "shell-window",
        [
            ("on_update_available", events::on_chrome_notice("update-available")),
            (
                "on_shutdown_requested",
                events::on_chrome_notice("shutdown-requested"),
            ),
            ("title", fields::window_title()),
            ("drag_region", fields::drag_region()),
        ],
    )
}
