//! Headless browsing session against the in-memory host document.
//!
//! Drives the same description/write cycle a real chrome frontend would:
//! each "frame" rewrites the shell description, then drains the deferral
//! queue the way a frame scheduler would between renders.

use std::rc::Rc;

use vitrine_dom::{
    Document, EventDetail, InMemorySurface, NavigationCommand, Surface, CHROME_SIGNAL,
};
use vitrine_driver::{mount, ElementDescription, Listener};
use vitrine_webview::{shell_window, text_input, web_view};

struct Frame {
    uri: String,
    navigation: Option<NavigationCommand>,
}

fn describe(frame: &Frame) -> ElementDescription {
    let location_listener = Listener::infallible(|event| {
        if let EventDetail::Text(uri) = &event.detail {
            println!("  location -> {uri}");
        }
    });
    let back_listener = Listener::infallible(|event| {
        if let EventDetail::Flag(flag) = event.detail {
            println!("  can go back -> {flag}");
        }
    });
    let update_listener = Listener::infallible(|_| println!("  runtime update available"));

    let mut view = web_view()
        .describe()
        .field("on_location_changed", location_listener)
        .field("on_history_back_changed", back_listener)
        .field("uri", frame.uri.as_str())
        .field("visible", true);
    if let Some(command) = frame.navigation {
        view = view.field("navigation", command);
    }

    shell_window()
        .describe()
        .field("title", format!("Vitrine - {}", frame.uri))
        .field("drag_region", true)
        .field("on_update_available", update_listener)
        .child(
            text_input()
                .describe()
                .field("value", frame.uri.as_str())
                .field("placeholder", "Search or enter address"),
        )
        .child(view)
}

fn main() {
    env_logger::init();

    println!("=== Vitrine Shell Demo ===");
    println!("Mounting the chrome, browsing two pages, then going back.");
    println!();

    let document = Document::new();
    document.set_surface_factory(|tag| {
        (tag == "webview").then(|| Rc::new(InMemorySurface::new()) as Rc<dyn Surface>)
    });

    let frames = [
        Frame {
            uri: "about:home".to_owned(),
            navigation: None,
        },
        Frame {
            uri: "https://example.org".to_owned(),
            navigation: None,
        },
        Frame {
            uri: "https://example.org".to_owned(),
            navigation: Some(NavigationCommand::GoBack),
        },
    ];

    let mut frames = frames.into_iter();
    let first = frames.next().expect("at least one frame");
    println!("frame 1: load {}", first.uri);
    let mut shell = mount(&document, document.root(), &describe(&first)).expect("mount shell");
    log::info!("shell mounted at {}", shell.node());
    document.run_deferred();

    for (index, frame) in frames.enumerate() {
        match frame.navigation {
            Some(command) => println!("frame {}: {command:?}", index + 2),
            None => println!("frame {}: load {}", index + 2, frame.uri),
        }
        shell.write(&describe(&frame)).expect("write shell");
        document.run_deferred();
    }

    println!();
    println!("simulating a runtime notice");
    document
        .emit(
            document.root(),
            CHROME_SIGNAL,
            EventDetail::Chrome {
                kind: "update-available".to_owned(),
                payload: String::new(),
            },
        )
        .expect("emit notice");

    println!();
    println!("window title: {}", document.window_title());
    println!("document tree:");
    print!("{}", document.dump_tree(None));
}
