use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vitrine_dom::{Document, EventDetail};
use vitrine_driver::{define_element, mount, ElementInstance, ElementType, EventHook, Hook, Listener};

const PANE_COUNT: usize = 32;
const LISTENER_SAMPLES: &[usize] = &[1, 4, 16, 64];

fn pane_type() -> Rc<ElementType> {
    define_element(
        "pane",
        [
            ("title", Hook::attribute("title")),
            ("on_ping", Hook::bubbled("ping")),
        ],
    )
}

struct StripFixture {
    strip: ElementInstance,
    pane: Rc<ElementType>,
    strip_type: Rc<ElementType>,
    generation: usize,
}

impl StripFixture {
    fn new(panes: usize) -> Self {
        let document = Document::new();
        let pane = pane_type();
        let strip_type = define_element("strip", []);
        let mut description = strip_type.describe();
        for index in 0..panes {
            description = description.child(
                pane.describe()
                    .field("title", format!("pane {index}"))
                    .field("on_ping", Listener::infallible(|_| {})),
            );
        }
        let strip = mount(&document, document.root(), &description).expect("mount");
        Self {
            strip,
            pane,
            strip_type,
            generation: 0,
        }
    }

    /// Rewrites every pane title; listener fields change identity each
    /// generation, so the swap path is exercised too.
    fn rewrite(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let mut description = self.strip_type.describe();
        for index in 0..PANE_COUNT {
            description = description.child(
                self.pane
                    .describe()
                    .field("title", format!("pane {index} gen {generation}"))
                    .field("on_ping", Listener::infallible(|_| {})),
            );
        }
        self.strip.write(&description).expect("write");
    }
}

fn bench_rewrite(c: &mut Criterion) {
    let mut fixture = StripFixture::new(PANE_COUNT);
    // Warm up so steady-state reconciliation is measured.
    fixture.rewrite();

    c.bench_function("strip_rewrite", |b| {
        b.iter(|| {
            fixture.rewrite();
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_dispatch");
    for &listeners in LISTENER_SAMPLES {
        group.bench_with_input(
            BenchmarkId::new("listeners", listeners),
            &listeners,
            |b, &listeners| {
                let document = Document::new();
                let node = document.create_element("pane");
                document.append_child(document.root(), node).expect("append");
                let hook = EventHook::bubbled("ping");
                let hits = Rc::new(Cell::new(0_usize));
                for _ in 0..listeners {
                    let hits = hits.clone();
                    hook.add_listener(
                        &document,
                        node,
                        Listener::infallible(move |_| hits.set(hits.get() + 1)),
                    )
                    .expect("add listener");
                }

                b.iter(|| {
                    document.emit(node, "ping", EventDetail::None).expect("emit");
                    black_box(hits.get());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(dispatch, bench_rewrite, bench_dispatch);
criterion_main!(dispatch);
