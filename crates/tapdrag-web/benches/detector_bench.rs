#![forbid(unsafe_code)]

use core::time::Duration;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tapdrag_core::{DetectorConfig, EventKind, InputEvent, NodeId, PointerSample};
use tapdrag_web::{Draggable, DraggableCallbacks, DraggableOptions, MovementDetector, Page, Position};

fn mouse(kind: EventKind, x: f64, y: f64) -> InputEvent {
    InputEvent::mouse(kind, x, y)
}

fn card_page() -> (Page, NodeId) {
    let page = Page::new();
    let card = {
        let mut doc = page.document_mut();
        let root = doc.root();
        let card = doc.append(root, "div").expect("append card");
        doc.set_position(card, Position::Absolute)
            .expect("position card");
        doc.set_left_top(card, 0.0, 0.0).expect("place card");
        card
    };
    (page, card)
}

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("tapdrag/detector");
    let detector = MovementDetector::new(DetectorConfig::default());

    group.bench_function("small_moves_32_then_release", |b| {
        let page = Page::new();
        b.iter(|| {
            let detection = detector
                .detect(&page, &mouse(EventKind::MouseDown, 100.0, 100.0))
                .expect("detect");
            for step in 0..32 {
                let jitter = f64::from(step % 5);
                page.dispatch(&mouse(EventKind::MouseMove, 100.0 + jitter, 100.0 - jitter));
            }
            page.dispatch(&mouse(EventKind::MouseUp, 100.0, 100.0));
            black_box(detection.outcome());
        });
    });

    group.bench_function("timeout", |b| {
        let page = Page::new();
        b.iter(|| {
            let detection = detector
                .detect(&page, &mouse(EventKind::MouseDown, 0.0, 0.0))
                .expect("detect");
            page.advance(Duration::from_millis(250));
            black_box(detection.outcome());
        });
    });

    group.finish();
}

fn bench_draggable(c: &mut Criterion) {
    let mut group = c.benchmark_group("tapdrag/draggable");

    group.bench_function("press_drag_120_drop", |b| {
        let (page, card) = card_page();
        let _draggable = Draggable::attach(
            &page,
            card,
            DraggableOptions::default().with_offset(PointerSample::ORIGIN),
            DraggableCallbacks::new(),
        );
        b.iter(|| {
            page.dispatch(&mouse(EventKind::MouseDown, 4.0, 4.0).with_target(card));
            for step in 0..120 {
                let x = 4.0 + f64::from(step) * 1.5;
                page.dispatch(&mouse(EventKind::MouseMove, x, 4.0).with_target(card));
            }
            page.dispatch(&mouse(EventKind::MouseUp, 184.0, 4.0).with_target(card));
            black_box(page.document().left_top(card));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_detection, bench_draggable);
criterion_main!(benches);
