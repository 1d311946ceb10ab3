#![no_main]

use arbitrary::Arbitrary;
use core::time::Duration;
use libfuzzer_sys::fuzz_target;
use tapdrag_core::{DetectorConfig, EventKind, InputEvent, MouseButton, PointerSample, TouchPoint};
use tapdrag_web::{Draggable, DraggableCallbacks, DraggableOptions, Page, Position};

#[derive(Debug, Arbitrary)]
enum Step {
    Mouse { kind: u8, x: i16, y: i16, button: u8 },
    Touch { kind: u8, touches: Vec<(u8, i16, i16)> },
    Advance(u16),
    Detach,
}

#[derive(Debug, Arbitrary)]
struct Script {
    trigger: u8,
    timeout_ms: u16,
    steps: Vec<Step>,
}

fuzz_target!(|script: Script| {
    let Ok(config) = DetectorConfig::new(
        f64::from(script.trigger.max(1)),
        Some(f64::from(script.timeout_ms)),
    ) else {
        return;
    };
    let page = Page::new();
    let Ok(card) = (|| {
        let mut doc = page.document_mut();
        let root = doc.root();
        let card = doc.append(root, "div")?;
        doc.set_position(card, Position::Absolute)?;
        doc.set_left_top(card, 0.0, 0.0)?;
        Ok::<_, tapdrag_web::DomError>(card)
    })() else {
        return;
    };
    let draggable = Draggable::attach(
        &page,
        card,
        DraggableOptions::default()
            .with_detector(config)
            .with_offset(PointerSample::ORIGIN),
        DraggableCallbacks::new(),
    );

    for step in script.steps.into_iter().take(256) {
        match step {
            Step::Mouse { kind, x, y, button } => {
                let kind = [EventKind::MouseDown, EventKind::MouseMove, EventKind::MouseUp]
                    [usize::from(kind % 3)];
                let event = InputEvent::mouse(kind, f64::from(x), f64::from(y))
                    .with_target(card)
                    .with_button(MouseButton::from_u8(button % 4));
                page.dispatch(&event);
            }
            Step::Touch { kind, touches } => {
                let kind = [EventKind::TouchStart, EventKind::TouchMove, EventKind::TouchEnd]
                    [usize::from(kind % 3)];
                let touches = touches
                    .into_iter()
                    .take(4)
                    .map(|(id, x, y)| TouchPoint::at(u32::from(id % 3), f64::from(x), f64::from(y)))
                    .collect();
                page.dispatch(&InputEvent::touches(kind, touches).with_target(card));
            }
            Step::Advance(ms) => page.advance(Duration::from_millis(u64::from(ms))),
            Step::Detach => {
                draggable.detach();
            }
        }
        // Two start listeners plus three per open session: one mouse
        // session and one per distinct touch identifier.
        assert!(page.active_sessions() <= 4);
        assert!(page.listener_count() <= 2 + 3 * page.active_sessions());
    }

    draggable.detach();
    assert!(!draggable.is_attached());
    assert!(!draggable.is_dragging());
    assert_eq!(page.active_sessions(), 0);
    assert_eq!(page.listener_count(), 0);
    assert_eq!(page.pending_timers(), 0);
});
