#![forbid(unsafe_code)]

//! Structured log events emitted by sessions, detection, and draggables.
//!
//! Run:
//!   cargo test -p tapdrag-web --test tracing_events

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use tapdrag_core::{EventKind, InputEvent, PointerSample};
use tapdrag_web::{
    Draggable, DraggableCallbacks, DraggableOptions, EventTarget, Listener, ListenerOptions, Page,
    Position, detect,
};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Tracing capture infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields,
        });
    }
}

fn with_captured_tracing<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    ensure_global_trace_level();
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::callsite::rebuild_interest_cache();
        f();
    });
    let captured = events.lock().unwrap().clone();
    captured
}

fn ensure_global_trace_level() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber =
            tracing_subscriber::registry().with(tracing_subscriber::filter::LevelFilter::TRACE);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn messages(events: &[CapturedEvent]) -> Vec<&str> {
    events
        .iter()
        .filter(|e| e.level <= tracing::Level::DEBUG)
        .map(|e| e.message.as_str())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn detection_logs_session_lifecycle_and_outcome() {
    let events = with_captured_tracing(|| {
        let page = Page::new();
        let detection = detect(
            &page,
            &InputEvent::mouse(EventKind::MouseDown, 0.0, 0.0),
            16.0,
            None,
        )
        .expect("detect");
        page.dispatch(&InputEvent::mouse(EventKind::MouseUp, 0.0, 0.0));
        assert!(detection.outcome().is_some());
    });

    assert_eq!(
        messages(&events),
        vec![
            "tracking session opened",
            "movement detection started",
            "tracking session closed",
            "movement detected: not a drag",
        ]
    );
    let closed = events
        .iter()
        .find(|e| e.message == "tracking session closed")
        .expect("close event");
    assert_eq!(closed.fields.get("cause").map(String::as_str), Some("end"));
    let outcome = events
        .iter()
        .find(|e| e.message == "movement detected: not a drag")
        .expect("outcome event");
    assert_eq!(outcome.fields.get("reason").map(String::as_str), Some("release"));
    assert_eq!(outcome.fields.get("gesture").map(String::as_str), Some("pointer"));
}

#[test]
fn malformed_touch_is_a_warning() {
    let events = with_captured_tracing(|| {
        let page = Page::new();
        let _detection = detect(
            &page,
            &InputEvent::touch(EventKind::TouchStart, 0.0, 0.0),
            16.0,
            None,
        )
        .expect("detect");
        page.dispatch(&InputEvent::touches(EventKind::TouchMove, Vec::new()));
    });

    let warning = events
        .iter()
        .find(|e| e.level == tracing::Level::WARN)
        .expect("warning");
    assert_eq!(warning.message, "movement detection aborted on malformed input");
    assert!(warning.fields.contains_key("error"));
}

#[test]
fn prevent_default_in_passive_listener_warns() {
    let events = with_captured_tracing(|| {
        let page = Page::new();
        page.add_listener(
            EventTarget::Document,
            EventKind::TouchStart,
            Listener::new(|event| event.prevent_default()),
            ListenerOptions::PASSIVE,
        );
        let outcome = page.dispatch(&InputEvent::touch(EventKind::TouchStart, 0.0, 0.0));
        assert!(!outcome.default_prevented);
    });

    assert!(events.iter().any(|e| e.level == tracing::Level::WARN));
}

#[test]
fn draggable_logs_drop_position() {
    let events = with_captured_tracing(|| {
        let page = Page::new();
        let card = {
            let mut doc = page.document_mut();
            let root = doc.root();
            let card = doc.append(root, "div").expect("append");
            doc.set_position(card, Position::Absolute).expect("position");
            card
        };
        let _draggable = Draggable::attach(
            &page,
            card,
            DraggableOptions::default().with_offset(PointerSample::ORIGIN),
            DraggableCallbacks::new(),
        );
        page.dispatch(&InputEvent::mouse(EventKind::MouseDown, 0.0, 0.0).with_target(card));
        page.dispatch(&InputEvent::mouse(EventKind::MouseMove, 30.0, 0.0));
        page.dispatch(&InputEvent::mouse(EventKind::MouseUp, 30.0, 0.0));
    });

    let dropped = events
        .iter()
        .find(|e| e.message == "draggable dropped")
        .expect("drop event");
    assert_eq!(dropped.fields.get("x").map(String::as_str), Some("30"));
    assert!(messages(&events).contains(&"draggable attached"));
}
