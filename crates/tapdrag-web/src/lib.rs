#![forbid(unsafe_code)]

//! `tapdrag-web` tells taps from drags on a host-driven page.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment dispatches input events
//!   into a [`Page`] and advances its clock explicitly.
//! - **Deterministic time**: timers fire only from [`Page::advance`], so any
//!   gesture can be replayed exactly.
//! - **No blocking / no threads**: everything is `Rc`-based and
//!   single-threaded, suitable for `wasm32-unknown-unknown`.
//!
//! Layers, bottom up:
//! - [`session`]: a [`TrackingSession`] binds one move and one end listener
//!   for a gesture and tears itself down exactly once.
//! - [`detector`]: a [`MovementDetector`] classifies a fresh gesture as a
//!   drag, or rejects it on release or timeout.
//! - [`drag_action`]: the default move handler that keeps an element under
//!   the pointer.
//! - [`draggable`]: [`Draggable`] wires the three onto an element.

pub mod detector;
pub mod dom;
pub mod drag_action;
pub mod draggable;
#[cfg(feature = "input-parser")]
pub mod input_parser;
pub mod listener;
pub mod page;
pub mod selector;
pub mod session;
pub mod timer;

pub use detector::{
    DetectError, Detection, DetectionError, DetectionOutcome, DetectionState, DragDetected,
    MovementDetector, RejectReason, detect,
};
pub use dom::{Document, DomError, Position};
pub use drag_action::{DragAction, DragActionError, make_drag_handler};
pub use draggable::{Draggable, DraggableCallbacks, DraggableError, DraggableOptions, DragEnd};
pub use listener::{EventTarget, Listener, ListenerEvent, ListenerOptions};
pub use page::{DispatchOutcome, Page, WeakPage};
pub use selector::{Selector, SelectorError};
pub use session::{
    GestureCallback, SUPPRESSED_EVENT, SessionError, SessionHandle, TrackingOptions,
    TrackingSession,
};
pub use timer::{DeterministicClock, TimerId};
