#![forbid(unsafe_code)]

//! Core: input events, coordinate normalization, and gesture kinds.
//!
//! # Role in tapdrag
//! `tapdrag-core` is the input layer. It owns the canonical [`event::InputEvent`]
//! shape that hosts translate DOM mouse and touch events into, the
//! [`coords::extract`] step that reduces either family to one
//! [`coords::PointerSample`], and the thresholds that classify a gesture.
//!
//! # How it fits in the system
//! `tapdrag-web` consumes these types to run tracking sessions and movement
//! detection against a host-driven page. Nothing here touches listeners,
//! time, or layout.

pub mod coords;
pub mod event;
pub mod gesture;

pub use coords::{CoordinateError, CoordinateFrame, PointerSample, extract, extract_page};
pub use event::{EventKind, InputEvent, Modifiers, MouseButton, NodeId, TouchPoint};
pub use gesture::{DetectorConfig, DetectorConfigError, GestureKind, normalize_timeout_ms};
