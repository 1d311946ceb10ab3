#![forbid(unsafe_code)]

//! Draggable elements: start listeners, detection, and the drag session.
//!
//! [`Draggable::attach`] binds non-passive `mousedown` and `touchstart`
//! listeners on one element. Every start runs a [`MovementDetector`]; a drag
//! opens a tracking session that moves the element (or feeds a custom move
//! callback) until release, and anything else is reported as an activation
//! with its [`RejectReason`].
//!
//! The start listeners hold the binding alive. Dropping the [`Draggable`]
//! handle does not detach it; call [`Draggable::detach`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tapdrag_core::{
    CoordinateError, DetectorConfig, EventKind, GestureKind, InputEvent, MouseButton, NodeId,
    PointerSample, extract_page,
};

use crate::detector::{
    DetectError, Detection, DetectionError, DetectionOutcome, DragDetected, MovementDetector, RejectReason,
};
use crate::drag_action::{DragAction, DragActionError};
use crate::listener::{EventTarget, Listener, ListenerEvent, ListenerOptions};
use crate::page::{Page, WeakPage};
use crate::session::{GestureCallback, SessionError, SessionHandle, TrackingOptions, TrackingSession};

/// Per-element configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraggableOptions {
    pub detector: DetectorConfig,
    /// Move the closest ancestor matching this selector instead of the
    /// element the gesture started on.
    pub selector: Option<String>,
    /// Fixed pointer-to-`left`/`top` offset; measured per drag when `None`.
    pub offset: Option<PointerSample>,
}

impl DraggableOptions {
    #[must_use]
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: PointerSample) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A finished drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEnd {
    pub gesture: GestureKind,
    /// Page-frame sample at gesture start.
    pub start: PointerSample,
    /// Last page-frame sample seen before release.
    pub position: PointerSample,
}

/// Failures surfaced while handling a gesture on a draggable.
#[derive(Debug, Clone, PartialEq)]
pub enum DraggableError {
    Detect(DetectError),
    /// A move or end event could not be sampled during detection.
    Malformed(CoordinateError),
    /// The default drag action could not be bound.
    Bind(DragActionError),
    Session(SessionError),
}

impl core::fmt::Display for DraggableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Detect(err) => write!(f, "detection failed to start: {err}"),
            Self::Malformed(err) => write!(f, "malformed input during detection: {err}"),
            Self::Bind(err) => write!(f, "drag action unavailable: {err}"),
            Self::Session(err) => write!(f, "drag session failed to start: {err}"),
        }
    }
}

impl std::error::Error for DraggableError {}

type ActivateCallback = Box<dyn FnMut(RejectReason)>;
type DragStartCallback = Box<dyn FnMut(DragDetected)>;
type DropCallback = Box<dyn FnMut(DragEnd)>;
type ErrorCallback = Box<dyn FnMut(&DraggableError)>;

/// Callbacks for the outcomes of gestures on a draggable.
#[derive(Default)]
pub struct DraggableCallbacks {
    on_activate: Option<ActivateCallback>,
    on_drag_start: Option<DragStartCallback>,
    on_move: Option<GestureCallback>,
    on_drop: Option<DropCallback>,
    on_error: Option<ErrorCallback>,
}

impl core::fmt::Debug for DraggableCallbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DraggableCallbacks")
            .field("on_activate", &self.on_activate.is_some())
            .field("on_drag_start", &self.on_drag_start.is_some())
            .field("on_move", &self.on_move.is_some())
            .field("on_drop", &self.on_drop.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl DraggableCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gesture ended without becoming a drag (a tap or a long press).
    #[must_use]
    pub fn on_activate(mut self, callback: impl FnMut(RejectReason) + 'static) -> Self {
        self.on_activate = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_drag_start(mut self, callback: impl FnMut(DragDetected) + 'static) -> Self {
        self.on_drag_start = Some(Box::new(callback));
        self
    }

    /// Replace the default drag action with `callback`.
    #[must_use]
    pub fn on_move(mut self, callback: impl FnMut(&ListenerEvent<'_>) + 'static) -> Self {
        self.on_move = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_drop(mut self, callback: impl FnMut(DragEnd) + 'static) -> Self {
        self.on_drop = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: impl FnMut(&DraggableError) + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

struct Inner {
    page: WeakPage,
    node: NodeId,
    options: DraggableOptions,
    detector: MovementDetector,
    callbacks: RefCell<DraggableCallbacks>,
    attached: Cell<bool>,
    /// Detections still deciding between tap and drag.
    pending: RefCell<Vec<Detection>>,
    /// Open drag sessions, one per dragging pointer.
    drags: RefCell<Vec<SessionHandle>>,
}

impl Inner {
    fn with_callbacks(&self, f: impl FnOnce(&mut DraggableCallbacks)) {
        match self.callbacks.try_borrow_mut() {
            Ok(mut callbacks) => f(&mut callbacks),
            Err(_) => tracing::debug!(node = self.node.0, "re-entrant draggable callback skipped"),
        }
    }

    fn report(&self, err: DraggableError) {
        tracing::warn!(node = self.node.0, error = %err, "draggable gesture failed");
        self.with_callbacks(|c| {
            if let Some(on_error) = c.on_error.as_mut() {
                on_error(&err);
            }
        });
    }

    fn has_custom_move(&self) -> bool {
        self.callbacks
            .try_borrow()
            .is_ok_and(|c| c.on_move.is_some())
    }
}

fn on_start(inner: &Rc<Inner>, event: &ListenerEvent<'_>) {
    if !inner.attached.get() {
        return;
    }
    let start = event.event();
    if !start.kind.is_touch() && start.button != MouseButton::Primary {
        tracing::trace!(node = inner.node.0, button = start.button.to_u8(), "non-primary press ignored");
        return;
    }
    let Some(page) = inner.page.upgrade() else {
        return;
    };

    let detection = match inner.detector.detect(&page, start) {
        Ok(detection) => detection,
        Err(DetectError::Session(SessionError::AlreadyTracking { .. })) => {
            tracing::debug!(node = inner.node.0, "pointer already tracked; start ignored");
            return;
        }
        Err(err) => {
            inner.report(DraggableError::Detect(err));
            return;
        }
    };

    {
        let mut pending = inner.pending.borrow_mut();
        pending.retain(|d| d.state().is_pending());
        pending.push(detection.clone());
    }
    let inner = Rc::clone(inner);
    let start_event = start.clone();
    detection.on_settled(move |outcome| on_detected(&inner, &start_event, outcome));
}

fn on_detected(inner: &Rc<Inner>, start_event: &InputEvent, outcome: DetectionOutcome) {
    if !inner.attached.get() {
        return;
    }
    match outcome {
        Ok(drag) => begin_drag(inner, start_event, drag),
        Err(DetectionError::Rejected(reason)) => {
            tracing::debug!(node = inner.node.0, reason = reason.name(), "draggable activated");
            inner.with_callbacks(|c| {
                if let Some(on_activate) = c.on_activate.as_mut() {
                    on_activate(reason);
                }
            });
        }
        Err(DetectionError::MalformedInput(err)) => inner.report(DraggableError::Malformed(err)),
    }
}

fn begin_drag(inner: &Rc<Inner>, start_event: &InputEvent, drag: DragDetected) {
    let Some(page) = inner.page.upgrade() else {
        return;
    };
    inner.with_callbacks(|c| {
        if let Some(on_drag_start) = c.on_drag_start.as_mut() {
            on_drag_start(drag);
        }
    });

    let mut mover: GestureCallback = if inner.has_custom_move() {
        let custom = Rc::clone(inner);
        Box::new(move |event| {
            custom.with_callbacks(|c| {
                if let Some(on_move) = c.on_move.as_mut() {
                    on_move(event);
                }
            });
        })
    } else {
        let action = match DragAction::bind(
            &page,
            start_event,
            inner.options.selector.as_deref(),
            inner.options.offset,
        ) {
            Ok(action) => action,
            Err(err) => {
                inner.report(DraggableError::Bind(err));
                return;
            }
        };
        // The move that triggered detection was consumed by the detector.
        action.move_to(&page, drag.position);
        action.into_callback(page.downgrade())
    };

    let last = Rc::new(Cell::new(drag.position));
    let tracked = Rc::clone(&last);
    let ended = Rc::clone(inner);
    let options = TrackingOptions::new(start_event)
        .on_move(move |event| {
            if let Ok(position) = extract_page(event.event()) {
                tracked.set(position);
            }
            mover(event);
        })
        .on_end(move |_| {
            ended.drags.borrow_mut().retain(SessionHandle::is_open);
            let end = DragEnd {
                gesture: drag.gesture,
                start: drag.start,
                position: last.get(),
            };
            tracing::debug!(
                node = ended.node.0,
                x = end.position.x,
                y = end.position.y,
                "draggable dropped"
            );
            ended.with_callbacks(|c| {
                if let Some(on_drop) = c.on_drop.as_mut() {
                    on_drop(end);
                }
            });
        });

    match TrackingSession::start(&page, options) {
        Ok(session) => inner.drags.borrow_mut().push(session),
        Err(err) => inner.report(DraggableError::Session(err)),
    }
}

/// Handle to an element bound for tap/drag gestures.
pub struct Draggable {
    inner: Rc<Inner>,
    mouse_listener: Listener,
    touch_listener: Listener,
}

impl core::fmt::Debug for Draggable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Draggable")
            .field("node", &self.inner.node)
            .field("attached", &self.is_attached())
            .field("dragging", &self.is_dragging())
            .finish()
    }
}

impl Draggable {
    /// Bind gesture handling to `node`.
    pub fn attach(
        page: &Page,
        node: NodeId,
        options: DraggableOptions,
        callbacks: DraggableCallbacks,
    ) -> Self {
        let inner = Rc::new(Inner {
            page: page.downgrade(),
            node,
            detector: MovementDetector::new(options.detector),
            options,
            callbacks: RefCell::new(callbacks),
            attached: Cell::new(true),
            pending: RefCell::new(Vec::new()),
            drags: RefCell::new(Vec::new()),
        });

        let start_listener = || {
            let inner = Rc::clone(&inner);
            Listener::new(move |event| on_start(&inner, event))
        };
        let mouse_listener = start_listener();
        let touch_listener = start_listener();
        let target = EventTarget::Node(node);
        let non_passive = ListenerOptions::empty();
        page.add_listener(target, EventKind::MouseDown, mouse_listener.clone(), non_passive);
        page.add_listener(target, EventKind::TouchStart, touch_listener.clone(), non_passive);
        tracing::debug!(node = node.0, "draggable attached");

        Self {
            inner,
            mouse_listener,
            touch_listener,
        }
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    #[must_use]
    pub fn options(&self) -> &DraggableOptions {
        &self.inner.options
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.attached.get()
    }

    /// Whether a drag session is open for this element.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.inner
            .drags
            .try_borrow()
            .is_ok_and(|drags| drags.iter().any(SessionHandle::is_open))
    }

    /// Remove the start listeners, cancel pending detections and every open
    /// drag session. Returns `false` if already detached.
    pub fn detach(&self) -> bool {
        if !self.inner.attached.replace(false) {
            return false;
        }
        if let Some(page) = self.inner.page.upgrade() {
            let target = EventTarget::Node(self.inner.node);
            page.remove_listener(target, EventKind::MouseDown, &self.mouse_listener);
            page.remove_listener(target, EventKind::TouchStart, &self.touch_listener);
        }
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        for detection in pending {
            detection.cancel();
        }
        let drags = std::mem::take(&mut *self.inner.drags.borrow_mut());
        for drag in drags {
            drag.cancel();
        }
        tracing::debug!(node = self.inner.node.0, "draggable detached");
        true
    }
}
