#![forbid(unsafe_code)]

//! Tracking sessions: move/end listener bindings for one gesture.
//!
//! [`TrackingSession::start`] binds exactly one move listener and one end
//! listener of the starting event's family to the page's input root (not the
//! element, so the gesture keeps being tracked after the pointer leaves it),
//! plus a non-passive `touchstart` suppressor at document scope that stops
//! touch-driven scrolling from competing with the gesture.
//!
//! # Invariants
//!
//! 1. A session binds one move and one end listener of a single family.
//! 2. Teardown runs at most once, either from [`SessionHandle::cancel`] or
//!    when the end event fires (before the end callback runs).
//! 3. Teardown removes exactly the three listeners this session added, using
//!    the retained [`Listener`] values.
//! 4. At most one session tracks a given pointer per gesture kind.
//!
//! An open session keeps itself alive through its end listener until it ends
//! or is cancelled; dropping every [`SessionHandle`] does not unbind it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tapdrag_core::{CoordinateError, EventKind, GestureKind, InputEvent};

use crate::listener::{EventTarget, Listener, ListenerEvent, ListenerOptions};
use crate::page::{Page, SessionKey, WeakPage};

/// Callback invoked for move or end events of a session.
pub type GestureCallback = Box<dyn FnMut(&ListenerEvent<'_>)>;

/// Event kind the default-action suppressor listens to.
pub const SUPPRESSED_EVENT: EventKind = EventKind::TouchStart;

/// Errors from starting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The start event carries no pointer to track.
    Malformed(CoordinateError),
    /// Another open session already tracks this pointer.
    AlreadyTracking {
        gesture: GestureKind,
        pointer_id: u32,
    },
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed start event: {err}"),
            Self::AlreadyTracking {
                gesture,
                pointer_id,
            } => write!(
                f,
                "{} pointer {pointer_id} is already tracked by an open session",
                gesture.name()
            ),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::AlreadyTracking { .. } => None,
        }
    }
}

/// Session parameters: the start event and the two gesture callbacks.
pub struct TrackingOptions<'a> {
    start_event: &'a InputEvent,
    on_move: GestureCallback,
    on_end: GestureCallback,
}

impl core::fmt::Debug for TrackingOptions<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrackingOptions")
            .field("start_event", &self.start_event.kind)
            .finish_non_exhaustive()
    }
}

impl<'a> TrackingOptions<'a> {
    /// Options with no-op callbacks.
    #[must_use]
    pub fn new(start_event: &'a InputEvent) -> Self {
        Self {
            start_event,
            on_move: Box::new(|_| {}),
            on_end: Box::new(|_| {}),
        }
    }

    #[must_use]
    pub fn on_move(mut self, callback: impl FnMut(&ListenerEvent<'_>) + 'static) -> Self {
        self.on_move = Box::new(callback);
        self
    }

    #[must_use]
    pub fn on_end(mut self, callback: impl FnMut(&ListenerEvent<'_>) + 'static) -> Self {
        self.on_end = Box::new(callback);
        self
    }

    /// Replace the move callback with an already boxed one.
    #[must_use]
    pub fn on_move_boxed(mut self, callback: GestureCallback) -> Self {
        self.on_move = callback;
        self
    }
}

struct Bindings {
    move_listener: Listener,
    end_listener: Listener,
    suppressor: Listener,
}

struct SessionState {
    page: WeakPage,
    key: SessionKey,
    root: EventTarget,
    open: Cell<bool>,
    bindings: RefCell<Option<Bindings>>,
}

impl SessionState {
    fn teardown(&self, cause: &'static str) -> bool {
        if !self.open.replace(false) {
            return false;
        }
        let bindings = self.bindings.borrow_mut().take();
        if let Some(page) = self.page.upgrade() {
            if let Some(bindings) = &bindings {
                let gesture = self.key.gesture;
                page.remove_listener(self.root, gesture.move_event(), &bindings.move_listener);
                page.remove_listener(self.root, gesture.end_event(), &bindings.end_listener);
                page.remove_listener(EventTarget::Document, SUPPRESSED_EVENT, &bindings.suppressor);
            }
            page.release_session(self.key.serial);
        }
        tracing::debug!(
            session = self.key.serial,
            gesture = self.key.gesture.name(),
            pointer_id = self.key.pointer_id,
            cause,
            "tracking session closed"
        );
        true
    }
}

/// Entry point for opening tracking sessions.
#[derive(Debug, Clone, Copy)]
pub struct TrackingSession;

impl TrackingSession {
    /// Bind move/end listeners for the gesture begun by `options.start_event`.
    pub fn start(page: &Page, options: TrackingOptions<'_>) -> Result<SessionHandle, SessionError> {
        let TrackingOptions {
            start_event,
            on_move,
            on_end,
        } = options;
        let gesture = GestureKind::of(start_event.kind);
        let pointer_id = start_event
            .pointer_id()
            .ok_or(SessionError::Malformed(CoordinateError::NoActiveTouch {
                kind: start_event.kind,
            }))?;
        let key = page
            .claim_session(gesture, pointer_id)
            .ok_or(SessionError::AlreadyTracking {
                gesture,
                pointer_id,
            })?;

        let root = EventTarget::Node(page.input_root());
        let state = Rc::new(SessionState {
            page: page.downgrade(),
            key,
            root,
            open: Cell::new(true),
            bindings: RefCell::new(None),
        });

        let move_listener = {
            let on_move = RefCell::new(on_move);
            Listener::new(move |event| {
                if let Ok(mut callback) = on_move.try_borrow_mut() {
                    callback(event);
                }
            })
        };
        let end_listener = {
            let state = Rc::clone(&state);
            let on_end = RefCell::new(on_end);
            Listener::new(move |event| {
                state.teardown("end");
                if let Ok(mut callback) = on_end.try_borrow_mut() {
                    callback(event);
                }
            })
        };
        let suppressor = Listener::new(|event| event.prevent_default());

        let none = ListenerOptions::empty();
        page.add_listener(root, gesture.move_event(), move_listener.clone(), none);
        page.add_listener(root, gesture.end_event(), end_listener.clone(), none);
        page.add_listener(EventTarget::Document, SUPPRESSED_EVENT, suppressor.clone(), none);
        *state.bindings.borrow_mut() = Some(Bindings {
            move_listener,
            end_listener,
            suppressor,
        });

        tracing::debug!(
            session = key.serial,
            gesture = gesture.name(),
            pointer_id,
            "tracking session opened"
        );
        Ok(SessionHandle { state })
    }
}

/// Cancellation handle for one tracking session.
#[derive(Clone)]
pub struct SessionHandle {
    state: Rc<SessionState>,
}

impl core::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &self.state.key.serial)
            .field("gesture", &self.state.key.gesture)
            .field("open", &self.is_open())
            .finish()
    }
}

impl SessionHandle {
    /// Remove this session's listeners. Returns `false` if the session was
    /// already closed; calling it again is always safe.
    pub fn cancel(&self) -> bool {
        self.state.teardown("cancel")
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.open.get()
    }

    #[must_use]
    pub fn gesture(&self) -> GestureKind {
        self.state.key.gesture
    }

    #[must_use]
    pub fn pointer_id(&self) -> u32 {
        self.state.key.pointer_id
    }
}
