#![forbid(unsafe_code)]

//! Movement detection: classify a fresh gesture as drag or not-a-drag.
//!
//! [`MovementDetector::detect`] records the start sample, opens a private
//! [`TrackingSession`], and races three causes against each other:
//!
//! - **movement**: the first move whose squared displacement from the start
//!   exceeds the squared trigger distance resolves as [`DragDetected`];
//! - **release**: the end event rejects with [`RejectReason::Release`];
//! - **timeout**: if configured, the timer rejects with
//!   [`RejectReason::Timeout`].
//!
//! # Invariants
//!
//! 1. The outcome settles exactly once; every resolution path checks the
//!    pending state first.
//! 2. The private session is cancelled and the timer cleared before the
//!    outcome becomes observable.
//! 3. A move event that cannot be sampled settles the detection with
//!    [`DetectionError::MalformedInput`], never with a bogus sample.
//! 4. [`Detection::cancel`] tears down the same way but never settles; its
//!    continuations are dropped without running.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};
use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tapdrag_core::{
    CoordinateError, DetectorConfig, DetectorConfigError, GestureKind, InputEvent, PointerSample,
    extract_page,
};

use crate::listener::ListenerEvent;
use crate::page::{Page, WeakPage};
use crate::session::{SessionError, SessionHandle, TrackingOptions, TrackingSession};
use crate::timer::TimerId;

/// Why a gesture was classified as not-a-drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The gesture ended before the trigger distance was exceeded.
    Release,
    /// Neither movement nor release happened within the timeout.
    Timeout,
}

impl RejectReason {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Timeout => "timeout",
        }
    }
}

/// Positive detection result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragDetected {
    pub gesture: GestureKind,
    /// Page-frame sample of the start event.
    pub start: PointerSample,
    /// Page-frame sample of the move that crossed the threshold.
    pub position: PointerSample,
    /// Page time between detection start and resolution.
    pub elapsed: Duration,
}

/// Negative detection result: an expected rejection or a malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionError {
    /// Not a drag. Callers usually treat this as a tap/click.
    Rejected(RejectReason),
    /// An event during detection could not be sampled.
    MalformedInput(CoordinateError),
}

impl DetectionError {
    /// Rejection reason, if this is an expected not-a-drag outcome.
    #[must_use]
    pub const fn reason(self) -> Option<RejectReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            Self::MalformedInput(_) => None,
        }
    }

    #[must_use]
    pub const fn is_rejection(self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl core::fmt::Display for DetectionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "gesture rejected: {}", reason.name()),
            Self::MalformedInput(err) => write!(f, "malformed input during detection: {err}"),
        }
    }
}

impl std::error::Error for DetectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(_) => None,
            Self::MalformedInput(err) => Some(err),
        }
    }
}

/// Settled detection value.
pub type DetectionOutcome = Result<DragDetected, DetectionError>;

/// Errors that prevent detection from starting at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectError {
    Config(DetectorConfigError),
    /// The start event could not be sampled.
    Malformed(CoordinateError),
    Session(SessionError),
}

impl core::fmt::Display for DetectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid detector config: {err}"),
            Self::Malformed(err) => write!(f, "malformed start event: {err}"),
            Self::Session(err) => write!(f, "cannot track gesture: {err}"),
        }
    }
}

impl std::error::Error for DetectError {}

impl From<DetectorConfigError> for DetectError {
    fn from(err: DetectorConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<SessionError> for DetectError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

/// Observable state of a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionState {
    Pending,
    Resolved(DragDetected),
    Rejected(DetectionError),
    /// Torn down by [`Detection::cancel`] before it settled.
    Cancelled,
}

impl DetectionState {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<DetectionOutcome> {
        match *self {
            Self::Pending | Self::Cancelled => None,
            Self::Resolved(drag) => Some(Ok(drag)),
            Self::Rejected(err) => Some(Err(err)),
        }
    }
}

type Continuation = Box<dyn FnOnce(DetectionOutcome)>;

struct Shared {
    page: WeakPage,
    gesture: GestureKind,
    start: PointerSample,
    started_at: Duration,
    state: Cell<DetectionState>,
    session: RefCell<Option<SessionHandle>>,
    timer: Cell<Option<TimerId>>,
    continuations: RefCell<Vec<Continuation>>,
    waker: RefCell<Option<Waker>>,
}

impl Shared {
    fn teardown(&self) {
        let session = self.session.borrow_mut().take();
        if let Some(session) = session {
            session.cancel();
        }
        if let (Some(id), Some(page)) = (self.timer.take(), self.page.upgrade()) {
            page.clear_timeout(id);
        }
    }

    fn cancel(&self) -> bool {
        if !self.state.get().is_pending() {
            return false;
        }
        self.teardown();
        self.state.set(DetectionState::Cancelled);
        let dropped = std::mem::take(&mut *self.continuations.borrow_mut());
        drop(dropped);
        self.waker.borrow_mut().take();
        tracing::debug!(gesture = self.gesture.name(), "movement detection cancelled");
        true
    }

    fn settle(&self, outcome: DetectionOutcome) {
        if !self.state.get().is_pending() {
            return;
        }
        // Tear down before anything can observe the outcome.
        self.teardown();

        self.state.set(match outcome {
            Ok(drag) => DetectionState::Resolved(drag),
            Err(err) => DetectionState::Rejected(err),
        });
        match outcome {
            Ok(drag) => tracing::debug!(
                gesture = self.gesture.name(),
                x = drag.position.x,
                y = drag.position.y,
                "movement detected: drag"
            ),
            Err(DetectionError::Rejected(reason)) => tracing::debug!(
                gesture = self.gesture.name(),
                reason = reason.name(),
                "movement detected: not a drag"
            ),
            Err(DetectionError::MalformedInput(err)) => tracing::warn!(
                gesture = self.gesture.name(),
                error = %err,
                "movement detection aborted on malformed input"
            ),
        }

        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
        let continuations = std::mem::take(&mut *self.continuations.borrow_mut());
        for continuation in continuations {
            continuation(outcome);
        }
    }

    fn elapsed(&self) -> Duration {
        self.page
            .upgrade()
            .map_or(Duration::ZERO, |page| page.now().saturating_sub(self.started_at))
    }

    fn on_move(&self, event: &ListenerEvent<'_>, trigger_squared: f64) {
        if !self.state.get().is_pending() {
            return;
        }
        match extract_page(event.event()) {
            Ok(position) => {
                if position.distance_squared(self.start) > trigger_squared {
                    self.settle(Ok(DragDetected {
                        gesture: self.gesture,
                        start: self.start,
                        position,
                        elapsed: self.elapsed(),
                    }));
                }
            }
            Err(err) => self.settle(Err(DetectionError::MalformedInput(err))),
        }
    }
}

/// One-shot detection outcome.
///
/// Observe it with [`on_settled`](Self::on_settled), [`state`](Self::state),
/// or by awaiting it.
/// A cancelled detection never completes.
#[derive(Clone)]
pub struct Detection {
    shared: Rc<Shared>,
}

impl core::fmt::Debug for Detection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Detection")
            .field("gesture", &self.shared.gesture)
            .field("start", &self.shared.start)
            .field("state", &self.state())
            .finish()
    }
}

impl Detection {
    #[must_use]
    pub fn state(&self) -> DetectionState {
        self.shared.state.get()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<DetectionOutcome> {
        self.state().outcome()
    }

    #[must_use]
    pub fn gesture(&self) -> GestureKind {
        self.shared.gesture
    }

    /// Run `continuation` once the detection settles, or right away if it
    /// already has. Dropped unrun if the detection is cancelled.
    pub fn on_settled(&self, continuation: impl FnOnce(DetectionOutcome) + 'static) {
        match self.state() {
            DetectionState::Pending => self
                .shared
                .continuations
                .borrow_mut()
                .push(Box::new(continuation)),
            state => {
                if let Some(outcome) = state.outcome() {
                    continuation(outcome);
                }
            }
        }
    }

    /// Abort a pending detection: unbind its session and clear its timer
    /// without settling. Returns `false` if it had already settled or been
    /// cancelled.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Split continuation into drag and not-a-drag branches.
    pub fn then(
        &self,
        on_drag: impl FnOnce(DragDetected) + 'static,
        on_reject: impl FnOnce(DetectionError) + 'static,
    ) {
        self.on_settled(move |outcome| match outcome {
            Ok(drag) => on_drag(drag),
            Err(err) => on_reject(err),
        });
    }
}

impl Future for Detection {
    type Output = DetectionOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.outcome() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                *self.shared.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// Click-vs-drag classifier with fixed thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementDetector {
    config: DetectorConfig,
}

impl MovementDetector {
    #[must_use]
    pub const fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> DetectorConfig {
        self.config
    }

    /// Start classifying the gesture begun by `start_event`.
    pub fn detect(&self, page: &Page, start_event: &InputEvent) -> Result<Detection, DetectError> {
        let start = extract_page(start_event).map_err(DetectError::Malformed)?;
        let gesture = GestureKind::of(start_event.kind);
        let shared = Rc::new(Shared {
            page: page.downgrade(),
            gesture,
            start,
            started_at: page.now(),
            state: Cell::new(DetectionState::Pending),
            session: RefCell::new(None),
            timer: Cell::new(None),
            continuations: RefCell::new(Vec::new()),
            waker: RefCell::new(None),
        });

        let trigger_squared = self.config.trigger_distance_squared();
        let on_move = Rc::clone(&shared);
        let on_end = Rc::clone(&shared);
        let session = TrackingSession::start(
            page,
            TrackingOptions::new(start_event)
                .on_move(move |event| on_move.on_move(event, trigger_squared))
                .on_end(move |_| on_end.settle(Err(DetectionError::Rejected(RejectReason::Release)))),
        )?;
        *shared.session.borrow_mut() = Some(session);

        if let Some(timeout) = self.config.timeout() {
            let on_timeout = Rc::clone(&shared);
            let id = page.set_timeout(timeout, move || {
                on_timeout.timer.set(None);
                on_timeout.settle(Err(DetectionError::Rejected(RejectReason::Timeout)));
            });
            shared.timer.set(Some(id));
        }

        tracing::debug!(
            gesture = gesture.name(),
            x = start.x,
            y = start.y,
            trigger = self.config.trigger_distance(),
            timeout_ms = self
                .config
                .timeout()
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            "movement detection started"
        );
        Ok(Detection { shared })
    }
}

/// Classify the gesture begun by `start_event` with ad-hoc thresholds.
///
/// `timeout_ms` is normalized as described on
/// [`normalize_timeout_ms`](tapdrag_core::normalize_timeout_ms).
pub fn detect(
    page: &Page,
    start_event: &InputEvent,
    trigger_distance: f64,
    timeout_ms: Option<f64>,
) -> Result<Detection, DetectError> {
    let config = DetectorConfig::new(trigger_distance, timeout_ms)?;
    MovementDetector::new(config).detect(page, start_event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapdrag_core::EventKind;

    fn mouse(kind: EventKind, x: f64, y: f64) -> InputEvent {
        InputEvent::mouse(kind, x, y)
    }

    #[test]
    fn first_move_past_threshold_resolves_drag() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 100.0, 100.0);
        let detection = detect(&page, &start, 16.0, Some(0.0)).expect("detect");

        page.dispatch(&mouse(EventKind::MouseMove, 105.0, 100.0));
        page.dispatch(&mouse(EventKind::MouseMove, 112.0, 100.0));
        assert!(detection.state().is_pending());
        page.dispatch(&mouse(EventKind::MouseMove, 120.0, 100.0));

        let drag = detection
            .outcome()
            .expect("settled")
            .expect("drag expected");
        assert_eq!(drag.position, PointerSample::new(120.0, 100.0));
        assert_eq!(drag.start, PointerSample::new(100.0, 100.0));
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn exactly_trigger_distance_is_not_a_drag() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 0.0, 0.0);
        let detection = detect(&page, &start, 5.0, Some(0.0)).expect("detect");
        page.dispatch(&mouse(EventKind::MouseMove, 3.0, 4.0));
        assert!(detection.state().is_pending());
    }

    #[test]
    fn release_before_threshold_rejects() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 100.0, 100.0);
        let detection = detect(&page, &start, 16.0, Some(150.0)).expect("detect");
        page.advance(Duration::from_millis(50));
        page.dispatch(&mouse(EventKind::MouseUp, 100.0, 100.0));
        assert_eq!(
            detection.outcome(),
            Some(Err(DetectionError::Rejected(RejectReason::Release)))
        );
        assert_eq!(page.pending_timers(), 0);
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn timeout_rejects_after_deadline() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 100.0, 100.0);
        let detection = detect(&page, &start, 16.0, Some(150.0)).expect("detect");
        page.advance(Duration::from_millis(149));
        assert!(detection.state().is_pending());
        page.advance(Duration::from_millis(2));
        assert_eq!(
            detection.outcome(),
            Some(Err(DetectionError::Rejected(RejectReason::Timeout)))
        );
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn zero_timeout_never_fires() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 0.0, 0.0);
        let detection = detect(&page, &start, 16.0, Some(0.0)).expect("detect");
        assert_eq!(page.pending_timers(), 0);
        page.advance(Duration::from_secs(3600));
        assert!(detection.state().is_pending());
    }

    #[test]
    fn sub_millisecond_timeout_still_fires() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 0.0, 0.0);
        let detection = detect(&page, &start, 16.0, Some(0.4)).expect("detect");
        assert_eq!(page.pending_timers(), 1);
        page.advance(Duration::from_millis(1));
        assert_eq!(
            detection.outcome(),
            Some(Err(DetectionError::Rejected(RejectReason::Timeout)))
        );
    }

    #[test]
    fn cancel_unbinds_without_settling() {
        let page = Page::new();
        let start = InputEvent::touch(EventKind::TouchStart, 0.0, 0.0);
        let detection = detect(&page, &start, 16.0, Some(150.0)).expect("detect");
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        detection.on_settled(move |_| flag.set(true));

        assert!(detection.cancel());
        assert!(!detection.cancel());
        assert_eq!(detection.state(), DetectionState::Cancelled);
        assert_eq!(detection.outcome(), None);
        assert_eq!(page.listener_count(), 0);
        assert_eq!(page.pending_timers(), 0);
        assert_eq!(page.active_sessions(), 0);

        page.advance(Duration::from_secs(1));
        let late = Rc::clone(&ran);
        detection.on_settled(move |_| late.set(true));
        assert!(!ran.get());
        assert!(!page.dispatch(&InputEvent::touch(EventKind::TouchStart, 5.0, 5.0)).default_prevented);
    }

    #[test]
    fn continuation_sees_torn_down_session() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 0.0, 0.0);
        let detection = detect(&page, &start, 1.0, None).expect("detect");
        let observed = Rc::new(Cell::new(None));
        let weak = page.downgrade();
        let slot = Rc::clone(&observed);
        detection.on_settled(move |outcome| {
            let listeners = weak.upgrade().map(|page| page.listener_count());
            slot.set(Some((outcome.is_ok(), listeners)));
        });
        page.dispatch(&mouse(EventKind::MouseMove, 10.0, 0.0));
        assert_eq!(observed.get(), Some((true, Some(0))));
    }

    #[test]
    fn late_continuation_runs_immediately() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 0.0, 0.0);
        let detection = detect(&page, &start, 1.0, None).expect("detect");
        page.dispatch(&mouse(EventKind::MouseUp, 0.0, 0.0));
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        detection.then(|_| {}, move |err| flag.set(err.is_rejection()));
        assert!(ran.get());
    }

    #[test]
    fn malformed_touch_move_is_a_fault_not_a_rejection() {
        let page = Page::new();
        let start = InputEvent::touch(EventKind::TouchStart, 0.0, 0.0);
        let detection = detect(&page, &start, 16.0, None).expect("detect");
        page.dispatch(&InputEvent::touches(EventKind::TouchMove, Vec::new()));
        let err = detection
            .outcome()
            .expect("settled")
            .expect_err("malformed input");
        assert!(!err.is_rejection());
        assert_eq!(err.reason(), None);
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn invalid_trigger_distance_is_reported() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 0.0, 0.0);
        assert!(matches!(
            detect(&page, &start, 0.0, None),
            Err(DetectError::Config(_))
        ));
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn future_resolves_after_wake() {
        let page = Page::new();
        let start = mouse(EventKind::MouseDown, 0.0, 0.0);
        let mut detection = detect(&page, &start, 16.0, Some(10.0)).expect("detect");
        let mut cx = Context::from_waker(Waker::noop());
        assert!(Pin::new(&mut detection).poll(&mut cx).is_pending());
        page.advance(Duration::from_millis(10));
        assert_eq!(
            Pin::new(&mut detection).poll(&mut cx),
            Poll::Ready(Err(DetectionError::Rejected(RejectReason::Timeout)))
        );
    }
}
