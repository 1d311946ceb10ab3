#![forbid(unsafe_code)]

//! Host-driven page: document, listener registry, and timers behind one
//! shared handle.
//!
//! The embedding environment pushes events with [`Page::dispatch`] and moves
//! time with [`Page::advance`]. Dispatch follows DOM bubbling order (target,
//! its ancestors, then the document) and re-checks registration before each
//! invocation, so a listener removed mid-dispatch is never called.
//!
//! `Page` is a cheap `Rc` handle. Listeners and timers usually capture a
//! [`WeakPage`] instead, which keeps the page from owning itself.

use core::time::Duration;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use tapdrag_core::{EventKind, GestureKind, InputEvent, NodeId};

use crate::dom::Document;
use crate::listener::{EventTarget, Listener, ListenerEvent, ListenerOptions, ListenerRegistry};
use crate::timer::{TimerId, TimerQueue};

/// Result of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Some non-passive listener called `prevent_default`; the host must skip
    /// the platform default action (scroll, selection, ...).
    pub default_prevented: bool,
    /// Listeners that ran.
    pub listeners_invoked: usize,
}

/// One live tracking session, as seen by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionKey {
    pub(crate) serial: u64,
    pub(crate) gesture: GestureKind,
    pub(crate) pointer_id: u32,
}

struct PageInner {
    document: RefCell<Document>,
    listeners: RefCell<ListenerRegistry>,
    timers: RefCell<TimerQueue>,
    sessions: RefCell<Vec<SessionKey>>,
    next_session: Cell<u64>,
}

/// Shared handle to a host-driven page.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

impl core::fmt::Debug for Page {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Page")
            .field("now", &self.now())
            .field("listeners", &self.listener_count())
            .field("pending_timers", &self.pending_timers())
            .field("active_sessions", &self.inner.sessions.borrow().len())
            .finish()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// Create a page with an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    #[must_use]
    pub fn with_document(document: Document) -> Self {
        Self {
            inner: Rc::new(PageInner {
                document: RefCell::new(document),
                listeners: RefCell::new(ListenerRegistry::default()),
                timers: RefCell::new(TimerQueue::new()),
                sessions: RefCell::new(Vec::new()),
                next_session: Cell::new(1),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakPage {
        WeakPage(Rc::downgrade(&self.inner))
    }

    /// Borrow the document.
    ///
    /// # Panics
    ///
    /// Panics if the document is mutably borrowed.
    #[must_use]
    pub fn document(&self) -> Ref<'_, Document> {
        self.inner.document.borrow()
    }

    /// Mutably borrow the document.
    ///
    /// # Panics
    ///
    /// Panics if the document is already borrowed.
    #[must_use]
    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.inner.document.borrow_mut()
    }

    /// The shared input root that tracking sessions bind to.
    #[must_use]
    pub fn input_root(&self) -> NodeId {
        self.document().root()
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// `addEventListener`. Adding the same listener twice is a no-op.
    pub fn add_listener(
        &self,
        target: EventTarget,
        kind: EventKind,
        listener: Listener,
        options: ListenerOptions,
    ) -> bool {
        self.inner
            .listeners
            .borrow_mut()
            .add(target, kind, listener, options)
    }

    /// `removeEventListener`, by listener identity.
    pub fn remove_listener(&self, target: EventTarget, kind: EventKind, listener: &Listener) -> bool {
        self.inner
            .listeners
            .borrow_mut()
            .remove(target, kind, listener)
    }

    #[must_use]
    pub fn has_listener(&self, target: EventTarget, kind: EventKind, listener: &Listener) -> bool {
        self.inner
            .listeners
            .borrow()
            .contains(target, kind, listener)
    }

    /// Listeners registered for `kind` on `target`.
    #[must_use]
    pub fn listeners_for(&self, target: EventTarget, kind: EventKind) -> usize {
        self.inner.listeners.borrow().count(target, kind)
    }

    /// All registered listeners on the page.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().total()
    }

    fn propagation_path(&self, target: Option<NodeId>) -> Vec<EventTarget> {
        let document = self.document();
        let start = target
            .filter(|&node| document.contains(node))
            .unwrap_or(document.root());
        std::iter::once(start)
            .chain(document.ancestors(start))
            .map(EventTarget::Node)
            .chain(std::iter::once(EventTarget::Document))
            .collect()
    }

    /// Dispatch `event` through the bubbling path.
    pub fn dispatch(&self, event: &InputEvent) -> DispatchOutcome {
        let default_prevented = Cell::new(false);
        let propagation_stopped = Cell::new(false);
        let mut invoked = 0;

        for target in self.propagation_path(event.target) {
            let snapshot = self.inner.listeners.borrow().snapshot(target, event.kind);
            for registration in snapshot {
                {
                    let mut listeners = self.inner.listeners.borrow_mut();
                    if !listeners.is_registered(target, event.kind, registration.serial) {
                        continue;
                    }
                    if registration.options.contains(ListenerOptions::ONCE) {
                        listeners.remove_serial(target, event.kind, registration.serial);
                    }
                }
                let view = ListenerEvent::new(
                    event,
                    target,
                    registration.options.contains(ListenerOptions::PASSIVE),
                    &default_prevented,
                    &propagation_stopped,
                );
                registration.listener.call(&view);
                invoked += 1;
            }
            if propagation_stopped.get() {
                break;
            }
        }

        tracing::trace!(
            event = event.kind.name(),
            listeners = invoked,
            default_prevented = default_prevented.get(),
            "dispatch"
        );
        DispatchOutcome {
            default_prevented: default_prevented.get(),
            listeners_invoked: invoked,
        }
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Current monotonic page time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.timers.borrow().now()
    }

    /// `setTimeout`.
    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        self.inner
            .timers
            .borrow_mut()
            .schedule(delay, Box::new(callback))
    }

    /// `clearTimeout`. Returns whether the timer was still pending.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.inner.timers.borrow_mut().clear(id)
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().pending()
    }

    /// Advance page time by `dt`, running every timer that falls due, in
    /// order, with the clock set to each timer's due time.
    pub fn advance(&self, dt: Duration) {
        let deadline = self.now().saturating_add(dt);
        loop {
            let next = self.inner.timers.borrow_mut().pop_due(deadline);
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
        self.inner.timers.borrow_mut().settle_at(deadline);
    }

    // -----------------------------------------------------------------------
    // Session bookkeeping
    // -----------------------------------------------------------------------

    /// Register a live session unless one is already tracking the same
    /// pointer for the same gesture kind.
    pub(crate) fn claim_session(&self, gesture: GestureKind, pointer_id: u32) -> Option<SessionKey> {
        let mut sessions = self.inner.sessions.borrow_mut();
        if sessions
            .iter()
            .any(|s| s.gesture == gesture && s.pointer_id == pointer_id)
        {
            return None;
        }
        let serial = self.inner.next_session.get();
        self.inner.next_session.set(serial + 1);
        let key = SessionKey {
            serial,
            gesture,
            pointer_id,
        };
        sessions.push(key);
        Some(key)
    }

    pub(crate) fn release_session(&self, serial: u64) {
        self.inner
            .sessions
            .borrow_mut()
            .retain(|s| s.serial != serial);
    }

    /// Tracking sessions currently open on this page.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.borrow().len()
    }
}

/// Non-owning page handle for listeners and timers.
#[derive(Clone, Debug)]
pub struct WeakPage(Weak<PageInner>);

impl WeakPage {
    #[must_use]
    pub fn upgrade(&self) -> Option<Page> {
        self.0.upgrade().map(|inner| Page { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Listener {
        let log = Rc::clone(log);
        Listener::new(move |_| log.borrow_mut().push(label))
    }

    #[test]
    fn dispatch_bubbles_from_target_to_document() {
        let page = Page::new();
        let root = page.input_root();
        let child = page.document_mut().append(root, "div").expect("append");
        let log = Rc::new(RefCell::new(Vec::new()));
        let none = ListenerOptions::empty();
        page.add_listener(EventTarget::Document, EventKind::MouseDown, recorder(&log, "document"), none);
        page.add_listener(EventTarget::Node(root), EventKind::MouseDown, recorder(&log, "root"), none);
        page.add_listener(EventTarget::Node(child), EventKind::MouseDown, recorder(&log, "child"), none);

        let event = InputEvent::mouse(EventKind::MouseDown, 0.0, 0.0).with_target(child);
        let outcome = page.dispatch(&event);
        assert_eq!(outcome.listeners_invoked, 3);
        assert_eq!(*log.borrow(), vec!["child", "root", "document"]);
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let page = Page::new();
        let root = EventTarget::Node(page.input_root());
        let log = Rc::new(RefCell::new(Vec::new()));
        let second = recorder(&log, "second");
        let weak = page.downgrade();
        let victim = second.clone();
        let first = Listener::new(move |_| {
            if let Some(page) = weak.upgrade() {
                page.remove_listener(root, EventKind::MouseMove, &victim);
            }
        });
        page.add_listener(root, EventKind::MouseMove, first, ListenerOptions::empty());
        page.add_listener(root, EventKind::MouseMove, second, ListenerOptions::empty());

        let outcome = page.dispatch(&InputEvent::mouse(EventKind::MouseMove, 1.0, 1.0));
        assert_eq!(outcome.listeners_invoked, 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn passive_listener_cannot_prevent_default() {
        let page = Page::new();
        let prevent = Listener::new(|event| event.prevent_default());
        page.add_listener(
            EventTarget::Document,
            EventKind::TouchStart,
            prevent.clone(),
            ListenerOptions::PASSIVE,
        );
        let event = InputEvent::touch(EventKind::TouchStart, 0.0, 0.0);
        assert!(!page.dispatch(&event).default_prevented);

        page.remove_listener(EventTarget::Document, EventKind::TouchStart, &prevent);
        page.add_listener(EventTarget::Document, EventKind::TouchStart, prevent, ListenerOptions::empty());
        assert!(page.dispatch(&event).default_prevented);
    }

    #[test]
    fn once_listener_runs_once() {
        let page = Page::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        page.add_listener(
            EventTarget::Document,
            EventKind::MouseUp,
            recorder(&log, "once"),
            ListenerOptions::ONCE,
        );
        let event = InputEvent::mouse(EventKind::MouseUp, 0.0, 0.0);
        page.dispatch(&event);
        page.dispatch(&event);
        assert_eq!(*log.borrow(), vec!["once"]);
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn stop_propagation_halts_bubbling() {
        let page = Page::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let root = EventTarget::Node(page.input_root());
        page.add_listener(
            root,
            EventKind::MouseDown,
            Listener::new(|event| event.stop_propagation()),
            ListenerOptions::empty(),
        );
        page.add_listener(root, EventKind::MouseDown, recorder(&log, "sibling"), ListenerOptions::empty());
        page.add_listener(EventTarget::Document, EventKind::MouseDown, recorder(&log, "document"), ListenerOptions::empty());
        page.dispatch(&InputEvent::mouse(EventKind::MouseDown, 0.0, 0.0));
        assert_eq!(*log.borrow(), vec!["sibling"]);
    }

    #[test]
    fn advance_runs_due_timers_at_their_due_time() {
        let page = Page::new();
        let seen = Rc::new(Cell::new(Duration::ZERO));
        let weak = page.downgrade();
        let at = Rc::clone(&seen);
        page.set_timeout(Duration::from_millis(40), move || {
            if let Some(page) = weak.upgrade() {
                at.set(page.now());
            }
        });
        page.advance(Duration::from_millis(39));
        assert_eq!(seen.get(), Duration::ZERO);
        page.advance(Duration::from_millis(10));
        assert_eq!(seen.get(), Duration::from_millis(40));
        assert_eq!(page.now(), Duration::from_millis(49));
    }

    #[test]
    fn session_claims_are_exclusive_per_pointer() {
        let page = Page::new();
        let first = page.claim_session(GestureKind::Touch, 3).expect("first claim");
        assert!(page.claim_session(GestureKind::Touch, 3).is_none());
        assert!(page.claim_session(GestureKind::Touch, 4).is_some());
        assert!(page.claim_session(GestureKind::Pointer, 3).is_some());
        page.release_session(first.serial);
        assert!(page.claim_session(GestureKind::Touch, 3).is_some());
    }
}
