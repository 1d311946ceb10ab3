#![forbid(unsafe_code)]

//! Listener identity, options, and the per-target registry.
//!
//! A [`Listener`] is a reference-counted callback. Registration and removal
//! compare listeners by pointer identity: removing a structurally identical
//! but separately constructed callback is a silent no-op, exactly as on the
//! web platform. Whoever needs to remove a listener later must keep the
//! [`Listener`] value it registered.

use std::cell::Cell;
use std::rc::Rc;

use ahash::AHashMap;
use bitflags::bitflags;
use tapdrag_core::{EventKind, InputEvent, NodeId};

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// An element in the page's document.
    Node(NodeId),
    /// The document itself, above the root element.
    Document,
}

bitflags! {
    /// `addEventListener` options.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ListenerOptions: u8 {
        /// `preventDefault()` calls from this listener are ignored.
        const PASSIVE = 0b01;
        /// The listener is removed before its first invocation.
        const ONCE    = 0b10;
    }
}

/// Event view handed to listeners during dispatch.
#[derive(Debug)]
pub struct ListenerEvent<'a> {
    event: &'a InputEvent,
    current_target: EventTarget,
    passive: bool,
    default_prevented: &'a Cell<bool>,
    propagation_stopped: &'a Cell<bool>,
}

impl<'a> ListenerEvent<'a> {
    pub(crate) fn new(
        event: &'a InputEvent,
        current_target: EventTarget,
        passive: bool,
        default_prevented: &'a Cell<bool>,
        propagation_stopped: &'a Cell<bool>,
    ) -> Self {
        Self {
            event,
            current_target,
            passive,
            default_prevented,
            propagation_stopped,
        }
    }

    /// The dispatched input event.
    #[inline]
    #[must_use]
    pub const fn event(&self) -> &'a InputEvent {
        self.event
    }

    /// Target the running listener is attached to.
    #[inline]
    #[must_use]
    pub const fn current_target(&self) -> EventTarget {
        self.current_target
    }

    /// Suppress the platform's default action (scroll, selection, ...).
    ///
    /// Ignored inside passive listeners.
    pub fn prevent_default(&self) {
        if self.passive {
            tracing::warn!(
                event = self.event.kind.name(),
                "preventDefault ignored inside passive listener"
            );
            return;
        }
        self.default_prevented.set(true);
    }

    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop bubbling to further targets once the current target is done.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }
}

type Callback = dyn Fn(&ListenerEvent<'_>);

/// Reference-counted event callback compared by identity.
#[derive(Clone)]
pub struct Listener(Rc<Callback>);

impl Listener {
    pub fn new(callback: impl Fn(&ListenerEvent<'_>) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    /// Identity comparison; clones of one listener are the same listener.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn call(&self, event: &ListenerEvent<'_>) {
        (self.0)(event);
    }
}

impl core::fmt::Debug for Listener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Listener")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub(crate) serial: u64,
    pub(crate) listener: Listener,
    pub(crate) options: ListenerOptions,
}

/// Listener table keyed by target and event kind, in registration order.
#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    entries: AHashMap<(EventTarget, EventKind), Vec<Registration>>,
    next_serial: u64,
}

impl ListenerRegistry {
    /// Register `listener`; re-adding an already registered listener is a
    /// no-op returning `false`.
    pub(crate) fn add(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        listener: Listener,
        options: ListenerOptions,
    ) -> bool {
        let list = self.entries.entry((target, kind)).or_default();
        if list.iter().any(|r| r.listener.same(&listener)) {
            return false;
        }
        self.next_serial += 1;
        list.push(Registration {
            serial: self.next_serial,
            listener,
            options,
        });
        true
    }

    /// Remove `listener` by identity. Returns whether anything was removed.
    pub(crate) fn remove(&mut self, target: EventTarget, kind: EventKind, listener: &Listener) -> bool {
        self.retain_where(target, kind, |r| !r.listener.same(listener))
    }

    pub(crate) fn remove_serial(&mut self, target: EventTarget, kind: EventKind, serial: u64) -> bool {
        self.retain_where(target, kind, |r| r.serial != serial)
    }

    fn retain_where(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        keep: impl Fn(&Registration) -> bool,
    ) -> bool {
        let Some(list) = self.entries.get_mut(&(target, kind)) else {
            return false;
        };
        let before = list.len();
        list.retain(keep);
        let removed = list.len() != before;
        if list.is_empty() {
            self.entries.remove(&(target, kind));
        }
        removed
    }

    pub(crate) fn is_registered(&self, target: EventTarget, kind: EventKind, serial: u64) -> bool {
        self.entries
            .get(&(target, kind))
            .is_some_and(|list| list.iter().any(|r| r.serial == serial))
    }

    pub(crate) fn snapshot(&self, target: EventTarget, kind: EventKind) -> Vec<Registration> {
        self.entries
            .get(&(target, kind))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, target: EventTarget, kind: EventKind) -> usize {
        self.entries.get(&(target, kind)).map_or(0, Vec::len)
    }

    pub(crate) fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub(crate) fn contains(&self, target: EventTarget, kind: EventKind, listener: &Listener) -> bool {
        self.entries
            .get(&(target, kind))
            .is_some_and(|list| list.iter().any(|r| r.listener.same(listener)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Listener::new(|_| {})
    }

    #[test]
    fn removal_is_by_identity() {
        let mut registry = ListenerRegistry::default();
        let original = noop();
        let lookalike = noop();
        let target = EventTarget::Document;

        assert!(registry.add(target, EventKind::TouchMove, original.clone(), ListenerOptions::empty()));
        assert!(!registry.remove(target, EventKind::TouchMove, &lookalike));
        assert_eq!(registry.count(target, EventKind::TouchMove), 1);

        assert!(registry.remove(target, EventKind::TouchMove, &original.clone()));
        assert_eq!(registry.total(), 0);
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let mut registry = ListenerRegistry::default();
        let listener = noop();
        let target = EventTarget::Node(NodeId(0));
        assert!(registry.add(target, EventKind::MouseUp, listener.clone(), ListenerOptions::empty()));
        assert!(!registry.add(target, EventKind::MouseUp, listener.clone(), ListenerOptions::PASSIVE));
        assert_eq!(registry.count(target, EventKind::MouseUp), 1);
        // Same listener on another kind is a separate registration.
        assert!(registry.add(target, EventKind::MouseMove, listener, ListenerOptions::empty()));
        assert_eq!(registry.total(), 2);
    }

    #[test]
    fn serials_track_reregistration() {
        let mut registry = ListenerRegistry::default();
        let listener = noop();
        let target = EventTarget::Document;
        registry.add(target, EventKind::MouseUp, listener.clone(), ListenerOptions::empty());
        let first = registry.snapshot(target, EventKind::MouseUp)[0].serial;
        registry.remove(target, EventKind::MouseUp, &listener);
        registry.add(target, EventKind::MouseUp, listener, ListenerOptions::empty());
        assert!(!registry.is_registered(target, EventKind::MouseUp, first));
    }
}
