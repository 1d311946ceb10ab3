#![forbid(unsafe_code)]

//! Canonical input events for pointer and touch gestures.
//!
//! The host translates DOM `MouseEvent` / `TouchEvent` values into
//! [`InputEvent`] before handing them to the gesture engine. Coordinates are
//! carried for every frame the platform reports, so downstream code can pick
//! a frame without re-reading the platform event.

use bitflags::bitflags;

use crate::coords::PointerSample;

/// Identifier of an element node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Raw index of the node.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

/// Input event kinds consumed by the gesture engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EventKind {
    MouseDown,
    MouseMove,
    MouseUp,
    TouchStart,
    TouchMove,
    TouchEnd,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::MouseDown,
        Self::MouseMove,
        Self::MouseUp,
        Self::TouchStart,
        Self::TouchMove,
        Self::TouchEnd,
    ];

    /// DOM event type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MouseDown => "mousedown",
            Self::MouseMove => "mousemove",
            Self::MouseUp => "mouseup",
            Self::TouchStart => "touchstart",
            Self::TouchMove => "touchmove",
            Self::TouchEnd => "touchend",
        }
    }

    /// Parse a DOM event type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this kind belongs to the touch family.
    #[inline]
    #[must_use]
    pub const fn is_touch(self) -> bool {
        matches!(self, Self::TouchStart | Self::TouchMove | Self::TouchEnd)
    }

    /// Whether this kind begins a gesture.
    #[inline]
    #[must_use]
    pub const fn is_start(self) -> bool {
        matches!(self, Self::MouseDown | Self::TouchStart)
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mouse button that changed state (DOM `MouseEvent.button`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButton {
    #[default]
    Primary,
    Auxiliary,
    Secondary,
    Other(u8),
}

impl MouseButton {
    #[must_use]
    pub const fn from_u8(n: u8) -> Self {
        match n {
            0 => Self::Primary,
            1 => Self::Auxiliary,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Auxiliary => 1,
            Self::Secondary => 2,
            Self::Other(n) => n,
        }
    }
}

/// One active touch contact.
///
/// DOM `Touch` objects report client and page coordinates; there is no
/// element-relative offset frame for a touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub identifier: u32,
    pub client: PointerSample,
    pub page: PointerSample,
}

impl TouchPoint {
    /// Touch whose client and page frames coincide (unscrolled page).
    #[must_use]
    pub const fn at(identifier: u32, x: f64, y: f64) -> Self {
        Self {
            identifier,
            client: PointerSample::new(x, y),
            page: PointerSample::new(x, y),
        }
    }
}

/// Normalized input event.
///
/// For touch-family events the event-level coordinate fields are unused by
/// the engine; positions come from [`InputEvent::touches`].
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub kind: EventKind,
    /// Element the platform dispatched the event at, if any.
    pub target: Option<NodeId>,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    pub client: PointerSample,
    pub page: PointerSample,
    pub offset: PointerSample,
    /// Active touches (DOM `TouchEvent.touches`), first entry is the primary.
    pub touches: Vec<TouchPoint>,
}

impl InputEvent {
    /// Mouse event whose client, page and offset frames coincide.
    #[must_use]
    pub fn mouse(kind: EventKind, x: f64, y: f64) -> Self {
        let sample = PointerSample::new(x, y);
        Self {
            kind,
            target: None,
            button: MouseButton::Primary,
            modifiers: Modifiers::empty(),
            client: sample,
            page: sample,
            offset: sample,
            touches: Vec::new(),
        }
    }

    /// Touch event with a single active touch (identifier `0`).
    #[must_use]
    pub fn touch(kind: EventKind, x: f64, y: f64) -> Self {
        Self::touches(kind, vec![TouchPoint::at(0, x, y)])
    }

    /// Touch event with an explicit active-touch list.
    #[must_use]
    pub fn touches(kind: EventKind, touches: Vec<TouchPoint>) -> Self {
        Self {
            kind,
            target: None,
            button: MouseButton::Primary,
            modifiers: Modifiers::empty(),
            client: PointerSample::ORIGIN,
            page: PointerSample::ORIGIN,
            offset: PointerSample::ORIGIN,
            touches,
        }
    }

    /// Set the dispatch target.
    #[must_use]
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the mouse button.
    #[must_use]
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    /// Identifier of the pointer driving this event.
    ///
    /// Mouse events always report `0`; touch events report the primary
    /// touch's identifier, or `None` when no touch is active.
    #[must_use]
    pub fn pointer_id(&self) -> Option<u32> {
        if self.kind.is_touch() {
            self.touches.first().map(|touch| touch.identifier)
        } else {
            Some(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("pointerdown"), None);
    }

    #[test]
    fn family_predicates() {
        assert!(EventKind::TouchMove.is_touch());
        assert!(!EventKind::MouseMove.is_touch());
        assert!(EventKind::MouseDown.is_start());
        assert!(EventKind::TouchStart.is_start());
        assert!(!EventKind::TouchEnd.is_start());
    }

    #[test]
    fn pointer_id_follows_primary_touch() {
        let mouse = InputEvent::mouse(EventKind::MouseDown, 1.0, 2.0);
        assert_eq!(mouse.pointer_id(), Some(0));

        let touch = InputEvent::touches(
            EventKind::TouchStart,
            vec![TouchPoint::at(7, 0.0, 0.0), TouchPoint::at(9, 5.0, 5.0)],
        );
        assert_eq!(touch.pointer_id(), Some(7));

        let empty = InputEvent::touches(EventKind::TouchEnd, Vec::new());
        assert_eq!(empty.pointer_id(), None);
    }

    #[test]
    fn mouse_button_codes() {
        for code in 0..6 {
            assert_eq!(MouseButton::from_u8(code).to_u8(), code);
        }
    }
}
