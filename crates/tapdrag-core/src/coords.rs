#![forbid(unsafe_code)]

//! Coordinate extraction across pointer and touch events.
//!
//! [`extract`] is the single normalization step between the two event
//! families: touch-family events read their first active touch, every other
//! event reads its own coordinates. Everything downstream works on
//! [`PointerSample`] only.
//!
//! # Failure Modes
//!
//! - A touch-family event with no active touch fails with
//!   [`CoordinateError::NoActiveTouch`] rather than producing NaN samples.
//! - Touches carry no element-relative frame, so [`CoordinateFrame::Offset`]
//!   on a touch event fails with [`CoordinateError::FrameUnavailable`].

use crate::event::{EventKind, InputEvent};

/// One normalized coordinate reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
}

impl PointerSample {
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Component-wise sum.
    #[inline]
    #[must_use]
    pub fn offset_by(self, delta: Self) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y)
    }

    /// Component-wise difference `self - other`.
    #[inline]
    #[must_use]
    pub fn delta_from(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Both components are finite.
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Coordinate frame to read from an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CoordinateFrame {
    /// Viewport-relative.
    #[default]
    Client,
    /// Document-relative.
    Page,
    /// Relative to the target element's padding edge.
    Offset,
}

impl CoordinateFrame {
    /// Parse a frame name, falling back to [`CoordinateFrame::Client`] for
    /// anything unrecognized.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "page" => Self::Page,
            "offset" => Self::Offset,
            _ => Self::Client,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Page => "page",
            Self::Offset => "offset",
        }
    }
}

/// Why a sample could not be read from an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateError {
    /// Touch-family event whose active-touch list is empty.
    NoActiveTouch { kind: EventKind },
    /// The requested frame does not exist for this event family.
    FrameUnavailable {
        kind: EventKind,
        frame: CoordinateFrame,
    },
}

impl core::fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoActiveTouch { kind } => write!(f, "{kind} event has no active touch"),
            Self::FrameUnavailable { kind, frame } => {
                write!(f, "{kind} event has no {} coordinates", frame.name())
            }
        }
    }
}

impl std::error::Error for CoordinateError {}

/// Read a sample from `event` in `frame`.
pub fn extract(event: &InputEvent, frame: CoordinateFrame) -> Result<PointerSample, CoordinateError> {
    if !event.kind.is_touch() {
        return Ok(match frame {
            CoordinateFrame::Client => event.client,
            CoordinateFrame::Page => event.page,
            CoordinateFrame::Offset => event.offset,
        });
    }

    let Some(touch) = event.touches.first() else {
        return Err(CoordinateError::NoActiveTouch { kind: event.kind });
    };
    match frame {
        CoordinateFrame::Client => Ok(touch.client),
        CoordinateFrame::Page => Ok(touch.page),
        CoordinateFrame::Offset => Err(CoordinateError::FrameUnavailable {
            kind: event.kind,
            frame,
        }),
    }
}

/// [`extract`] in the page frame, the frame used while dragging.
#[inline]
pub fn extract_page(event: &InputEvent) -> Result<PointerSample, CoordinateError> {
    extract(event, CoordinateFrame::Page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TouchPoint;
    use proptest::prelude::*;

    fn mouse_with_frames() -> InputEvent {
        let mut event = InputEvent::mouse(EventKind::MouseMove, 0.0, 0.0);
        event.client = PointerSample::new(1.0, 2.0);
        event.page = PointerSample::new(10.0, 20.0);
        event.offset = PointerSample::new(100.0, 200.0);
        event
    }

    #[test]
    fn mouse_reads_requested_frame() {
        let event = mouse_with_frames();
        assert_eq!(
            extract(&event, CoordinateFrame::Client),
            Ok(PointerSample::new(1.0, 2.0))
        );
        assert_eq!(extract_page(&event), Ok(PointerSample::new(10.0, 20.0)));
        assert_eq!(
            extract(&event, CoordinateFrame::Offset),
            Ok(PointerSample::new(100.0, 200.0))
        );
    }

    #[test]
    fn invalid_frame_name_falls_back_to_client() {
        let event = mouse_with_frames();
        let frame = CoordinateFrame::parse_lenient("screen");
        assert_eq!(frame, CoordinateFrame::Client);
        assert_eq!(extract(&event, frame), Ok(PointerSample::new(1.0, 2.0)));
        assert_eq!(CoordinateFrame::parse_lenient(" Page "), CoordinateFrame::Page);
        assert_eq!(CoordinateFrame::parse_lenient(""), CoordinateFrame::Client);
    }

    #[test]
    fn touch_uses_first_active_touch() {
        let first = TouchPoint {
            identifier: 3,
            client: PointerSample::new(5.0, 6.0),
            page: PointerSample::new(50.0, 60.0),
        };
        let event = InputEvent::touches(
            EventKind::TouchMove,
            vec![first, TouchPoint::at(4, 999.0, 999.0)],
        );
        assert_eq!(
            extract(&event, CoordinateFrame::Client),
            Ok(PointerSample::new(5.0, 6.0))
        );
        assert_eq!(extract_page(&event), Ok(PointerSample::new(50.0, 60.0)));
    }

    #[test]
    fn touch_ignores_event_level_coordinates() {
        let mut event = InputEvent::touch(EventKind::TouchStart, 7.0, 8.0);
        event.client = PointerSample::new(-1.0, -1.0);
        assert_eq!(
            extract(&event, CoordinateFrame::Client),
            Ok(PointerSample::new(7.0, 8.0))
        );
    }

    #[test]
    fn empty_touch_list_fails_loudly() {
        let event = InputEvent::touches(EventKind::TouchMove, Vec::new());
        assert_eq!(
            extract_page(&event),
            Err(CoordinateError::NoActiveTouch {
                kind: EventKind::TouchMove
            })
        );
    }

    #[test]
    fn touch_has_no_offset_frame() {
        let event = InputEvent::touch(EventKind::TouchStart, 1.0, 1.0);
        let err = extract(&event, CoordinateFrame::Offset).expect_err("offset is unavailable");
        assert_eq!(err.to_string(), "touchstart event has no offset coordinates");
    }

    #[test]
    fn distance_squared_is_euclidean() {
        let a = PointerSample::new(100.0, 100.0);
        assert_eq!(a.distance_squared(PointerSample::new(103.0, 104.0)), 25.0);
        assert_eq!(a.distance_squared(a), 0.0);
    }

    proptest! {
        #[test]
        fn single_touch_round_trips_any_coordinates(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6) {
            let event = InputEvent::touch(EventKind::TouchMove, x, y);
            prop_assert_eq!(extract_page(&event), Ok(PointerSample::new(x, y)));
            prop_assert_eq!(extract(&event, CoordinateFrame::Client), Ok(PointerSample::new(x, y)));
        }

        #[test]
        fn distance_squared_is_symmetric(
            ax in -1.0e4f64..1.0e4, ay in -1.0e4f64..1.0e4,
            bx in -1.0e4f64..1.0e4, by in -1.0e4f64..1.0e4,
        ) {
            let a = PointerSample::new(ax, ay);
            let b = PointerSample::new(bx, by);
            prop_assert_eq!(a.distance_squared(b), b.distance_squared(a));
            prop_assert!(a.distance_squared(b) >= 0.0);
        }
    }
}
