#![forbid(unsafe_code)]

//! Gesture kinds and detector thresholds.
//!
//! A gesture is one press-to-release interaction. Its [`GestureKind`] is
//! fixed by the event that starts it and selects the move/end event pair a
//! tracking session listens for.
//!
//! # Invariants
//!
//! 1. [`GestureKind::move_event`] and [`GestureKind::end_event`] always belong
//!    to the same family as [`GestureKind::start_event`].
//! 2. A validated [`DetectorConfig`] has a finite, strictly positive trigger
//!    distance.
//! 3. [`normalize_timeout_ms`] never fails; it maps any input to either a
//!    non-zero duration or "no timeout".

use std::time::Duration;

use crate::event::EventKind;

/// Default movement-detection timeout in milliseconds.
pub const DEFAULT_DETECT_TIMEOUT_MS: u64 = 200;

/// Default trigger distance in pixels.
pub const DEFAULT_TRIGGER_DISTANCE: f64 = 16.0;

/// Event family a gesture was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GestureKind {
    Pointer,
    Touch,
}

impl GestureKind {
    /// Gesture kind for a starting event kind.
    #[must_use]
    pub const fn of(kind: EventKind) -> Self {
        if kind.is_touch() {
            Self::Touch
        } else {
            Self::Pointer
        }
    }

    #[must_use]
    pub const fn start_event(self) -> EventKind {
        match self {
            Self::Pointer => EventKind::MouseDown,
            Self::Touch => EventKind::TouchStart,
        }
    }

    #[must_use]
    pub const fn move_event(self) -> EventKind {
        match self {
            Self::Pointer => EventKind::MouseMove,
            Self::Touch => EventKind::TouchMove,
        }
    }

    #[must_use]
    pub const fn end_event(self) -> EventKind {
        match self {
            Self::Pointer => EventKind::MouseUp,
            Self::Touch => EventKind::TouchEnd,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pointer => "pointer",
            Self::Touch => "touch",
        }
    }
}

/// Normalize a caller-supplied timeout in milliseconds.
///
/// - `None`, NaN and infinities use [`DEFAULT_DETECT_TIMEOUT_MS`].
/// - Negative values use their absolute value.
/// - Zero disables the timeout; other values round to whole milliseconds,
///   never below 1 ms.
#[must_use]
pub fn normalize_timeout_ms(raw: Option<f64>) -> Option<Duration> {
    let ms = match raw {
        Some(value) if value.is_finite() => value.abs(),
        _ => return Some(Duration::from_millis(DEFAULT_DETECT_TIMEOUT_MS)),
    };
    if ms == 0.0 {
        return None;
    }
    let whole = ms.round().max(1.0);
    // Saturate absurdly large values instead of overflowing.
    let whole = if whole >= u64::MAX as f64 {
        u64::MAX
    } else {
        whole as u64
    };
    Some(Duration::from_millis(whole))
}

/// Invalid detector configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorConfigError {
    /// Trigger distance must be finite and strictly positive.
    InvalidTriggerDistance(f64),
}

impl core::fmt::Display for DetectorConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidTriggerDistance(value) => {
                write!(f, "trigger distance must be finite and positive, got {value}")
            }
        }
    }
}

impl std::error::Error for DetectorConfigError {}

/// Thresholds for click-vs-drag classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    trigger_distance: f64,
    timeout: Option<Duration>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            trigger_distance: DEFAULT_TRIGGER_DISTANCE,
            timeout: Some(Duration::from_millis(DEFAULT_DETECT_TIMEOUT_MS)),
        }
    }
}

impl DetectorConfig {
    /// Validate a trigger distance and normalize a raw timeout.
    pub fn new(trigger_distance: f64, timeout_ms: Option<f64>) -> Result<Self, DetectorConfigError> {
        if !trigger_distance.is_finite() || trigger_distance <= 0.0 {
            return Err(DetectorConfigError::InvalidTriggerDistance(trigger_distance));
        }
        Ok(Self {
            trigger_distance,
            timeout: normalize_timeout_ms(timeout_ms),
        })
    }

    /// Minimum displacement (exclusive) that classifies a gesture as a drag.
    #[inline]
    #[must_use]
    pub const fn trigger_distance(&self) -> f64 {
        self.trigger_distance
    }

    /// Square of [`trigger_distance`](Self::trigger_distance).
    #[inline]
    #[must_use]
    pub fn trigger_distance_squared(&self) -> f64 {
        self.trigger_distance * self.trigger_distance
    }

    /// Timeout after which a motionless gesture is rejected, if any.
    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
