#![forbid(unsafe_code)]

//! JSON input parser for host-encoded DOM events.
//!
//! [`parse_encoded_input`] accepts one JSON object per event, shaped after
//! the DOM properties a host forwards:
//!
//! ```json
//! {"type":"mousedown","x":10,"y":20,"page_x":10,"page_y":120,"button":0,"target":3}
//! {"type":"touchmove","touches":[{"id":0,"x":12,"y":24}],"target":3}
//! ```
//!
//! Mouse events require `x`/`y` (client frame); `page_*` and `offset_*`
//! default to the client values. Touch events require a `touches` array
//! (empty is valid, e.g. the final `touchend`). Feature-gated behind
//! `input-parser`.

use serde::Deserialize;
use tapdrag_core::{
    EventKind, InputEvent, Modifiers, MouseButton, NodeId, PointerSample, TouchPoint,
};

/// Errors from parsing encoded input JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
    /// Event type the gesture engine does not consume.
    UnknownType(String),
}

impl core::fmt::Display for InputParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::UnknownType(kind) => write!(f, "unknown event type: {kind}"),
        }
    }
}

impl std::error::Error for InputParseError {}

#[derive(Debug, Deserialize)]
struct RawTouch {
    #[serde(default)]
    id: u32,
    x: f64,
    y: f64,
    #[serde(default)]
    page_x: Option<f64>,
    #[serde(default)]
    page_y: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    target: Option<u32>,
    #[serde(default)]
    button: Option<u8>,
    #[serde(default)]
    mods: Option<u8>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    page_x: Option<f64>,
    #[serde(default)]
    page_y: Option<f64>,
    #[serde(default)]
    offset_x: Option<f64>,
    #[serde(default)]
    offset_y: Option<f64>,
    #[serde(default)]
    touches: Option<Vec<RawTouch>>,
}

/// Parse one JSON-encoded DOM event into an [`InputEvent`].
pub fn parse_encoded_input(json: &str) -> Result<InputEvent, InputParseError> {
    let raw: RawInput =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;
    let kind = EventKind::from_name(&raw.kind)
        .ok_or_else(|| InputParseError::UnknownType(raw.kind.clone()))?;

    let mut event = if kind.is_touch() {
        parse_touch_event(kind, &raw)?
    } else {
        parse_mouse_event(kind, &raw)?
    };
    event.target = raw.target.map(NodeId);
    event.modifiers = Modifiers::from_bits_truncate(raw.mods.unwrap_or(0));
    Ok(event)
}

fn parse_mouse_event(kind: EventKind, raw: &RawInput) -> Result<InputEvent, InputParseError> {
    let x = raw.x.ok_or(InputParseError::MissingField("x"))?;
    let y = raw.y.ok_or(InputParseError::MissingField("y"))?;
    let mut event = InputEvent::mouse(kind, x, y);
    event.page = PointerSample::new(raw.page_x.unwrap_or(x), raw.page_y.unwrap_or(y));
    event.offset = PointerSample::new(raw.offset_x.unwrap_or(x), raw.offset_y.unwrap_or(y));
    event.button = MouseButton::from_u8(raw.button.unwrap_or(0));
    Ok(event)
}

fn parse_touch_event(kind: EventKind, raw: &RawInput) -> Result<InputEvent, InputParseError> {
    let touches = raw
        .touches
        .as_ref()
        .ok_or(InputParseError::MissingField("touches"))?
        .iter()
        .map(|t| TouchPoint {
            identifier: t.id,
            client: PointerSample::new(t.x, t.y),
            page: PointerSample::new(t.page_x.unwrap_or(t.x), t.page_y.unwrap_or(t.y)),
        })
        .collect();
    Ok(InputEvent::touches(kind, touches))
}
