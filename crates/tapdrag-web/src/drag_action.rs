#![forbid(unsafe_code)]

//! Default drag action: move an element along with the pointer.
//!
//! The element is expected to be absolutely positioned. Its `left`/`top`
//! are relative to its containing block, so the action measures the element
//! against its nearest positioned ancestor once, at bind time, and from then
//! on writes `offset + pointer` on every move.

use tapdrag_core::{CoordinateError, InputEvent, NodeId, PointerSample, extract_page};

use crate::page::{Page, WeakPage};
use crate::selector::{Selector, SelectorError};
use crate::session::GestureCallback;

/// Errors from binding a drag action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragActionError {
    /// The start event has no target element.
    NoTarget,
    /// The start event's target is not in the page's document.
    UnknownTarget(NodeId),
    Selector(SelectorError),
    /// No inclusive ancestor of the target matches the selector.
    NoMatch { selector: String },
    /// The start event could not be sampled.
    Malformed(CoordinateError),
}

impl core::fmt::Display for DragActionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoTarget => f.write_str("start event has no target element"),
            Self::UnknownTarget(node) => write!(f, "start event target {} is not in the document", node.0),
            Self::Selector(err) => write!(f, "invalid selector: {err}"),
            Self::NoMatch { selector } => write!(f, "no ancestor matches {selector:?}"),
            Self::Malformed(err) => write!(f, "malformed start event: {err}"),
        }
    }
}

impl std::error::Error for DragActionError {}

impl From<SelectorError> for DragActionError {
    fn from(err: SelectorError) -> Self {
        Self::Selector(err)
    }
}

/// Resolved element and offset for one drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAction {
    target: NodeId,
    offset: PointerSample,
}

impl DragAction {
    /// Resolve the element to move and its pointer offset.
    pub fn bind(
        page: &Page,
        start_event: &InputEvent,
        selector: Option<&str>,
        offset: Option<PointerSample>,
    ) -> Result<Self, DragActionError> {
        let origin = start_event.target.ok_or(DragActionError::NoTarget)?;
        let document = page.document();
        if !document.contains(origin) {
            return Err(DragActionError::UnknownTarget(origin));
        }

        let target = match selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let parsed = Selector::parse(raw)?;
                document
                    .closest(origin, &parsed)
                    .ok_or_else(|| DragActionError::NoMatch {
                        selector: raw.to_string(),
                    })?
            }
            None => origin,
        };

        let offset = match offset.filter(|o| o.is_finite()) {
            Some(offset) => offset,
            None => {
                let start = extract_page(start_event).map_err(DragActionError::Malformed)?;
                let anchor = document.positioned_ancestor(target);
                let target_origin = document
                    .page_offset(target)
                    .ok_or(DragActionError::UnknownTarget(target))?;
                let anchor_origin = document
                    .page_offset(anchor)
                    .ok_or(DragActionError::UnknownTarget(anchor))?;
                target_origin.delta_from(anchor_origin).delta_from(start)
            }
        };

        Ok(Self { target, offset })
    }

    /// Element being moved.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// Value added to the page-frame pointer to get `left`/`top`.
    #[must_use]
    pub const fn offset(&self) -> PointerSample {
        self.offset
    }

    /// `left`/`top` for a pointer at `pointer`.
    #[must_use]
    pub fn placement(&self, pointer: PointerSample) -> PointerSample {
        self.offset.offset_by(pointer)
    }

    /// Reposition the element for a pointer at `pointer` (page frame).
    pub fn move_to(&self, page: &Page, pointer: PointerSample) -> PointerSample {
        let placement = self.placement(pointer);
        if let Err(err) = page
            .document_mut()
            .set_left_top(self.target, placement.x, placement.y)
        {
            tracing::warn!(error = %err, "drag target vanished");
        }
        placement
    }

    /// Reposition the element for `event`.
    pub fn apply(&self, page: &Page, event: &InputEvent) -> Result<PointerSample, CoordinateError> {
        Ok(self.move_to(page, extract_page(event)?))
    }

    /// Move callback suitable for a tracking session.
    #[must_use]
    pub fn into_callback(self, page: WeakPage) -> GestureCallback {
        Box::new(move |event| {
            let Some(page) = page.upgrade() else {
                return;
            };
            if let Err(err) = self.apply(&page, event.event()) {
                tracing::warn!(error = %err, "skipping unsampleable drag move");
            }
        })
    }
}

/// Build the default move callback for a drag begun by `start_event`.
pub fn make_drag_handler(
    page: &Page,
    start_event: &InputEvent,
    selector: Option<&str>,
    offset: Option<PointerSample>,
) -> Result<GestureCallback, DragActionError> {
    let action = DragAction::bind(page, start_event, selector, offset)?;
    Ok(action.into_callback(page.downgrade()))
}
