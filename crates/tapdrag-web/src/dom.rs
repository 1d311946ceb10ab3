#![forbid(unsafe_code)]

//! Minimal element tree with the layout queries drag actions need.
//!
//! The host mirrors the relevant part of its DOM here: element identity
//! (tag/id/classes), parentage, computed `position`, the static-flow page
//! origin of each element, and `left`/`top` styles in pixels.
//!
//! Layout model:
//! - `static` elements sit at their flow origin.
//! - `relative` elements sit at their flow origin shifted by `left`/`top`.
//! - `absolute` elements sit at their containing block (nearest positioned
//!   ancestor, else the document root) shifted by `left`/`top`; a missing
//!   `left` or `top` keeps the flow coordinate on that axis.
//! - `fixed` elements are placed like `absolute` against the page origin
//!   (the page does not scroll in this model).

use tapdrag_core::{NodeId, PointerSample};

use crate::selector::Selector;

/// Computed CSS `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

impl Position {
    #[inline]
    #[must_use]
    pub const fn is_positioned(self) -> bool {
        !matches!(self, Self::Static)
    }
}

/// Errors from document mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomError {
    UnknownNode(NodeId),
}

impl core::fmt::Display for DomError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownNode(node) => write!(f, "unknown node {}", node.0),
        }
    }
}

impl std::error::Error for DomError {}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<NodeId>,
    position: Position,
    flow_origin: PointerSample,
    left: Option<f64>,
    top: Option<f64>,
    text: String,
}

impl Element {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            parent,
            position: Position::Static,
            flow_origin: PointerSample::ORIGIN,
            left: None,
            top: None,
            text: String::new(),
        }
    }
}

/// Element arena rooted at a `body` element at the page origin.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing only the root element.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: vec![Element::new("body", None)],
        }
    }

    /// Root element; the shared input root for tracking sessions.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of elements, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always `false`; the root cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.elements.len()
    }

    fn element(&self, node: NodeId) -> Result<&Element, DomError> {
        self.elements
            .get(node.index())
            .ok_or(DomError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element, DomError> {
        self.elements
            .get_mut(node.index())
            .ok_or(DomError::UnknownNode(node))
    }

    /// Append a new element under `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        self.element(parent)?;
        let id = u32::try_from(self.elements.len()).map_err(|_| DomError::UnknownNode(parent))?;
        self.elements.push(Element::new(tag, Some(parent)));
        Ok(NodeId(id))
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) -> Result<(), DomError> {
        self.element_mut(node)?.id = Some(id.to_string());
        Ok(())
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element_mut(node)?;
        if !element.classes.iter().any(|c| c == class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn set_position(&mut self, node: NodeId, position: Position) -> Result<(), DomError> {
        self.element_mut(node)?.position = position;
        Ok(())
    }

    /// Page coordinates the element would occupy in static flow.
    pub fn set_flow_origin(&mut self, node: NodeId, origin: PointerSample) -> Result<(), DomError> {
        self.element_mut(node)?.flow_origin = origin;
        Ok(())
    }

    /// Set `left`/`top` in px.
    pub fn set_left_top(&mut self, node: NodeId, left: f64, top: f64) -> Result<(), DomError> {
        let element = self.element_mut(node)?;
        element.left = Some(left);
        element.top = Some(top);
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        text.clone_into(&mut self.element_mut(node)?.text);
        Ok(())
    }

    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.element(node).ok().map(|e| e.text.as_str())
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).ok().map(|e| e.tag.as_str())
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).ok().and_then(|e| e.parent)
    }

    #[must_use]
    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.element(node).ok().map(|e| e.position)
    }

    /// `left`/`top` style as a pair, when both are set.
    #[must_use]
    pub fn left_top(&self, node: NodeId) -> Option<(f64, f64)> {
        let element = self.element(node).ok()?;
        Some((element.left?, element.top?))
    }

    /// Inline style text for `left`/`top`, as a DOM host would write it.
    #[must_use]
    pub fn style_text(&self, node: NodeId) -> Option<String> {
        let (left, top) = self.left_top(node)?;
        Some(format!("left: {left}px; top: {top}px;"))
    }

    /// Proper ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    /// Whether `node` matches `selector`.
    #[must_use]
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.element(node)
            .is_ok_and(|e| selector.matches(&e.tag, e.id.as_deref(), &e.classes))
    }

    /// Closest inclusive ancestor of `node` matching `selector`.
    #[must_use]
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        if !self.contains(node) {
            return None;
        }
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| self.matches(n, selector))
    }

    /// Nearest proper ancestor whose computed position is not `static`,
    /// falling back to the root.
    #[must_use]
    pub fn positioned_ancestor(&self, node: NodeId) -> NodeId {
        self.ancestors(node)
            .find(|&n| self.position(n).is_some_and(Position::is_positioned))
            .unwrap_or(self.root())
    }

    /// Page coordinates of the element's top-left corner.
    #[must_use]
    pub fn page_offset(&self, node: NodeId) -> Option<PointerSample> {
        let element = self.element(node).ok()?;
        let flow = element.flow_origin;
        let offset = match element.position {
            Position::Static => flow,
            Position::Relative => PointerSample::new(
                flow.x + element.left.unwrap_or(0.0),
                flow.y + element.top.unwrap_or(0.0),
            ),
            Position::Absolute => {
                let container = self.positioned_ancestor(node);
                let base = if container == node {
                    PointerSample::ORIGIN
                } else {
                    self.page_offset(container)?
                };
                PointerSample::new(
                    element.left.map_or(flow.x, |left| base.x + left),
                    element.top.map_or(flow.y, |top| base.y + top),
                )
            }
            Position::Fixed => PointerSample::new(
                element.left.unwrap_or(flow.x),
                element.top.unwrap_or(flow.y),
            ),
        };
        Some(offset)
    }
}
