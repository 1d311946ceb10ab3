//! Demo page: a board with one draggable card.
//!
//! Node ids are fixed so scripts can target them directly:
//!
//! | id | element              | layout                                 |
//! |----|----------------------|----------------------------------------|
//! | 0  | `body`               | page origin                            |
//! | 1  | `div#board`          | relative, flow origin (20, 20)         |
//! | 2  | `div.card`           | absolute, `left: 40px; top: 40px`      |
//! | 3  | `span.label`         | static child of the card               |

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tapdrag_core::{DetectorConfig, GestureKind, NodeId, PointerSample};
use tapdrag_web::{
    Draggable, DraggableCallbacks, DraggableOptions, DomError, Page, Position, RejectReason,
};

pub const CARD_SELECTOR: &str = ".card";

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Ready {
        board: u32,
        card: u32,
        label: u32,
    },
    Activate {
        reason: &'static str,
        at_ms: u64,
    },
    DragStart {
        gesture: GestureKind,
        x: f64,
        y: f64,
        at_ms: u64,
    },
    Drop {
        gesture: GestureKind,
        x: f64,
        y: f64,
        left: f64,
        top: f64,
        at_ms: u64,
    },
    Error {
        message: String,
        at_ms: u64,
    },
}

/// Page, card, and the reports its draggable produced so far.
#[derive(Debug)]
pub struct DemoPage {
    page: Page,
    board: NodeId,
    card: NodeId,
    label: NodeId,
    draggable: Draggable,
    reports: Rc<RefCell<Vec<Report>>>,
}

fn now_ms(page: &Page) -> u64 {
    u64::try_from(page.now().as_millis()).unwrap_or(u64::MAX)
}

impl DemoPage {
    /// Build the demo page with `detector` thresholds.
    ///
    /// `selector` overrides the drag target lookup; presses on the label
    /// move the card with the default.
    pub fn new(detector: DetectorConfig, selector: Option<&str>) -> Result<Self, DomError> {
        let page = Page::new();
        let (board, card, label) = {
            let mut doc = page.document_mut();
            let root = doc.root();
            let board = doc.append(root, "div")?;
            doc.set_id(board, "board")?;
            doc.set_position(board, Position::Relative)?;
            doc.set_flow_origin(board, PointerSample::new(20.0, 20.0))?;
            let card = doc.append(board, "div")?;
            doc.add_class(card, "card")?;
            doc.set_position(card, Position::Absolute)?;
            doc.set_left_top(card, 40.0, 40.0)?;
            let label = doc.append(card, "span")?;
            doc.add_class(label, "label")?;
            doc.set_text(label, "drag me")?;
            (board, card, label)
        };

        let reports = Rc::new(RefCell::new(vec![Report::Ready {
            board: board.0,
            card: card.0,
            label: label.0,
        }]));
        let callbacks = Self::callbacks(&page, card, &reports);
        let options = DraggableOptions::default()
            .with_detector(detector)
            .with_selector(selector.unwrap_or(CARD_SELECTOR));
        let draggable = Draggable::attach(&page, card, options, callbacks);

        Ok(Self {
            page,
            board,
            card,
            label,
            draggable,
            reports,
        })
    }

    fn callbacks(page: &Page, card: NodeId, reports: &Rc<RefCell<Vec<Report>>>) -> DraggableCallbacks {
        let (on_activate, on_drag_start, on_drop, on_error) = (
            (page.downgrade(), Rc::clone(reports)),
            (page.downgrade(), Rc::clone(reports)),
            (page.downgrade(), Rc::clone(reports)),
            (page.downgrade(), Rc::clone(reports)),
        );
        DraggableCallbacks::new()
            .on_activate(move |reason: RejectReason| {
                let (page, reports) = &on_activate;
                let at_ms = page.upgrade().map_or(0, |p| now_ms(&p));
                reports.borrow_mut().push(Report::Activate {
                    reason: reason.name(),
                    at_ms,
                });
            })
            .on_drag_start(move |drag| {
                let (page, reports) = &on_drag_start;
                let at_ms = page.upgrade().map_or(0, |p| now_ms(&p));
                reports.borrow_mut().push(Report::DragStart {
                    gesture: drag.gesture,
                    x: drag.position.x,
                    y: drag.position.y,
                    at_ms,
                });
            })
            .on_drop(move |end| {
                let (page, reports) = &on_drop;
                let Some(page) = page.upgrade() else {
                    return;
                };
                let (left, top) = page.document().left_top(card).unwrap_or_default();
                reports.borrow_mut().push(Report::Drop {
                    gesture: end.gesture,
                    x: end.position.x,
                    y: end.position.y,
                    left,
                    top,
                    at_ms: now_ms(&page),
                });
            })
            .on_error(move |err| {
                let (page, reports) = &on_error;
                let at_ms = page.upgrade().map_or(0, |p| now_ms(&p));
                reports.borrow_mut().push(Report::Error {
                    message: err.to_string(),
                    at_ms,
                });
            })
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub fn board(&self) -> NodeId {
        self.board
    }

    #[must_use]
    pub fn card(&self) -> NodeId {
        self.card
    }

    #[must_use]
    pub fn label(&self) -> NodeId {
        self.label
    }

    #[must_use]
    pub fn draggable(&self) -> &Draggable {
        &self.draggable
    }

    /// Take every report produced since the last call.
    pub fn drain_reports(&self) -> Vec<Report> {
        std::mem::take(&mut *self.reports.borrow_mut())
    }
}
