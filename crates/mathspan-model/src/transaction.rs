//! Document transactions issued by the equation views.
//!
//! A `Transaction` is the only way the view layer talks back to the host
//! document: a list of content steps plus an optional selection command.
//! The host applies the steps to its own model and recomputes the shared
//! `InteractionFlags` from the transaction it just applied.

use crate::node::EquationNode;
use smol_str::SmolStr;

/// A range in the document, measured in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<Range> for std::ops::Range<usize> {
    fn from(r: Range) -> Self {
        r.start..r.end
    }
}

/// One content-changing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace the text in `range` with `text` (empty `text` clears it).
    ReplaceText { range: Range, text: SmolStr },
    /// Remove everything in `range` from the document.
    Delete { range: Range },
    /// Replace `range` with a freshly created equation node.
    ReplaceWithNode { range: Range, node: EquationNode },
}

/// Where the host should put the selection after applying the steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOp {
    /// Select the whole node starting at `pos`.
    Node { pos: usize },
    /// Caret exactly at `pos`.
    Caret { pos: usize },
    /// Caret at the nearest valid position to `pos`, searching in the
    /// direction of `bias` (-1 left, +1 right).
    CaretNear { pos: usize, bias: i8 },
}

/// A batch of document edits plus selection/metadata, applied atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub selection: Option<SelectionOp>,
    pub scroll_into_view: bool,
    /// Transient request: open the equation editor on the next selection of
    /// the node this transaction selects. Consumed by the flags below.
    pub request_open_editor: bool,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff applying this transaction changes document content.
    /// Selection-only transactions do not count.
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }
}

/// Document-scoped flags recomputed on every transaction and consumed by
/// the next selection event. Never persisted.
///
/// `doc_changed_in_last_tr` distinguishes selections caused by undo/redo or
/// structural edits (which change the document) from caret movement and
/// clicks (which don't). Hosts must call [`InteractionFlags::after`] for
/// every transaction they apply, including ones they originate themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionFlags {
    pub doc_changed_in_last_tr: bool,
    pub request_open_editor: bool,
}

impl InteractionFlags {
    /// The flag state after applying `tr`.
    pub fn after(tr: &Transaction) -> Self {
        Self {
            doc_changed_in_last_tr: tr.doc_changed(),
            request_open_editor: tr.request_open_editor,
        }
    }
}
