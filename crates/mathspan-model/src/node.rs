//! Equation node values.
//!
//! An equation node is an atomic leaf in the host document whose only child
//! is its raw TeX text. Nodes are immutable per revision: every content
//! change replaces the node wholesale, the host never mutates one in place.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Which flavor of equation node this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquationKind {
    /// Standalone block-level equation. Always typeset in display style.
    Block,
    /// Equation flowing inside a text line. Display style is toggleable.
    Inline,
}

impl EquationKind {
    pub fn is_block(self) -> bool {
        matches!(self, Self::Block)
    }
}

/// One equation node as the host document stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationNode {
    kind: EquationKind,
    /// Display-style flag. Only meaningful for inline nodes; block nodes
    /// are display-style unconditionally.
    display: bool,
    /// Raw TeX markup, stored verbatim (whitespace included).
    content: SmolStr,
}

impl EquationNode {
    /// Create a block equation node.
    pub fn block(content: impl Into<SmolStr>) -> Self {
        Self {
            kind: EquationKind::Block,
            display: true,
            content: content.into(),
        }
    }

    /// Create an inline equation node with the given display-style flag.
    pub fn inline(content: impl Into<SmolStr>, display: bool) -> Self {
        Self {
            kind: EquationKind::Inline,
            display,
            content: content.into(),
        }
    }

    pub fn kind(&self) -> EquationKind {
        self.kind
    }

    /// Effective display style: block nodes are always display-style.
    pub fn display(&self) -> bool {
        self.kind.is_block() || self.display
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Content length in characters (host positions are char-based).
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Size of the node in host document tokens: one token for each
    /// boundary plus one per content character.
    pub fn node_size(&self) -> usize {
        self.content_len() + 2
    }

    /// The next revision of this node with different content.
    pub fn with_content(&self, content: impl Into<SmolStr>) -> Self {
        Self {
            kind: self.kind,
            display: self.display,
            content: content.into(),
        }
    }

    /// Structural identity check: same kind and display style, content not
    /// considered. A node whose markup differs cannot be adopted by an
    /// existing view and forces a remount.
    pub fn same_markup(&self, other: &Self) -> bool {
        self.kind == other.kind && self.display() == other.display()
    }
}
