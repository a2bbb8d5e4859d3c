//! The `$$...$$` typing pattern.
//!
//! Recognizes an inline equation typed as `$$content$$` at the end of a
//! text span and proposes replacing it with an inline equation node. Pure
//! classification, no side effects; the host's input-rule mechanism calls
//! this on every keystroke.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::node::EquationNode;
use crate::transaction::{Range, Step, Transaction};

/// Placeholder character hosts serialize a forced line break to.
pub const FORCED_BREAK: char = '\u{FFFC}';

/// `$$content$$` preceded by start-of-text, whitespace, or a forced-break
/// placeholder, anchored at the end of the span. Content must be non-empty
/// and must not start or end with whitespace or `$`; interior whitespace
/// and interior `$` are fine.
static INLINE_EQUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s|\x{FFFC})\$\$([^\s$](?:.*[^\s$])?)\$\$$").unwrap()
});

/// A recognized inline equation pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineEquationMatch {
    /// Char range of the whole match within the examined span, boundary
    /// character included when present.
    pub range: std::ops::Range<usize>,
    /// The TeX between the delimiters.
    pub content: SmolStr,
    /// Whether the match starts with a whitespace/forced-break boundary
    /// character (as opposed to start-of-text). That character must survive
    /// the replacement.
    pub leading_boundary: bool,
}

/// Match the inline equation pattern against a text span ending at the
/// caret. Offsets in the result are char offsets into `text`.
pub fn match_inline_equation(text: &str) -> Option<InlineEquationMatch> {
    let caps = INLINE_EQUATION_RE.captures(text)?;
    let whole = caps.get(0)?;
    let content = caps.get(1)?;

    let first = whole.as_str().chars().next()?;
    let leading_boundary = first.is_whitespace() || first == FORCED_BREAK;

    let start_chars = text[..whole.start()].chars().count();
    let len_chars = whole.as_str().chars().count();

    Some(InlineEquationMatch {
        range: start_chars..start_chars + len_chars,
        content: content.as_str().into(),
        leading_boundary,
    })
}

/// The replace-with-node edit for a recognized pattern.
///
/// `span_start` is the document char offset of `text[0]`. Returns the
/// transaction replacing the matched range (minus a preserved leading
/// boundary character) with a fresh inline equation node.
pub fn input_rule_transaction(text: &str, span_start: usize) -> Option<Transaction> {
    let m = match_inline_equation(text)?;
    let start = span_start + m.range.start + usize::from(m.leading_boundary);
    let end = span_start + m.range.end;
    Some(Transaction {
        steps: vec![Step::ReplaceWithNode {
            range: Range::new(start, end),
            node: EquationNode::inline(m.content, false),
        }],
        ..Transaction::new()
    })
}
