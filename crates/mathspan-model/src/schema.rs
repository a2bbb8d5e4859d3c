//! Serialized node shape.
//!
//! A block node serializes to a single wrapping element containing its raw
//! text verbatim; an inline node adds one boolean attribute for the display
//! style. Whitespace is preserved exactly, so a parse of a serialize is
//! always the identical node.

use smol_str::SmolStr;
use thiserror::Error;

use crate::node::{EquationKind, EquationNode};

const BLOCK_TAG: &str = "block-equation";
const INLINE_TAG: &str = "inline-equation";
const DISPLAY_ATTR: &str = "data-display";

/// Failure to parse a serialized equation node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("not an equation element: {0}")]
    UnknownTag(SmolStr),
    #[error("malformed equation element: {0}")]
    Malformed(&'static str),
    #[error("bad {DISPLAY_ATTR} value: {0}")]
    BadDisplayAttr(SmolStr),
}

/// Serialize a node to its wrapping-element form.
pub fn serialize_node(node: &EquationNode) -> String {
    let text = escape_text(node.content());
    match node.kind() {
        EquationKind::Block => format!("<{BLOCK_TAG}>{text}</{BLOCK_TAG}>"),
        EquationKind::Inline => format!(
            "<{INLINE_TAG} {DISPLAY_ATTR}=\"{}\">{text}</{INLINE_TAG}>",
            node.display()
        ),
    }
}

/// Parse a serialized equation element back into a node.
pub fn parse_node(input: &str) -> Result<EquationNode, SchemaError> {
    let rest = input
        .strip_prefix('<')
        .ok_or(SchemaError::Malformed("missing opening tag"))?;

    if let Some(rest) = rest.strip_prefix(BLOCK_TAG) {
        let body = rest
            .strip_prefix('>')
            .and_then(|r| r.strip_suffix(&format!("</{BLOCK_TAG}>")))
            .ok_or(SchemaError::Malformed("unterminated block element"))?;
        return Ok(EquationNode::block(unescape_text(body)));
    }

    if let Some(rest) = rest.strip_prefix(INLINE_TAG) {
        let rest = rest
            .strip_prefix(&format!(" {DISPLAY_ATTR}=\""))
            .ok_or(SchemaError::Malformed("missing display attribute"))?;
        let (value, body) = rest
            .split_once("\">")
            .ok_or(SchemaError::Malformed("unterminated attribute"))?;
        let display = match value {
            "true" => true,
            "false" => false,
            other => return Err(SchemaError::BadDisplayAttr(other.into())),
        };
        let body = body
            .strip_suffix(&format!("</{INLINE_TAG}>"))
            .ok_or(SchemaError::Malformed("unterminated inline element"))?;
        return Ok(EquationNode::inline(unescape_text(body), display));
    }

    let tag: SmolStr = rest.split(['>', ' ']).next().unwrap_or(rest).into();
    Err(SchemaError::UnknownTag(tag))
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        if let Some(r) = rest.strip_prefix("&amp;") {
            out.push('&');
            rest = r;
        } else if let Some(r) = rest.strip_prefix("&lt;") {
            out.push('<');
            rest = r;
        } else if let Some(r) = rest.strip_prefix("&gt;") {
            out.push('>');
            rest = r;
        } else {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}
