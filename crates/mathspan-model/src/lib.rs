//! mathspan-model: document-facing types for embedded equation nodes.
//!
//! This crate provides:
//! - `EquationNode` - the immutable per-revision node value
//! - Serialization to/from the node's wrapping-element shape
//! - The `$$...$$` input pattern matcher
//! - `Transaction` and the document-scoped interaction flags
//!
//! Everything here is host-agnostic data; the live view machinery lives in
//! `mathspan-view`.

pub mod node;
pub mod pattern;
pub mod schema;
pub mod transaction;

pub use node::{EquationKind, EquationNode};
pub use pattern::{InlineEquationMatch, input_rule_transaction, match_inline_equation};
pub use schema::{SchemaError, parse_node, serialize_node};
pub use smol_str::SmolStr;
pub use transaction::{InteractionFlags, Range, SelectionOp, Step, Transaction};
