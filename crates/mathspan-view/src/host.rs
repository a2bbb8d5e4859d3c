//! Host-facing contracts.
//!
//! The host document (its model, transaction/undo system, and selection
//! machinery) is an external collaborator. These traits are the whole
//! surface the equation views need from it, and the whole surface it needs
//! from them.

use mathspan_model::{EquationKind, EquationNode, InteractionFlags, Transaction};

/// Handle to the outer document view.
///
/// Implementations apply dispatched transactions to their own model and
/// must recompute [`InteractionFlags`] via `InteractionFlags::after` for
/// every transaction they apply, whatever its origin.
pub trait DocHost {
    /// Whether the document currently accepts edits. When false, equation
    /// nodes render but never open their editor.
    fn editable(&self) -> bool;

    /// Flag state left behind by the last applied transaction.
    fn flags(&self) -> InteractionFlags;

    /// If the current selection is a whole-node selection of an equation
    /// node, its position and kind.
    fn node_selection(&self) -> Option<(usize, EquationKind)>;

    /// Apply a transaction to the document.
    fn dispatch(&self, tr: Transaction);

    /// Return keyboard focus to the document.
    fn focus(&self);

    /// Height of the viewport the overlay positions itself within.
    fn viewport_height(&self) -> f64;
}

/// Position lookup for one mounted node. `None` means the node is no
/// longer present in the document; callers must abort the operation they
/// were computing rather than dispatch on stale coordinates.
pub type GetPos = Box<dyn Fn() -> Option<usize>>;

/// Per-node view contract, invoked by the host's view layer.
pub trait NodeView {
    /// Adopt a new revision of the node. Returning false signals that this
    /// view cannot handle the update (structural identity changed) and the
    /// host must destroy it and mount a fresh instance.
    fn update(&self, node: &EquationNode) -> bool;

    /// The host selected this node as a whole.
    fn select_node(&self);

    /// The selection moved off this node.
    fn deselect_node(&self);

    /// The node was unmounted. Must release the overlay and listeners;
    /// must not mutate the document.
    fn destroy(&self);

    /// The view's own surface edits must never be reinterpreted by the
    /// host as document edits.
    fn ignore_mutation(&self) -> bool {
        true
    }
}
