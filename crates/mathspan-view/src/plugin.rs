//! Document-level equation commands.
//!
//! The one command living outside the per-node views: pressing Enter while
//! a block equation is selected as a whole opens its editor instead of
//! letting the host's default behavior split the node into a paragraph.

use mathspan_model::{SelectionOp, Transaction};

use crate::host::DocHost;

/// Keys the equation plugin cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other,
}

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn any(self) -> bool {
        self.alt || self.ctrl || self.meta || self.shift
    }
}

/// A key event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// Handle a document-level key event. Returns true when the event was
/// consumed and the host must not run its default behavior.
///
/// Plain Enter on a whole-node-selected block equation opens its editor.
/// There is no way to tell the view to open directly, so the command
/// forces a selection round-trip: select elsewhere, then reselect the node
/// with the open-request flag set, which makes the host call the view's
/// `select_node` again and the normal open path take over.
pub fn handle_key_down(host: &dyn DocHost, input: &KeyInput) -> bool {
    if !host.editable() {
        return false;
    }
    let Some((pos, kind)) = host.node_selection() else {
        return false;
    };
    if !kind.is_block() {
        return false;
    }
    if input.key != Key::Enter {
        return false;
    }
    // Modified Enter is swallowed whole: passing it through would run the
    // host's default split-into-paragraph on the selected equation.
    if input.modifiers.any() {
        return true;
    }

    host.dispatch(Transaction {
        selection: Some(SelectionOp::Caret { pos: 0 }),
        ..Transaction::new()
    });
    host.dispatch(Transaction {
        selection: Some(SelectionOp::Node { pos }),
        request_open_editor: true,
        ..Transaction::new()
    });
    true
}
