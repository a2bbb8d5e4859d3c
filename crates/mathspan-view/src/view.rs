//! The equation node-view state machine.
//!
//! One view per mounted equation node, in one of three states: idle,
//! selected, or editing (overlay open). The view mediates between the host
//! document's node lifecycle and the overlay's lifecycle: it decides when
//! the overlay opens, keeps the visible node in sync with the live draft
//! while editing, and runs the commit/cancel protocol that writes the draft
//! back into the document and restores the caret.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use mathspan_model::{EquationKind, EquationNode, Range, SelectionOp, Step, Transaction};
use smol_str::SmolStr;

use crate::host::{DocHost, GetPos, NodeView};
use crate::overlay::{Disposer, EditorOverlay, OverlayProps};
use crate::render::RenderAdapter;
use crate::schedule::FrameScheduler;
use crate::surface::NodeSurface;

/// Marker class while the host has this node selected as a whole.
pub const SELECTED_CLASS: &str = "selected-node";
/// Marker class while the editor overlay is open.
pub const EDITING_CLASS: &str = "editing-equation";

const BLOCK_CLASS: &str = "block-equation";
const INLINE_CLASS: &str = "inline-equation";

/// Shared services every equation view in a document uses.
#[derive(Clone)]
pub struct ViewContext {
    pub host: Rc<dyn DocHost>,
    pub adapter: RenderAdapter,
    pub overlay: Rc<dyn EditorOverlay>,
    pub scheduler: Rc<dyn FrameScheduler>,
}

struct ViewInner {
    me: Weak<ViewInner>,
    ctx: ViewContext,
    get_pos: GetPos,
    surface: NodeSurface,
    is_block: bool,
    /// Latest node revision adopted from the document.
    node: RefCell<EquationNode>,
    selected: Cell<bool>,
    editing: Cell<bool>,
    /// Live overlay content. Only meaningful while editing.
    draft: RefCell<SmolStr>,
    /// Cleanup for the open overlay. Present iff editing.
    disposer: RefCell<Option<Disposer>>,
}

impl ViewInner {
    fn render_node(&self, content: &str) {
        let node = self.node.borrow();
        self.ctx
            .adapter
            .render(&self.surface, node.kind(), node.display(), content);
    }

    fn update(&self, node: &EquationNode) -> bool {
        let same = node.same_markup(&self.node.borrow());
        if !same {
            // Structural identity changed; the host must remount.
            return false;
        }
        // Commit/cancel need the latest revision even mid-edit.
        *self.node.borrow_mut() = node.clone();

        // While editing, the visible node tracks the overlay's draft, not
        // the document's stale copy.
        if self.editing.get() {
            return true;
        }
        self.render_node(node.content());
        true
    }

    fn select_node(&self) {
        self.selected.set(true);
        self.surface.add_class(SELECTED_CLASS);

        if !self.ctx.host.editable() {
            return;
        }

        // Clicking a selected node (re-)opens the editor, e.g. after Escape
        // closed it while the node stayed selected.
        let me = self.me.clone();
        self.surface.set_on_click(Some(Rc::new(move || {
            if let Some(view) = me.upgrade() {
                if view.ctx.host.editable() {
                    view.schedule_open();
                }
            }
        })));

        let flags = self.ctx.host.flags();

        // A transaction explicitly asked for edit mode on this selection.
        if flags.request_open_editor {
            self.schedule_open();
            return;
        }

        // Block equations open only on explicit request, click, or the
        // Enter command, never on bare selection.
        if self.is_block {
            return;
        }

        // Selection caused by undo/redo or a structural change (the last
        // transaction changed the document) must not pop the editor open.
        if flags.doc_changed_in_last_tr {
            return;
        }

        self.schedule_open();
    }

    fn deselect_node(&self) {
        self.selected.set(false);
        self.surface.remove_class(SELECTED_CLASS);
        self.surface.set_on_click(None);
        // The document selection has already moved on; discard the overlay
        // without touching content or selection. The draft dies with the
        // overlay, so the surface falls back to the document's copy.
        if self.editing.get() {
            self.close_overlay();
            self.render_node(self.node.borrow().content());
        }
    }

    /// Opening is deferred to the next frame: overlay construction must not
    /// block the triggering input event, and the overlay only reliably gets
    /// focus after the host's own selection side effects settle.
    fn schedule_open(&self) {
        let me = self.me.clone();
        self.ctx.scheduler.schedule(Box::new(move || {
            if let Some(view) = me.upgrade() {
                view.open_overlay();
            }
        }));
    }

    fn open_overlay(&self) {
        // Never more than one overlay per view.
        if self.editing.get() {
            return;
        }
        // The deferred open raced a deselect or destroy; do nothing.
        if !self.selected.get() {
            return;
        }

        let node = self.node.borrow().clone();
        tracing::debug!(
            target: "mathspan::view",
            kind = ?node.kind(),
            "opening equation editor"
        );

        self.editing.set(true);
        self.surface.add_class(EDITING_CLASS);
        *self.draft.borrow_mut() = node.content().into();

        let on_change = self.me.clone();
        let on_commit = self.me.clone();
        let on_cancel = self.me.clone();
        let on_boundary = self.me.clone();
        let props = OverlayProps {
            is_block: self.is_block,
            initial_tex: node.content().into(),
            anchor: self.surface.rect(),
            viewport_height: self.ctx.host.viewport_height(),
            on_change: Rc::new(move |tex| {
                if let Some(view) = on_change.upgrade() {
                    view.apply_draft(tex);
                }
            }),
            on_commit: Rc::new(move |dir| {
                if let Some(view) = on_commit.upgrade() {
                    view.commit(dir);
                }
            }),
            on_cancel: Rc::new(move || {
                if let Some(view) = on_cancel.upgrade() {
                    view.cancel();
                }
            }),
            on_boundary_exit: Rc::new(move |dir| {
                if let Some(view) = on_boundary.upgrade() {
                    // Block equations never exit on a boundary; inline ones
                    // treat it as a commit in that direction.
                    if !view.is_block {
                        view.commit(dir);
                    }
                }
            }),
        };
        *self.disposer.borrow_mut() = self.ctx.overlay.open(props);
    }

    fn apply_draft(&self, tex: SmolStr) {
        *self.draft.borrow_mut() = tex.clone();
        // The visible node always reflects the in-progress edit.
        self.render_node(&tex);
    }

    /// Tear down the overlay and editing state. Idempotent; callable from
    /// deselection and a user cancel in the same tick.
    fn close_overlay(&self) {
        if let Some(mut disposer) = self.disposer.borrow_mut().take() {
            disposer.dispose();
        }
        self.editing.set(false);
        *self.draft.borrow_mut() = SmolStr::default();
        self.surface.remove_class(EDITING_CLASS);
    }

    /// Save the draft and close the editor. `dir` is the direction the
    /// caret was moving (-1 left, +1 right); for inline nodes it picks the
    /// side of the node the caret lands on.
    fn commit(&self, dir: i8) -> bool {
        let next_tex: SmolStr = self.draft.borrow().trim().into();

        // Overlay disposal always precedes the transaction, so re-renders
        // triggered by the dispatch see a non-editing view.
        self.close_overlay();

        // An inline equation committed empty is removed outright.
        if !self.is_block && next_tex.is_empty() {
            return self.delete_node_and_focus();
        }

        let Some(pos) = (self.get_pos)() else {
            // Node vanished while the editor was open; never dispatch on
            // stale coordinates.
            return false;
        };
        let node = self.node.borrow().clone();

        let mut tr = Transaction::new();
        if next_tex.as_str() != node.content() {
            let start = pos + 1;
            tr.steps.push(Step::ReplaceText {
                range: Range::new(start, start + node.content_len()),
                text: next_tex.clone(),
            });
        }

        if self.is_block {
            // Block equations rest in the selected state after editing.
            tr.selection = Some(SelectionOp::Node { pos });
        } else {
            let target = if dir < 0 {
                pos
            } else {
                pos + next_tex.chars().count() + 2
            };
            tr.selection = Some(SelectionOp::CaretNear { pos: target, bias: dir });
            tr.scroll_into_view = true;
        }

        self.ctx.host.dispatch(tr);
        self.ctx.host.focus();
        true
    }

    /// Discard the draft and close the editor.
    fn cancel(&self) -> bool {
        self.close_overlay();

        let node = self.node.borrow().clone();

        // An inline equation that was empty before the edit began has
        // nothing to fall back to; remove it.
        if !self.is_block && node.is_empty() {
            return self.delete_node_and_focus();
        }

        // Back to the document's unchanged copy.
        self.render_node(node.content());

        if self.is_block {
            self.reselect_node_and_focus()
        } else {
            self.put_caret_after_and_focus()
        }
    }

    fn reselect_node_and_focus(&self) -> bool {
        let Some(pos) = (self.get_pos)() else {
            return false;
        };
        self.ctx.host.dispatch(Transaction {
            selection: Some(SelectionOp::Node { pos }),
            ..Transaction::new()
        });
        self.focus_next_frame();
        true
    }

    fn put_caret_after_and_focus(&self) -> bool {
        let Some(pos) = (self.get_pos)() else {
            return false;
        };
        let after = pos + self.node.borrow().node_size();
        self.ctx.host.dispatch(Transaction {
            selection: Some(SelectionOp::CaretNear {
                pos: after,
                bias: 1,
            }),
            ..Transaction::new()
        });
        self.focus_next_frame();
        true
    }

    fn delete_node_and_focus(&self) -> bool {
        let Some(pos) = (self.get_pos)() else {
            return false;
        };
        let size = self.node.borrow().node_size();
        self.ctx.host.dispatch(Transaction {
            steps: vec![Step::Delete {
                range: Range::new(pos, pos + size),
            }],
            selection: Some(SelectionOp::Caret { pos }),
            ..Transaction::new()
        });
        self.focus_next_frame();
        true
    }

    /// Focusing the host can have a perceivable delay; do it next frame.
    fn focus_next_frame(&self) {
        let host = self.ctx.host.clone();
        self.ctx.scheduler.schedule(Box::new(move || host.focus()));
    }

    fn destroy(&self) {
        // Cancel without focus restore: release everything, mutate nothing.
        self.close_overlay();
        self.surface.set_on_click(None);
        self.selected.set(false);
        self.surface.detach();
    }
}

/// The shared node-view implementation behind both equation kinds.
pub struct EquationViewCore {
    inner: Rc<ViewInner>,
}

impl EquationViewCore {
    pub fn new(node: &EquationNode, ctx: ViewContext, get_pos: GetPos) -> Self {
        let surface = NodeSurface::new();
        let is_block = node.kind().is_block();
        surface.add_class(if is_block { BLOCK_CLASS } else { INLINE_CLASS });

        let inner = Rc::new_cyclic(|me| ViewInner {
            me: me.clone(),
            ctx,
            get_pos,
            surface,
            is_block,
            node: RefCell::new(node.clone()),
            selected: Cell::new(false),
            editing: Cell::new(false),
            draft: RefCell::new(SmolStr::default()),
            disposer: RefCell::new(None),
        });
        inner.render_node(node.content());
        Self { inner }
    }

    /// The presentation surface the host mounts for this node.
    pub fn surface(&self) -> NodeSurface {
        self.inner.surface.clone()
    }

    pub fn is_editing(&self) -> bool {
        self.inner.editing.get()
    }

    /// Current node snapshot.
    pub fn node(&self) -> EquationNode {
        self.inner.node.borrow().clone()
    }

    /// Current draft content. Only meaningful while editing.
    pub fn draft(&self) -> SmolStr {
        self.inner.draft.borrow().clone()
    }
}

impl NodeView for EquationViewCore {
    fn update(&self, node: &EquationNode) -> bool {
        self.inner.update(node)
    }

    fn select_node(&self) {
        self.inner.select_node();
    }

    fn deselect_node(&self) {
        self.inner.deselect_node();
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}

/// Node view for block equations.
pub struct BlockEquationView {
    core: EquationViewCore,
}

/// Node view for inline equations.
pub struct InlineEquationView {
    core: EquationViewCore,
}

macro_rules! delegate_node_view {
    ($ty:ty) => {
        impl $ty {
            pub fn core(&self) -> &EquationViewCore {
                &self.core
            }
        }

        impl NodeView for $ty {
            fn update(&self, node: &EquationNode) -> bool {
                self.core.update(node)
            }
            fn select_node(&self) {
                self.core.select_node();
            }
            fn deselect_node(&self) {
                self.core.deselect_node();
            }
            fn destroy(&self) {
                self.core.destroy();
            }
        }
    };
}

delegate_node_view!(BlockEquationView);
delegate_node_view!(InlineEquationView);

/// Node view factory, keyed on the node's kind.
pub fn equation_view(node: &EquationNode, ctx: ViewContext, get_pos: GetPos) -> Box<dyn NodeView> {
    let core = EquationViewCore::new(node, ctx, get_pos);
    match node.kind() {
        EquationKind::Block => Box::new(BlockEquationView { core }),
        EquationKind::Inline => Box::new(InlineEquationView { core }),
    }
}
