//! The floating TeX editor overlay.
//!
//! An overlay is opened with an anchor rectangle and callbacks and returns
//! a disposer. The micro-editor widget inside it is external (it owns its
//! own cursor movement, highlighting, keymaps); this module owns placement,
//! the open/dispose lifecycle, and the hazard of the widget finishing its
//! asynchronous construction after the overlay is already gone.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kurbo::Rect;
use smol_str::SmolStr;

/// Everything an overlay needs to open.
pub struct OverlayProps {
    /// Whether the edited node is a block equation. Overlay implementations
    /// size and style their popup differently for block nodes; the commit
    /// and boundary-exit policy differences live in the node view, not here.
    pub is_block: bool,
    pub initial_tex: SmolStr,
    /// Screen rectangle of the equation node being edited.
    pub anchor: Rect,
    pub viewport_height: f64,
    /// The draft changed.
    pub on_change: Rc<dyn Fn(SmolStr)>,
    /// Commit the draft; the argument is the caret exit direction
    /// (-1 left, +1 right).
    pub on_commit: Rc<dyn Fn(i8)>,
    /// Discard the draft.
    pub on_cancel: Rc<dyn Fn()>,
    /// The user tried to move the caret past the first (-1) or last (+1)
    /// character of single-line content.
    pub on_boundary_exit: Rc<dyn Fn(i8)>,
}

/// Cleanup handle returned from [`EditorOverlay::open`].
///
/// Safe to call any number of times, and safe to call before the overlay's
/// internal construction has finished: disposal prevents the construction
/// from taking visible effect and releases what it already allocated.
pub struct Disposer(Option<Box<dyn FnOnce()>>);

impl Disposer {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn dispose(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_none()
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Disposer").field(&self.is_disposed()).finish()
    }
}

/// Overlay factory. `None` from `open` means there is nothing to clean up.
pub trait EditorOverlay {
    fn open(&self, props: OverlayProps) -> Option<Disposer>;
}

/// Which side of the anchor the popup lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySide {
    Above,
    Below,
}

/// Computed popup position: side plus the popup origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    pub side: OverlaySide,
    /// Horizontal origin, anchored to the rectangle's left edge.
    pub x: f64,
    /// The edge of the anchor the popup grows away from.
    pub y: f64,
}

impl OverlayPlacement {
    /// Place the popup at the side of the anchor with more vertical space.
    pub fn compute(anchor: Rect, viewport_height: f64) -> Self {
        let space_above = anchor.y0;
        let space_below = viewport_height - anchor.y1;
        if space_above > space_below {
            Self {
                side: OverlaySide::Above,
                x: anchor.x0,
                y: anchor.y0,
            }
        } else {
            Self {
                side: OverlaySide::Below,
                x: anchor.x0,
                y: anchor.y1,
            }
        }
    }
}

/// The micro-editor widget living inside the overlay. Construction may be
/// asynchronous; everything else about it is out of scope here.
pub trait TexWidget {
    /// Give the widget keyboard focus, optionally selecting its content.
    fn focus(&self, select_all: bool);
    /// Tear the widget down and release its resources.
    fn destroy(&self);
}

/// What the widget is constructed from. The overlay pre-wires the commit/
/// cancel/boundary handoff; the widget keeps its own editing behavior.
pub struct WidgetProps {
    pub initial_tex: SmolStr,
    pub on_change: Rc<dyn Fn(SmolStr)>,
    /// Enter pressed inside the widget.
    pub on_enter: Rc<dyn Fn()>,
    /// Escape pressed inside the widget.
    pub on_escape: Rc<dyn Fn()>,
    /// Caret moved past the first/last character.
    pub on_caret_exit: Rc<dyn Fn(i8)>,
}

/// Asynchronous widget construction. `done` may run on a later tick.
pub trait WidgetFactory {
    fn create(&self, props: WidgetProps, done: Box<dyn FnOnce(Box<dyn TexWidget>)>);
}

/// Default overlay: positions a popup next to the anchor and hosts a
/// [`TexWidget`] built by the injected factory.
pub struct TexEditorOverlay {
    factory: Rc<dyn WidgetFactory>,
}

impl TexEditorOverlay {
    pub fn new(factory: Rc<dyn WidgetFactory>) -> Self {
        Self { factory }
    }
}

impl EditorOverlay for TexEditorOverlay {
    fn open(&self, props: OverlayProps) -> Option<Disposer> {
        let placement = OverlayPlacement::compute(props.anchor, props.viewport_height);
        tracing::debug!(
            target: "mathspan::view",
            block = props.is_block,
            side = ?placement.side,
            x = placement.x,
            "opening equation editor overlay"
        );

        // Popup state shared with the async construction callback.
        let attached = Rc::new(Cell::new(true));
        let widget_slot: Rc<RefCell<Option<Box<dyn TexWidget>>>> = Rc::new(RefCell::new(None));

        let on_commit = props.on_commit.clone();
        let widget_props = WidgetProps {
            initial_tex: props.initial_tex.clone(),
            on_change: props.on_change.clone(),
            on_enter: Rc::new(move || on_commit(1)),
            on_escape: props.on_cancel.clone(),
            on_caret_exit: props.on_boundary_exit.clone(),
        };

        let attached_for_done = attached.clone();
        let slot_for_done = widget_slot.clone();
        self.factory.create(
            widget_props,
            Box::new(move |widget| {
                if attached_for_done.get() {
                    widget.focus(true);
                    *slot_for_done.borrow_mut() = Some(widget);
                } else {
                    // Overlay closed before construction finished: the
                    // widget must never take visible effect.
                    widget.destroy();
                }
            }),
        );

        Some(Disposer::new(move || {
            attached.set(false);
            if let Some(widget) = widget_slot.borrow_mut().take() {
                widget.destroy();
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(y0: f64, y1: f64) -> Rect {
        Rect::new(40.0, y0, 120.0, y1)
    }

    #[test]
    fn placement_prefers_side_with_more_space() {
        // Node near the top: more space below.
        let p = OverlayPlacement::compute(anchor(10.0, 30.0), 800.0);
        assert_eq!(p.side, OverlaySide::Below);
        assert_eq!(p.x, 40.0);
        assert_eq!(p.y, 30.0);

        // Node near the bottom: more space above.
        let p = OverlayPlacement::compute(anchor(700.0, 720.0), 800.0);
        assert_eq!(p.side, OverlaySide::Above);
        assert_eq!(p.y, 700.0);
    }

    #[test]
    fn placement_ties_go_below() {
        let p = OverlayPlacement::compute(anchor(390.0, 410.0), 800.0);
        assert_eq!(p.side, OverlaySide::Below);
    }

    #[test]
    fn disposer_is_idempotent() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let mut disposer = Disposer::new(move || counter.set(counter.get() + 1));

        assert!(!disposer.is_disposed());
        disposer.dispose();
        disposer.dispose();
        assert_eq!(runs.get(), 1);
        assert!(disposer.is_disposed());
    }

    /// Widget recording focus/destroy calls.
    struct ProbeWidget {
        focused: Rc<Cell<bool>>,
        destroyed: Rc<Cell<bool>>,
    }

    impl TexWidget for ProbeWidget {
        fn focus(&self, select_all: bool) {
            assert!(select_all, "overlay focuses with select-all");
            self.focused.set(true);
        }
        fn destroy(&self) {
            self.destroyed.set(true);
        }
    }

    /// Factory that holds construction until the test resolves it.
    #[derive(Default)]
    struct PendingFactory {
        #[allow(clippy::type_complexity)]
        pending: RefCell<Vec<Box<dyn FnOnce(Box<dyn TexWidget>)>>>,
    }

    impl PendingFactory {
        fn resolve(&self, widget: ProbeWidget) {
            for done in self.pending.borrow_mut().drain(..) {
                done(Box::new(ProbeWidget {
                    focused: widget.focused.clone(),
                    destroyed: widget.destroyed.clone(),
                }));
            }
        }
    }

    impl WidgetFactory for PendingFactory {
        fn create(&self, _props: WidgetProps, done: Box<dyn FnOnce(Box<dyn TexWidget>)>) {
            self.pending.borrow_mut().push(done);
        }
    }

    fn props() -> OverlayProps {
        OverlayProps {
            is_block: false,
            initial_tex: "x".into(),
            anchor: anchor(10.0, 30.0),
            viewport_height: 800.0,
            on_change: Rc::new(|_| {}),
            on_commit: Rc::new(|_| {}),
            on_cancel: Rc::new(|| {}),
            on_boundary_exit: Rc::new(|_| {}),
        }
    }

    #[test]
    fn widget_resolving_while_open_is_attached_and_focused() {
        let factory = Rc::new(PendingFactory::default());
        let overlay = TexEditorOverlay::new(factory.clone());
        let focused = Rc::new(Cell::new(false));
        let destroyed = Rc::new(Cell::new(false));

        let mut disposer = overlay.open(props()).unwrap();
        factory.resolve(ProbeWidget {
            focused: focused.clone(),
            destroyed: destroyed.clone(),
        });

        assert!(focused.get());
        assert!(!destroyed.get());

        disposer.dispose();
        assert!(destroyed.get());
    }

    #[test]
    fn widget_resolving_after_dispose_is_destroyed_not_attached() {
        let factory = Rc::new(PendingFactory::default());
        let overlay = TexEditorOverlay::new(factory.clone());
        let focused = Rc::new(Cell::new(false));
        let destroyed = Rc::new(Cell::new(false));

        let mut disposer = overlay.open(props()).unwrap();
        disposer.dispose();

        factory.resolve(ProbeWidget {
            focused: focused.clone(),
            destroyed: destroyed.clone(),
        });

        assert!(!focused.get());
        assert!(destroyed.get());
    }

    #[test]
    fn widget_enter_maps_to_commit_right() {
        struct CapturingFactory {
            props: RefCell<Option<WidgetProps>>,
        }
        impl WidgetFactory for CapturingFactory {
            fn create(&self, props: WidgetProps, _done: Box<dyn FnOnce(Box<dyn TexWidget>)>) {
                *self.props.borrow_mut() = Some(props);
            }
        }

        let factory = Rc::new(CapturingFactory {
            props: RefCell::new(None),
        });
        let overlay = TexEditorOverlay::new(factory.clone());

        let committed = Rc::new(RefCell::new(Vec::new()));
        let sink = committed.clone();
        let mut p = props();
        p.on_commit = Rc::new(move |dir| sink.borrow_mut().push(dir));

        let _disposer = overlay.open(p);
        let widget_props = factory.props.borrow_mut().take().unwrap();
        (widget_props.on_enter)();
        assert_eq!(*committed.borrow(), vec![1]);
    }
}
