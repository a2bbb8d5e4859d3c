//! The node's presentation surface.
//!
//! `NodeSurface` stands in for the element the host mounts for an equation
//! node: a set of marker classes, the displayed content, a hover title, an
//! anchor rectangle, and an installable click callback. The view owns it
//! exclusively; host-side code only reads it and delivers clicks.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use kurbo::Rect;
use smol_str::SmolStr;

/// What the surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SurfaceContent {
    /// Nothing rendered yet.
    #[default]
    Blank,
    /// Kind-specific "add an equation" placeholder.
    Placeholder(SmolStr),
    /// Typeset output from the render backend.
    Typeset(SmolStr),
    /// Human-readable render failure.
    ErrorText(SmolStr),
}

#[derive(Default)]
struct SurfaceInner {
    classes: RefCell<BTreeSet<SmolStr>>,
    content: RefCell<SurfaceContent>,
    title: RefCell<Option<SmolStr>>,
    rect: Cell<Rect>,
    detached: Cell<bool>,
    on_click: RefCell<Option<Rc<dyn Fn()>>>,
}

/// Cheaply clonable handle to one node's presentation state.
#[derive(Clone, Default)]
pub struct NodeSurface {
    inner: Rc<SurfaceInner>,
}

impl NodeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&self, class: &str) {
        self.inner.classes.borrow_mut().insert(class.into());
    }

    pub fn remove_class(&self, class: &str) {
        self.inner.classes.borrow_mut().remove(class);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.inner.classes.borrow().contains(class)
    }

    /// Replace the displayed content wholesale. There is deliberately no
    /// append: repeated renders must not accumulate children.
    pub fn set_content(&self, content: SurfaceContent) {
        *self.inner.content.borrow_mut() = content;
    }

    pub fn content(&self) -> SurfaceContent {
        self.inner.content.borrow().clone()
    }

    pub fn set_title(&self, title: Option<SmolStr>) {
        *self.inner.title.borrow_mut() = title;
    }

    pub fn title(&self) -> Option<SmolStr> {
        self.inner.title.borrow().clone()
    }

    /// Screen rectangle of the node, used to anchor the overlay. Hosts
    /// update it from layout; tests set it directly.
    pub fn set_rect(&self, rect: Rect) {
        self.inner.rect.set(rect);
    }

    pub fn rect(&self) -> Rect {
        self.inner.rect.get()
    }

    /// Mark the surface as removed from the document. Pending asynchronous
    /// work keyed on this surface must drop itself instead of applying.
    pub fn detach(&self) {
        self.inner.detached.set(true);
    }

    pub fn is_attached(&self) -> bool {
        !self.inner.detached.get()
    }

    /// Install or remove the click callback.
    pub fn set_on_click(&self, handler: Option<Rc<dyn Fn()>>) {
        *self.inner.on_click.borrow_mut() = handler;
    }

    pub fn has_click_handler(&self) -> bool {
        self.inner.on_click.borrow().is_some()
    }

    /// Deliver a click to the installed handler, if any.
    pub fn click(&self) {
        let handler = self.inner.on_click.borrow().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl std::fmt::Debug for NodeSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSurface")
            .field("classes", &self.inner.classes.borrow())
            .field("content", &self.inner.content.borrow())
            .field("title", &self.inner.title.borrow())
            .field("attached", &self.is_attached())
            .finish()
    }
}
