//! Render adapter: raw TeX in, visual state out.
//!
//! The typesetting backend itself is external and may load lazily on first
//! use. This module isolates all of that: callers get a synchronous
//! `render` call whose effect may be deferred until the one-time backend
//! load resolves. Render failures never escape this boundary; they become a
//! visible "invalid" state on the surface.

use std::cell::RefCell;
use std::rc::Rc;

use mathspan_model::EquationKind;
use smol_str::SmolStr;
use thiserror::Error;

use crate::surface::{NodeSurface, SurfaceContent};

/// Marker class for a node showing the empty-content placeholder.
pub const EMPTY_CLASS: &str = "empty-equation";
/// Marker class for a node whose TeX failed to typeset.
pub const INVALID_CLASS: &str = "invalid-equation";

const BLOCK_PLACEHOLDER: &str = "Add a TeX equation";
const INLINE_PLACEHOLDER: &str = "\u{221A}x New equation";
const INLINE_INVALID: &str = "\u{221A}x Invalid equation";

/// Typesetting failure for a specific piece of TeX.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TypesetError {
    pub message: String,
}

/// The backend could not be acquired at all.
#[derive(Debug, Clone, Error)]
#[error("typeset backend unavailable: {0}")]
pub struct BackendLoadError(pub String);

/// A typesetting backend. Turns raw TeX into markup for the surface.
pub trait TypesetBackend {
    fn typeset(&self, tex: &str, display: bool) -> Result<String, TypesetError>;
}

/// One-shot asynchronous backend acquisition.
///
/// `load` is called at most once per in-flight load; the callback may fire
/// immediately or on a later tick.
pub trait BackendLoader {
    fn load(&self, done: Box<dyn FnOnce(Result<Rc<dyn TypesetBackend>, BackendLoadError>)>);
}

enum BackendSlot {
    Unloaded,
    /// Load in flight; renders requested meanwhile queue here and run in
    /// order once the backend arrives.
    Loading(Vec<RenderJob>),
    Ready(Rc<dyn TypesetBackend>),
}

struct RenderJob {
    surface: NodeSurface,
    kind: EquationKind,
    display: bool,
    content: SmolStr,
}

struct AdapterInner {
    loader: Rc<dyn BackendLoader>,
    slot: RefCell<BackendSlot>,
}

/// Shared render adapter. Clones share one backend slot, so the backend
/// loads once per adapter however many views render through it.
#[derive(Clone)]
pub struct RenderAdapter {
    inner: Rc<AdapterInner>,
}

impl RenderAdapter {
    pub fn new(loader: Rc<dyn BackendLoader>) -> Self {
        Self {
            inner: Rc::new(AdapterInner {
                loader,
                slot: RefCell::new(BackendSlot::Unloaded),
            }),
        }
    }

    /// Render `content` onto `surface`.
    ///
    /// Idempotent: each call fully replaces what the surface shows. Empty
    /// content renders a kind-specific placeholder without touching the
    /// backend. Non-empty content typesets in display style when the node
    /// is block or its display flag is set.
    pub fn render(&self, surface: &NodeSurface, kind: EquationKind, display: bool, content: &str) {
        if content.is_empty() {
            let placeholder = if kind.is_block() {
                BLOCK_PLACEHOLDER
            } else {
                INLINE_PLACEHOLDER
            };
            surface.set_content(SurfaceContent::Placeholder(placeholder.into()));
            surface.add_class(EMPTY_CLASS);
            surface.remove_class(INVALID_CLASS);
            surface.set_title(None);
            return;
        }

        let job = RenderJob {
            surface: surface.clone(),
            kind,
            display,
            content: content.into(),
        };

        // Scope the borrow: the Ready path typesets and the Unloaded path
        // calls the loader, either of which may re-enter the slot.
        let mut slot = self.inner.slot.borrow_mut();
        match &mut *slot {
            BackendSlot::Ready(backend) => {
                let backend = backend.clone();
                drop(slot);
                render_now(&backend, &job);
            }
            BackendSlot::Loading(queue) => queue.push(job),
            BackendSlot::Unloaded => {
                *slot = BackendSlot::Loading(vec![job]);
                drop(slot);
                self.start_load();
            }
        }
    }

    fn start_load(&self) {
        let inner = Rc::downgrade(&self.inner);
        self.inner.loader.load(Box::new(move |result| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let queued = {
                let mut slot = inner.slot.borrow_mut();
                match std::mem::replace(&mut *slot, BackendSlot::Unloaded) {
                    BackendSlot::Loading(queue) => queue,
                    other => {
                        *slot = other;
                        Vec::new()
                    }
                }
            };
            match result {
                Ok(backend) => {
                    *inner.slot.borrow_mut() = BackendSlot::Ready(backend.clone());
                    for job in &queued {
                        // A surface detached while the load was in flight is
                        // gone from the document; don't render into it.
                        if job.surface.is_attached() {
                            render_now(&backend, job);
                        }
                    }
                }
                Err(err) => {
                    // Slot stays Unloaded so the next interaction retries;
                    // surfaces keep their last good state.
                    tracing::warn!(
                        target: "mathspan::render",
                        error = %err,
                        "typeset backend failed to load"
                    );
                }
            }
        }));
    }
}

fn render_now(backend: &Rc<dyn TypesetBackend>, job: &RenderJob) {
    let display = job.kind.is_block() || job.display;
    match backend.typeset(&job.content, display) {
        Ok(markup) => {
            job.surface
                .set_content(SurfaceContent::Typeset(markup.into()));
            job.surface.remove_class(EMPTY_CLASS);
            job.surface.remove_class(INVALID_CLASS);
            job.surface.set_title(None);
        }
        Err(err) => {
            let message = rebrand_error(&err.message);
            job.surface.add_class(INVALID_CLASS);
            job.surface.remove_class(EMPTY_CLASS);
            if job.kind.is_block() {
                job.surface.set_content(SurfaceContent::ErrorText(message));
                job.surface.set_title(None);
            } else {
                job.surface
                    .set_content(SurfaceContent::ErrorText(INLINE_INVALID.into()));
                job.surface.set_title(Some(message));
            }
        }
    }
}

/// Backends tend to prefix messages with their own product name
/// ("KaTeX parse error: ..."); show neutral wording instead.
fn rebrand_error(message: &str) -> SmolStr {
    message
        .replacen("KaTeX parse error", "Invalid equation", 1)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Typesets `\bad` to an error, everything else to `[tex|display]`.
    struct FakeBackend;

    impl TypesetBackend for FakeBackend {
        fn typeset(&self, tex: &str, display: bool) -> Result<String, TypesetError> {
            if tex.contains("\\bad") {
                Err(TypesetError {
                    message: format!("KaTeX parse error: unknown command {tex}"),
                })
            } else {
                Ok(format!("[{tex}|{display}]"))
            }
        }
    }

    /// Resolves immediately, counting load attempts.
    struct ImmediateLoader {
        loads: Rc<Cell<usize>>,
        fail: bool,
    }

    impl BackendLoader for ImmediateLoader {
        fn load(&self, done: Box<dyn FnOnce(Result<Rc<dyn TypesetBackend>, BackendLoadError>)>) {
            self.loads.set(self.loads.get() + 1);
            if self.fail {
                done(Err(BackendLoadError("offline".into())));
            } else {
                done(Ok(Rc::new(FakeBackend)));
            }
        }
    }

    /// Holds the callback until the test resolves it.
    #[derive(Default)]
    struct PendingLoader {
        #[allow(clippy::type_complexity)]
        pending: RefCell<Vec<Box<dyn FnOnce(Result<Rc<dyn TypesetBackend>, BackendLoadError>)>>>,
    }

    impl PendingLoader {
        fn resolve(&self) {
            for done in self.pending.borrow_mut().drain(..) {
                done(Ok(Rc::new(FakeBackend)));
            }
        }
    }

    impl BackendLoader for PendingLoader {
        fn load(&self, done: Box<dyn FnOnce(Result<Rc<dyn TypesetBackend>, BackendLoadError>)>) {
            self.pending.borrow_mut().push(done);
        }
    }

    fn adapter() -> RenderAdapter {
        RenderAdapter::new(Rc::new(ImmediateLoader {
            loads: Rc::new(Cell::new(0)),
            fail: false,
        }))
    }

    #[test]
    fn empty_content_renders_kind_specific_placeholder() {
        let adapter = adapter();
        let surface = NodeSurface::new();

        adapter.render(&surface, EquationKind::Block, true, "");
        assert_eq!(
            surface.content(),
            SurfaceContent::Placeholder(BLOCK_PLACEHOLDER.into())
        );
        assert!(surface.has_class(EMPTY_CLASS));

        adapter.render(&surface, EquationKind::Inline, false, "");
        assert_eq!(
            surface.content(),
            SurfaceContent::Placeholder(INLINE_PLACEHOLDER.into())
        );
    }

    #[test]
    fn success_clears_markers_and_replaces_content() {
        let adapter = adapter();
        let surface = NodeSurface::new();

        adapter.render(&surface, EquationKind::Inline, false, "");
        assert!(surface.has_class(EMPTY_CLASS));

        adapter.render(&surface, EquationKind::Inline, false, "x^2");
        assert_eq!(surface.content(), SurfaceContent::Typeset("[x^2|false]".into()));
        assert!(!surface.has_class(EMPTY_CLASS));
        assert!(!surface.has_class(INVALID_CLASS));
        assert_eq!(surface.title(), None);
    }

    #[test]
    fn block_nodes_always_typeset_in_display_style() {
        let adapter = adapter();
        let surface = NodeSurface::new();

        // display flag false, but the node is block.
        adapter.render(&surface, EquationKind::Block, false, "x");
        assert_eq!(surface.content(), SurfaceContent::Typeset("[x|true]".into()));

        adapter.render(&surface, EquationKind::Inline, true, "x");
        assert_eq!(surface.content(), SurfaceContent::Typeset("[x|true]".into()));
    }

    #[test]
    fn invalid_tex_marks_surface_instead_of_panicking() {
        let adapter = adapter();

        let block = NodeSurface::new();
        adapter.render(&block, EquationKind::Block, true, "\\bad{");
        assert!(block.has_class(INVALID_CLASS));
        let SurfaceContent::ErrorText(msg) = block.content() else {
            panic!("expected error text");
        };
        // Full rebranded message for block nodes.
        assert!(msg.starts_with("Invalid equation"), "got {msg:?}");
        assert_eq!(block.title(), None);

        let inline = NodeSurface::new();
        adapter.render(&inline, EquationKind::Inline, false, "\\bad{");
        assert_eq!(
            inline.content(),
            SurfaceContent::ErrorText(INLINE_INVALID.into())
        );
        // Short indicator inline, full message in the hover title.
        assert!(inline.title().unwrap().starts_with("Invalid equation"));
    }

    #[test]
    fn invalid_state_is_cleared_by_next_good_render() {
        let adapter = adapter();
        let surface = NodeSurface::new();

        adapter.render(&surface, EquationKind::Inline, false, "\\bad{");
        assert!(surface.has_class(INVALID_CLASS));

        adapter.render(&surface, EquationKind::Inline, false, "x");
        assert!(!surface.has_class(INVALID_CLASS));
        assert_eq!(surface.title(), None);
    }

    #[test]
    fn render_is_idempotent() {
        let adapter = adapter();
        let a = NodeSurface::new();
        let b = NodeSurface::new();

        adapter.render(&a, EquationKind::Inline, false, "x+1");
        adapter.render(&b, EquationKind::Inline, false, "x+1");
        adapter.render(&b, EquationKind::Inline, false, "x+1");

        assert_eq!(a.content(), b.content());
        assert_eq!(a.title(), b.title());
        assert_eq!(a.has_class(INVALID_CLASS), b.has_class(INVALID_CLASS));
        assert_eq!(a.has_class(EMPTY_CLASS), b.has_class(EMPTY_CLASS));
    }

    #[test]
    fn backend_loads_once_for_many_renders() {
        let loads = Rc::new(Cell::new(0));
        let adapter = RenderAdapter::new(Rc::new(ImmediateLoader {
            loads: loads.clone(),
            fail: false,
        }));
        let surface = NodeSurface::new();

        adapter.render(&surface, EquationKind::Inline, false, "a");
        adapter.render(&surface, EquationKind::Inline, false, "b");
        adapter.render(&surface, EquationKind::Inline, false, "c");
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn renders_queued_during_load_run_in_order() {
        let loader = Rc::new(PendingLoader::default());
        let adapter = RenderAdapter::new(loader.clone());
        let surface = NodeSurface::new();

        adapter.render(&surface, EquationKind::Inline, false, "first");
        adapter.render(&surface, EquationKind::Inline, false, "second");
        // Nothing visible yet.
        assert_eq!(surface.content(), SurfaceContent::Blank);

        loader.resolve();
        // Both ran; the later call owns the final state.
        assert_eq!(
            surface.content(),
            SurfaceContent::Typeset("[second|false]".into())
        );
    }

    #[test]
    fn detached_surface_is_dropped_not_rendered() {
        let loader = Rc::new(PendingLoader::default());
        let adapter = RenderAdapter::new(loader.clone());
        let surface = NodeSurface::new();

        adapter.render(&surface, EquationKind::Inline, false, "x");
        surface.detach();
        loader.resolve();

        assert_eq!(surface.content(), SurfaceContent::Blank);
    }

    #[test]
    fn failed_load_retries_on_next_render() {
        let loads = Rc::new(Cell::new(0));
        let adapter = RenderAdapter::new(Rc::new(ImmediateLoader {
            loads: loads.clone(),
            fail: true,
        }));
        let surface = NodeSurface::new();

        adapter.render(&surface, EquationKind::Inline, false, "x");
        assert_eq!(loads.get(), 1);
        // Surface keeps its last state; no error marker for a load failure.
        assert_eq!(surface.content(), SurfaceContent::Blank);
        assert!(!surface.has_class(INVALID_CLASS));

        adapter.render(&surface, EquationKind::Inline, false, "x");
        assert_eq!(loads.get(), 2);
    }
}
