//! mathspan-view: the live side of embedded equation nodes.
//!
//! One [`view::EquationViewCore`] exists per mounted equation node. It owns
//! the node's presentation surface, listens for selection/interaction
//! events from the host, drives the [`render::RenderAdapter`] for typeset
//! display, and drives an [`overlay::EditorOverlay`] for raw-TeX editing,
//! translating overlay events into host document transactions.
//!
//! All of this runs on the single host UI thread; shared state is `Rc` +
//! `RefCell`/`Cell` throughout.

pub mod host;
pub mod overlay;
pub mod plugin;
pub mod render;
pub mod schedule;
pub mod surface;
pub mod view;

pub use host::{DocHost, GetPos, NodeView};
pub use overlay::{
    Disposer, EditorOverlay, OverlayPlacement, OverlayProps, OverlaySide, TexEditorOverlay,
    TexWidget, WidgetFactory, WidgetProps,
};
pub use plugin::{Key, KeyInput, Modifiers, handle_key_down};
pub use render::{
    BackendLoadError, BackendLoader, EMPTY_CLASS, INVALID_CLASS, RenderAdapter, TypesetBackend,
    TypesetError,
};
pub use schedule::{FrameScheduler, ImmediateScheduler, ManualScheduler};
pub use surface::{NodeSurface, SurfaceContent};
pub use view::{
    BlockEquationView, EDITING_CLASS, EquationViewCore, InlineEquationView, SELECTED_CLASS,
    ViewContext, equation_view,
};
