//! Scene renderer adapter.
//!
//! [`SceneRenderer`] is the boundary the runtime draws through. The
//! always-available [`HeadlessRenderer`] keeps the scene graph in memory and
//! flattens it into a draw list each frame; it is what tests and headless
//! drivers use. With the `renderer` feature, [`DebugRenderer`] draws that
//! draw list into a window as a top-down view, and [`run_windowed`] drives a
//! game inside a winit event loop.

pub mod model;
pub mod scene;

#[cfg(feature = "renderer")]
pub mod app;
#[cfg(feature = "renderer")]
pub mod renderer;

pub use model::{
    FsModelSource, MemoryModelSource, ModelAsset, ModelFormat, ModelLoadOutcome, ModelOptions,
    ModelSource,
};
pub use scene::{
    CameraView, DrawCommand, DrawSource, HeadlessRenderer, LightNode, MeshNode, NodeShape,
    SceneRenderer,
};

#[cfg(feature = "renderer")]
pub use app::run_windowed;
#[cfg(feature = "renderer")]
pub use renderer::{DebugRenderer, TopDownCamera};
