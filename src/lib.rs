//! sculpt
//!
//! An interactive 3D scene viewer and editor core built on wgpu and winit:
//! OBJ models, textured spheres, free-drawn geometry and a free-fly camera.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::ViewerApp;
pub use config::ViewerConfig;
pub use engine::{Engine, FrameGuard};
pub use error::{LoadError, Result, SequenceError, ViewerError};

/// Creates a viewer with the default configuration
pub fn default() -> ViewerApp {
    ViewerApp::new(ViewerConfig::default())
}
