//! # Prelude
//!
//! Commonly used types in one import.
//!
//! ```no_run
//! use sculpt::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = sculpt::default();
//!     let sphere = app.engine().create_sphere(None)?;
//!     app.engine().set_rotation_y(sphere, 45.0)?;
//!     app.run()?;
//!     Ok(())
//! }
//! ```

// Re-export core application types
pub use crate::app::ViewerApp;
pub use crate::config::{CameraConfig, LightConfig, SphereConfig, ViewerConfig};
pub use crate::default;
pub use crate::engine::{Engine, FrameGuard};
pub use crate::error::{LoadError, SequenceError, ViewerError};

// Re-export graphics and scene types
pub use crate::gfx::camera::{FlyCamera, MovementKey};
pub use crate::gfx::math::CompositionOrder;
pub use crate::gfx::scene::{
    CustomHandle, GeometrySource, ObjectId, ObjectRole, Scene, SceneObject, SceneStatistics,
    TransformEdit,
};

// Re-export common external dependencies
pub use cgmath::{InnerSpace, Vector3};
