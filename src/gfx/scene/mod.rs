//! # Scene Management Module
//!
//! Scene objects, their meshes and vertex formats, and the registry that owns
//! them.
//!
//! ## Key Components
//!
//! - [`Scene`] - Registry of objects keyed by [`ObjectId`], plus the camera
//! - [`SceneObject`] - An object with meshes and a transform, edited through [`TransformEdit`]
//! - [`StaticMesh`] / [`DynamicMesh`] - GPU buffer owners
//! - [`TexturedVertex`], [`ColoredVertex`], [`LineVertex`] - Interleaved vertex formats
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use sculpt::config::ViewerConfig;
//! use sculpt::gfx::scene::Scene;
//!
//! let mut scene = Scene::new(ViewerConfig::default());
//! let id = scene.open_model(Path::new("models/teapot.obj")).unwrap();
//! scene.object_mut(id).unwrap().set_rotation_y(45.0);
//! ```

pub mod mesh;
pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use mesh::{DrawMesh, DrawStyle, DynamicMesh, PipelineSource, StaticMesh};
pub use object::{GeometrySource, ObjectMesh, ObjectRole, SceneObject, Transform, TransformEdit};
pub use scene::{CustomHandle, ObjectId, Scene, SceneStatistics};
pub use vertex::{ColoredVertex, LineVertex, TexturedVertex, Vertex, VertexLayout};
