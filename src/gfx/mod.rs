//! # Graphics Module
//!
//! Everything between a file on disk and pixels on screen.
//!
//! ## Architecture Overview
//!
//! - **Math** ([`math`]) - Transform composition and projection helpers over cgmath
//! - **Camera System** ([`camera`]) - Free-fly camera with eased movement, mouse look and zoom
//! - **Geometry** ([`geometry`]) - UV spheres and the axes gizmo
//! - **Model Loading** ([`loader`]) - Wavefront OBJ/MTL through tobj
//! - **Scene Management** ([`scene`]) - Objects, meshes and the registry
//! - **Resource Management** ([`resources`]) - Materials, textures and uniform bindings
//! - **Rendering Pipeline** ([`rendering`]) - Surface, pipelines and frame rendering
//!
//! ## Usage
//!
//! ```no_run
//! use sculpt::config::ViewerConfig;
//! use sculpt::gfx::scene::Scene;
//!
//! let mut scene = Scene::new(ViewerConfig::default());
//! let sphere = scene.create_sphere(None).unwrap();
//! scene.object_mut(sphere).unwrap().set_wireframe(true);
//! ```

pub mod camera;
pub mod geometry;
pub mod loader;
pub mod math;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::FlyCamera;
pub use rendering::render_engine::RenderEngine;
