//! # Procedural Geometry Generation
//!
//! Generates the primitive shapes the viewer creates without a model file:
//! the UV sphere and the axes gizmo lines.
//!
//! ## Usage
//!
//! ```rust
//! use sculpt::gfx::geometry::generate_uv_sphere;
//!
//! let sphere = generate_uv_sphere(5.0, 50, 50);
//! assert_eq!(sphere.vertex_count(), 51 * 51);
//! ```

pub mod primitives;

pub use primitives::*;

use crate::gfx::scene::vertex::TexturedVertex;

/// Represents generated geometry data ready for GPU upload
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v), bottom-left origin
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaves the attribute streams into textured vertices
    pub fn to_textured_vertices(&self) -> Vec<TexturedVertex> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                TexturedVertex::new(
                    position,
                    self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                )
            })
            .collect()
    }
}
