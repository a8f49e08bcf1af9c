//! # Vertex Data Structures
//!
//! The three interleaved vertex formats the viewer draws with. Each format
//! implements [`Vertex`], which ties it to a [`VertexLayout`] tag and to the
//! `wgpu` buffer layout its pipeline expects, so a mesh can only ever be drawn
//! by a pipeline built for its own format.
//!
//! Shader locations are the same across formats: position at 0, normal at 1
//! and the per-format attribute (texture coordinates or colour) at 2.

use std::mem;

/// Identifies a vertex format; pipelines are keyed by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    Textured,
    Colored,
    Line,
}

/// A GPU vertex format
pub trait Vertex: bytemuck::Pod + std::fmt::Debug {
    const LAYOUT: VertexLayout;

    /// Returns the vertex buffer layout for wgpu rendering.
    fn desc() -> wgpu::VertexBufferLayout<'static>;

    fn position(&self) -> [f32; 3];
}

/// Vertex of a loaded model or a sphere.
///
/// # Memory Layout
///
/// `tex_coords` (2 floats), `normal` (3 floats), `position` (3 floats), 32
/// bytes per vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    /// Texture coordinates; the row order of the image is decided by the texture
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub position: [f32; 3],
}

impl TexturedVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            offset: (mem::size_of::<[f32; 2]>() + mem::size_of::<[f32; 3]>())
                as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
    ];

    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            tex_coords,
            normal,
            position,
        }
    }
}

impl Vertex for TexturedVertex {
    const LAYOUT: VertexLayout = VertexLayout::Textured;

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TexturedVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn position(&self) -> [f32; 3] {
        self.position
    }
}

/// Vertex of a user-drawn object: colour, normal, position (36 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColoredVertex {
    /// Linear RGB in 0..1
    pub color: [f32; 3],
    pub normal: [f32; 3],
    pub position: [f32; 3],
}

impl ColoredVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            offset: (2 * mem::size_of::<[f32; 3]>()) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x3,
        },
    ];

    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            color,
            normal: [0.0, 0.0, 0.0],
            position,
        }
    }
}

impl Vertex for ColoredVertex {
    const LAYOUT: VertexLayout = VertexLayout::Colored;

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ColoredVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn position(&self) -> [f32; 3] {
        self.position
    }
}

/// Unlit line vertex. Lines have no normal; location 1 is unused.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x3,
        },
    ];

    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }
}

impl Vertex for LineVertex {
    const LAYOUT: VertexLayout = VertexLayout::Line;

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn position(&self) -> [f32; 3] {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute_end(attr: &wgpu::VertexAttribute) -> u64 {
        attr.offset + attr.format.size()
    }

    fn assert_layout_fits<V: Vertex>() {
        let layout = V::desc();
        assert_eq!(layout.array_stride, mem::size_of::<V>() as u64);
        for attr in layout.attributes {
            assert!(attribute_end(attr) <= layout.array_stride);
        }
    }

    #[test]
    fn strides_match_struct_sizes() {
        assert_eq!(mem::size_of::<TexturedVertex>(), 32);
        assert_eq!(mem::size_of::<ColoredVertex>(), 36);
        assert_eq!(mem::size_of::<LineVertex>(), 24);
        assert_layout_fits::<TexturedVertex>();
        assert_layout_fits::<ColoredVertex>();
        assert_layout_fits::<LineVertex>();
    }

    #[test]
    fn textured_position_is_last_in_memory() {
        let vertex = TexturedVertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.25, 0.75]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&vertex));
        assert_eq!(floats, &[0.25, 0.75, 0.0, 1.0, 0.0, 1.0, 2.0, 3.0]);

        let position = &TexturedVertex::desc().attributes[0];
        assert_eq!(position.shader_location, 0);
        assert_eq!(position.offset, 20);
    }

    #[test]
    fn layout_tags_are_distinct() {
        assert_ne!(TexturedVertex::LAYOUT, ColoredVertex::LAYOUT);
        assert_ne!(ColoredVertex::LAYOUT, LineVertex::LAYOUT);
    }
}
