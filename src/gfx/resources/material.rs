//! Materials and their textures
//!
//! A [`Material`] is a contiguous block of vertices sharing one texture binding.
//! Meshes concatenate the blocks of their materials into a single vertex
//! buffer and issue one draw call per material.
//!
//! Texture images are decoded once on the CPU ([`TextureImage`]) and shared
//! between materials through an `Arc`; the GPU copy is created lazily the first
//! time the owning mesh is synced with a device.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LoadError;
use crate::gfx::scene::vertex::Vertex;
use crate::wgpu_utils::binding_builder::BindGroupLayoutWithDesc;

use super::texture_resource::TextureResource;

/// Bind group index material textures are bound to
pub const TEXTURE_GROUP: u32 = 2;

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Decodes an image file into RGBA8
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let decoded = image::open(path).map_err(|source| LoadError::Texture {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        log::debug!(
            "Decoded texture {} ({}x{})",
            path.display(),
            rgba.width(),
            rgba.height()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }

    /// Wraps raw RGBA8 pixels; `None` when the buffer does not match the size
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != (width * height * 4) as usize {
            return None;
        }
        Some(Self {
            path: None,
            width,
            height,
            pixels,
        })
    }

    /// Pixels with the row order reversed
    pub fn flipped_rows(&self) -> Vec<u8> {
        let row = (self.width * 4) as usize;
        self.pixels
            .chunks_exact(row)
            .rev()
            .flatten()
            .copied()
            .collect()
    }
}

struct GpuTexture {
    _resource: TextureResource,
    bind_group: wgpu::BindGroup,
}

/// A texture bound to a material
///
/// `flip` marks texture coordinates that use a bottom-left origin; the rows
/// are reversed on upload so those coordinates sample the right texels.
pub struct Texture {
    pub slot: u32,
    pub image: Arc<TextureImage>,
    pub flip: bool,
    gpu: Option<GpuTexture>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("slot", &self.slot)
            .field("path", &self.image.path)
            .field("size", &(self.image.width, self.image.height))
            .field("flip", &self.flip)
            .field("uploaded", &self.gpu.is_some())
            .finish()
    }
}

impl Texture {
    pub fn new(image: Arc<TextureImage>, flip: bool) -> Self {
        Self {
            slot: TEXTURE_GROUP,
            image,
            flip,
            gpu: None,
        }
    }

    /// Pixels in the order they are uploaded
    pub fn upload_pixels(&self) -> Cow<'_, [u8]> {
        if self.flip {
            Cow::Owned(self.image.flipped_rows())
        } else {
            Cow::Borrowed(&self.image.pixels)
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
    ) {
        if self.gpu.is_some() {
            return;
        }
        let label = self
            .image
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Procedural Texture".to_string());
        let resource = TextureResource::create_from_rgba_data(
            device,
            queue,
            &self.upload_pixels(),
            self.image.width,
            self.image.height,
            &label,
        );
        let bind_group = resource.create_bind_group(device, layout, &label);
        self.gpu = Some(GpuTexture {
            _resource: resource,
            bind_group,
        });
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.bind_group)
    }
}

/// Texture state of a material
#[derive(Debug)]
pub enum TextureBinding {
    Textured(Texture),
    Untextured,
}

impl TextureBinding {
    pub fn texture(&self) -> Option<&Texture> {
        match self {
            TextureBinding::Textured(texture) => Some(texture),
            TextureBinding::Untextured => None,
        }
    }

    pub fn texture_mut(&mut self) -> Option<&mut Texture> {
        match self {
            TextureBinding::Textured(texture) => Some(texture),
            TextureBinding::Untextured => None,
        }
    }
}

/// Named vertex block with its texture binding
#[derive(Debug)]
pub struct Material<V: Vertex> {
    pub name: String,
    vertices: Vec<V>,
    /// Indices local to this material's vertex block
    indices: Option<Vec<u32>>,
    pub texture: TextureBinding,
}

impl<V: Vertex> Material<V> {
    pub fn new(name: impl Into<String>, vertices: Vec<V>, texture: TextureBinding) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices: None,
            texture,
        }
    }

    pub fn untextured(name: impl Into<String>, vertices: Vec<V>) -> Self {
        Self::new(name, vertices, TextureBinding::Untextured)
    }

    /// Adds an index block; indices pointing past the vertex block are dropped
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        let count = self.vertices.len() as u32;
        let valid: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < count))
            .flatten()
            .copied()
            .collect();
        if valid.len() != indices.len() {
            log::warn!(
                "Material '{}': dropped {} out-of-range indices",
                self.name,
                indices.len() - valid.len()
            );
        }
        self.indices = Some(valid);
        self
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of elements one draw of this material covers
    pub fn element_count(&self) -> usize {
        self.indices
            .as_ref()
            .map_or(self.vertices.len(), |indices| indices.len())
    }

    pub fn triangle_count(&self) -> usize {
        self.element_count() / 3
    }

    pub fn is_textured(&self) -> bool {
        matches!(self.texture, TextureBinding::Textured(_))
    }

    pub(crate) fn push_vertex(&mut self, vertex: V) {
        self.vertices.push(vertex);
    }

    pub(crate) fn vertices_mut(&mut self) -> &mut Vec<V> {
        &mut self.vertices
    }
}
