use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::gfx::math;
use crate::gfx::resources::{
    global_bindings::ShaderKind,
    material::{Material, TextureBinding},
};
use crate::wgpu_utils::binding_builder::BindGroupLayoutWithDesc;

use super::vertex::{ColoredVertex, Vertex, VertexLayout};

/// Looks up the pipeline a material should be drawn with
pub trait PipelineSource {
    fn pipeline(&self, kind: ShaderKind, wireframe: bool) -> Option<&wgpu::RenderPipeline>;
}

/// How an object asks its meshes to be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawStyle {
    pub wireframe: bool,
    /// Replaces the per-material shader choice (light spheres)
    pub shader: Option<ShaderKind>,
}

/// Shader a material is drawn with unless the object overrides it
pub fn default_shader<V: Vertex>(material: &Material<V>) -> ShaderKind {
    match V::LAYOUT {
        VertexLayout::Textured if material.is_textured() => ShaderKind::Textured,
        VertexLayout::Textured => ShaderKind::Untextured,
        VertexLayout::Colored => ShaderKind::Colored,
        VertexLayout::Line => ShaderKind::Line,
    }
}

/// Averaged per-vertex normals from indexed triangles
///
/// Each vertex receives the mean of the face normals of the triangles that
/// reference it, normalized. Vertices no triangle references keep a zero
/// normal.
pub fn calculate_face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];
    let mut counts = vec![0u32; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let face_normal = triangle_normal(positions[i0], positions[i1], positions[i2]);

        for vertex_idx in [i0, i1, i2] {
            for axis in 0..3 {
                normals[vertex_idx][axis] += face_normal[axis];
            }
            counts[vertex_idx] += 1;
        }
    }

    for (normal, &count) in normals.iter_mut().zip(&counts) {
        if count > 0 {
            *normal = math::normalize((*normal).into()).into();
        }
    }
    normals
}

/// Unnormalized face normal of a counter-clockwise triangle
fn triangle_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
    [
        edge1[1] * edge2[2] - edge1[2] * edge2[1],
        edge1[2] * edge2[0] - edge1[0] * edge2[2],
        edge1[0] * edge2[1] - edge1[1] * edge2[0],
    ]
}

/// Span of the concatenated buffers one material covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSpan {
    pub material: usize,
    /// Range into the index buffer when indexed, the vertex buffer otherwise
    pub elements: Range<u32>,
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    revision: u64,
}

fn create_vertex_buffer<V: Vertex>(device: &wgpu::Device, label: &str, vertices: &[V]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

/// Mesh whose geometry is fixed once built
///
/// The vertex blocks of all materials are concatenated into one vertex
/// buffer. The mesh is indexed when any material carries indices; the
/// index blocks are then rebased onto the concatenated vertex buffer and
/// materials without indices get a sequential block covering their vertices.
/// Buffers are created on the first [`StaticMesh::sync`] and never again.
#[derive(Debug)]
pub struct StaticMesh<V: Vertex> {
    pub name: String,
    materials: Vec<Material<V>>,
    buffers: Option<MeshBuffers>,
}

impl std::fmt::Debug for MeshBuffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshBuffers")
            .field("indexed", &self.index_buffer.is_some())
            .field("revision", &self.revision)
            .finish()
    }
}

impl<V: Vertex> StaticMesh<V> {
    pub fn new(name: impl Into<String>, materials: Vec<Material<V>>) -> Self {
        Self {
            name: name.into(),
            materials,
            buffers: None,
        }
    }

    pub fn materials(&self) -> &[Material<V>] {
        &self.materials
    }

    pub(crate) fn into_materials(self) -> Vec<Material<V>> {
        self.materials
    }

    pub fn is_indexed(&self) -> bool {
        self.materials.iter().any(|m| m.indices().is_some())
    }

    pub fn vertex_count(&self) -> usize {
        self.materials.iter().map(Material::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.materials.iter().map(Material::triangle_count).sum()
    }

    pub fn is_uploaded(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn concatenated_vertices(&self) -> Vec<V> {
        self.materials
            .iter()
            .flat_map(|m| m.vertices().iter().copied())
            .collect()
    }

    /// Index blocks offset by each material's position in the vertex buffer
    pub fn concatenated_indices(&self) -> Option<Vec<u32>> {
        if !self.is_indexed() {
            return None;
        }
        let mut base = 0u32;
        let mut indices = Vec::new();
        for material in &self.materials {
            let count = material.vertex_count() as u32;
            match material.indices() {
                Some(block) => indices.extend(block.iter().map(|i| i + base)),
                None => indices.extend(base..base + count),
            }
            base += count;
        }
        Some(indices)
    }

    /// One span per material, cumulative in material order
    pub fn material_spans(&self) -> Vec<MaterialSpan> {
        let indexed = self.is_indexed();
        let mut offset = 0u32;
        self.materials
            .iter()
            .enumerate()
            .map(|(material, m)| {
                let count = if indexed {
                    m.element_count()
                } else {
                    m.vertex_count()
                } as u32;
                let span = MaterialSpan {
                    material,
                    elements: offset..offset + count,
                };
                offset += count;
                span
            })
            .collect()
    }

    /// Creates the GPU buffers and textures on first call
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_layout: &BindGroupLayoutWithDesc,
    ) {
        for material in &mut self.materials {
            if let TextureBinding::Textured(texture) = &mut material.texture {
                texture.upload(device, queue, texture_layout);
            }
        }
        if self.buffers.is_some() || self.vertex_count() == 0 {
            return;
        }

        let vertex_buffer =
            create_vertex_buffer(device, &format!("{} Vertex Buffer", self.name), &self.concatenated_vertices());
        let index_buffer = self.concatenated_indices().map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", self.name)),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
        log::debug!(
            "Uploaded mesh '{}': {} vertices, {} materials, indexed: {}",
            self.name,
            self.vertex_count(),
            self.materials.len(),
            index_buffer.is_some()
        );

        self.buffers = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
            revision: 0,
        });
    }
}

/// Single-material mesh grown one point at a time (user-drawn objects)
///
/// Points form a triangle strip expanded into a triangle list: the first
/// three points make the first triangle, and every later point makes a new
/// triangle together with the last two vertices of the previous one. Those
/// two vertices are re-emitted, so after four points the mesh holds six
/// vertices. Every append bumps the revision and the next sync re-uploads the
/// whole buffer.
#[derive(Debug)]
pub struct DynamicMesh {
    material: Material<ColoredVertex>,
    points: usize,
    revision: u64,
    buffers: Option<MeshBuffers>,
}

impl Default for DynamicMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicMesh {
    pub fn new() -> Self {
        Self {
            material: Material::untextured("custom", Vec::new()),
            points: 0,
            revision: 0,
            buffers: None,
        }
    }

    pub fn append(&mut self, position: [f32; 3], color: [f32; 3]) {
        self.points += 1;
        let vertices = self.material.vertices_mut();
        if self.points > 3 {
            let len = vertices.len();
            let previous = [vertices[len - 2], vertices[len - 1]];
            vertices.extend_from_slice(&previous);
        }
        self.material.push_vertex(ColoredVertex::new(position, color));

        let vertices = self.material.vertices_mut();
        if vertices.len() % 3 == 0 {
            let len = vertices.len();
            let normal = math::normalize(
                triangle_normal(
                    vertices[len - 3].position,
                    vertices[len - 2].position,
                    vertices[len - 1].position,
                )
                .into(),
            );
            for vertex in &mut vertices[len - 3..] {
                vertex.normal = normal.into();
            }
        }
        self.revision += 1;
    }

    pub fn material(&self) -> &Material<ColoredVertex> {
        &self.material
    }

    pub fn vertices(&self) -> &[ColoredVertex] {
        self.material.vertices()
    }

    pub fn point_count(&self) -> usize {
        self.points
    }

    pub fn vertex_count(&self) -> usize {
        self.material.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when the GPU copy lags behind the CPU vertices
    pub fn needs_upload(&self) -> bool {
        self.vertex_count() > 0
            && self
                .buffers
                .as_ref()
                .is_none_or(|buffers| buffers.revision != self.revision)
    }

    /// Re-creates the vertex buffer if anything was appended since last sync
    pub fn sync(&mut self, device: &wgpu::Device) {
        if !self.needs_upload() {
            return;
        }
        let vertex_buffer = create_vertex_buffer(device, "Custom Object Vertex Buffer", self.vertices());
        self.buffers = Some(MeshBuffers {
            vertex_buffer,
            index_buffer: None,
            revision: self.revision,
        });
    }
}

/// Draw calls for meshes, implemented on the render pass
pub trait DrawMesh {
    fn draw_static_mesh<V: Vertex>(
        &mut self,
        mesh: &StaticMesh<V>,
        pipelines: &dyn PipelineSource,
        style: DrawStyle,
    );

    fn draw_dynamic_mesh(
        &mut self,
        mesh: &DynamicMesh,
        pipelines: &dyn PipelineSource,
        style: DrawStyle,
    );
}

impl DrawMesh for wgpu::RenderPass<'_> {
    fn draw_static_mesh<V: Vertex>(
        &mut self,
        mesh: &StaticMesh<V>,
        pipelines: &dyn PipelineSource,
        style: DrawStyle,
    ) {
        let Some(buffers) = &mesh.buffers else {
            return;
        };
        self.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        if let Some(index_buffer) = &buffers.index_buffer {
            self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        }

        for span in mesh.material_spans() {
            if span.elements.is_empty() {
                continue;
            }
            let material = &mesh.materials[span.material];
            let kind = style.shader.unwrap_or_else(|| default_shader(material));
            let Some(pipeline) = pipelines.pipeline(kind, style.wireframe) else {
                continue;
            };
            self.set_pipeline(pipeline);

            if kind.samples_texture() {
                let Some(texture) = material.texture.texture() else {
                    continue;
                };
                let Some(bind_group) = texture.bind_group() else {
                    continue;
                };
                self.set_bind_group(texture.slot, bind_group, &[]);
            }

            if buffers.index_buffer.is_some() {
                self.draw_indexed(span.elements, 0, 0..1);
            } else {
                self.draw(span.elements, 0..1);
            }
        }
    }

    fn draw_dynamic_mesh(
        &mut self,
        mesh: &DynamicMesh,
        pipelines: &dyn PipelineSource,
        style: DrawStyle,
    ) {
        let Some(buffers) = &mesh.buffers else {
            return;
        };
        // Vertices of a triangle still being drawn are not rendered yet.
        let count = (buffers.vertex_buffer.size() / std::mem::size_of::<ColoredVertex>() as u64) as u32;
        let count = count - count % 3;
        if count == 0 {
            return;
        }
        let kind = style.shader.unwrap_or(ShaderKind::Colored);
        let Some(pipeline) = pipelines.pipeline(kind, style.wireframe) else {
            return;
        };
        self.set_pipeline(pipeline);
        self.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        self.draw(0..count, 0..1);
    }
}
