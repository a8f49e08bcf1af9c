//! Scene objects and their transforms
//!
//! A [`SceneObject`] owns its meshes and a [`Transform`]. The model matrix is
//! derived state: every mutation goes through [`TransformEdit::commit`], which
//! stores the new transform and recomputes the matrix in the same step, so the
//! two can never be observed out of sync.

use std::path::PathBuf;

use cgmath::{Matrix4, Vector3};

use crate::gfx::geometry::{generate_uv_sphere, primitives::MIN_SECTORS};
use crate::gfx::math::{self, CompositionOrder};
use crate::gfx::resources::{
    global_bindings::{GlobalBindings, ObjectUBO, ObjectUniform, ShaderKind},
    material::{Material, TextureBinding},
};
use crate::wgpu_utils::binding_builder::BindGroupBuilder;

use super::mesh::{DrawMesh, DrawStyle, DynamicMesh, PipelineSource, StaticMesh};
use super::vertex::{LineVertex, TexturedVertex};

/// Smallest magnitude a scale factor is clamped to
pub const MIN_SCALE: f32 = 1e-4;

pub const SPHERE_RADIUS_RANGE: (f32, f32) = (1.0, 100.0);
pub const SPHERE_SEGMENT_RANGE: (u32, u32) = (MIN_SECTORS, 100);

/// Position, rotation and uniform scale of an object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    /// Degrees about X (pitch), Y (yaw) and Z (roll)
    pub rotation: Vector3<f32>,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn matrix(&self, order: CompositionOrder) -> Matrix4<f32> {
        math::compose(order, self.position, self.rotation, self.scale)
    }
}

/// Where an object's geometry came from
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    Loaded { path: PathBuf },
    ProceduralSphere { radius: f32, sectors: u32, stacks: u32 },
    UserDrawn,
    Axes,
}

/// What an object does in the scene besides being drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectRole {
    Standard,
    /// Drives the scene light; colour in 0..1 RGB
    Light { color: [f32; 3] },
}

/// Mesh owned by an object, tagged by vertex format
#[derive(Debug)]
pub enum ObjectMesh {
    Textured(StaticMesh<TexturedVertex>),
    Lines(StaticMesh<LineVertex>),
    Dynamic(DynamicMesh),
}

impl ObjectMesh {
    pub fn vertex_count(&self) -> usize {
        match self {
            ObjectMesh::Textured(mesh) => mesh.vertex_count(),
            ObjectMesh::Lines(mesh) => mesh.vertex_count(),
            ObjectMesh::Dynamic(mesh) => mesh.vertex_count(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            ObjectMesh::Textured(mesh) => mesh.triangle_count(),
            ObjectMesh::Lines(_) => 0,
            ObjectMesh::Dynamic(mesh) => mesh.triangle_count(),
        }
    }
}

struct ObjectGpuResources {
    ubo: ObjectUBO,
    bind_group: wgpu::BindGroup,
}

/// An object placed in the world
pub struct SceneObject {
    pub name: String,
    transform: Transform,
    order: CompositionOrder,
    model_matrix: Matrix4<f32>,
    pub wireframe: bool,
    pub visible: bool,
    meshes: Vec<ObjectMesh>,
    source: GeometrySource,
    role: ObjectRole,
    gpu_resources: Option<ObjectGpuResources>,
}

impl std::fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObject")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("order", &self.order)
            .field("wireframe", &self.wireframe)
            .field("meshes", &self.meshes.len())
            .field("source", &self.source)
            .field("role", &self.role)
            .finish()
    }
}

impl SceneObject {
    pub fn new(
        name: impl Into<String>,
        meshes: Vec<ObjectMesh>,
        source: GeometrySource,
        transform: Transform,
    ) -> Self {
        let order = match source {
            GeometrySource::UserDrawn => CompositionOrder::TranslateRotateScale,
            _ => CompositionOrder::ScaleRotateTranslate,
        };
        Self {
            name: name.into(),
            transform,
            order,
            model_matrix: transform.matrix(order),
            wireframe: false,
            visible: true,
            meshes,
            source,
            role: ObjectRole::Standard,
            gpu_resources: None,
        }
    }

    pub fn with_role(mut self, role: ObjectRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_order(mut self, order: CompositionOrder) -> Self {
        self.order = order;
        self.model_matrix = self.transform.matrix(order);
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.transform.rotation
    }

    pub fn scale(&self) -> f32 {
        self.transform.scale
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.model_matrix
    }

    pub fn composition_order(&self) -> CompositionOrder {
        self.order
    }

    pub fn source(&self) -> &GeometrySource {
        &self.source
    }

    pub fn role(&self) -> ObjectRole {
        self.role
    }

    pub fn is_light(&self) -> bool {
        matches!(self.role, ObjectRole::Light { .. })
    }

    pub fn meshes(&self) -> &[ObjectMesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [ObjectMesh] {
        &mut self.meshes
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(ObjectMesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(ObjectMesh::triangle_count).sum()
    }

    /// Starts a transform change; nothing is applied until `commit`
    pub fn edit(&mut self) -> TransformEdit<'_> {
        TransformEdit {
            pending: self.transform,
            object: self,
        }
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.edit().with_position(x, y, z).commit();
    }

    pub fn translate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.edit().with_translation(dx, dy, dz).commit();
    }

    pub fn set_rotation_x(&mut self, degrees: f32) {
        self.edit().with_rotation_x(degrees).commit();
    }

    pub fn set_rotation_y(&mut self, degrees: f32) {
        self.edit().with_rotation_y(degrees).commit();
    }

    pub fn set_rotation_z(&mut self, degrees: f32) {
        self.edit().with_rotation_z(degrees).commit();
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.edit().with_scale(scale).commit();
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.wireframe = wireframe;
    }

    /// Sets the light colour; ignored for objects that are not lights
    pub fn set_light_color(&mut self, color: [f32; 3]) {
        if let ObjectRole::Light { color: current } = &mut self.role {
            *current = color.map(|c| c.clamp(0.0, 1.0));
        }
    }

    pub(crate) fn dynamic_mesh_mut(&mut self) -> Option<&mut DynamicMesh> {
        self.meshes.iter_mut().find_map(|mesh| match mesh {
            ObjectMesh::Dynamic(dynamic) => Some(dynamic),
            _ => None,
        })
    }

    /// Rebuilds a sphere with new tessellation, keeping its texture
    ///
    /// Values are clamped to the accepted ranges. Returns false (and changes
    /// nothing) when the object is not a procedural sphere.
    pub fn regenerate_sphere(&mut self, radius: f32, sectors: u32, stacks: u32) -> bool {
        if !matches!(self.source, GeometrySource::ProceduralSphere { .. }) {
            return false;
        }
        let radius = if radius.is_finite() {
            radius.clamp(SPHERE_RADIUS_RANGE.0, SPHERE_RADIUS_RANGE.1)
        } else {
            SPHERE_RADIUS_RANGE.0
        };
        let sectors = sectors.clamp(SPHERE_SEGMENT_RANGE.0, SPHERE_SEGMENT_RANGE.1);
        let stacks = stacks.clamp(SPHERE_SEGMENT_RANGE.0, SPHERE_SEGMENT_RANGE.1);

        let texture = self
            .meshes
            .drain(..)
            .find_map(|mesh| match mesh {
                ObjectMesh::Textured(mesh) => mesh.into_materials().into_iter().next(),
                _ => None,
            })
            .map_or(TextureBinding::Untextured, |material| material.texture);

        self.meshes = vec![sphere_mesh(radius, sectors, stacks, texture)];
        self.source = GeometrySource::ProceduralSphere {
            radius,
            sectors,
            stacks,
        };
        log::debug!(
            "Regenerated '{}' with radius {radius}, {sectors} sectors, {stacks} stacks",
            self.name
        );
        true
    }

    /// Shader whose uniform needs decide what the object uniform carries
    fn uniform_shader(&self) -> ShaderKind {
        match (self.role, self.meshes.first()) {
            (ObjectRole::Light { .. }, _) => ShaderKind::Light,
            (_, Some(ObjectMesh::Lines(_))) => ShaderKind::Line,
            (_, Some(ObjectMesh::Dynamic(_))) => ShaderKind::Colored,
            _ => ShaderKind::Textured,
        }
    }

    pub fn uniform(&self) -> ObjectUniform {
        ObjectUniform::new(self.uniform_shader(), self.model_matrix)
    }

    /// Creates or refreshes GPU resources: meshes, textures and the transform uniform
    pub fn sync_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &GlobalBindings,
    ) {
        for mesh in &mut self.meshes {
            match mesh {
                ObjectMesh::Textured(mesh) => mesh.sync(device, queue, bindings.texture_layout()),
                ObjectMesh::Lines(mesh) => mesh.sync(device, queue, bindings.texture_layout()),
                ObjectMesh::Dynamic(mesh) => mesh.sync(device),
            }
        }

        let uniform = self.uniform();
        match &mut self.gpu_resources {
            Some(resources) => resources.ubo.update_content(queue, uniform),
            None => {
                let ubo = ObjectUBO::new_with_data(device, &uniform);
                let bind_group = BindGroupBuilder::new(bindings.object_layout())
                    .resource(ubo.binding_resource())
                    .create(device, &format!("{} Transform Bind Group", self.name));
                self.gpu_resources = Some(ObjectGpuResources { ubo, bind_group });
            }
        }
    }

    /// Binds the transform uniform then draws every mesh
    ///
    /// Expects the global bind group to be set already.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, pipelines: &dyn PipelineSource) {
        let Some(resources) = &self.gpu_resources else {
            return;
        };
        if !self.visible {
            return;
        }
        render_pass.set_bind_group(1, &resources.bind_group, &[]);

        let style = DrawStyle {
            wireframe: self.wireframe,
            shader: self.is_light().then_some(ShaderKind::Light),
        };
        for mesh in &self.meshes {
            match mesh {
                ObjectMesh::Textured(mesh) => render_pass.draw_static_mesh(mesh, pipelines, style),
                ObjectMesh::Lines(mesh) => render_pass.draw_static_mesh(mesh, pipelines, style),
                ObjectMesh::Dynamic(mesh) => render_pass.draw_dynamic_mesh(mesh, pipelines, style),
            }
        }
    }
}

/// Builds the single-material mesh of a sphere
pub fn sphere_mesh(radius: f32, sectors: u32, stacks: u32, texture: TextureBinding) -> ObjectMesh {
    let geometry = generate_uv_sphere(radius, sectors, stacks);
    let material = Material::new("sphere", geometry.to_textured_vertices(), texture)
        .with_indices(geometry.indices);
    ObjectMesh::Textured(StaticMesh::new("sphere", vec![material]))
}

/// Pending transform change
///
/// Builder methods only touch the pending copy. `commit` writes it to the
/// object and recomputes the model matrix. Non-finite inputs are ignored.
#[must_use = "a transform edit does nothing until committed"]
pub struct TransformEdit<'a> {
    object: &'a mut SceneObject,
    pending: Transform,
}

impl TransformEdit<'_> {
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        let position = Vector3::new(x, y, z);
        if is_finite(position) {
            self.pending.position = position;
        }
        self
    }

    pub fn with_translation(mut self, dx: f32, dy: f32, dz: f32) -> Self {
        let delta = Vector3::new(dx, dy, dz);
        if is_finite(delta) {
            self.pending.position += delta;
        }
        self
    }

    pub fn with_rotation_x(mut self, degrees: f32) -> Self {
        if degrees.is_finite() {
            self.pending.rotation.x = degrees;
        }
        self
    }

    pub fn with_rotation_y(mut self, degrees: f32) -> Self {
        if degrees.is_finite() {
            self.pending.rotation.y = degrees;
        }
        self
    }

    pub fn with_rotation_z(mut self, degrees: f32) -> Self {
        if degrees.is_finite() {
            self.pending.rotation.z = degrees;
        }
        self
    }

    /// Uniform scale; magnitudes below [`MIN_SCALE`] are raised to it
    pub fn with_scale(mut self, scale: f32) -> Self {
        if scale.is_finite() {
            self.pending.scale = if scale.abs() < MIN_SCALE {
                MIN_SCALE.copysign(scale)
            } else {
                scale
            };
        }
        self
    }

    /// Applies the pending transform; returns the new model matrix
    pub fn commit(self) -> Matrix4<f32> {
        self.object.transform = self.pending;
        self.object.model_matrix = self.pending.matrix(self.object.order);
        self.object.model_matrix
    }
}

fn is_finite(v: Vector3<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
