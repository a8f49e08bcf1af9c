//! Uniform bindings shared by every pipeline
//!
//! Uniform data is split in two groups:
//! - group 0, [`GlobalUniforms`]: written once per frame (camera, light, time).
//! - group 1, [`ObjectUniform`]: one buffer per scene object (model and normal
//!   matrices).
//!
//! Not every shader reads every value. [`ShaderKind::uses`] is the table of
//! which [`UniformSlot`] each built-in shader consumes; values a shader does
//! not read are still laid out in the buffer but never computed for it.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    gfx::{camera::CameraUniform, math, scene::vertex::VertexLayout},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// A named uniform input of the built-in shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    Time,
    Resolution,
    View,
    Model,
    Projection,
    LightColor,
    LightPos,
    NormalModel,
    ViewPos,
}

impl UniformSlot {
    pub const ALL: [UniformSlot; 9] = [
        UniformSlot::Time,
        UniformSlot::Resolution,
        UniformSlot::View,
        UniformSlot::Model,
        UniformSlot::Projection,
        UniformSlot::LightColor,
        UniformSlot::LightPos,
        UniformSlot::NormalModel,
        UniformSlot::ViewPos,
    ];

    /// Field name inside the WGSL uniform structs
    pub fn field_name(self) -> &'static str {
        match self {
            UniformSlot::Time => "time",
            UniformSlot::Resolution => "resolution",
            UniformSlot::View => "view",
            UniformSlot::Model => "model",
            UniformSlot::Projection => "projection",
            UniformSlot::LightColor => "light_color",
            UniformSlot::LightPos => "light_pos",
            UniformSlot::NormalModel => "normal_model",
            UniformSlot::ViewPos => "view_pos",
        }
    }

    /// True for values stored per object rather than per frame
    pub fn is_per_object(self) -> bool {
        matches!(self, UniformSlot::Model | UniformSlot::NormalModel)
    }
}

/// The built-in shader programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Lit, sampled from a material texture
    Textured,
    /// Lit, flat grey; textured-layout meshes whose material has no texture
    Untextured,
    /// Lit, per-vertex colour (user-drawn objects)
    Colored,
    /// Unlit lines (axes gizmo)
    Line,
    /// Emissive, tinted by the light colour (light spheres)
    Light,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 5] = [
        ShaderKind::Textured,
        ShaderKind::Untextured,
        ShaderKind::Colored,
        ShaderKind::Line,
        ShaderKind::Light,
    ];

    pub fn uses(self, slot: UniformSlot) -> bool {
        use UniformSlot::*;
        match slot {
            View | Projection | Model => true,
            NormalModel | LightPos | ViewPos => self.is_lit(),
            LightColor => self.is_lit() || self == ShaderKind::Light,
            Time | Resolution => false,
        }
    }

    pub fn is_lit(self) -> bool {
        matches!(
            self,
            ShaderKind::Textured | ShaderKind::Untextured | ShaderKind::Colored
        )
    }

    pub fn vertex_layout(self) -> VertexLayout {
        match self {
            ShaderKind::Textured | ShaderKind::Untextured | ShaderKind::Light => {
                VertexLayout::Textured
            }
            ShaderKind::Colored => VertexLayout::Colored,
            ShaderKind::Line => VertexLayout::Line,
        }
    }

    /// Whether the pipeline binds a material texture at group 2
    pub fn samples_texture(self) -> bool {
        self == ShaderKind::Textured
    }

    pub fn label(self) -> &'static str {
        match self {
            ShaderKind::Textured => "textured",
            ShaderKind::Untextured => "untextured",
            ShaderKind::Colored => "colored",
            ShaderKind::Line => "line",
            ShaderKind::Light => "light",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            ShaderKind::Textured => include_str!("../rendering/shaders/textured.wgsl"),
            ShaderKind::Untextured => include_str!("../rendering/shaders/untextured.wgsl"),
            ShaderKind::Colored => include_str!("../rendering/shaders/colored.wgsl"),
            ShaderKind::Line => include_str!("../rendering/shaders/line.wgsl"),
            ShaderKind::Light => include_str!("../rendering/shaders/light.wgsl"),
        }
    }
}

/// Per-frame uniform block (group 0)
///
/// MUST match the `Globals` struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
    pub light_pos: [f32; 4],
    pub light_color: [f32; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    _padding: f32,
}
// 64 + 64 + 16 + 16 + 16 + 8 + 4 + 4 = 192 bytes

impl Default for GlobalUniforms {
    fn default() -> Self {
        Self {
            view: math::to_array(Matrix4::identity()),
            projection: math::to_array(Matrix4::identity()),
            view_pos: [0.0; 4],
            light_pos: [0.0, 0.0, 0.0, 1.0],
            light_color: [1.0, 1.0, 1.0, 1.0],
            resolution: [1.0, 1.0],
            time: 0.0,
            _padding: 0.0,
        }
    }
}

/// Scene light as seen by the shaders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    pub position: Vector3<f32>,
    /// Linear RGB in 0..1
    pub color: [f32; 3],
}

impl GlobalUniforms {
    pub fn new(
        camera: CameraUniform,
        light: LightState,
        resolution: (u32, u32),
        time: f32,
    ) -> Self {
        Self {
            view: camera.view,
            projection: camera.projection,
            view_pos: camera.view_position,
            light_pos: light.position.extend(1.0).into(),
            light_color: [light.color[0], light.color[1], light.color[2], 1.0],
            resolution: [resolution.0 as f32, resolution.1 as f32],
            time,
            _padding: 0.0,
        }
    }
}

/// Per-object uniform block (group 1)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_model: [[f32; 4]; 4],
}

impl ObjectUniform {
    /// The normal matrix is only computed when the shader reads it
    pub fn new(kind: ShaderKind, model: Matrix4<f32>) -> Self {
        let normal_model = if kind.uses(UniformSlot::NormalModel) {
            math::normal_matrix(model)
        } else {
            Matrix4::identity()
        };
        Self {
            model: math::to_array(model),
            normal_model: math::to_array(normal_model),
        }
    }
}

pub type GlobalUBO = UniformBuffer<GlobalUniforms>;
pub type ObjectUBO = UniformBuffer<ObjectUniform>;

/// Layouts and the per-frame bind group shared by all pipelines
pub struct GlobalBindings {
    global_layout: BindGroupLayoutWithDesc,
    object_layout: BindGroupLayoutWithDesc,
    texture_layout: BindGroupLayoutWithDesc,
    ubo: GlobalUBO,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let global_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group");
        let object_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(device, "Object Bind Group");
        let texture_layout = super::texture_resource::TextureResource::bind_group_layout(device);

        let ubo = GlobalUBO::new_with_data(device, &GlobalUniforms::default());
        let bind_group = BindGroupBuilder::new(&global_layout)
            .resource(ubo.binding_resource())
            .create(device, "Global Bind Group");

        Self {
            global_layout,
            object_layout,
            texture_layout,
            ubo,
            bind_group,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, content: GlobalUniforms) {
        self.ubo.update_content(queue, content);
    }

    pub fn global_layout(&self) -> &wgpu::BindGroupLayout {
        &self.global_layout.layout
    }

    pub fn object_layout(&self) -> &BindGroupLayoutWithDesc {
        &self.object_layout
    }

    pub fn texture_layout(&self) -> &BindGroupLayoutWithDesc {
        &self.texture_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_shader_reads_the_transform_chain() {
        for kind in ShaderKind::ALL {
            assert!(kind.uses(UniformSlot::Model), "{kind:?}");
            assert!(kind.uses(UniformSlot::View), "{kind:?}");
            assert!(kind.uses(UniformSlot::Projection), "{kind:?}");
        }
    }

    #[test]
    fn only_lit_shaders_read_lighting() {
        for kind in ShaderKind::ALL {
            assert_eq!(kind.uses(UniformSlot::LightPos), kind.is_lit());
            assert_eq!(kind.uses(UniformSlot::NormalModel), kind.is_lit());
            assert_eq!(kind.uses(UniformSlot::ViewPos), kind.is_lit());
        }
        assert!(ShaderKind::Light.uses(UniformSlot::LightColor));
        assert!(!ShaderKind::Line.uses(UniformSlot::LightColor));
    }

    #[test]
    fn every_slot_is_used_or_declared_spare() {
        for slot in UniformSlot::ALL {
            let used = ShaderKind::ALL.iter().any(|kind| kind.uses(slot));
            let spare = matches!(slot, UniformSlot::Time | UniformSlot::Resolution);
            assert!(used != spare, "{slot:?}");
        }
    }

    #[test]
    fn every_slot_appears_in_a_shader_struct() {
        let sources: String = ShaderKind::ALL.iter().map(|k| k.source()).collect();
        for slot in UniformSlot::ALL {
            assert!(sources.contains(slot.field_name()), "{slot:?}");
        }
    }

    #[test]
    fn normal_matrix_skipped_for_unlit_shaders() {
        let model = math::scale(2.0);
        let lit = ObjectUniform::new(ShaderKind::Colored, model);
        let line = ObjectUniform::new(ShaderKind::Line, model);
        assert_eq!(lit.normal_model[0][0], 0.5);
        assert_eq!(line.normal_model, math::to_array(Matrix4::identity()));
        assert_eq!(lit.model, line.model);
    }

    #[test]
    fn uniform_block_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<GlobalUniforms>(), 192);
        assert_eq!(std::mem::size_of::<ObjectUniform>() % 16, 0);
    }
}
