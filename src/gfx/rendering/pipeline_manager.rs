//! Render pipeline management
//!
//! One pipeline exists per (shader kind, wireframe) pair. All of them are
//! created up front so draw code can look them up through a shared reference
//! ([`PipelineSource`]).

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::gfx::resources::{global_bindings::ShaderKind, texture_resource::TextureResource};
use crate::gfx::scene::{
    mesh::PipelineSource,
    vertex::{ColoredVertex, LineVertex, TexturedVertex, Vertex, VertexLayout},
};

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: ShaderKind,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub polygon_mode: PolygonMode,
    pub depth_format: Option<TextureFormat>,
    pub multisample: MultisampleState,
    pub color_targets: Vec<Option<ColorTargetState>>,
}

impl PipelineConfig {
    pub fn new(shader: ShaderKind, color_format: TextureFormat) -> Self {
        let primitive_topology = match shader.vertex_layout() {
            VertexLayout::Line => PrimitiveTopology::LineList,
            _ => PrimitiveTopology::TriangleList,
        };
        // Models keep the winding of their file and objects may be mirrored
        // by a negative scale, so both faces are always drawn.
        Self {
            label: format!("{} pipeline", shader.label()),
            shader,
            bind_group_layouts: Vec::new(),
            primitive_topology,
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            depth_format: Some(TextureResource::DEPTH_FORMAT),
            multisample: MultisampleState::default(),
            color_targets: vec![Some(ColorTargetState {
                format: color_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_polygon_mode(mut self, mode: PolygonMode) -> Self {
        self.polygon_mode = mode;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_depth_format(mut self, format: Option<TextureFormat>) -> Self {
        self.depth_format = format;
        self
    }

    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }

    fn vertex_buffer_layout(&self) -> VertexBufferLayout<'static> {
        match self.shader.vertex_layout() {
            VertexLayout::Textured => TexturedVertex::desc(),
            VertexLayout::Colored => ColoredVertex::desc(),
            VertexLayout::Line => LineVertex::desc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    shader: ShaderKind,
    wireframe: bool,
}

/// Owns the compiled shaders and every pipeline built from them
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
    shader_modules: HashMap<ShaderKind, ShaderModule>,
    line_polygons: bool,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        let line_polygons = device.features().contains(Features::POLYGON_MODE_LINE);
        if !line_polygons {
            log::warn!("POLYGON_MODE_LINE unavailable; wireframe objects are drawn filled");
        }
        Self {
            device,
            pipelines: HashMap::new(),
            shader_modules: HashMap::new(),
            line_polygons,
        }
    }

    /// Compiles a built-in shader
    pub fn load_shader(&mut self, kind: ShaderKind) {
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(kind.label()),
            source: ShaderSource::Wgsl(kind.source().into()),
        });
        self.shader_modules.insert(kind, shader_module);
    }

    /// Builds the fill and wireframe pipelines for `config.shader`
    pub fn register_pipelines(&mut self, config: PipelineConfig) {
        if !self.shader_modules.contains_key(&config.shader) {
            self.load_shader(config.shader);
        }
        let shader = config.shader;

        let fill = self.create_pipeline_from_config(&config);
        self.pipelines.insert(
            PipelineKey {
                shader,
                wireframe: false,
            },
            fill,
        );

        let wireframe_mode = if self.line_polygons && config.primitive_topology != PrimitiveTopology::LineList {
            PolygonMode::Line
        } else {
            PolygonMode::Fill
        };
        let wireframe_config = config
            .clone()
            .with_label(&format!("{} (wireframe)", config.label))
            .with_polygon_mode(wireframe_mode)
            .with_cull_mode(None);
        let wireframe = self.create_pipeline_from_config(&wireframe_config);
        self.pipelines.insert(
            PipelineKey {
                shader,
                wireframe: true,
            },
            wireframe,
        );
        log::debug!("Registered pipelines for '{}'", shader.label());
    }

    fn create_pipeline_from_config(&self, config: &PipelineConfig) -> RenderPipeline {
        let shader = &self.shader_modules[&config.shader];

        let bind_group_layout_refs: Vec<&BindGroupLayout> = config.bind_group_layouts.iter().collect();
        let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", config.label)),
            bind_group_layouts: &bind_group_layout_refs,
            push_constant_ranges: &[],
        });

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&config.label),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[config.vertex_buffer_layout()],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &config.color_targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: config.primitive_topology,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: config.cull_mode,
                polygon_mode: config.polygon_mode,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: config.multisample,
            multiview: None,
            cache: None,
        })
    }

    pub fn supports_wireframe(&self) -> bool {
        self.line_polygons
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            total_pipelines: self.pipelines.len(),
            loaded_shaders: self.shader_modules.len(),
        }
    }
}

impl PipelineSource for PipelineManager {
    fn pipeline(&self, kind: ShaderKind, wireframe: bool) -> Option<&RenderPipeline> {
        self.pipelines.get(&PipelineKey {
            shader: kind,
            wireframe,
        })
    }
}

/// Statistics about pipeline manager state
#[derive(Debug)]
pub struct PipelineStats {
    pub total_pipelines: usize,
    pub loaded_shaders: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_follows_the_shader_kind() {
        let line = PipelineConfig::new(ShaderKind::Line, TextureFormat::Bgra8Unorm);
        assert_eq!(line.primitive_topology, PrimitiveTopology::LineList);
        assert_eq!(line.cull_mode, None);
        assert_eq!(line.vertex_buffer_layout().array_stride, 24);

        let textured = PipelineConfig::new(ShaderKind::Textured, TextureFormat::Bgra8Unorm);
        assert_eq!(textured.primitive_topology, PrimitiveTopology::TriangleList);
        assert_eq!(textured.cull_mode, None);
        assert_eq!(textured.depth_format, Some(TextureResource::DEPTH_FORMAT));

        let light = PipelineConfig::new(ShaderKind::Light, TextureFormat::Bgra8Unorm);
        assert_eq!(light.vertex_buffer_layout().array_stride, 32);
    }

    #[test]
    fn every_pipeline_draws_both_faces() {
        for kind in ShaderKind::ALL {
            let config = PipelineConfig::new(kind, TextureFormat::Rgba8Unorm);
            assert_eq!(config.cull_mode, None, "{}", kind.label());
        }
        let colored = PipelineConfig::new(ShaderKind::Colored, TextureFormat::Rgba8Unorm);
        assert_eq!(colored.vertex_buffer_layout().array_stride, 36);
    }
}
