// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles textures, materials, uniform buffers and bind groups for rendering.

pub mod global_bindings;
pub mod material;
pub mod texture_resource;

pub use global_bindings::{
    GlobalBindings, GlobalUniforms, LightState, ObjectUniform, ShaderKind, UniformSlot,
};
pub use material::{Material, Texture, TextureBinding, TextureImage};
pub use texture_resource::TextureResource;
