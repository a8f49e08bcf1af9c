//! # Primitive Shape Generation
//!
//! All shapes are generated with outward normals and texture coordinates.

use super::GeometryData;
use crate::gfx::scene::vertex::LineVertex;
use std::f32::consts::PI;

pub const MIN_SECTORS: u32 = 3;
pub const MIN_STACKS: u32 = 2;

/// Generate a UV sphere centered at the origin, Y up
///
/// The grid has `(stacks + 1) * (sectors + 1)` vertices: one row per stack
/// boundary from the north pole down, with the seam column duplicated so
/// texture coordinates can wrap. Normals are `position / radius`.
///
/// The first and last bands touch a pole, so they emit one triangle per
/// sector; every other band emits two. That is `2 * sectors * (stacks - 1)`
/// triangles in total.
///
/// Texture coordinates use a bottom-left origin: `v = 1` at the north pole.
pub fn generate_uv_sphere(radius: f32, sectors: u32, stacks: u32) -> GeometryData {
    let radius = if radius.is_finite() && radius > 0.0 {
        radius
    } else {
        1.0
    };
    let sectors = sectors.max(MIN_SECTORS);
    let stacks = stacks.max(MIN_STACKS);

    let mut data = GeometryData::new();
    let sector_step = 2.0 * PI / sectors as f32;
    let stack_step = PI / stacks as f32;

    for i in 0..=stacks {
        let stack_angle = PI / 2.0 - i as f32 * stack_step;
        let ring = radius * stack_angle.cos();
        let y = radius * stack_angle.sin();

        for j in 0..=sectors {
            let sector_angle = j as f32 * sector_step;
            let x = ring * sector_angle.cos();
            let z = -ring * sector_angle.sin();

            data.vertices.push([x, y, z]);
            data.normals.push([x / radius, y / radius, z / radius]);
            data.tex_coords
                .push([j as f32 / sectors as f32, 1.0 - i as f32 / stacks as f32]);
        }
    }

    for i in 0..stacks {
        let k1 = i * (sectors + 1);
        let k2 = k1 + sectors + 1;

        for j in 0..sectors {
            let (a, b) = (k1 + j, k2 + j);
            if i != 0 {
                data.indices.extend_from_slice(&[a, b, a + 1]);
            }
            if i != stacks - 1 {
                data.indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }

    data
}

/// Expected triangle count of [`generate_uv_sphere`]
pub fn uv_sphere_triangle_count(sectors: u32, stacks: u32) -> usize {
    let sectors = sectors.max(MIN_SECTORS) as usize;
    let stacks = stacks.max(MIN_STACKS) as usize;
    2 * sectors * (stacks - 1)
}

/// Three unit lines from the origin: X red, Y green, -Z blue
pub fn generate_axes() -> Vec<LineVertex> {
    const RED: [f32; 3] = [1.0, 0.0, 0.0];
    const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
    const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
    vec![
        LineVertex::new([0.0, 0.0, 0.0], RED),
        LineVertex::new([1.0, 0.0, 0.0], RED),
        LineVertex::new([0.0, 0.0, 0.0], GREEN),
        LineVertex::new([0.0, 1.0, 0.0], GREEN),
        LineVertex::new([0.0, 0.0, 0.0], BLUE),
        LineVertex::new([0.0, 0.0, -1.0], BLUE),
    ]
}
