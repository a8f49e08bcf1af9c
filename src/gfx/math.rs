//! Matrix and vector helpers
//!
//! Thin, pure functions over `cgmath` types. Matrices are column-major and act
//! on column vectors (`clip = projection * view * model * v`), which is what the
//! WGSL shaders consume.
//!
//! Object transforms are composed as `T * Rx * Ry * Rz * S`: a vertex is
//! scaled first, then rolled about Z, turned about Y, tilted about X and
//! finally translated. Written for row vectors this is the familiar
//! `S * Rz * Ry * Rx * T`; every call site in the crate goes through
//! [`compose`] so the order cannot drift.

use cgmath::{Deg, InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3, Vector4, Zero};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Below this length a cross product is treated as "parallel"
const PARALLEL_EPSILON: f32 = 1e-6;

/// How a transform's pieces are multiplied together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionOrder {
    /// `T * Rx * Ry * Rz * S`. Scale and rotate in local space, then place.
    #[default]
    ScaleRotateTranslate,
    /// `S * Rz * Ry * Rx * T`. The mirrored order, used for free-drawn objects
    /// whose vertices are already expressed in world space.
    TranslateRotateScale,
}

pub fn translate(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(x, y, z))
}

pub fn rotate_x(degrees: f32) -> Matrix4<f32> {
    Matrix4::from_angle_x(Deg(degrees))
}

pub fn rotate_y(degrees: f32) -> Matrix4<f32> {
    Matrix4::from_angle_y(Deg(degrees))
}

pub fn rotate_z(degrees: f32) -> Matrix4<f32> {
    Matrix4::from_angle_z(Deg(degrees))
}

pub fn scale(factor: f32) -> Matrix4<f32> {
    Matrix4::from_scale(factor)
}

/// Builds a model matrix from position, per-axis rotation (degrees) and uniform scale
pub fn compose(
    order: CompositionOrder,
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    factor: f32,
) -> Matrix4<f32> {
    let t = Matrix4::from_translation(position);
    let rx = rotate_x(rotation.x);
    let ry = rotate_y(rotation.y);
    let rz = rotate_z(rotation.z);
    let s = scale(factor);

    match order {
        CompositionOrder::ScaleRotateTranslate => t * rx * ry * rz * s,
        CompositionOrder::TranslateRotateScale => s * rz * ry * rx * t,
    }
}

/// OpenGL-style perspective projection, or `None` for degenerate parameters
///
/// Rejects `aspect <= 0`, `near <= 0`, `near >= far` and a field of view
/// outside the open interval (0°, 180°).
pub fn checked_perspective(
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
) -> Option<Matrix4<f32>> {
    let valid = aspect.is_finite()
        && aspect > 0.0
        && near > 0.0
        && near < far
        && far.is_finite()
        && fov_degrees > 0.0
        && fov_degrees < 180.0;
    if !valid {
        return None;
    }

    let f = 1.0 / (fov_degrees.to_radians() / 2.0).tan();
    let depth = near - far;

    #[rustfmt::skip]
    let m = Matrix4::new(
        f / aspect, 0.0, 0.0,                         0.0,
        0.0,        f,   0.0,                         0.0,
        0.0,        0.0, (far + near) / depth,       -1.0,
        0.0,        0.0, (2.0 * far * near) / depth,  0.0,
    );
    Some(m)
}

/// Perspective projection that falls back to identity on degenerate input
pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    checked_perspective(fov_degrees, aspect, near, far).unwrap_or_else(Matrix4::identity)
}

/// Orthographic projection, or `None` when any extent is empty
pub fn checked_orthographic(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
) -> Option<Matrix4<f32>> {
    if left == right || bottom == top || near == far {
        return None;
    }
    Some(cgmath::ortho(left, right, bottom, top, near, far))
}

/// Orthographic projection that falls back to identity on degenerate input
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4<f32> {
    checked_orthographic(left, right, bottom, top, near, far).unwrap_or_else(Matrix4::identity)
}

/// Right-handed view matrix looking from `eye` towards the point `target`
///
/// A zero-length view direction yields identity. When `up` is parallel to the
/// view direction another world axis is substituted so the result stays finite.
pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    let f = normalize(target - eye);
    if f.is_zero() {
        return Matrix4::identity();
    }

    let mut s = f.cross(normalize(up));
    if s.magnitude() < PARALLEL_EPSILON {
        let fallback = if f.z.abs() < 0.999 {
            Vector3::unit_z()
        } else {
            Vector3::unit_x()
        };
        s = f.cross(fallback);
    }
    let s = normalize(s);
    let u = s.cross(f);

    #[rustfmt::skip]
    let m = Matrix4::new(
        s.x,          u.x,          -f.x,        0.0,
        s.y,          u.y,          -f.y,        0.0,
        s.z,          u.z,          -f.z,        0.0,
        -s.dot(eye), -u.dot(eye),   f.dot(eye),  1.0,
    );
    m
}

/// View matrix looking from `eye` along `direction`
pub fn look_to(eye: Vector3<f32>, direction: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    look_at(eye, eye + direction, up)
}

/// Unit vector in the direction of `v`; the zero vector is returned unchanged
pub fn normalize(v: Vector3<f32>) -> Vector3<f32> {
    let len = v.magnitude();
    if len == 0.0 || !len.is_finite() {
        v
    } else {
        v / len
    }
}

pub fn cross(a: Vector3<f32>, b: Vector3<f32>) -> Vector3<f32> {
    a.cross(b)
}

pub fn dot(a: Vector3<f32>, b: Vector3<f32>) -> f32 {
    a.dot(b)
}

/// Inverse-transpose of the model matrix, for transforming normals
///
/// A singular model (scale 0) has no meaningful normal transform, identity is used.
pub fn normal_matrix(model: Matrix4<f32>) -> Matrix4<f32> {
    model
        .invert()
        .map(|inv| inv.transpose())
        .unwrap_or_else(Matrix4::identity)
}

/// Transforms a point and divides by `w`
pub fn project_point(matrix: Matrix4<f32>, point: Vector3<f32>) -> Option<Vector3<f32>> {
    let clip = matrix * Vector4::new(point.x, point.y, point.z, 1.0);
    if clip.w.abs() < f32::EPSILON {
        return None;
    }
    Some(clip.truncate() / clip.w)
}

pub fn to_array(matrix: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_zero_vector_is_zero() {
        let v = normalize(Vector3::zero());
        assert_eq!(v, Vector3::new(0.0, 0.0, 0.0));
        assert!(!v.x.is_nan());
    }

    #[test]
    fn normalize_gives_unit_length() {
        let v = normalize(Vector3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(v.magnitude(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn neutral_composition_is_identity() {
        let m = scale(1.0) * rotate_x(0.0) * rotate_y(0.0) * rotate_z(0.0) * translate(0.0, 0.0, 0.0);
        assert_relative_eq!(m, Matrix4::identity(), epsilon = 1e-6);

        for order in [
            CompositionOrder::ScaleRotateTranslate,
            CompositionOrder::TranslateRotateScale,
        ] {
            let m = compose(order, Vector3::zero(), Vector3::zero(), 1.0);
            assert_relative_eq!(m, Matrix4::identity(), epsilon = 1e-6);
        }
    }

    #[test]
    fn rotation_is_right_handed() {
        let p = rotate_z(90.0) * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p, Vector4::new(0.0, 1.0, 0.0, 1.0), epsilon = 1e-6);

        let p = rotate_x(90.0) * Vector4::new(0.0, 1.0, 0.0, 1.0);
        assert_relative_eq!(p, Vector4::new(0.0, 0.0, 1.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn standard_order_scales_before_translating() {
        let m = compose(
            CompositionOrder::ScaleRotateTranslate,
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::zero(),
            2.0,
        );
        let p = m * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 12.0, epsilon = 1e-5);
    }

    #[test]
    fn mirrored_order_scales_the_translation() {
        let m = compose(
            CompositionOrder::TranslateRotateScale,
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::zero(),
            2.0,
        );
        let p = m * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 22.0, epsilon = 1e-5);
    }

    #[test]
    fn forward_point_projects_to_screen_centre() {
        let eye = Vector3::new(0.0, 0.0, 3.0);
        let forward = Vector3::new(0.0, 0.0, -1.0);
        let view = look_to(eye, forward, Vector3::unit_y());
        let proj = perspective(60.0, 1.0, 0.1, 100.0);
        let model: Matrix4<f32> = Matrix4::identity();

        let ndc = project_point(proj * view * model, eye + forward * 5.0).unwrap();
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn degenerate_perspective_is_rejected() {
        assert!(checked_perspective(60.0, 0.0, 0.1, 100.0).is_none());
        assert!(checked_perspective(60.0, -1.0, 0.1, 100.0).is_none());
        assert!(checked_perspective(60.0, 1.0, 10.0, 10.0).is_none());
        assert!(checked_perspective(60.0, 1.0, 100.0, 0.1).is_none());
        assert_eq!(perspective(60.0, 0.0, 0.1, 100.0), Matrix4::identity());
    }

    #[test]
    fn look_at_with_parallel_up_stays_finite() {
        let m = look_at(Vector3::zero(), Vector3::new(0.0, 5.0, 0.0), Vector3::unit_y());
        let cols: [[f32; 4]; 4] = m.into();
        assert!(cols.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn look_at_without_direction_is_identity() {
        let eye = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(look_at(eye, eye, Vector3::unit_y()), Matrix4::identity());
    }

    #[test]
    fn singular_model_has_identity_normal_matrix() {
        assert_eq!(normal_matrix(scale(0.0)), Matrix4::identity());
    }

    #[test]
    fn orthographic_rejects_empty_extent() {
        assert!(checked_orthographic(1.0, 1.0, -1.0, 1.0, 0.1, 10.0).is_none());
        assert!(checked_orthographic(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0).is_some());
    }
}
