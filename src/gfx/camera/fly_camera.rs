use std::collections::HashSet;

use cgmath::{InnerSpace, Matrix4, Vector3, Zero};

use crate::config::CameraConfig;
use crate::gfx::math;

use super::camera_controller::MovementKey;
use super::camera_utils::Camera;

pub const FOV_MIN: f32 = 1.0;
pub const FOV_MAX: f32 = 140.0;

/// Pitch stays strictly inside (-89°, 89°)
const PITCH_LIMIT: f32 = 89.0 - 1e-3;

/// Frame length the resistance factor is expressed against (60 Hz)
const REFERENCE_FRAME: f32 = 1.0 / 60.0;

/// Longest step integrated at once; a stalled frame must not fling the camera
const MAX_STEP: f32 = 0.25;

/// Below this speed the camera is considered at rest
const REST_SPEED: f32 = 1e-4;

/// Free-fly camera driven by held movement keys, mouse look and wheel zoom
///
/// All angles are in degrees. `view_direction` is never set directly: it is
/// re-derived from yaw and pitch after every look update, so it is always
/// unit length. Out-of-range input is clamped, never rejected.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vector3<f32>,
    view_direction: Vector3<f32>,
    up: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    fov: f32,
    velocity: Vector3<f32>,
    pub movement_speed: f32,
    pub resistance: f32,
    pub mouse_sensitivity: f32,
    pub wheel_sensitivity: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

impl Camera for FlyCamera {
    fn build_view_projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        self.projection(aspect) * self.view_matrix()
    }
}

impl FlyCamera {
    pub fn new(config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: Vector3::from(config.position),
            view_direction: -Vector3::unit_z(),
            up: Vector3::unit_y(),
            yaw: 0.0,
            pitch: 0.0,
            fov: config.fov.clamp(FOV_MIN, FOV_MAX),
            velocity: Vector3::zero(),
            movement_speed: config.movement_speed,
            resistance: config.resistance.clamp(0.0, 0.99),
            mouse_sensitivity: config.mouse_sensitivity,
            wheel_sensitivity: config.wheel_sensitivity,
            znear: config.znear,
            zfar: config.zfar,
        };
        camera.set_orientation(config.yaw, config.pitch);
        camera
    }

    pub fn view_direction(&self) -> Vector3<f32> {
        self.view_direction
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    /// Unit vector pointing to the camera's right
    pub fn right(&self) -> Vector3<f32> {
        math::normalize(self.view_direction.cross(self.up))
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn set_fov(&mut self, degrees: f32) {
        if degrees.is_nan() {
            return;
        }
        self.fov = degrees.clamp(FOV_MIN, FOV_MAX);
    }

    /// Sets yaw and pitch, wrapping yaw and clamping pitch
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        if yaw.is_finite() {
            self.yaw = wrap_yaw(yaw);
        }
        if !pitch.is_nan() {
            self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_view_direction();
    }

    /// Applies a mouse-look delta in pixels
    pub fn look(&mut self, dx: f32, dy: f32) {
        let dx = if dx.is_finite() { dx } else { 0.0 };
        let dy = if dy.is_finite() { dy } else { 0.0 };
        self.set_orientation(
            self.yaw + dx * self.mouse_sensitivity,
            self.pitch + dy * self.mouse_sensitivity,
        );
    }

    /// Applies wheel ticks; positive ticks zoom in (narrow the field of view)
    pub fn zoom(&mut self, ticks: f32) {
        if !ticks.is_finite() {
            return;
        }
        self.set_fov(self.fov - ticks * self.wheel_sensitivity);
    }

    /// Moves the camera for one frame of held movement keys
    ///
    /// With a non-zero resistance the keys apply a force: velocity integrates
    /// it, the position integrates velocity, and velocity then decays by the
    /// resistance factor (per 1/60 s), so starts and stops are eased. With zero
    /// resistance the camera moves at `movement_speed` exactly while keys are
    /// held and stops as soon as they are released.
    pub fn advance(&mut self, pressed: &HashSet<MovementKey>, elapsed: f32) {
        if !elapsed.is_finite() || elapsed <= 0.0 {
            return;
        }
        let dt = elapsed.min(MAX_STEP);
        let direction = self.movement_direction(pressed);

        if self.resistance <= 0.0 {
            self.velocity = direction * self.movement_speed;
            self.position += self.velocity * dt;
            return;
        }

        let r = self.resistance;
        // A held key settles at `movement_speed` at the reference frame rate.
        let acceleration = direction * (self.movement_speed * (1.0 - r) / REFERENCE_FRAME);
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
        self.velocity *= r.powf(dt / REFERENCE_FRAME);

        if self.velocity.magnitude() < REST_SPEED {
            self.velocity = Vector3::zero();
        }
    }

    /// Stops any residual motion
    pub fn halt(&mut self) {
        self.velocity = Vector3::zero();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        math::look_to(self.position, self.view_direction, self.up)
    }

    /// Perspective projection; identity when the aspect ratio is degenerate
    pub fn projection(&self, aspect: f32) -> Matrix4<f32> {
        math::perspective(self.fov, aspect, self.znear, self.zfar)
    }

    /// Point `distance` units straight ahead of the camera
    pub fn point_ahead(&self, distance: f32) -> Vector3<f32> {
        self.position + self.view_direction * distance
    }

    fn movement_direction(&self, pressed: &HashSet<MovementKey>) -> Vector3<f32> {
        let right = self.right();
        let direction = pressed
            .iter()
            .fold(Vector3::zero(), |acc, key| match key {
                MovementKey::Forward => acc + self.view_direction,
                MovementKey::Backward => acc - self.view_direction,
                MovementKey::Left => acc - right,
                MovementKey::Right => acc + right,
                MovementKey::Up => acc + Vector3::unit_y(),
                MovementKey::Down => acc - Vector3::unit_y(),
            });
        math::normalize(direction)
    }

    fn update_view_direction(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.view_direction = math::normalize(Vector3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        ));
    }
}

/// Wraps an angle into (-180°, 180°]
fn wrap_yaw(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn keys(list: &[MovementKey]) -> HashSet<MovementKey> {
        list.iter().copied().collect()
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = FlyCamera::default();
        assert_relative_eq!(camera.view_direction(), -Vector3::unit_z(), epsilon = 1e-6);
        assert_eq!(camera.fov(), 45.0);
    }

    #[test]
    fn look_keeps_angles_in_range() {
        let mut camera = FlyCamera::default();
        let deltas = [
            (1.0e4, 1.0e4),
            (-3.3e3, -7.0e5),
            (12345.0, 2.0),
            (-0.5, 9.0e9),
            (f32::MAX, f32::MIN),
            (f32::NAN, f32::INFINITY),
        ];
        for _ in 0..50 {
            for (dx, dy) in deltas {
                camera.look(dx, dy);
                assert!(camera.pitch() > -89.0 && camera.pitch() < 89.0);
                assert!(camera.yaw() > -180.0 && camera.yaw() <= 180.0);
                assert_relative_eq!(camera.view_direction().magnitude(), 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn yaw_wraps_to_half_open_interval() {
        assert_eq!(wrap_yaw(180.0), 180.0);
        assert_eq!(wrap_yaw(-180.0), 180.0);
        assert_relative_eq!(wrap_yaw(190.0), -170.0);
        assert_relative_eq!(wrap_yaw(-190.0), 170.0);
        assert_relative_eq!(wrap_yaw(720.0 + 45.0), 45.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = FlyCamera::default();
        for _ in 0..1000 {
            camera.zoom(250.0);
            assert!(camera.fov() >= FOV_MIN);
        }
        assert_eq!(camera.fov(), FOV_MIN);

        for _ in 0..1000 {
            camera.zoom(-1.0e6);
            assert!(camera.fov() <= FOV_MAX);
        }
        assert_eq!(camera.fov(), FOV_MAX);
    }

    #[test]
    fn movement_without_easing_is_exact() {
        let config = CameraConfig::default().without_easing();
        let mut camera = FlyCamera::new(&config);
        camera.advance(&keys(&[MovementKey::Forward]), 0.2);
        assert_relative_eq!(camera.position.z, 3.0 - config.movement_speed * 0.2, epsilon = 1e-5);

        camera.advance(&HashSet::new(), 0.2);
        assert_relative_eq!(camera.position.z, 3.0 - config.movement_speed * 0.2, epsilon = 1e-5);
    }

    #[test]
    fn eased_movement_accelerates_then_comes_to_rest() {
        let mut camera = FlyCamera::default();
        let held = keys(&[MovementKey::Forward]);

        camera.advance(&held, REFERENCE_FRAME);
        let first = camera.velocity().magnitude();
        camera.advance(&held, REFERENCE_FRAME);
        assert!(camera.velocity().magnitude() > first);
        assert!(camera.position.z < 3.0);

        for _ in 0..2000 {
            camera.advance(&HashSet::new(), REFERENCE_FRAME);
        }
        assert_eq!(camera.velocity(), Vector3::zero());
    }

    #[test]
    fn eased_movement_settles_near_configured_speed() {
        let mut camera = FlyCamera::default();
        let held = keys(&[MovementKey::Right]);
        for _ in 0..600 {
            camera.advance(&held, REFERENCE_FRAME);
        }
        let speed = camera.velocity().magnitude() / camera.resistance;
        assert_relative_eq!(speed, camera.movement_speed, epsilon = 1e-2);
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut camera = FlyCamera::new(&CameraConfig::default().without_easing());
        camera.advance(&keys(&[MovementKey::Left, MovementKey::Right]), 0.1);
        assert_relative_eq!(camera.position, Vector3::new(0.0, 0.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn invalid_elapsed_time_is_ignored() {
        let mut camera = FlyCamera::default();
        camera.advance(&keys(&[MovementKey::Up]), -1.0);
        camera.advance(&keys(&[MovementKey::Up]), f32::NAN);
        assert_eq!(camera.position, Vector3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn projection_reads_do_not_mutate() {
        let camera = FlyCamera::default();
        let before = camera.clone();
        let _ = camera.view_matrix();
        let _ = camera.projection(16.0 / 9.0);
        let _ = camera.projection(0.0);
        assert_eq!(before.position, camera.position);
        assert_eq!(before.fov(), camera.fov());
    }
}
