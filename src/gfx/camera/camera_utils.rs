use cgmath::{Matrix4, SquareMatrix};

use crate::gfx::math;

use super::{camera_controller::CameraController, fly_camera::FlyCamera};

/// Owns the session camera together with the input it consumes
pub struct CameraManager {
    pub camera: FlyCamera,
    pub controller: CameraController,
}

impl CameraManager {
    pub fn new(camera: FlyCamera, controller: CameraController) -> Self {
        Self { camera, controller }
    }

    /// Applies the input gathered since the last frame
    ///
    /// Look and zoom deltas are drained; held keys stay held.
    pub fn update(&mut self, elapsed: f32) {
        if let Some((dx, dy)) = self.controller.take_look_delta() {
            self.camera.look(dx, dy);
        }
        if let Some(ticks) = self.controller.take_zoom_ticks() {
            self.camera.zoom(ticks);
        }
        self.camera.advance(self.controller.pressed_keys(), elapsed);
    }

    pub fn get_view_proj_matrix(&self, aspect: f32) -> Matrix4<f32> {
        self.camera.build_view_projection_matrix(aspect)
    }
}

pub trait Camera: Sized {
    fn build_view_projection_matrix(&self, aspect: f32) -> Matrix4<f32>;
}

/// Camera section of the per-frame uniforms
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// Eye position in homogeneous coordinates (keeps 16 byte alignment).
    pub view_position: [f32; 4],
    pub view: [[f32; 4]; 4],
    /// Already mapped to wgpu clip space.
    pub projection: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view: math::to_array(Matrix4::identity()),
            projection: math::to_array(Matrix4::identity()),
        }
    }
}

impl CameraUniform {
    pub fn from_camera(camera: &FlyCamera, aspect: f32) -> Self {
        Self {
            view_position: camera.position.extend(1.0).into(),
            view: math::to_array(camera.view_matrix()),
            projection: math::to_array(math::OPENGL_TO_WGPU_MATRIX * camera.projection(aspect)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::MovementKey;

    #[test]
    fn update_drains_look_and_zoom() {
        let mut manager = CameraManager::new(FlyCamera::default(), CameraController::new());
        manager.controller.add_look_delta(100.0, 0.0);
        manager.controller.add_zoom_ticks(2.0);
        manager.update(1.0 / 60.0);

        assert!((manager.camera.yaw() - (-87.0)).abs() < 1e-4);
        assert_eq!(manager.camera.fov(), 39.0);

        manager.update(1.0 / 60.0);
        assert!((manager.camera.yaw() - (-87.0)).abs() < 1e-4);
        assert_eq!(manager.camera.fov(), 39.0);
    }

    #[test]
    fn held_keys_move_every_frame() {
        let mut manager = CameraManager::new(FlyCamera::default(), CameraController::new());
        manager.controller.set_key(MovementKey::Up, true);
        manager.update(1.0 / 60.0);
        let first = manager.camera.position.y;
        manager.update(1.0 / 60.0);
        assert!(first > 0.0);
        assert!(manager.camera.position.y > first);
    }

    #[test]
    fn uniform_carries_eye_position() {
        let camera = FlyCamera::default();
        let uniform = CameraUniform::from_camera(&camera, 1.0);
        assert_eq!(uniform.view_position, [0.0, 0.0, 3.0, 1.0]);
    }
}
