pub mod camera_controller;
pub mod camera_utils;
pub mod fly_camera;

pub use camera_controller::{CameraController, MovementKey};
pub use camera_utils::{Camera, CameraManager, CameraUniform};
pub use fly_camera::FlyCamera;
