//! Viewer configuration
//!
//! Plain structs with sensible defaults and `with_*` builders. Everything the
//! engine needs to start a session lives here: camera tuning, where new
//! objects spawn, default sphere tessellation and the initial light.

/// Free-fly camera tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Degrees. -90 looks down -Z.
    pub yaw: f32,
    /// Degrees.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// World units per second at full speed.
    pub movement_speed: f32,
    /// Fraction of velocity kept after one frame without input (0 = instant stop).
    pub resistance: f32,
    /// Degrees of yaw/pitch per pixel of mouse travel.
    pub mouse_sensitivity: f32,
    /// Degrees of field of view per wheel tick.
    pub wheel_sensitivity: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            yaw: -90.0,
            pitch: 0.0,
            fov: 45.0,
            movement_speed: 2.5,
            resistance: 0.85,
            mouse_sensitivity: 0.03,
            wheel_sensitivity: 3.0,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl CameraConfig {
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = [x, y, z];
        self
    }

    pub fn with_speed(mut self, movement_speed: f32) -> Self {
        self.movement_speed = movement_speed.max(0.0);
        self
    }

    /// Disables velocity easing: the camera stops as soon as keys are released
    pub fn without_easing(mut self) -> Self {
        self.resistance = 0.0;
        self
    }

    pub fn with_resistance(mut self, resistance: f32) -> Self {
        self.resistance = resistance.clamp(0.0, 0.99);
        self
    }

    pub fn with_sensitivity(mut self, mouse: f32, wheel: f32) -> Self {
        self.mouse_sensitivity = mouse;
        self.wheel_sensitivity = wheel;
        self
    }
}

/// Tessellation used for newly created spheres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereConfig {
    pub radius: f32,
    pub sectors: u32,
    pub stacks: u32,
    /// Flip the texture vertically on upload.
    pub flip_texture: bool,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            sectors: 50,
            stacks: 50,
            flip_texture: true,
        }
    }
}

/// Scene light, driven by a light sphere once one exists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Top-level session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub sphere: SphereConfig,
    pub light: LightConfig,
    /// Distance in front of the camera where models and custom vertices land.
    pub spawn_distance: f32,
    /// Distance in front of the camera where spheres land.
    pub sphere_spawn_distance: f32,
    pub clear_color: [f64; 4],
    pub show_axes: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            sphere: SphereConfig::default(),
            light: LightConfig::default(),
            spawn_distance: 5.0,
            sphere_spawn_distance: 10.0,
            clear_color: [125.0 / 255.0, 125.0 / 255.0, 125.0 / 255.0, 1.0],
            show_axes: true,
        }
    }
}

impl ViewerConfig {
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_sphere(mut self, sphere: SphereConfig) -> Self {
        self.sphere = sphere;
        self
    }

    pub fn with_light(mut self, light: LightConfig) -> Self {
        self.light = light;
        self
    }

    pub fn with_spawn_distances(mut self, objects: f32, spheres: f32) -> Self {
        self.spawn_distance = objects;
        self.sphere_spawn_distance = spheres;
        self
    }

    pub fn with_axes(mut self, show: bool) -> Self {
        self.show_axes = show;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistance_is_clamped_below_one() {
        let cfg = CameraConfig::default().with_resistance(4.0);
        assert!(cfg.resistance < 1.0);
        assert_eq!(CameraConfig::default().without_easing().resistance, 0.0);
    }
}
