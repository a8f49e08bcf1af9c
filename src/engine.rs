//! Thread-safe facade over the scene
//!
//! The [`Engine`] holds the scene behind one mutex. A frame takes the lock
//! through [`Engine::begin_frame`] and keeps it until its [`FrameGuard`] is
//! dropped, after the draw. Every other operation takes the same lock for the
//! duration of the call, so an edit and the matrix recompute it triggers are
//! never observed half-done by a frame.
//!
//! A panic while the lock is held poisons it; the engine logs the poisoning
//! and keeps using the scene as it was left.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use cgmath::Vector3;

use crate::config::ViewerConfig;
use crate::error::{Result, SequenceError};
use crate::gfx::{
    camera::MovementKey,
    rendering::RenderEngine,
    scene::{CustomHandle, ObjectId, Scene, SceneObject, SceneStatistics},
};

/// Exclusive access to the scene for one frame
pub struct FrameGuard<'a> {
    scene: MutexGuard<'a, Scene>,
}

impl FrameGuard<'_> {
    /// Runs the camera on the input gathered by its controller
    pub fn update(&mut self, elapsed: f32) {
        self.scene.update(elapsed);
    }

    pub fn render(&mut self, renderer: &mut RenderEngine) -> Result<()> {
        renderer.render_frame(&mut self.scene)
    }
}

impl Deref for FrameGuard<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        &self.scene
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }
}

/// Shared handle to a scene; clones refer to the same scene
#[derive(Clone)]
pub struct Engine {
    scene: Arc<Mutex<Scene>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl Engine {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            scene: Arc::new(Mutex::new(Scene::new(config))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Scene> {
        self.scene.lock().unwrap_or_else(|poisoned| {
            log::warn!("Scene lock was poisoned by a panic; recovering");
            self.scene.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Locks the scene until the returned guard is dropped
    pub fn begin_frame(&self) -> FrameGuard<'_> {
        FrameGuard { scene: self.lock() }
    }

    /// Updates the camera from its controller and draws one frame
    pub fn render_frame(&self, renderer: &mut RenderEngine, elapsed: f32) -> Result<()> {
        let mut frame = self.begin_frame();
        frame.update(elapsed);
        frame.render(renderer)
    }

    /// Runs `f` with the scene locked
    pub fn with_scene<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> R {
        f(&mut self.lock())
    }

    /// Runs `f` on one object with the scene locked
    pub fn with_object<R>(&self, id: ObjectId, f: impl FnOnce(&mut SceneObject) -> R) -> Result<R> {
        let mut scene = self.lock();
        let object = scene
            .object_mut(id)
            .ok_or(SequenceError::UnknownObject(id))?;
        Ok(f(object))
    }

    pub fn open_model(&self, path: &Path) -> Result<ObjectId> {
        Ok(self.lock().open_model(path)?)
    }

    pub fn create_sphere(&self, texture: Option<&Path>) -> Result<ObjectId> {
        Ok(self.lock().create_sphere(texture)?)
    }

    pub fn create_light(&self, color: [u8; 3]) -> ObjectId {
        self.lock().create_light(color)
    }

    pub fn create_custom_object(&self) -> Result<CustomHandle> {
        Ok(self.lock().create_custom_object()?)
    }

    pub fn add_vertex(&self, handle: CustomHandle, point: [f32; 3], color: [f32; 3]) -> Result<()> {
        Ok(self.lock().add_vertex(handle, Vector3::from(point), color)?)
    }

    /// Adds the point in front of the camera
    pub fn add_vertex_ahead(&self, handle: CustomHandle, color: [f32; 3]) -> Result<()> {
        Ok(self.lock().add_vertex_ahead(handle, color)?)
    }

    pub fn finish_custom_object(&self, handle: CustomHandle) -> Result<ObjectId> {
        Ok(self.lock().finish_custom_object(handle)?)
    }

    pub fn remove_object(&self, id: ObjectId) -> Result<()> {
        self.lock().remove_object(id)?;
        Ok(())
    }

    pub fn advance_frame(&self, pressed: &HashSet<MovementKey>, elapsed_seconds: f32) {
        self.lock().advance_camera(pressed, elapsed_seconds);
    }

    pub fn apply_mouse_delta(&self, dx: f32, dy: f32) {
        self.lock().look(dx, dy);
    }

    pub fn apply_zoom_delta(&self, ticks: f32) {
        self.lock().zoom(ticks);
    }

    pub fn list_object_names(&self) -> Vec<String> {
        self.lock().list_object_names()
    }

    pub fn statistics(&self) -> SceneStatistics {
        self.lock().statistics()
    }

    pub fn set_position(&self, id: ObjectId, x: f32, y: f32, z: f32) -> Result<()> {
        self.with_object(id, |object| object.set_position(x, y, z))
    }

    pub fn translate(&self, id: ObjectId, dx: f32, dy: f32, dz: f32) -> Result<()> {
        self.with_object(id, |object| object.translate(dx, dy, dz))
    }

    pub fn set_rotation_x(&self, id: ObjectId, degrees: f32) -> Result<()> {
        self.with_object(id, |object| object.set_rotation_x(degrees))
    }

    pub fn set_rotation_y(&self, id: ObjectId, degrees: f32) -> Result<()> {
        self.with_object(id, |object| object.set_rotation_y(degrees))
    }

    pub fn set_rotation_z(&self, id: ObjectId, degrees: f32) -> Result<()> {
        self.with_object(id, |object| object.set_rotation_z(degrees))
    }

    pub fn set_scale(&self, id: ObjectId, scale: f32) -> Result<()> {
        self.with_object(id, |object| object.set_scale(scale))
    }

    pub fn set_wireframe(&self, id: ObjectId, wireframe: bool) -> Result<()> {
        self.with_object(id, |object| object.set_wireframe(wireframe))
    }

    /// Colour in 0-255 RGB; ignored for objects that are not lights
    pub fn set_light_color(&self, id: ObjectId, color: [u8; 3]) -> Result<()> {
        self.with_object(id, |object| {
            object.set_light_color(color.map(|c| f32::from(c) / 255.0))
        })
    }

    /// Returns false when the object is not a sphere
    pub fn regenerate_sphere(&self, id: ObjectId, radius: f32, sectors: u32, stacks: u32) -> Result<bool> {
        self.with_object(id, |object| object.regenerate_sphere(radius, sectors, stacks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::gfx::scene::ObjectRole;
    use std::sync::TryLockError;

    #[test]
    fn frame_guard_holds_the_lock_until_dropped() {
        let engine = Engine::default();
        let frame = engine.begin_frame();
        assert!(matches!(engine.scene.try_lock(), Err(TryLockError::WouldBlock)));
        drop(frame);
        assert!(engine.scene.try_lock().is_ok());
    }

    #[test]
    fn setters_reach_the_object() {
        let engine = Engine::default();
        let id = engine.create_sphere(None).unwrap();
        engine.set_position(id, 1.0, 2.0, 3.0).unwrap();
        engine.set_rotation_y(id, 30.0).unwrap();
        engine.set_scale(id, 0.5).unwrap();
        engine.set_wireframe(id, true).unwrap();

        let (position, rotation, scale, wireframe) = engine
            .with_object(id, |o| (o.position(), o.rotation().y, o.scale(), o.wireframe))
            .unwrap();
        assert_eq!(position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!((rotation, scale, wireframe), (30.0, 0.5, true));
    }

    #[test]
    fn unknown_ids_are_sequence_errors() {
        let engine = Engine::default();
        let id = engine.create_light([255, 255, 255]);
        engine.remove_object(id).unwrap();
        let err = engine.set_scale(id, 2.0).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::Sequence(SequenceError::UnknownObject(missing)) if missing == id
        ));
    }

    #[test]
    fn custom_object_through_the_facade() {
        let engine = Engine::default();
        let handle = engine.create_custom_object().unwrap();
        for point in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]] {
            engine.add_vertex(handle, point, [0.0, 1.0, 0.0]).unwrap();
        }
        let id = engine.finish_custom_object(handle).unwrap();
        assert_eq!(engine.statistics().vertices, 6);
        assert_eq!(engine.list_object_names(), vec!["custom object"]);
        assert!(engine.add_vertex_ahead(handle, [1.0; 3]).is_err());
        assert_eq!(id, handle.id());
    }

    #[test]
    fn failed_load_is_a_load_error() {
        let engine = Engine::default();
        let err = engine.open_model(Path::new("missing.obj")).unwrap_err();
        assert!(err.is_load_error());
        assert!(engine.list_object_names().is_empty());
    }

    #[test]
    fn camera_input_never_fails() {
        let engine = Engine::default();
        engine.apply_mouse_delta(1.0e6, -1.0e6);
        engine.apply_zoom_delta(1000.0);
        let pressed: HashSet<_> = [MovementKey::Forward].into_iter().collect();
        engine.advance_frame(&pressed, f32::NAN);
        engine.advance_frame(&pressed, 0.016);

        engine.with_scene(|scene| {
            let camera = scene.camera();
            assert!(camera.pitch() > -89.0 && camera.pitch() < 89.0);
            assert!(camera.yaw() > -180.0 && camera.yaw() <= 180.0);
            assert_eq!(camera.fov(), 1.0);
            assert!(camera.position.x.is_finite());
        });
    }

    #[test]
    fn light_color_is_converted_from_bytes() {
        let engine = Engine::default();
        let id = engine.create_light([255, 255, 255]);
        engine.set_light_color(id, [0, 51, 255]).unwrap();
        let role = engine.with_object(id, |o| o.role()).unwrap();
        assert_eq!(role, ObjectRole::Light { color: [0.0, 0.2, 1.0] });
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let engine = Engine::default();
        engine.create_sphere(None).unwrap();

        let clone = engine.clone();
        let result = std::thread::spawn(move || {
            clone.with_scene::<()>(|_| panic!("panic while holding the scene"));
        })
        .join();
        assert!(result.is_err());

        assert_eq!(engine.list_object_names(), vec!["sphere"]);
        assert!(engine.scene.try_lock().is_ok());
    }
}
