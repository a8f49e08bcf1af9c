use std::collections::HashSet;
use std::path::Path;

use cgmath::{SquareMatrix, Vector3, Vector4};

use crate::config::ViewerConfig;
use crate::error::{LoadError, SequenceError};
use crate::gfx::{
    camera::{camera_utils::CameraManager, CameraController, CameraUniform, FlyCamera, MovementKey},
    geometry::generate_axes,
    loader::{self, TextureCache},
    resources::{
        global_bindings::{GlobalBindings, LightState},
        material::{Material, Texture, TextureBinding},
    },
};

use super::mesh::{DynamicMesh, PipelineSource, StaticMesh};
use super::object::{sphere_mesh, GeometrySource, ObjectMesh, ObjectRole, SceneObject, Transform};

/// Stable identifier of an object in a [`Scene`]
///
/// Ids are never reused within a scene, so a stale id simply stops resolving
/// once its object is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

/// Token for the custom object currently being drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomHandle {
    id: ObjectId,
}

impl CustomHandle {
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

/// Totals over every object in the scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStatistics {
    pub objects: usize,
    pub vertices: usize,
    pub triangles: usize,
}

pub const LIGHT_NAME: &str = "Light";
pub const SPHERE_NAME: &str = "sphere";
pub const CUSTOM_OBJECT_NAME: &str = "custom object";

const LIGHT_RADIUS: f32 = 1.5;
const LIGHT_SEGMENTS: u32 = 20;
const AXES_SCALE: f32 = 0.15;
const AXES_DISTANCE: f32 = 1.0;

/// Main scene containing the objects and the camera
pub struct Scene {
    pub camera_manager: CameraManager,
    config: ViewerConfig,
    objects: Vec<(ObjectId, SceneObject)>,
    next_id: u64,
    textures: TextureCache,
    active_custom: Option<ObjectId>,
    axes: SceneObject,
}

impl Scene {
    pub fn new(config: ViewerConfig) -> Self {
        let camera_manager = CameraManager::new(FlyCamera::new(&config.camera), CameraController::new());
        let axes = SceneObject::new(
            "axes",
            vec![ObjectMesh::Lines(StaticMesh::new(
                "axes",
                vec![Material::untextured("axes", generate_axes())],
            ))],
            GeometrySource::Axes,
            Transform::default(),
        );
        let mut scene = Self {
            camera_manager,
            config,
            objects: Vec::new(),
            next_id: 0,
            textures: TextureCache::new(),
            active_custom: None,
            axes,
        };
        scene.place_axes();
        scene
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &FlyCamera {
        &self.camera_manager.camera
    }

    pub fn camera_mut(&mut self) -> &mut FlyCamera {
        &mut self.camera_manager.camera
    }

    /// Runs the camera on the controller's own input state
    pub fn update(&mut self, elapsed: f32) {
        self.camera_manager.update(elapsed);
        self.place_axes();
    }

    /// Moves the camera for the given held keys
    pub fn advance_camera(&mut self, pressed: &HashSet<MovementKey>, elapsed: f32) {
        self.camera_manager.camera.advance(pressed, elapsed);
        self.place_axes();
    }

    pub fn look(&mut self, dx: f32, dy: f32) {
        self.camera_manager.camera.look(dx, dy);
        self.place_axes();
    }

    pub fn zoom(&mut self, ticks: f32) {
        self.camera_manager.camera.zoom(ticks);
    }

    pub fn camera_uniform(&self, aspect: f32) -> CameraUniform {
        CameraUniform::from_camera(&self.camera_manager.camera, aspect)
    }

    fn insert(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        log::info!("Added '{}' as {id:?}", object.name);
        self.objects.push((id, object));
        id
    }

    fn spawn_point(&self, distance: f32) -> Vector3<f32> {
        self.camera_manager.camera.point_ahead(distance)
    }

    /// Loads an OBJ model and places it in front of the camera
    ///
    /// Nothing is added when loading fails.
    pub fn open_model(&mut self, path: &Path) -> Result<ObjectId, LoadError> {
        let model = loader::load_model(path, &mut self.textures)?;
        let meshes = model.meshes.into_iter().map(ObjectMesh::Textured).collect();
        let object = SceneObject::new(
            format!("model {}", model.name),
            meshes,
            GeometrySource::Loaded { path: model.path },
            Transform::at(self.spawn_point(self.config.spawn_distance)),
        );
        Ok(self.insert(object))
    }

    /// Adds a UV sphere with the configured tessellation, optionally textured
    pub fn create_sphere(&mut self, texture: Option<&Path>) -> Result<ObjectId, LoadError> {
        let binding = match texture {
            Some(path) => {
                let image = self.textures.load(path)?;
                TextureBinding::Textured(Texture::new(image, self.config.sphere.flip_texture))
            }
            None => TextureBinding::Untextured,
        };
        let sphere = self.config.sphere;
        let object = SceneObject::new(
            SPHERE_NAME,
            vec![sphere_mesh(sphere.radius, sphere.sectors, sphere.stacks, binding)],
            GeometrySource::ProceduralSphere {
                radius: sphere.radius,
                sectors: sphere.sectors,
                stacks: sphere.stacks,
            },
            Transform::at(self.spawn_point(self.config.sphere_spawn_distance)),
        );
        Ok(self.insert(object))
    }

    /// Adds a small sphere that drives the scene light; colour is 0-255 RGB
    pub fn create_light(&mut self, color: [u8; 3]) -> ObjectId {
        let color = color.map(|c| f32::from(c) / 255.0);
        let object = SceneObject::new(
            LIGHT_NAME,
            vec![sphere_mesh(
                LIGHT_RADIUS,
                LIGHT_SEGMENTS,
                LIGHT_SEGMENTS,
                TextureBinding::Untextured,
            )],
            GeometrySource::ProceduralSphere {
                radius: LIGHT_RADIUS,
                sectors: LIGHT_SEGMENTS,
                stacks: LIGHT_SEGMENTS,
            },
            Transform::at(self.spawn_point(self.config.sphere_spawn_distance)),
        )
        .with_role(ObjectRole::Light { color });
        self.insert(object)
    }

    /// Starts a free-drawn object in front of the camera
    ///
    /// The object is part of the scene (and drawn) from this point on; points
    /// are added with [`Scene::add_vertex`] until it is finished.
    pub fn create_custom_object(&mut self) -> Result<CustomHandle, SequenceError> {
        if self.active_custom.is_some() {
            return Err(SequenceError::AlreadyActive);
        }
        let object = SceneObject::new(
            CUSTOM_OBJECT_NAME,
            vec![ObjectMesh::Dynamic(DynamicMesh::new())],
            GeometrySource::UserDrawn,
            Transform::at(self.spawn_point(self.config.spawn_distance)),
        );
        let id = self.insert(object);
        self.active_custom = Some(id);
        Ok(CustomHandle { id })
    }

    fn check_handle(&self, handle: CustomHandle) -> Result<(), SequenceError> {
        match self.active_custom {
            None => Err(SequenceError::NoActiveCustomObject),
            Some(id) if id != handle.id => Err(SequenceError::HandleMismatch),
            Some(_) => Ok(()),
        }
    }

    /// Appends a world-space point to the custom object being drawn
    ///
    /// The point is stored in the object's local space, so it lands where it
    /// was placed whatever the object's current transform.
    pub fn add_vertex(
        &mut self,
        handle: CustomHandle,
        point: Vector3<f32>,
        color: [f32; 3],
    ) -> Result<(), SequenceError> {
        self.check_handle(handle)?;
        let object = self
            .object_mut(handle.id)
            .ok_or(SequenceError::UnknownObject(handle.id))?;

        let model = object.model_matrix();
        let local = match model.invert() {
            Some(inverse) => (inverse * Vector4::new(point.x, point.y, point.z, 1.0)).truncate(),
            None => point - object.position(),
        };
        let color = color.map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 });
        let mesh = object
            .dynamic_mesh_mut()
            .ok_or(SequenceError::UnknownObject(handle.id))?;
        mesh.append(local.into(), color);
        log::debug!("Custom object now has {} points", mesh.point_count());
        Ok(())
    }

    /// Appends the point at the spawn distance in front of the camera
    pub fn add_vertex_ahead(&mut self, handle: CustomHandle, color: [f32; 3]) -> Result<(), SequenceError> {
        let point = self.spawn_point(self.config.spawn_distance);
        self.add_vertex(handle, point, color)
    }

    /// Ends drawing; the object stays in the scene
    pub fn finish_custom_object(&mut self, handle: CustomHandle) -> Result<ObjectId, SequenceError> {
        self.check_handle(handle)?;
        self.active_custom = None;
        if let Some(object) = self.object(handle.id) {
            if object.triangle_count() == 0 {
                log::warn!("Finished '{}' without a complete triangle", object.name);
            }
        }
        Ok(handle.id)
    }

    /// Handle of the custom object being drawn, if any
    pub fn active_custom_object(&self) -> Option<CustomHandle> {
        self.active_custom.map(|id| CustomHandle { id })
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Result<SceneObject, SequenceError> {
        let index = self
            .objects
            .iter()
            .position(|(object_id, _)| *object_id == id)
            .ok_or(SequenceError::UnknownObject(id))?;
        if self.active_custom == Some(id) {
            self.active_custom = None;
        }
        let (_, object) = self.objects.remove(index);
        log::info!("Removed '{}'", object.name);
        Ok(object)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find(|(object_id, _)| *object_id == id)
            .map(|(_, object)| object)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects
            .iter_mut()
            .find(|(object_id, _)| *object_id == id)
            .map(|(_, object)| object)
    }

    /// Objects in draw order
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn list_object_names(&self) -> Vec<String> {
        self.objects.iter().map(|(_, object)| object.name.clone()).collect()
    }

    pub fn statistics(&self) -> SceneStatistics {
        self.objects
            .iter()
            .fold(SceneStatistics::default(), |mut stats, (_, object)| {
                stats.objects += 1;
                stats.vertices += object.vertex_count();
                stats.triangles += object.triangle_count();
                stats
            })
    }

    /// Light seen by the shaders: the first light object, else the configured one
    pub fn light_state(&self) -> LightState {
        self.objects
            .iter()
            .find_map(|(_, object)| match object.role() {
                ObjectRole::Light { color } => Some(LightState {
                    position: object.position(),
                    color,
                }),
                ObjectRole::Standard => None,
            })
            .unwrap_or(LightState {
                position: self.config.light.position.into(),
                color: self.config.light.color,
            })
    }

    pub fn axes(&self) -> &SceneObject {
        &self.axes
    }

    /// Keeps the axes gizmo just in front of the camera, world-aligned
    fn place_axes(&mut self) {
        let anchor = self.camera_manager.camera.point_ahead(AXES_DISTANCE);
        self.axes
            .edit()
            .with_position(anchor.x, anchor.y, anchor.z)
            .with_scale(AXES_SCALE)
            .commit();
    }

    pub fn shared_textures(&self) -> usize {
        self.textures.len()
    }

    /// Uploads whatever changed since the last frame
    pub fn sync_gpu(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bindings: &GlobalBindings) {
        for (_, object) in &mut self.objects {
            object.sync_gpu_resources(device, queue, bindings);
        }
        if self.config.show_axes {
            self.axes.sync_gpu_resources(device, queue, bindings);
        }
    }

    /// Draws every object in insertion order, then the axes gizmo
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, pipelines: &dyn PipelineSource) {
        for (_, object) in &self.objects {
            object.draw(render_pass, pipelines);
        }
        if self.config.show_axes {
            self.axes.draw(render_pass, pipelines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use std::fs;

    fn scene() -> Scene {
        Scene::new(ViewerConfig::default())
    }

    fn write_quad(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("crate.obj");
        fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn model_spawns_in_front_of_camera_with_prefixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = scene();
        let id = scene.open_model(&write_quad(dir.path())).unwrap();

        let object = scene.object(id).unwrap();
        assert_eq!(object.name, "model crate");
        // Default camera at (0,0,3) looking down -Z.
        let p = object.position();
        assert!((p.x).abs() < 1e-5 && (p.y).abs() < 1e-5 && (p.z + 2.0).abs() < 1e-5);
        assert_eq!(scene.statistics().triangles, 2);
    }

    #[test]
    fn failed_load_leaves_registry_unchanged() {
        let mut scene = scene();
        scene.create_sphere(None).unwrap();
        let before = scene.list_object_names();

        assert!(scene.open_model(Path::new("missing/model.obj")).is_err());
        assert!(scene.create_sphere(Some(Path::new("missing/earth.png"))).is_err());
        assert_eq!(scene.list_object_names(), before);
    }

    #[test]
    fn sphere_uses_configured_tessellation() {
        let mut scene = scene();
        let id = scene.create_sphere(None).unwrap();
        let object = scene.object(id).unwrap();
        assert_eq!(object.name, SPHERE_NAME);
        assert_eq!(object.vertex_count(), 51 * 51);
        assert_eq!(object.triangle_count(), 2 * 50 * 49);
        assert!((object.position().z + 7.0).abs() < 1e-5);
    }

    #[test]
    fn textured_sphere_flips_its_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("earth.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 255, 255]))
            .save(&path)
            .unwrap();

        let mut scene = scene();
        let first = scene.create_sphere(Some(&path)).unwrap();
        scene.create_sphere(Some(&path)).unwrap();
        assert_eq!(scene.shared_textures(), 1);

        let ObjectMesh::Textured(mesh) = &scene.object(first).unwrap().meshes()[0] else {
            panic!("sphere should be a textured mesh");
        };
        let texture = mesh.materials()[0].texture.texture().unwrap();
        assert!(texture.flip);
    }

    #[test]
    fn custom_object_grows_by_re_emitting_vertices() {
        let mut scene = scene();
        let handle = scene.create_custom_object().unwrap();
        assert_eq!(scene.list_object_names(), vec![CUSTOM_OBJECT_NAME]);

        for (i, x) in [0.0, 1.0, 0.0, 1.0].into_iter().enumerate() {
            let y = if i < 2 { 0.0 } else { 1.0 };
            scene
                .add_vertex(handle, Vector3::new(x, y, -2.0), [1.0, 0.0, 0.0])
                .unwrap();
            if i == 2 {
                assert_eq!(scene.object(handle.id()).unwrap().vertex_count(), 3);
            }
        }
        let object = scene.object(handle.id()).unwrap();
        assert_eq!(object.vertex_count(), 6);
        assert_eq!(object.triangle_count(), 2);

        assert_eq!(scene.finish_custom_object(handle), Ok(handle.id()));
        assert!(scene.active_custom_object().is_none());
    }

    #[test]
    fn custom_vertices_land_where_they_were_placed() {
        let mut scene = scene();
        let handle = scene.create_custom_object().unwrap();
        scene.object_mut(handle.id()).unwrap().set_scale(2.0);
        let point = Vector3::new(0.5, 0.25, -1.0);
        scene.add_vertex(handle, point, [1.0; 3]).unwrap();

        let object = scene.object(handle.id()).unwrap();
        let ObjectMesh::Dynamic(mesh) = &object.meshes()[0] else {
            panic!("custom object should own a dynamic mesh");
        };
        let local = mesh.vertices()[0].position;
        let world = object.model_matrix() * Vector4::new(local[0], local[1], local[2], 1.0);
        assert!((world.truncate() - point).x.abs() < 1e-5);
        assert!((world.truncate() - point).y.abs() < 1e-5);
        assert!((world.truncate() - point).z.abs() < 1e-5);
    }

    #[test]
    fn custom_object_sequencing_errors() {
        let mut scene = scene();
        let stale = scene.create_custom_object().unwrap();
        assert_eq!(scene.create_custom_object(), Err(SequenceError::AlreadyActive));
        scene.finish_custom_object(stale).unwrap();

        assert_eq!(
            scene.add_vertex(stale, Vector3::new(0.0, 0.0, 0.0), [1.0; 3]),
            Err(SequenceError::NoActiveCustomObject)
        );
        assert_eq!(
            scene.finish_custom_object(stale),
            Err(SequenceError::NoActiveCustomObject)
        );

        let _current = scene.create_custom_object().unwrap();
        assert_eq!(
            scene.add_vertex(stale, Vector3::new(0.0, 0.0, 0.0), [1.0; 3]),
            Err(SequenceError::HandleMismatch)
        );
    }

    #[test]
    fn removing_the_active_custom_object_ends_drawing() {
        let mut scene = scene();
        let handle = scene.create_custom_object().unwrap();
        scene.remove_object(handle.id()).unwrap();
        assert!(scene.is_empty());
        assert!(scene.create_custom_object().is_ok());
        assert_eq!(
            scene.remove_object(handle.id()).unwrap_err(),
            SequenceError::UnknownObject(handle.id())
        );
    }

    #[test]
    fn ids_are_stable_and_order_is_insertion_order() {
        let mut scene = scene();
        let a = scene.create_sphere(None).unwrap();
        let light = scene.create_light([255, 255, 255]);
        let c = scene.create_sphere(None).unwrap();
        scene.remove_object(light).unwrap();
        assert_eq!(scene.object_ids(), vec![a, c]);
        let d = scene.create_light([0, 0, 0]);
        assert!(d > c);
        assert_eq!(scene.list_object_names(), vec!["sphere", "sphere", "Light"]);
    }

    #[test]
    fn light_object_drives_light_state() {
        let mut scene = scene();
        let fallback = scene.light_state();
        assert_eq!(fallback.color, scene.config().light.color);

        let id = scene.create_light([255, 0, 51]);
        scene.object_mut(id).unwrap().set_position(1.0, 2.0, 3.0);
        let light = scene.light_state();
        assert_eq!(light.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(light.color, [1.0, 0.0, 0.2]);

        let object = scene.object(id).unwrap();
        assert_eq!(object.vertex_count(), 21 * 21);
        assert!(object.is_light());
    }

    #[test]
    fn axes_follow_the_camera() {
        let config = ViewerConfig::default().with_camera(CameraConfig::default().without_easing());
        let mut scene = Scene::new(config);
        let before = scene.axes().position();
        let pressed: HashSet<_> = [MovementKey::Right].into_iter().collect();
        scene.advance_camera(&pressed, 0.1);

        let after = scene.axes().position();
        assert!(after.x > before.x);
        assert_eq!(scene.axes().scale(), AXES_SCALE);
        assert_eq!(scene.statistics().objects, 0);
    }

    #[test]
    fn axes_follow_mouse_look() {
        let mut scene = scene();
        let before = scene.axes().position();
        scene.look(300.0, 100.0);

        let after = scene.axes().position();
        assert_ne!(after, before);
        assert_eq!(after, scene.camera().point_ahead(AXES_DISTANCE));
    }

    #[test]
    fn removing_the_last_user_frees_its_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("earth.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 255, 255]))
            .save(&path)
            .unwrap();

        let mut scene = scene();
        let first = scene.create_sphere(Some(&path)).unwrap();
        let second = scene.create_sphere(Some(&path)).unwrap();

        drop(scene.remove_object(first).unwrap());
        assert_eq!(scene.shared_textures(), 1);
        drop(scene.remove_object(second).unwrap());
        assert_eq!(scene.shared_textures(), 0);
    }

    #[test]
    fn statistics_sum_over_objects() {
        let mut scene = scene();
        scene.create_sphere(None).unwrap();
        scene.create_light([1, 2, 3]);
        let stats = scene.statistics();
        assert_eq!(stats.objects, 2);
        assert_eq!(stats.vertices, 51 * 51 + 21 * 21);
        assert_eq!(stats.triangles, 2 * 50 * 49 + 2 * 20 * 19);
    }
}
