//! Wavefront OBJ/MTL model loading
//!
//! Faces are triangulated and re-indexed by `tobj` so every vertex carries one
//! position, normal and texture coordinate. `tobj` splits an object into one
//! model per material; consecutive models that share a name are grouped back
//! into a single mesh with one material per distinct material id.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use crate::error::LoadError;
use crate::gfx::resources::material::{Material, Texture, TextureBinding, TextureImage};
use crate::gfx::scene::mesh::{calculate_face_normals, StaticMesh};
use crate::gfx::scene::vertex::TexturedVertex;

/// Decoded images shared by every material that references the same file
///
/// The cache only holds weak references; an image is freed once the last
/// material using it is dropped.
#[derive(Debug, Default)]
pub struct TextureCache {
    images: HashMap<PathBuf, Weak<TextureImage>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Arc<TextureImage>, LoadError> {
        if let Some(image) = self.images.get(path).and_then(Weak::upgrade) {
            return Ok(image);
        }
        let image = Arc::new(TextureImage::load(path)?);
        self.prune();
        self.images.insert(path.to_path_buf(), Arc::downgrade(&image));
        Ok(image)
    }

    /// Forgets entries whose image is no longer used by any material
    pub fn prune(&mut self) {
        self.images.retain(|_, image| image.strong_count() > 0);
    }

    /// Number of images still alive
    pub fn len(&self) -> usize {
        self.images
            .values()
            .filter(|image| image.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Meshes of one OBJ file
#[derive(Debug)]
pub struct LoadedModel {
    pub path: PathBuf,
    /// File stem, used to name the scene object
    pub name: String,
    pub meshes: Vec<StaticMesh<TexturedVertex>>,
}

impl LoadedModel {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(StaticMesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(StaticMesh::triangle_count).sum()
    }
}

/// Loads an OBJ file and the textures its faces use
///
/// A missing or broken MTL library is not fatal: the model loads untextured.
/// A texture that a used material references but that cannot be decoded fails
/// the whole load. Materials no face uses are never decoded.
pub fn load_model(path: &Path, textures: &mut TextureCache) -> Result<LoadedModel, LoadError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| LoadError::Model {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = materials.unwrap_or_else(|err| {
        log::warn!(
            "No usable material library for {}: {err}; loading untextured",
            path.display()
        );
        Vec::new()
    });

    let model_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let used: BTreeSet<usize> = models.iter().filter_map(|m| m.mesh.material_id).collect();
    let mut bindings: HashMap<usize, Option<Arc<TextureImage>>> = HashMap::new();
    for id in used {
        let Some(material) = materials.get(id) else {
            continue;
        };
        let image = match material.diffuse_texture.as_deref() {
            Some(texture) if !texture.trim().is_empty() => {
                Some(textures.load(&model_dir.join(texture.trim()))?)
            }
            _ => None,
        };
        bindings.insert(id, image);
    }

    let mut meshes = Vec::new();
    let mut group: Vec<&tobj::Model> = Vec::new();
    for model in &models {
        if group.first().is_some_and(|first| first.name != model.name) {
            meshes.push(build_mesh(&group, &materials, &bindings));
            group.clear();
        }
        group.push(model);
    }
    if !group.is_empty() {
        meshes.push(build_mesh(&group, &materials, &bindings));
    }
    meshes.retain(|mesh| mesh.vertex_count() > 0);

    if meshes.is_empty() {
        return Err(LoadError::EmptyModel {
            path: path.to_path_buf(),
        });
    }

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    let loaded = LoadedModel {
        path: path.to_path_buf(),
        name,
        meshes,
    };
    log::info!(
        "Loaded {}: {} meshes, {} vertices, {} triangles",
        path.display(),
        loaded.meshes.len(),
        loaded.vertex_count(),
        loaded.triangle_count()
    );
    Ok(loaded)
}

/// Builds one mesh from a run of same-named models
fn build_mesh(
    group: &[&tobj::Model],
    materials: &[tobj::Material],
    bindings: &HashMap<usize, Option<Arc<TextureImage>>>,
) -> StaticMesh<TexturedVertex> {
    // (material id, vertices, indices) in first-seen order
    let mut blocks: Vec<(Option<usize>, Vec<TexturedVertex>, Vec<u32>)> = Vec::new();

    for model in group {
        let mesh = &model.mesh;
        let block = match blocks.iter().position(|(id, _, _)| *id == mesh.material_id) {
            Some(index) => &mut blocks[index],
            None => {
                blocks.push((mesh.material_id, Vec::new(), Vec::new()));
                let last = blocks.len() - 1;
                &mut blocks[last]
            }
        };
        let base = block.1.len() as u32;
        block.1.extend(vertices_of(mesh));
        block.2.extend(mesh.indices.iter().map(|i| i + base));
    }

    let materials = blocks
        .into_iter()
        .map(|(id, vertices, indices)| {
            let name = id
                .and_then(|id| materials.get(id))
                .map(|m| m.name.clone())
                .unwrap_or_else(|| "default".to_string());
            let texture = match id.and_then(|id| bindings.get(&id)) {
                Some(Some(image)) => TextureBinding::Textured(Texture::new(Arc::clone(image), true)),
                _ => TextureBinding::Untextured,
            };
            Material::new(name, vertices, texture).with_indices(indices)
        })
        .collect();

    StaticMesh::new(group[0].name.clone(), materials)
}

fn vertices_of(mesh: &tobj::Mesh) -> Vec<TexturedVertex> {
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();

    let normals: Vec<[f32; 3]> = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
        mesh.normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect()
    } else {
        calculate_face_normals(&positions, &mesh.indices)
    };

    let has_tex_coords = mesh.texcoords.len() / 2 == positions.len();
    positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let tex_coords = if has_tex_coords {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            TexturedVertex::new(position, normals[i], tex_coords)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUAD: &str = "\
mtllib quad.mtl
o quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
usemtl painted
f 1/1 2/2 3/3 4/4
";

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn write_png(dir: &Path, name: &str) {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn loads_textured_quad() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "paint.png");
        write(dir.path(), "quad.mtl", b"newmtl painted\nmap_Kd paint.png\n");
        let obj = write(dir.path(), "quad.obj", QUAD.as_bytes());

        let mut cache = TextureCache::new();
        let model = load_model(&obj, &mut cache).unwrap();
        assert_eq!(model.name, "quad");
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.vertex_count(), 4);

        let material = &model.meshes[0].materials()[0];
        assert_eq!(material.name, "painted");
        let texture = material.texture.texture().unwrap();
        assert!(texture.flip);
        assert_eq!((texture.image.width, texture.image.height), (2, 2));
        assert_eq!(cache.len(), 1);

        // No normals in the file: computed from the faces.
        for vertex in material.vertices() {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn unused_material_textures_are_not_decoded() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "paint.png");
        write(
            dir.path(),
            "quad.mtl",
            b"newmtl painted\nmap_Kd paint.png\nnewmtl stale\nmap_Kd gone.png\n",
        );
        let obj = write(dir.path(), "quad.obj", QUAD.as_bytes());

        let mut cache = TextureCache::new();
        let model = load_model(&obj, &mut cache).unwrap();
        assert!(model.meshes[0].materials()[0].is_textured());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cached_images_are_freed_with_their_models() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "paint.png");
        write(dir.path(), "quad.mtl", b"newmtl painted\nmap_Kd paint.png\n");
        let obj = write(dir.path(), "quad.obj", QUAD.as_bytes());

        let mut cache = TextureCache::new();
        let first = load_model(&obj, &mut cache).unwrap();
        let second = load_model(&obj, &mut cache).unwrap();
        assert_eq!(cache.len(), 1);

        drop(first);
        assert_eq!(cache.len(), 1);
        drop(second);
        assert!(cache.is_empty());

        cache.prune();
        assert!(cache.images.is_empty());
        load_model(&obj, &mut cache).unwrap();
    }

    #[test]
    fn missing_material_library_loads_untextured() {
        let dir = tempfile::tempdir().unwrap();
        let obj = write(dir.path(), "quad.obj", QUAD.as_bytes());

        let model = load_model(&obj, &mut TextureCache::new()).unwrap();
        let material = &model.meshes[0].materials()[0];
        assert!(!material.is_textured());
        assert_eq!(model.triangle_count(), 2);
    }

    #[test]
    fn material_without_texture_is_untextured() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "quad.mtl", b"newmtl painted\nKd 0.5 0.5 0.5\n");
        let obj = write(dir.path(), "quad.obj", QUAD.as_bytes());

        let model = load_model(&obj, &mut TextureCache::new()).unwrap();
        assert!(!model.meshes[0].materials()[0].is_textured());
    }

    #[test]
    fn unreadable_texture_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "paint.png", b"not a png");
        write(dir.path(), "quad.mtl", b"newmtl painted\nmap_Kd paint.png\n");
        let obj = write(dir.path(), "quad.obj", QUAD.as_bytes());

        let err = load_model(&obj, &mut TextureCache::new()).unwrap_err();
        assert!(matches!(err, LoadError::Texture { .. }));
    }

    #[test]
    fn missing_file_is_a_model_error() {
        let err = load_model(Path::new("nowhere/none.obj"), &mut TextureCache::new()).unwrap_err();
        assert!(matches!(err, LoadError::Model { .. }));
    }

    #[test]
    fn file_without_faces_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let obj = write(dir.path(), "points.obj", b"v 0 0 0\nv 1 0 0\n");
        let err = load_model(&obj, &mut TextureCache::new()).unwrap_err();
        assert!(matches!(err, LoadError::EmptyModel { .. }));
    }

    #[test]
    fn objects_are_split_and_materials_grouped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "two.mtl",
            b"newmtl red\nKd 1 0 0\nnewmtl blue\nKd 0 0 1\n",
        );
        let obj = write(
            dir.path(),
            "two.obj",
            b"mtllib two.mtl
o first
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
vn 0 0 1
usemtl red
f 1//1 2//1 3//1
usemtl blue
f 2//1 4//1 3//1
o second
v 5 0 0
v 6 0 0
v 5 1 0
usemtl red
f 5//1 6//1 7//1
",
        );

        let model = load_model(&obj, &mut TextureCache::new()).unwrap();
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[0].name, "first");
        let names: Vec<&str> = model.meshes[0]
            .materials()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["red", "blue"]);
        assert_eq!(model.meshes[1].materials().len(), 1);
        assert_eq!(model.triangle_count(), 3);
        assert!(model.meshes[0].is_indexed());
    }
}
