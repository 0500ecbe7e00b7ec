//! Models: the meshes of one imported asset placed by one transform.

use std::path::Path;

use cgmath::{Deg, Matrix4, Vector3};

use crate::config::ModelConfig;
use crate::error::AssetError;
use crate::gfx::import::{ImportedScene, SceneImporter};
use crate::gfx::resources::texture_cache::{PbrTexture, Texture, TextureCache, TextureRole};
use crate::gfx::resources::uploader::{ResourceUploader, TransformSlotId};

use super::mesh::{vertices_from_import, Mesh};

/// Local placement, edited live from the UI. Rotation is in degrees per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// `T · Rx · Ry · Rz · S`.
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from_angle_x(Deg(self.rotation.x))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_z(Deg(self.rotation.z))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl From<&ModelConfig> for Transform {
    fn from(config: &ModelConfig) -> Self {
        Self {
            translation: config.translation.into(),
            rotation: config.rotation.into(),
            scale: config.scale.into(),
        }
    }
}

/// Collaborators a model load needs. The texture cache is shared by every model.
pub struct LoadContext<'a> {
    pub importer: &'a dyn SceneImporter,
    pub textures: &'a mut TextureCache,
    pub uploader: &'a mut dyn ResourceUploader,
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub transform: Transform,
    /// Name of the lit program this model is drawn with.
    pub shader: String,
    pub transform_slot: Option<TransformSlotId>,
}

impl Model {
    /// A model with nothing to draw.
    pub fn empty(shader: &str) -> Self {
        Self {
            meshes: Vec::new(),
            transform: Transform::default(),
            shader: shader.to_string(),
            transform_slot: None,
        }
    }

    /// Imports `path` and builds one mesh per node mesh reference, in traversal order.
    ///
    /// Import failures and root-less scenes are logged and produce an empty
    /// model. Individual meshes that fail validation or upload are skipped.
    pub fn load(path: &Path, shader: &str, ctx: LoadContext<'_>) -> Self {
        let mut model = Self::empty(shader);

        let scene = match ctx.importer.import(path) {
            Ok(scene) if scene.root.is_some() => scene,
            Ok(_) => {
                log::warn!(
                    "{}",
                    AssetError::IncompleteScene {
                        path: path.to_path_buf()
                    }
                );
                return model;
            }
            Err(err) => {
                log::warn!("{err}");
                return model;
            }
        };

        for mesh_index in scene.mesh_order() {
            let imported = &scene.meshes[mesh_index];
            let pbr = resolve_material(&scene, imported.material, ctx.textures, ctx.uploader);
            let name = format!("{}:{}", path.display(), imported.name);

            match Mesh::new(
                name,
                vertices_from_import(imported),
                imported.indices.clone(),
                pbr,
                ctx.uploader,
            ) {
                Ok(mesh) => model.meshes.push(mesh),
                Err(err) => log::warn!("Skipping mesh: {err}"),
            }
        }

        if !model.meshes.is_empty() {
            match ctx.uploader.create_transform_slot(&path.display().to_string()) {
                Ok(slot) => model.transform_slot = Some(slot),
                Err(err) => log::warn!("{err}; '{}' will not be drawn", path.display()),
            }
        }

        log::info!(
            "Loaded '{}': {} meshes, {} triangles",
            path.display(),
            model.mesh_count(),
            model.triangle_count()
        );
        model
    }

    pub fn compute_model_matrix(&self) -> Matrix4<f32> {
        self.transform.matrix()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Frees mesh buffers and the transform slot. Textures stay with the cache.
    pub fn release(&mut self, uploader: &mut dyn ResourceUploader) {
        for mesh in self.meshes.drain(..) {
            uploader.release_mesh(mesh.buffers);
        }
        if let Some(slot) = self.transform_slot.take() {
            uploader.release_transform_slot(slot);
        }
    }
}

/// Resolves a material's three textures and its PBR set.
///
/// Roles the material doesn't provide use the default texture. The set is
/// keyed by the base-color source, or by the material slot when there is none.
fn resolve_material(
    scene: &ImportedScene,
    material: Option<usize>,
    textures: &mut TextureCache,
    uploader: &mut dyn ResourceUploader,
) -> PbrTexture {
    let Some((index, material)) =
        material.and_then(|index| scene.materials.get(index).map(|material| (index, material)))
    else {
        return textures.default_pbr();
    };

    let default_id = textures.default_texture().id;
    let mut resolve = |role: TextureRole| match material.texture(role) {
        Some(source) => textures.get_or_create_texture(source, role, uploader),
        None => Texture {
            id: default_id,
            role,
        },
    };
    let resolved = [
        resolve(TextureRole::BaseColor),
        resolve(TextureRole::Normal),
        resolve(TextureRole::Roughness),
    ];

    let key = match &material.base_color {
        Some(source) => source.key(),
        None => format!("{}#material{index}", scene.source.display()),
    };
    textures.get_or_create_pbr_texture(resolved, &key, uploader)
}
