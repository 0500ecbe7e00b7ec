//! Wavefront OBJ/MTL import via `tobj`

use std::path::Path;

use crate::error::AssetError;
use crate::gfx::resources::image_decoder::TextureSource;

use super::tangents::generate_tangents;
use super::{ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, SceneImporter};

/// MTL key some exporters use for a roughness map.
const ROUGHNESS_MAP_KEY: &str = "map_Pr";

#[derive(Debug, Default, Clone, Copy)]
pub struct ObjImporter;

impl SceneImporter for ObjImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, AssetError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|err| AssetError::Import {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let materials = materials.unwrap_or_else(|err| {
            log::warn!("No usable MTL for {}: {err}", path.display());
            Vec::new()
        });

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let texture = |name: Option<&String>| {
            name.filter(|name| !name.is_empty())
                .map(|name| TextureSource::File(base.join(name)))
        };
        let mut materials: Vec<ImportedMaterial> = materials
            .iter()
            .enumerate()
            .map(|(index, material)| ImportedMaterial {
                name: if material.name.is_empty() {
                    format!("material{index}")
                } else {
                    material.name.clone()
                },
                base_color: texture(material.diffuse_texture.as_ref()),
                normal: texture(material.normal_texture.as_ref()),
                roughness: texture(material.unknown_param.get(ROUGHNESS_MAP_KEY)),
            })
            .collect();
        let mut default_material = None;

        let meshes: Vec<ImportedMesh> = models
            .into_iter()
            .map(|model| {
                let mesh = model.mesh;
                let positions: Vec<[f32; 3]> = mesh
                    .positions
                    .chunks_exact(3)
                    .map(|p| [p[0], p[1], p[2]])
                    .collect();
                let normals = (!positions.is_empty() && mesh.normals.len() == mesh.positions.len()).then(|| {
                    mesh.normals
                        .chunks_exact(3)
                        .map(|n| [n[0], n[1], n[2]])
                        .collect::<Vec<_>>()
                });
                // OBJ puts the UV origin bottom-left.
                let tex_coords = (mesh.texcoords.len() / 2 == positions.len() && !positions.is_empty())
                    .then(|| {
                        mesh.texcoords
                            .chunks_exact(2)
                            .map(|t| [t[0], 1.0 - t[1]])
                            .collect::<Vec<_>>()
                    });
                let (tangents, bitangents) = match &tex_coords {
                    Some(tex_coords) => {
                        let (t, b) = generate_tangents(&positions, tex_coords, &mesh.indices);
                        (Some(t), Some(b))
                    }
                    None => (None, None),
                };

                let material = match mesh.material_id.filter(|&id| id < materials.len()) {
                    Some(id) => id,
                    None => *default_material.get_or_insert_with(|| {
                        materials.push(ImportedMaterial {
                            name: "default".to_string(),
                            ..Default::default()
                        });
                        materials.len() - 1
                    }),
                };

                ImportedMesh {
                    name: model.name,
                    positions,
                    normals,
                    tex_coords,
                    tangents,
                    bitangents,
                    indices: mesh.indices,
                    material: Some(material),
                }
            })
            .collect();

        // OBJ has no hierarchy: every object hangs off one root.
        let root = ImportedNode {
            name: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            meshes: (0..meshes.len()).collect(),
            children: Vec::new(),
        };

        Ok(ImportedScene {
            source: path.to_path_buf(),
            nodes: vec![root],
            root: Some(0),
            meshes,
            materials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o loose
v 5 5 5
v 6 5 5
v 5 6 5
f 1 2 3
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl brick
f 4/1/1 5/2/1 6/3/1 7/4/1
";

    const QUAD_MTL: &str = "\
newmtl brick
map_Kd textures/brick.png
map_Bump textures/brick_n.png
map_Pr textures/brick_r.png
";

    fn write_quad(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lantern-obj-{test}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("quad.mtl"), QUAD_MTL).unwrap();
        let path = dir.join("quad.obj");
        fs::write(&path, QUAD_OBJ).unwrap();
        path
    }

    #[test]
    fn test_quad_is_triangulated_with_flipped_uvs() {
        let path = write_quad("quad");
        let scene = ObjImporter.import(&path).unwrap();

        let quad = &scene.meshes[1];
        assert_eq!(quad.name, "quad");
        assert_eq!(quad.indices.len(), 6);
        assert_eq!(quad.positions.len(), 4);
        assert!(quad.normals.is_some());
        let uvs = quad.tex_coords.as_ref().unwrap();
        assert_eq!(uvs[0], [0.0, 1.0]);
        assert!(quad.tangents.is_some());
    }

    #[test]
    fn test_single_root_lists_every_mesh() {
        let path = write_quad("root");
        let scene = ObjImporter.import(&path).unwrap();

        assert_eq!(scene.root, Some(0));
        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.mesh_order(), vec![0, 1]);
    }

    #[test]
    fn test_mtl_maps_resolve_next_to_the_obj() {
        let path = write_quad("mtl");
        let dir = path.parent().unwrap();
        let scene = ObjImporter.import(&path).unwrap();

        let brick = &scene.materials[0];
        assert_eq!(brick.name, "brick");
        assert_eq!(
            brick.base_color,
            Some(TextureSource::File(dir.join("textures/brick.png")))
        );
        assert_eq!(
            brick.normal,
            Some(TextureSource::File(dir.join("textures/brick_n.png")))
        );
        assert_eq!(
            brick.roughness,
            Some(TextureSource::File(dir.join("textures/brick_r.png")))
        );

        // The object before any usemtl gets the appended default material.
        let loose = &scene.meshes[0];
        assert!(loose.tex_coords.is_none());
        assert_eq!(loose.material, Some(1));
        assert_eq!(scene.meshes[1].material, Some(0));
    }

    #[test]
    fn test_missing_obj_is_import_error() {
        let err = ObjImporter.import(Path::new("nope/missing.obj")).unwrap_err();
        assert!(matches!(err, AssetError::Import { .. }));
    }
}
