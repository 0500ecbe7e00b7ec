//! glTF 2.0 import (`.gltf` with external or embedded buffers, and `.glb`)

use std::path::Path;
use std::sync::Arc;

use cgmath::{InnerSpace, Vector3, Vector4};

use crate::error::AssetError;
use crate::gfx::resources::image_decoder::TextureSource;

use super::tangents::generate_tangents;
use super::{ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, SceneImporter};

#[derive(Debug, Default, Clone, Copy)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, AssetError> {
        let import_error = |reason: String| AssetError::Import {
            path: path.to_path_buf(),
            reason,
        };

        let gltf = gltf::Gltf::open(path).map_err(|err| import_error(err.to_string()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let buffers = gltf::import_buffers(&gltf.document, Some(base), gltf.blob.clone())
            .map_err(|err| import_error(err.to_string()))?;
        let document = &gltf.document;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| AssetError::IncompleteScene {
                path: path.to_path_buf(),
            })?;

        let images: Vec<Option<TextureSource>> = document
            .images()
            .map(|image| image_source(path, base, &image, &buffers))
            .collect();

        let mut materials: Vec<ImportedMaterial> = document
            .materials()
            .enumerate()
            .map(|(index, material)| {
                let texture = |info: Option<gltf::Texture<'_>>| {
                    info.and_then(|texture| images.get(texture.source().index()).cloned().flatten())
                };
                let pbr = material.pbr_metallic_roughness();
                ImportedMaterial {
                    name: material
                        .name()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("material{index}")),
                    base_color: texture(pbr.base_color_texture().map(|info| info.texture())),
                    normal: texture(material.normal_texture().map(|info| info.texture())),
                    roughness: texture(pbr.metallic_roughness_texture().map(|info| info.texture())),
                }
            })
            .collect();
        let mut default_material = None;

        // glTF mesh index -> imported mesh indices, one per triangle primitive.
        let mut primitives_of_mesh = Vec::with_capacity(document.meshes().len());
        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            let mut primitive_indices = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping {:?} primitive {} of mesh '{}' in {}",
                        primitive.mode(),
                        primitive.index(),
                        mesh.name().unwrap_or("unnamed"),
                        path.display()
                    );
                    continue;
                }

                let material = match primitive.material().index() {
                    Some(index) => index,
                    None => *default_material.get_or_insert_with(|| {
                        materials.push(ImportedMaterial {
                            name: "default".to_string(),
                            ..Default::default()
                        });
                        materials.len() - 1
                    }),
                };

                let name = match mesh.name() {
                    Some(name) => format!("{name}#{}", primitive.index()),
                    None => format!("mesh{}#{}", mesh.index(), primitive.index()),
                };
                primitive_indices.push(meshes.len());
                meshes.push(read_primitive(name, &primitive, &buffers, material));
            }
            primitives_of_mesh.push(primitive_indices);
        }

        // Node 0 is a synthetic root holding the scene's top-level nodes.
        let mut nodes = Vec::with_capacity(document.nodes().len() + 1);
        nodes.push(ImportedNode {
            name: scene.name().unwrap_or("root").to_string(),
            meshes: Vec::new(),
            children: scene.nodes().map(|node| node.index() + 1).collect(),
        });
        for node in document.nodes() {
            nodes.push(ImportedNode {
                name: node
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("node{}", node.index())),
                meshes: node
                    .mesh()
                    .map(|mesh| primitives_of_mesh[mesh.index()].clone())
                    .unwrap_or_default(),
                children: node.children().map(|child| child.index() + 1).collect(),
            });
        }

        Ok(ImportedScene {
            source: path.to_path_buf(),
            nodes,
            root: Some(0),
            meshes,
            materials,
        })
    }
}

fn buffer_slice<'a>(buffers: &'a [gltf::buffer::Data], buffer: gltf::Buffer<'_>) -> Option<&'a [u8]> {
    buffers.get(buffer.index()).map(|data| data.0.as_slice())
}

fn read_primitive(
    name: String,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    material: usize,
) -> ImportedMesh {
    let reader = primitive.reader(|buffer| buffer_slice(buffers, buffer));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|positions| positions.collect())
        .unwrap_or_default();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|normals| normals.collect());
    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let (tangents, bitangents) = match (reader.read_tangents(), &tex_coords) {
        (Some(tangents), _) => {
            // glTF stores handedness in w: bitangent = cross(normal, tangent) * w.
            let mut tangent_out = Vec::with_capacity(positions.len());
            let mut bitangent_out = Vec::with_capacity(positions.len());
            for (index, tangent) in tangents.enumerate() {
                let tangent = Vector4::from(tangent);
                let normal = normals
                    .as_ref()
                    .and_then(|normals| normals.get(index))
                    .map(|n| Vector3::from(*n))
                    .unwrap_or_else(|| Vector3::new(0.0, 0.0, 0.0));
                let bitangent = normal.cross(tangent.truncate()) * tangent.w;
                tangent_out.push(tangent.truncate().into());
                bitangent_out.push(if bitangent.magnitude2() > 0.0 {
                    bitangent.normalize().into()
                } else {
                    [0.0; 3]
                });
            }
            (Some(tangent_out), Some(bitangent_out))
        }
        (None, Some(tex_coords)) => {
            let (tangents, bitangents) = generate_tangents(&positions, tex_coords, &indices);
            (Some(tangents), Some(bitangents))
        }
        (None, None) => (None, None),
    };

    ImportedMesh {
        name,
        positions,
        normals,
        tex_coords,
        tangents,
        bitangents,
        indices,
        material: Some(material),
    }
}

fn image_source(
    path: &Path,
    base: &Path,
    image: &gltf::Image<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<TextureSource> {
    match image.source() {
        gltf::image::Source::View { view, .. } => {
            let data = buffer_slice(buffers, view.buffer())?;
            let bytes = data.get(view.offset()..view.offset() + view.length())?;
            Some(TextureSource::Embedded {
                key: format!("{}#image{}", path.display(), image.index()),
                bytes: Arc::from(bytes),
            })
        }
        gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
            log::warn!(
                "Image {} in {} uses a data URI, which is not supported",
                image.index(),
                path.display()
            );
            None
        }
        gltf::image::Source::Uri { uri, .. } => match urlencoding::decode(uri) {
            Ok(decoded) => Some(TextureSource::File(base.join(&*decoded))),
            Err(err) => {
                log::warn!(
                    "Image {} in {} has an undecodable URI '{uri}': {err}",
                    image.index(),
                    path.display()
                );
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "parent", "mesh": 0, "children": [1] },
            { "name": "child", "mesh": 0 }
        ],
        "images": [{ "uri": "albedo.png" }],
        "textures": [{ "source": 0 }],
        "materials": [{
            "name": "painted",
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
        }],
        "meshes": [{
            "name": "tri",
            "primitives": [
                { "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "indices": 2, "material": 0 },
                { "attributes": { "POSITION": 0 } }
            ]
        }],
        "buffers": [{ "uri": "tri.bin", "byteLength": 68 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 60, "byteLength": 6 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
            { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    fn write_triangle(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lantern-{test}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let uvs: [f32; 6] = [0.0, 1.0, 1.0, 1.0, 0.0, 0.0];
        let indices: [u16; 4] = [0, 1, 2, 0];
        let mut bin = Vec::new();
        bin.extend_from_slice(bytemuck::cast_slice(&positions));
        bin.extend_from_slice(bytemuck::cast_slice(&uvs));
        bin.extend_from_slice(bytemuck::cast_slice(&indices));
        assert_eq!(bin.len(), 68);

        fs::write(dir.join("tri.bin"), bin).unwrap();
        let path = dir.join("tri.gltf");
        fs::write(&path, TRIANGLE_GLTF).unwrap();
        path
    }

    #[test]
    fn test_import_builds_rooted_node_graph() {
        let path = write_triangle("graph");
        let scene = GltfImporter.import(&path).unwrap();

        assert_eq!(scene.root, Some(0));
        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.nodes[0].children, vec![1]);
        assert_eq!(scene.nodes[1].name, "parent");
        assert_eq!(scene.nodes[1].children, vec![2]);
        // Both primitives are referenced by both nodes.
        assert_eq!(scene.mesh_order(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_import_reads_attributes_and_generates_tangents() {
        let path = write_triangle("attributes");
        let scene = GltfImporter.import(&path).unwrap();

        let indexed = &scene.meshes[0];
        assert_eq!(indexed.positions.len(), 3);
        assert_eq!(indexed.indices, vec![0, 1, 2]);
        assert!(indexed.normals.is_none());
        assert_eq!(indexed.tex_coords.as_ref().map(Vec::len), Some(3));
        let tangent = indexed.tangents.as_ref().unwrap()[0];
        assert!((tangent[0] - 1.0).abs() < 1e-5);

        // No index accessor: sequential indices. No UVs: no tangent frame.
        let unindexed = &scene.meshes[1];
        assert_eq!(unindexed.indices, vec![0, 1, 2]);
        assert!(unindexed.tangents.is_none());
    }

    #[test]
    fn test_materials_resolve_textures_and_default() {
        let path = write_triangle("materials");
        let scene = GltfImporter.import(&path).unwrap();

        assert_eq!(scene.materials.len(), 2);
        let painted = &scene.materials[0];
        assert_eq!(
            painted.base_color,
            Some(TextureSource::File(path.parent().unwrap().join("albedo.png")))
        );
        assert!(painted.normal.is_none());

        // The material-less primitive gets an appended default material.
        assert_eq!(scene.meshes[0].material, Some(0));
        assert_eq!(scene.meshes[1].material, Some(1));
        assert_eq!(scene.materials[1].name, "default");
    }

    fn write_gltf_with_image_uri(test: &str, uri: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lantern-uri-{test}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let document = format!(
            r#"{{
                "asset": {{ "version": "2.0" }},
                "scenes": [{{ "nodes": [0] }}],
                "nodes": [{{ "name": "empty" }}],
                "images": [{{ "uri": "{uri}" }}],
                "textures": [{{ "source": 0 }}],
                "materials": [{{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }}]
            }}"#
        );
        let path = dir.join("image.gltf");
        fs::write(&path, document).unwrap();
        path
    }

    #[test]
    fn test_image_uri_is_percent_decoded() {
        let path = write_gltf_with_image_uri("encoded", "my%20albedo.png");
        let scene = GltfImporter.import(&path).unwrap();

        assert_eq!(
            scene.materials[0].base_color,
            Some(TextureSource::File(path.parent().unwrap().join("my albedo.png")))
        );
    }

    #[test]
    fn test_data_uri_image_is_skipped() {
        let path = write_gltf_with_image_uri("data", "data:image/png;base64,AAAA");
        let scene = GltfImporter.import(&path).unwrap();

        assert!(scene.materials[0].base_color.is_none());
    }

    #[test]
    fn test_missing_file_is_import_error() {
        let err = GltfImporter
            .import(Path::new("does/not/exist.gltf"))
            .unwrap_err();
        assert!(matches!(err, AssetError::Import { .. }));
    }
}
