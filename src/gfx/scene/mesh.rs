//! Meshes: validated triangle lists uploaded to the GPU with their material.

use crate::error::AssetError;
use crate::gfx::import::ImportedMesh;
use crate::gfx::resources::texture_cache::PbrTexture;
use crate::gfx::resources::uploader::{MeshBufferId, ResourceUploader};

use super::vertex::Vertex;

/// One drawable triangle list with its material.
///
/// The CPU copy of the geometry is kept for statistics; the GPU buffers are
/// owned by the uploader and referenced through `buffers`.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub pbr: PbrTexture,
    pub buffers: MeshBufferId,
}

impl Mesh {
    /// Validates the geometry and uploads it.
    ///
    /// Fails on an index outside the vertex range, on an empty triangle list
    /// and on a rejected GPU upload.
    pub fn new(
        name: String,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        pbr: PbrTexture,
        uploader: &mut dyn ResourceUploader,
    ) -> Result<Self, AssetError> {
        validate_indices(&name, &indices, vertices.len())?;
        let buffers = uploader.upload_mesh(&name, &vertices, &indices)?;

        Ok(Self {
            name,
            vertices,
            indices,
            pbr,
            buffers,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Interleaves imported attributes. Missing or short attribute arrays leave zeros.
pub fn vertices_from_import(mesh: &ImportedMesh) -> Vec<Vertex> {
    fn attribute<T: Copy + Default>(values: &Option<Vec<T>>, index: usize) -> T {
        values
            .as_ref()
            .and_then(|values| values.get(index))
            .copied()
            .unwrap_or_default()
    }

    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| Vertex {
            position,
            normal: attribute(&mesh.normals, i),
            tex_coords: attribute(&mesh.tex_coords, i),
            tangent: attribute(&mesh.tangents, i),
            bitangent: attribute(&mesh.bitangents, i),
        })
        .collect()
}

fn validate_indices(name: &str, indices: &[u32], vertex_count: usize) -> Result<(), AssetError> {
    if indices.len() < 3 {
        return Err(AssetError::EmptyMesh {
            mesh: name.to_string(),
        });
    }
    if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
        return Err(AssetError::IndexOutOfRange {
            mesh: name.to_string(),
            index,
            vertex_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::texture_cache::{Texture, TextureRole};
    use crate::gfx::resources::uploader::mock::MockUploader;
    use crate::gfx::resources::uploader::{PbrBindingId, TextureId};

    fn pbr() -> PbrTexture {
        let texture = |role| Texture {
            id: TextureId(0),
            role,
        };
        PbrTexture {
            albedo: texture(TextureRole::BaseColor),
            normal: texture(TextureRole::Normal),
            metal_roughness: texture(TextureRole::Roughness),
            binding: PbrBindingId(0),
        }
    }

    fn triangle() -> Vec<Vertex> {
        vec![Vertex::default(); 3]
    }

    #[test]
    fn test_valid_mesh_is_uploaded() {
        let mut uploader = MockUploader::default();
        let mesh = Mesh::new("tri".into(), triangle(), vec![0, 1, 2], pbr(), &mut uploader).unwrap();

        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(uploader.meshes, vec![("tri".to_string(), 3, 3)]);
    }

    #[test]
    fn test_out_of_range_index_is_rejected_before_upload() {
        let mut uploader = MockUploader::default();
        let err = Mesh::new("bad".into(), triangle(), vec![0, 1, 3], pbr(), &mut uploader).unwrap_err();

        assert!(matches!(
            err,
            AssetError::IndexOutOfRange {
                index: 3,
                vertex_count: 3,
                ..
            }
        ));
        assert!(uploader.meshes.is_empty());
    }

    #[test]
    fn test_mesh_without_triangles_is_rejected() {
        let mut uploader = MockUploader::default();
        let err = Mesh::new("empty".into(), triangle(), Vec::new(), pbr(), &mut uploader).unwrap_err();
        assert!(matches!(err, AssetError::EmptyMesh { .. }));
    }

    #[test]
    fn test_missing_attributes_stay_zero() {
        let imported = ImportedMesh {
            positions: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            normals: Some(vec![[0.0, 1.0, 0.0]]),
            ..Default::default()
        };
        let vertices = vertices_from_import(&imported);

        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[1].normal, [0.0; 3]);
        assert_eq!(vertices[1].tex_coords, [0.0; 2]);
        assert_eq!(vertices[1].position, [4.0, 5.0, 6.0]);
    }
}
