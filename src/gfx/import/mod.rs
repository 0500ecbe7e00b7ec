//! Asset import
//!
//! Importers turn a file into an [`ImportedScene`]: a node graph with
//! per-node mesh references, triangulated mesh data with UVs in top-left
//! origin convention, tangent frames, and material texture sources.

pub mod gltf_importer;
pub mod obj_importer;
pub mod tangents;

use std::path::{Path, PathBuf};

use crate::error::AssetError;
use crate::gfx::resources::image_decoder::TextureSource;
use crate::gfx::resources::texture_cache::TextureRole;

pub use gltf_importer::GltfImporter;
pub use obj_importer::ObjImporter;

#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub source: PathBuf,
    pub nodes: Vec<ImportedNode>,
    pub root: Option<usize>,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedNode {
    pub name: String,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    /// Indices into [`ImportedScene::nodes`], in file order.
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    /// Triangle list.
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedMaterial {
    pub name: String,
    pub base_color: Option<TextureSource>,
    pub normal: Option<TextureSource>,
    pub roughness: Option<TextureSource>,
}

impl ImportedMaterial {
    pub fn texture(&self, role: TextureRole) -> Option<&TextureSource> {
        match role {
            TextureRole::BaseColor => self.base_color.as_ref(),
            TextureRole::Normal => self.normal.as_ref(),
            TextureRole::Roughness => self.roughness.as_ref(),
        }
    }
}

impl ImportedScene {
    /// Node indices depth-first from the root, parents before children and
    /// siblings in file order.
    ///
    /// Uses an explicit stack; a node reachable twice (or through a cycle) is
    /// visited once.
    pub fn depth_first_nodes(&self) -> Vec<usize> {
        let Some(root) = self.root else {
            return Vec::new();
        };

        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![root];

        while let Some(index) = stack.pop() {
            if index >= self.nodes.len() || visited[index] {
                continue;
            }
            visited[index] = true;
            order.push(index);
            // Reversed so the first child is popped first.
            stack.extend(self.nodes[index].children.iter().rev().copied());
        }

        order
    }

    /// Mesh indices in traversal order. A mesh referenced by several nodes appears once per reference.
    pub fn mesh_order(&self) -> Vec<usize> {
        self.depth_first_nodes()
            .into_iter()
            .flat_map(|node| self.nodes[node].meshes.iter().copied())
            .filter(|&mesh| mesh < self.meshes.len())
            .collect()
    }
}

/// Import collaborator: file path in, mesh/material graph out.
pub trait SceneImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, AssetError>;
}

/// Picks an importer from the file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssetImporter {
    gltf: GltfImporter,
    obj: ObjImporter,
}

impl SceneImporter for AssetImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, AssetError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "gltf" | "glb" => self.gltf.import(path),
            "obj" => self.obj.import(path),
            _ => Err(AssetError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, meshes: Vec<usize>, children: Vec<usize>) -> ImportedNode {
        ImportedNode {
            name: name.to_string(),
            meshes,
            children,
        }
    }

    fn tree() -> ImportedScene {
        // root(0) -> a(1) -> a1(3)
        //         -> b(2)
        ImportedScene {
            nodes: vec![
                node("root", vec![0], vec![1, 2]),
                node("a", vec![1], vec![3]),
                node("b", vec![2], vec![]),
                node("a1", vec![3], vec![]),
            ],
            root: Some(0),
            meshes: vec![ImportedMesh::default(); 4],
            ..Default::default()
        }
    }

    #[test]
    fn test_depth_first_parent_before_children() {
        assert_eq!(tree().depth_first_nodes(), vec![0, 1, 3, 2]);
        assert_eq!(tree().mesh_order(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_rootless_scene_has_no_meshes() {
        let mut scene = tree();
        scene.root = None;
        assert!(scene.mesh_order().is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        let mut scene = tree();
        scene.nodes[3].children.push(0);
        assert_eq!(scene.depth_first_nodes(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let depth = 100_000;
        let nodes = (0..depth)
            .map(|i| node("n", vec![], if i + 1 < depth { vec![i + 1] } else { vec![] }))
            .collect();
        let scene = ImportedScene {
            nodes,
            root: Some(0),
            ..Default::default()
        };
        assert_eq!(scene.depth_first_nodes().len(), depth);
    }

    #[test]
    fn test_dangling_references_are_skipped() {
        let mut scene = tree();
        scene.nodes[2].children.push(42);
        scene.nodes[2].meshes.push(99);
        assert_eq!(scene.mesh_order(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = AssetImporter::default()
            .import(Path::new("scene.fbx"))
            .unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedFormat { extension, .. } if extension == "fbx"));
    }
}
