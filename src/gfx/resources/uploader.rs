//! GPU upload seam
//!
//! Scene and cache code never touches wgpu directly. They ask a
//! [`ResourceUploader`] for GPU objects and keep the returned opaque ids; the
//! wgpu implementation ([`super::gpu_store::GpuStore`]) owns the objects.

use crate::error::GpuResourceError;
use crate::gfx::scene::vertex::Vertex;

use super::image_decoder::DecodedImage;

/// Handle to a 2D texture with a full mip chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

/// Handle to a bind group of albedo, normal and metal-roughness textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PbrBindingId(pub(crate) u32);

/// Handle to a mesh's vertex and index buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshBufferId(pub(crate) u32);

/// Handle to a per-model transform uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformSlotId(pub(crate) u32);

/// Source pixel layout chosen from the decoded channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

pub trait ResourceUploader {
    fn upload_texture(
        &mut self,
        label: &str,
        image: &DecodedImage,
        format: PixelFormat,
    ) -> Result<TextureId, GpuResourceError>;

    fn bind_pbr_textures(
        &mut self,
        label: &str,
        albedo: TextureId,
        normal: TextureId,
        metal_roughness: TextureId,
    ) -> Result<PbrBindingId, GpuResourceError>;

    fn upload_mesh(
        &mut self,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshBufferId, GpuResourceError>;

    fn create_transform_slot(&mut self, label: &str) -> Result<TransformSlotId, GpuResourceError>;

    fn release_mesh(&mut self, id: MeshBufferId);

    fn release_transform_slot(&mut self, id: TransformSlotId);
}

/// In-memory uploader that records calls. Used by unit tests across the crate.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    #[derive(Debug, Default)]
    pub struct MockUploader {
        pub textures: Vec<(String, PixelFormat, u32, u32)>,
        pub pbr_bindings: Vec<(TextureId, TextureId, TextureId)>,
        pub meshes: Vec<(String, usize, usize)>,
        pub transform_slots: u32,
        pub released_meshes: Vec<MeshBufferId>,
        pub released_transforms: Vec<TransformSlotId>,
        pub fail_textures: bool,
    }

    impl ResourceUploader for MockUploader {
        fn upload_texture(
            &mut self,
            label: &str,
            image: &DecodedImage,
            format: PixelFormat,
        ) -> Result<TextureId, GpuResourceError> {
            if self.fail_textures {
                return Err(GpuResourceError {
                    label: label.to_string(),
                    message: "out of memory".to_string(),
                });
            }
            self.textures
                .push((label.to_string(), format, image.width, image.height));
            Ok(TextureId(self.textures.len() as u32 - 1))
        }

        fn bind_pbr_textures(
            &mut self,
            _label: &str,
            albedo: TextureId,
            normal: TextureId,
            metal_roughness: TextureId,
        ) -> Result<PbrBindingId, GpuResourceError> {
            self.pbr_bindings.push((albedo, normal, metal_roughness));
            Ok(PbrBindingId(self.pbr_bindings.len() as u32 - 1))
        }

        fn upload_mesh(
            &mut self,
            label: &str,
            vertices: &[Vertex],
            indices: &[u32],
        ) -> Result<MeshBufferId, GpuResourceError> {
            self.meshes
                .push((label.to_string(), vertices.len(), indices.len()));
            Ok(MeshBufferId(self.meshes.len() as u32 - 1))
        }

        fn create_transform_slot(
            &mut self,
            _label: &str,
        ) -> Result<TransformSlotId, GpuResourceError> {
            self.transform_slots += 1;
            Ok(TransformSlotId(self.transform_slots - 1))
        }

        fn release_mesh(&mut self, id: MeshBufferId) {
            self.released_meshes.push(id);
        }

        fn release_transform_slot(&mut self, id: TransformSlotId) {
            self.released_transforms.push(id);
        }
    }
}
