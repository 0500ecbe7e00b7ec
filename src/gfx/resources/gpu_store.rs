//! wgpu-backed resource arenas
//!
//! Owns every texture, material bind group, mesh buffer pair and per-model
//! transform uniform created during loading. Ids handed out through
//! [`ResourceUploader`] index into these arenas; released slots stay `None`.

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::error::GpuResourceError;
use crate::gfx::scene::vertex::Vertex;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types, error_scope,
    uniform_buffer::UniformBuffer,
};

use super::image_decoder::DecodedImage;
use super::texture_resource::TextureResource;
use super::uploader::{
    MeshBufferId, PbrBindingId, PixelFormat, ResourceUploader, TextureId, TransformSlotId,
};

/// Per-model uniform. MUST match `ModelUniforms` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub matrix_model: [[f32; 4]; 4],
}

pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

pub struct TransformSlot {
    buffer: UniformBuffer<ModelUniform>,
    pub bind_group: wgpu::BindGroup,
}

pub struct GpuStore {
    device: wgpu::Device,
    queue: wgpu::Queue,
    material_layout: BindGroupLayoutWithDesc,
    model_layout: BindGroupLayoutWithDesc,
    textures: Vec<Option<TextureResource>>,
    pbr_bindings: Vec<Option<wgpu::BindGroup>>,
    meshes: Vec<Option<MeshBuffers>>,
    transforms: Vec<Option<TransformSlot>>,
}

impl GpuStore {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        // texture_base, texture_normal, texture_roughness, sampler
        let material_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        let model_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(device, "Model Bind Group Layout");

        Self {
            device: device.clone(),
            queue: queue.clone(),
            material_layout,
            model_layout,
            textures: Vec::new(),
            pbr_bindings: Vec::new(),
            meshes: Vec::new(),
            transforms: Vec::new(),
        }
    }

    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout.layout
    }

    pub fn model_layout(&self) -> &wgpu::BindGroupLayout {
        &self.model_layout.layout
    }

    pub fn mesh(&self, id: MeshBufferId) -> Option<&MeshBuffers> {
        self.meshes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn pbr_binding(&self, id: PbrBindingId) -> Option<&wgpu::BindGroup> {
        self.pbr_bindings.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn transform(&self, id: TransformSlotId) -> Option<&wgpu::BindGroup> {
        self.transforms
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .map(|slot| &slot.bind_group)
    }

    /// Uploads a model matrix. Unchanged matrices are not rewritten.
    pub fn write_transform(&mut self, id: TransformSlotId, matrix: Matrix4<f32>) {
        if let Some(Some(slot)) = self.transforms.get_mut(id.0 as usize) {
            slot.buffer.update_content(
                &self.queue,
                ModelUniform {
                    matrix_model: matrix.into(),
                },
            );
        }
    }

    pub fn texture_count(&self) -> usize {
        self.textures.iter().flatten().count()
    }

    /// Destroys everything, newest kind first: transforms, meshes, material bindings, textures.
    pub fn release_all(&mut self) {
        for slot in self.transforms.drain(..).flatten() {
            slot.buffer.destroy();
        }
        for mesh in self.meshes.drain(..).flatten() {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
        self.pbr_bindings.clear();
        for texture in self.textures.drain(..).flatten() {
            texture.texture.destroy();
        }
        log::debug!("Released all GPU scene resources");
    }

    fn texture(&self, id: TextureId) -> Result<&TextureResource, GpuResourceError> {
        self.textures
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| GpuResourceError {
                label: format!("texture {}", id.0),
                message: "texture has been released".to_string(),
            })
    }
}

/// Rejects images wgpu cannot hold before any GPU call is made.
pub fn validate_image(label: &str, image: &DecodedImage, format: PixelFormat) -> Result<(), GpuResourceError> {
    let invalid = |message: String| GpuResourceError {
        label: label.to_string(),
        message,
    };
    if image.width == 0 || image.height == 0 {
        return Err(invalid(format!(
            "image has zero extent ({}x{})",
            image.width, image.height
        )));
    }
    let expected = image.width as usize * image.height as usize * format.channels();
    if image.pixels.len() != expected {
        return Err(invalid(format!(
            "expected {expected} bytes of pixel data, got {}",
            image.pixels.len()
        )));
    }
    Ok(())
}

impl ResourceUploader for GpuStore {
    fn upload_texture(
        &mut self,
        label: &str,
        image: &DecodedImage,
        format: PixelFormat,
    ) -> Result<TextureId, GpuResourceError> {
        validate_image(label, image, format)?;
        let texture = error_scope::capture(&self.device, label, || {
            TextureResource::create_material_texture(&self.device, &self.queue, image, format, label)
        })?;

        self.textures.push(Some(texture));
        Ok(TextureId(self.textures.len() as u32 - 1))
    }

    fn bind_pbr_textures(
        &mut self,
        label: &str,
        albedo: TextureId,
        normal: TextureId,
        metal_roughness: TextureId,
    ) -> Result<PbrBindingId, GpuResourceError> {
        let albedo = self.texture(albedo)?;
        let normal = self.texture(normal)?;
        let metal_roughness = self.texture(metal_roughness)?;

        let bind_group = error_scope::capture(&self.device, label, || {
            BindGroupBuilder::new(&self.material_layout)
                .texture(&albedo.view)
                .texture(&normal.view)
                .texture(&metal_roughness.view)
                .sampler(&albedo.sampler)
                .create(&self.device, &format!("{label} Material Bind Group"))
        })?;

        self.pbr_bindings.push(Some(bind_group));
        Ok(PbrBindingId(self.pbr_bindings.len() as u32 - 1))
    }

    fn upload_mesh(
        &mut self,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshBufferId, GpuResourceError> {
        let mesh = error_scope::capture(&self.device, label, || MeshBuffers {
            vertex_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertex Buffer")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Index Buffer")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: indices.len() as u32,
        })?;

        self.meshes.push(Some(mesh));
        Ok(MeshBufferId(self.meshes.len() as u32 - 1))
    }

    fn create_transform_slot(&mut self, label: &str) -> Result<TransformSlotId, GpuResourceError> {
        let slot = error_scope::capture(&self.device, label, || {
            let buffer = UniformBuffer::new_with_data(
                &self.device,
                label,
                &ModelUniform {
                    matrix_model: Matrix4::from_scale(1.0).into(),
                },
            );
            let bind_group = BindGroupBuilder::new(&self.model_layout)
                .resource(buffer.binding_resource())
                .create(&self.device, &format!("{label} Model Bind Group"));
            TransformSlot { buffer, bind_group }
        })?;

        self.transforms.push(Some(slot));
        Ok(TransformSlotId(self.transforms.len() as u32 - 1))
    }

    fn release_mesh(&mut self, id: MeshBufferId) {
        if let Some(mesh) = self.meshes.get_mut(id.0 as usize).and_then(Option::take) {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
    }

    fn release_transform_slot(&mut self, id: TransformSlotId) {
        if let Some(slot) = self.transforms.get_mut(id.0 as usize).and_then(Option::take) {
            slot.buffer.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_extent_image_is_rejected() {
        let image = DecodedImage {
            pixels: Vec::new(),
            width: 0,
            height: 4,
            channels: 4,
        };
        let err = validate_image("empty.png", &image, PixelFormat::Rgba8).unwrap_err();
        assert_eq!(err.label, "empty.png");
    }

    #[test]
    fn test_pixel_count_must_match_format() {
        let image = DecodedImage {
            pixels: vec![0; 2 * 2 * 3],
            width: 2,
            height: 2,
            channels: 3,
        };
        assert!(validate_image("rgb", &image, PixelFormat::Rgb8).is_ok());
        assert!(validate_image("rgb", &image, PixelFormat::Rgba8).is_err());
    }

    #[test]
    fn test_model_uniform_is_one_matrix() {
        assert_eq!(std::mem::size_of::<ModelUniform>(), 64);
    }
}
