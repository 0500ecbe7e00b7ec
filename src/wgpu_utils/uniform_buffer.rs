//! Uniform buffers that only upload when their bytes change.

use std::marker::PhantomData;

use wgpu::util::DeviceExt;

/// Uniform buffer over a CPU byte block
///
/// Used directly where the layout is described at run time, and through
/// [`UniformBuffer`] for fixed `Pod` structs.
pub struct RawUniformBuffer {
    buffer: wgpu::Buffer,
    previous_content: Vec<u8>,
}

impl RawUniformBuffer {
    /// Zero-filled buffer of `size` bytes. The first `update_content` always writes.
    pub fn new(device: &wgpu::Device, label: &str, size: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniform Buffer")),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            previous_content: Vec::new(),
        }
    }

    pub fn with_content(device: &wgpu::Device, label: &str, content: &[u8]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Uniform Buffer")),
            contents: content,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            buffer,
            previous_content: content.to_vec(),
        }
    }

    /// Writes `content` when it differs from the last upload. Returns whether a write happened.
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: &[u8]) -> bool {
        if self.previous_content == content {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, content);
        self.previous_content = content.to_vec();
        true
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }

    /// Frees the GPU allocation now rather than when the last handle drops
    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}

/// Typed view of a [`RawUniformBuffer`] holding one `Content`
pub struct UniformBuffer<Content> {
    raw: RawUniformBuffer,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    pub fn new_with_data(device: &wgpu::Device, label: &str, initial_content: &Content) -> Self {
        Self {
            raw: RawUniformBuffer::with_content(device, label, bytemuck::bytes_of(initial_content)),
            content_type: PhantomData,
        }
    }

    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) -> bool {
        self.raw.update_content(queue, bytemuck::bytes_of(&content))
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.raw.binding_resource()
    }

    pub fn destroy(&self) {
        self.raw.destroy();
    }
}
