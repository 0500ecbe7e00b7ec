//! Binding types used by the lit, shadow and material layouts

pub fn uniform() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

/// `Filtering` for material textures, `Comparison` for the shadow cube.
pub fn sampler(kind: wgpu::SamplerBindingType) -> wgpu::BindingType {
    wgpu::BindingType::Sampler(kind)
}

/// Filterable float 2D texture (albedo, normal, metal-roughness).
pub fn texture_2d() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

/// Depth cube sampled with a comparison sampler.
pub fn texture_depth_cube() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Depth,
        view_dimension: wgpu::TextureViewDimension::Cube,
        multisampled: false,
    }
}
