//! Texture resource creation for wgpu
//!
//! Provides the depth buffer, the omnidirectional shadow cube and mip-mapped
//! material textures.

use image::{imageops::FilterType, RgbaImage};

use super::image_decoder::DecodedImage;
use super::uploader::PixelFormat;

/// GPU texture resource containing texture, view, and sampler
///
/// Bundles the three main components needed for texture operations:
/// - Texture: The actual GPU memory allocation
/// - View: Interface for shader access
/// - Sampler: Filtering and addressing configuration
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Number of layers in a cube texture, in +X, -X, +Y, -Y, +Z, -Z order.
pub const CUBE_FACE_COUNT: u32 = 6;

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of every material texture. Gamma is applied in the lit shader.
    pub const MATERIAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates a depth texture matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Creates the depth cube used for point-light shadows
    ///
    /// The resource's view is the cube view sampled in the lit pass, paired
    /// with a comparison sampler. Render into individual faces through
    /// [`TextureResource::cube_face_view`].
    pub fn create_shadow_cube(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Cube"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: CUBE_FACE_COUNT,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Shadow Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(CUBE_FACE_COUNT),
            ..Default::default()
        });

        // Hardware comparison: 1.0 when the reference depth is not behind the stored one.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// 2D render-target view of one cube face.
    pub fn cube_face_view(&self, face: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("Shadow Cube Face {face}")),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: face,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    /// Uploads a decoded image as a repeat-addressed, trilinear-filtered texture with a full mip chain.
    pub fn create_material_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &DecodedImage,
        format: PixelFormat,
        label: &str,
    ) -> Self {
        let base = RgbaImage::from_raw(image.width, image.height, expand_to_rgba(image, format))
            .unwrap_or_else(|| RgbaImage::new(image.width.max(1), image.height.max(1)));
        let (width, height) = base.dimensions();
        let mip_level_count = mip_level_count(width, height);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::MATERIAL_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for level in 0..mip_level_count {
            let level_width = (width >> level).max(1);
            let level_height = (height >> level).max(1);
            let resized;
            let pixels = if level == 0 {
                &base
            } else {
                resized = image::imageops::resize(&base, level_width, level_height, FilterType::Triangle);
                &resized
            };

            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level_width),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// Number of levels down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Widens RGB pixels to RGBA with opaque alpha; RGBA input is copied as-is.
pub fn expand_to_rgba(image: &DecodedImage, format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::Rgba8 => image.pixels.clone(),
        PixelFormat::Rgb8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(1000, 3), 10);
    }

    #[test]
    fn test_expand_rgb_adds_opaque_alpha() {
        let image = DecodedImage {
            pixels: vec![1, 2, 3, 4, 5, 6],
            width: 2,
            height: 1,
            channels: 3,
        };
        assert_eq!(
            expand_to_rgba(&image, PixelFormat::Rgb8),
            vec![1, 2, 3, 255, 4, 5, 6, 255]
        );
    }

    #[test]
    fn test_expand_rgba_is_identity() {
        let image = DecodedImage::solid_rgba([9, 8, 7, 6]);
        assert_eq!(expand_to_rgba(&image, PixelFormat::Rgba8), vec![9, 8, 7, 6]);
    }
}
