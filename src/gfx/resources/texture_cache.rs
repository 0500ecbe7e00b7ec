//! Path-keyed texture cache
//!
//! Owns every decoded texture and every composed PBR set for the lifetime of
//! the renderer. A source key maps to at most one GPU texture. Failures never
//! reach the caller: they are logged and the default texture is handed out.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{AssetError, GpuResourceError};

use super::image_decoder::{DecodedImage, ImageDecoder, TextureSource};
use super::uploader::{PbrBindingId, PixelFormat, ResourceUploader, TextureId};

/// What a texture is sampled as in the lit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    BaseColor,
    Normal,
    /// Metal-roughness data (glTF packs roughness in G and metalness in B).
    Roughness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Texture {
    pub id: TextureId,
    pub role: TextureRole,
}

/// Albedo, normal and metal-roughness textures bound together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PbrTexture {
    pub albedo: Texture,
    pub normal: Texture,
    pub metal_roughness: Texture,
    pub binding: PbrBindingId,
}

pub struct TextureCache {
    decoder: Box<dyn ImageDecoder>,
    textures: HashMap<String, Texture>,
    pbr_textures: HashMap<String, PbrTexture>,
    default_texture: Texture,
    default_pbr: PbrTexture,
}

pub const DEFAULT_TEXEL: [u8; 4] = [0, 0, 0, 255];

impl TextureCache {
    /// Creates the cache and its default textures.
    ///
    /// The default is `default_path` when it decodes to 3 or 4 channels,
    /// otherwise a single black texel. Only a GPU failure is an error here.
    pub fn new(
        decoder: Box<dyn ImageDecoder>,
        default_path: Option<&Path>,
        uploader: &mut dyn ResourceUploader,
    ) -> Result<Self, GpuResourceError> {
        let configured = default_path.and_then(|path| {
            let source = TextureSource::File(path.to_path_buf());
            match decoder.decode(&source) {
                Ok(image) if PixelFormat::from_channels(image.channels).is_some() => Some(image),
                Ok(image) => {
                    log::warn!(
                        "{}",
                        AssetError::UnsupportedChannels {
                            source_key: source.key(),
                            channels: image.channels,
                        }
                    );
                    None
                }
                Err(err) => {
                    log::warn!("Default texture unavailable, using built-in: {err}");
                    None
                }
            }
        });
        let image = configured.unwrap_or_else(|| DecodedImage::solid_rgba(DEFAULT_TEXEL));
        let format = PixelFormat::from_channels(image.channels).unwrap_or(PixelFormat::Rgba8);

        let id = uploader.upload_texture("default", &image, format)?;
        let default_texture = Texture {
            id,
            role: TextureRole::BaseColor,
        };
        let binding = uploader.bind_pbr_textures("default", id, id, id)?;
        let default_pbr = PbrTexture {
            albedo: default_texture,
            normal: Texture {
                id,
                role: TextureRole::Normal,
            },
            metal_roughness: Texture {
                id,
                role: TextureRole::Roughness,
            },
            binding,
        };

        Ok(Self {
            decoder,
            textures: HashMap::new(),
            pbr_textures: HashMap::new(),
            default_texture,
            default_pbr,
        })
    }

    /// Returns the cached texture for `source`, decoding and uploading it on first use.
    pub fn get_or_create_texture(
        &mut self,
        source: &TextureSource,
        role: TextureRole,
        uploader: &mut dyn ResourceUploader,
    ) -> Texture {
        let key = source.key();
        if let Some(texture) = self.textures.get(&key) {
            return *texture;
        }

        match self.create_texture(source, &key, role, uploader) {
            Ok(texture) => {
                log::debug!("Loaded texture '{key}' as {role:?}");
                self.textures.insert(key, texture);
                texture
            }
            Err(err) => {
                log::warn!("{err}; using default texture");
                Texture {
                    id: self.default_texture.id,
                    role,
                }
            }
        }
    }

    fn create_texture(
        &self,
        source: &TextureSource,
        key: &str,
        role: TextureRole,
        uploader: &mut dyn ResourceUploader,
    ) -> Result<Texture, AssetError> {
        let image = self.decoder.decode(source)?;
        let format = PixelFormat::from_channels(image.channels).ok_or_else(|| {
            AssetError::UnsupportedChannels {
                source_key: key.to_string(),
                channels: image.channels,
            }
        })?;
        let id = uploader.upload_texture(key, &image, format)?;

        Ok(Texture { id, role })
    }

    /// Composes three resolved textures into a named set, reusing an existing set of that name.
    pub fn get_or_create_pbr_texture(
        &mut self,
        textures: [Texture; 3],
        name: &str,
        uploader: &mut dyn ResourceUploader,
    ) -> PbrTexture {
        if let Some(pbr) = self.pbr_textures.get(name) {
            return *pbr;
        }

        let [albedo, normal, metal_roughness] = textures;
        match uploader.bind_pbr_textures(name, albedo.id, normal.id, metal_roughness.id) {
            Ok(binding) => {
                let pbr = PbrTexture {
                    albedo,
                    normal,
                    metal_roughness,
                    binding,
                };
                self.pbr_textures.insert(name.to_string(), pbr);
                pbr
            }
            Err(err) => {
                log::warn!("{err}; using default PBR set for '{name}'");
                self.default_pbr
            }
        }
    }

    pub fn lookup(&self, key: &str) -> Option<Texture> {
        self.textures.get(key).copied()
    }

    pub fn lookup_pbr(&self, name: &str) -> Option<PbrTexture> {
        self.pbr_textures.get(name).copied()
    }

    pub fn default_texture(&self) -> Texture {
        self.default_texture
    }

    pub fn default_pbr(&self) -> PbrTexture {
        self.default_pbr
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Forgets every entry. GPU objects are released by the uploader's owner.
    pub fn clear(&mut self) {
        self.textures.clear();
        self.pbr_textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::image_decoder::mock::MockDecoder;
    use crate::gfx::resources::uploader::mock::MockUploader;
    use std::path::PathBuf;

    fn file(path: &str) -> TextureSource {
        TextureSource::File(PathBuf::from(path))
    }

    fn cache_with(decoder: MockDecoder, uploader: &mut MockUploader) -> TextureCache {
        TextureCache::new(Box::new(decoder), None, uploader).unwrap()
    }

    #[test]
    fn test_same_path_returns_same_handle_with_one_decode() {
        let decoder = MockDecoder::default().with_image("wood.png", 4);
        let calls = decoder.calls.clone();
        let mut uploader = MockUploader::default();
        let mut cache = cache_with(decoder, &mut uploader);

        let first = cache.get_or_create_texture(&file("wood.png"), TextureRole::BaseColor, &mut uploader);
        let second = cache.get_or_create_texture(&file("wood.png"), TextureRole::BaseColor, &mut uploader);

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        // Default texture plus wood.png.
        assert_eq!(uploader.textures.len(), 2);
        assert_eq!(cache.texture_count(), 1);
    }

    #[test]
    fn test_decode_failure_returns_default_without_inserting() {
        let mut uploader = MockUploader::default();
        let mut cache = cache_with(MockDecoder::default(), &mut uploader);

        let texture = cache.get_or_create_texture(&file("missing.png"), TextureRole::Normal, &mut uploader);

        assert_eq!(texture.id, cache.default_texture().id);
        assert_eq!(texture.role, TextureRole::Normal);
        assert!(cache.lookup("missing.png").is_none());
        assert_eq!(cache.texture_count(), 0);
    }

    #[test]
    fn test_channel_count_selects_format() {
        let decoder = MockDecoder::default()
            .with_image("rgb.jpg", 3)
            .with_image("rgba.png", 4);
        let mut uploader = MockUploader::default();
        let mut cache = cache_with(decoder, &mut uploader);

        cache.get_or_create_texture(&file("rgb.jpg"), TextureRole::BaseColor, &mut uploader);
        cache.get_or_create_texture(&file("rgba.png"), TextureRole::BaseColor, &mut uploader);

        assert_eq!(uploader.textures[1].1, PixelFormat::Rgb8);
        assert_eq!(uploader.textures[2].1, PixelFormat::Rgba8);
    }

    #[test]
    fn test_unsupported_channel_count_uses_default() {
        let decoder = MockDecoder::default().with_image("mask.png", 1);
        let mut uploader = MockUploader::default();
        let mut cache = cache_with(decoder, &mut uploader);

        let texture = cache.get_or_create_texture(&file("mask.png"), TextureRole::Roughness, &mut uploader);

        assert_eq!(texture.id, cache.default_texture().id);
        assert!(cache.lookup("mask.png").is_none());
        assert_eq!(uploader.textures.len(), 1);
    }

    #[test]
    fn test_pbr_sets_dedupe_by_name() {
        let decoder = MockDecoder::default()
            .with_image("a.png", 4)
            .with_image("n.png", 3);
        let mut uploader = MockUploader::default();
        let mut cache = cache_with(decoder, &mut uploader);

        let albedo = cache.get_or_create_texture(&file("a.png"), TextureRole::BaseColor, &mut uploader);
        let normal = cache.get_or_create_texture(&file("n.png"), TextureRole::Normal, &mut uploader);
        let roughness = cache.default_texture();

        let first = cache.get_or_create_pbr_texture([albedo, normal, roughness], "a.png", &mut uploader);
        let second = cache.get_or_create_pbr_texture([albedo, normal, roughness], "a.png", &mut uploader);

        assert_eq!(first, second);
        assert_eq!(cache.lookup_pbr("a.png"), Some(first));
        // One binding for the default set and one for "a.png".
        assert_eq!(uploader.pbr_bindings.len(), 2);
    }

    #[test]
    fn test_configured_default_texture_is_used() {
        let decoder = MockDecoder::default().with_image("dev_black.png", 3);
        let mut uploader = MockUploader::default();
        let cache = TextureCache::new(
            Box::new(decoder),
            Some(Path::new("dev_black.png")),
            &mut uploader,
        )
        .unwrap();

        assert_eq!(uploader.textures[0].1, PixelFormat::Rgb8);
        assert_eq!(uploader.textures[0].2, 2);
        assert_eq!(cache.default_pbr().albedo.id, cache.default_texture().id);
    }

    #[test]
    fn test_missing_default_falls_back_to_builtin_texel() {
        let mut uploader = MockUploader::default();
        TextureCache::new(
            Box::new(MockDecoder::default()),
            Some(Path::new("nowhere.png")),
            &mut uploader,
        )
        .unwrap();

        assert_eq!(uploader.textures[0].1, PixelFormat::Rgba8);
        assert_eq!((uploader.textures[0].2, uploader.textures[0].3), (1, 1));
    }

    #[test]
    fn test_default_upload_failure_is_an_error() {
        let mut uploader = MockUploader {
            fail_textures: true,
            ..Default::default()
        };
        assert!(TextureCache::new(Box::new(MockDecoder::default()), None, &mut uploader).is_err());
    }
}
