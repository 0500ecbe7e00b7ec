use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::AssetError;

/// Where a texture's encoded bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    File(PathBuf),
    /// Image packed inside another asset (e.g. a glTF buffer view).
    Embedded { key: String, bytes: Arc<[u8]> },
}

impl TextureSource {
    /// Cache key: the file path, or the embedding asset's synthetic key.
    pub fn key(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().into_owned(),
            Self::Embedded { key, .. } => key.clone(),
        }
    }
}

/// Tightly packed 8-bit pixels, `channels` bytes per pixel, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl DecodedImage {
    /// Keeps the source channel count; wider sample types are narrowed to 8 bits.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let channels = image.color().channel_count();
        let pixels = match channels {
            1 => image.into_luma8().into_raw(),
            2 => image.into_luma_alpha8().into_raw(),
            3 => image.into_rgb8().into_raw(),
            _ => image.into_rgba8().into_raw(),
        };

        Self {
            pixels,
            width,
            height,
            channels,
        }
    }

    /// Opaque single-texel image used when nothing else can be loaded.
    pub fn solid_rgba(color: [u8; 4]) -> Self {
        Self {
            pixels: color.to_vec(),
            width: 1,
            height: 1,
            channels: 4,
        }
    }
}

pub trait ImageDecoder {
    fn decode(&self, source: &TextureSource) -> Result<DecodedImage, AssetError>;
}

/// Decodes files and embedded buffers with the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageDecoder;

impl ImageDecoder for FileImageDecoder {
    fn decode(&self, source: &TextureSource) -> Result<DecodedImage, AssetError> {
        let decoded = match source {
            TextureSource::File(path) => image::open(path),
            TextureSource::Embedded { bytes, .. } => image::load_from_memory(bytes),
        }
        .map_err(|err| AssetError::Decode {
            source_key: source.key(),
            reason: err.to_string(),
        })?;

        Ok(DecodedImage::from_dynamic(decoded))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;

    /// Serves canned images by key and counts every decode attempt.
    #[derive(Debug, Default)]
    pub struct MockDecoder {
        pub images: HashMap<String, DecodedImage>,
        pub calls: Rc<Cell<usize>>,
    }

    impl MockDecoder {
        pub fn with_image(mut self, key: &str, channels: u8) -> Self {
            let image = DecodedImage {
                pixels: vec![128; 4 * channels as usize],
                width: 2,
                height: 2,
                channels,
            };
            self.images.insert(key.to_string(), image);
            self
        }
    }

    impl ImageDecoder for MockDecoder {
        fn decode(&self, source: &TextureSource) -> Result<DecodedImage, AssetError> {
            self.calls.set(self.calls.get() + 1);
            self.images
                .get(&source.key())
                .cloned()
                .ok_or_else(|| AssetError::Decode {
                    source_key: source.key(),
                    reason: "no such file".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage, RgbaImage};

    #[test]
    fn test_from_dynamic_keeps_channel_count() {
        let rgb = DecodedImage::from_dynamic(DynamicImage::ImageRgb8(RgbImage::new(3, 2)));
        assert_eq!(rgb.channels, 3);
        assert_eq!(rgb.pixels.len(), 3 * 2 * 3);

        let rgba = DecodedImage::from_dynamic(DynamicImage::ImageRgba8(RgbaImage::new(4, 4)));
        assert_eq!(rgba.channels, 4);
        assert_eq!(rgba.pixels.len(), 4 * 4 * 4);

        let gray = DecodedImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(2, 2)));
        assert_eq!(gray.channels, 1);
    }

    #[test]
    fn test_embedded_key() {
        let source = TextureSource::Embedded {
            key: "scene.glb#image3".to_string(),
            bytes: Arc::from(vec![0u8; 4]),
        };
        assert_eq!(source.key(), "scene.glb#image3");
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let source = TextureSource::File(PathBuf::from("definitely/not/here.png"));
        let err = FileImageDecoder.decode(&source).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn test_decode_embedded_png() {
        let mut bytes = Vec::new();
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            1,
            image::Rgba([10, 20, 30, 255]),
        ));
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let source = TextureSource::Embedded {
            key: "inline".to_string(),
            bytes: Arc::from(bytes),
        };
        let decoded = FileImageDecoder.decode(&source).unwrap();
        assert_eq!((decoded.width, decoded.height, decoded.channels), (2, 1, 4));
        assert_eq!(&decoded.pixels[..4], &[10, 20, 30, 255]);
    }
}
