//! GPU resource management
//!
//! Handles textures, mesh buffers and bind groups for rendering.

pub mod gpu_store;
pub mod image_decoder;
pub mod texture_cache;
pub mod texture_resource;
pub mod uploader;

// Re-export main types
pub use gpu_store::GpuStore;
pub use image_decoder::{FileImageDecoder, ImageDecoder, TextureSource};
pub use texture_cache::{PbrTexture, Texture, TextureCache, TextureRole};
pub use texture_resource::TextureResource;
pub use uploader::ResourceUploader;
