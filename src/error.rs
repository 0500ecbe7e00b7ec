//! Error taxonomy
//!
//! Asset and shader failures are absorbed where they happen and only logged;
//! [`GpuInitError`] is the one class that aborts startup.

use std::path::PathBuf;

use thiserror::Error;

/// Import or decode failure. Callers degrade to a default texture or an empty model.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to import '{path}': {reason}")]
    Import { path: PathBuf, reason: String },

    #[error("'{path}' has no root node")]
    IncompleteScene { path: PathBuf },

    #[error("unsupported asset format '{extension}' for '{path}'")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to decode image '{source_key}': {reason}")]
    Decode { source_key: String, reason: String },

    #[error("image '{source_key}' has {channels} channels, expected 3 or 4")]
    UnsupportedChannels { source_key: String, channels: u8 },

    #[error("mesh {mesh} references vertex {index} but only has {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh {mesh} has no triangles")]
    EmptyMesh { mesh: String },

    #[error(transparent)]
    Gpu(#[from] GpuResourceError),}

/// Shader stage loading or pipeline validation failure.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader binary '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a SPIR-V binary")]
    InvalidBinary { path: PathBuf },

    #[error("program '{program}' failed to compile:\n{diagnostic}")]
    Compile { program: String, diagnostic: String },

    #[error("program '{program}' requests a {stage} stage, which is not supported")]
    UnsupportedStage { program: String, stage: &'static str },
}

/// Startup failure. Fatal: the viewer exits with a nonzero status.
#[derive(Debug, Error)]
pub enum GpuInitError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("failed to create default texture: {0}")]
    DefaultTexture(#[source] GpuResourceError),

    #[error("failed to create shadow map: {0}")]
    ShadowTarget(#[source] GpuResourceError),
}

/// A GPU object creation that wgpu rejected. Non-fatal outside initialisation.
#[derive(Debug, Clone, Error)]
#[error("GPU resource '{label}' could not be created: {message}")]
pub struct GpuResourceError {
    pub label: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scene file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a model named '{0}' is already registered")]
    DuplicateName(String),
}
