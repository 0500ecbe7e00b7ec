//! Declarative scene configuration
//!
//! A scene file lists the models to load together with camera, light, shadow
//! and window settings. Every field has a default, so an empty file is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Program used for models that do not name one.
pub const DEFAULT_PROGRAM: &str = "pbr";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub shadow: ShadowConfig,
    pub assets: AssetConfig,
    /// Named lit programs. `pbr` falls back to the built-in WGSL program when absent.
    pub shaders: BTreeMap<String, ProgramConfig>,
    pub shadow_program: Option<ProgramConfig>,
    pub duplicate_models: DuplicatePolicy,
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sensitivity: f32,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub power: f32,
    pub radius: f32,
    pub gamma: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Edge length of each cube face in texels.
    pub resolution: u32,
    pub near: f32,
    pub far: f32,
    pub bias: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub default_texture: Option<PathBuf>,
}

/// Precompiled SPIR-V stages for one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    #[serde(default)]
    pub geometry: Option<PathBuf>,
}

/// What to do when a model name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Replace the previous model and release its GPU buffers.
    #[default]
    Replace,
    /// Keep the previous model and log the rejected one.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_shader")]
    pub shader: String,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

fn default_shader() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "lantern".to_string(),
            width: 1366,
            height: 768,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 110.0,
            near: 0.1,
            far: 2000.0,
            speed: 20.0,
            sensitivity: 0.1,
            position: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 50.0, 0.0],
            color: [1.0, 1.0, 1.0],
            power: 64.0,
            radius: 64.0,
            gamma: 2.2,
        }
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 1024,
            near: 0.1,
            far: 250.0,
            bias: 0.05,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            shadow: ShadowConfig::default(),
            assets: AssetConfig::default(),
            shaders: BTreeMap::new(),
            shadow_program: None,
            duplicate_models: DuplicatePolicy::default(),
            models: vec![
                ModelConfig {
                    name: "sponza".to_string(),
                    path: PathBuf::from("assets/sponza-gltf-pbr/sponza.glb"),
                    shader: default_shader(),
                    translation: [0.0, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                    scale: [0.1, 0.1, 0.1],
                },
                ModelConfig {
                    name: "helmet".to_string(),
                    path: PathBuf::from("assets/SciFiHelmet.gltf"),
                    shader: default_shader(),
                    translation: [0.0, 10.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                    scale: [3.0, 3.0, 3.0],
                },
            ],
        }
    }
}

impl SceneConfig {
    /// Reads a scene file and resolves its relative paths against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        log::info!(
            "Loaded scene '{}' with {} model(s)",
            path.display(),
            config.models.len()
        );
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Rewrites every relative asset and shader path as `base.join(path)`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        for model in &mut self.models {
            resolve(&mut model.path);
        }
        if let Some(texture) = self.assets.default_texture.as_mut() {
            resolve(texture);
        }
        for program in self.shaders.values_mut().chain(self.shadow_program.as_mut()) {
            resolve(&mut program.vertex);
            resolve(&mut program.fragment);
            if let Some(geometry) = program.geometry.as_mut() {
                resolve(geometry);
            }
        }
    }
}
