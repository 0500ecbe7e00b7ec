//! # Scene Module
//!
//! Meshes, models and the named registry that owns them, plus the mutable
//! per-frame state shared by the debug UI and the renderer.
//!
//! ## Key Components
//!
//! - [`Model`] - meshes of one imported asset placed by a [`Transform`]
//! - [`ModelRegistry`] - models by name, in declaration order
//! - [`SceneState`] - the light and the registry, edited live
//! - [`Vertex`] - GPU vertex layout with a full tangent frame

pub mod draw;
pub mod mesh;
pub mod model;
pub mod registry;
pub mod vertex;

use crate::config::LightConfig;

// Re-export main types
pub use draw::DrawModel;
pub use mesh::Mesh;
pub use model::{LoadContext, Model, Transform};
pub use registry::ModelRegistry;
pub use vertex::Vertex;

/// The single point light plus the output gamma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub power: f32,
    /// Distance at which the light's contribution has faded to zero.
    pub radius: f32,
    pub gamma: f32,
}

impl From<&LightConfig> for Light {
    fn from(config: &LightConfig) -> Self {
        Self {
            position: config.position,
            color: config.color,
            power: config.power,
            radius: config.radius,
            gamma: config.gamma,
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::from(&LightConfig::default())
    }
}

/// Everything the UI may edit between frames.
#[derive(Debug, Default)]
pub struct SceneState {
    pub light: Light,
    pub models: ModelRegistry,
}

impl SceneState {
    pub fn new(light: Light) -> Self {
        Self {
            light,
            models: ModelRegistry::new(),
        }
    }
}
