//! Lantern scene viewer
//!
//! A real-time 3D scene viewer built on wgpu and winit. Models are imported
//! from glTF or OBJ files, shaded with a metal/roughness PBR model and
//! shadowed by a single point light through a depth cube map. An imgui
//! overlay edits the light and model transforms live.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::Viewer;
pub use config::SceneConfig;
