//! # Graphics Module
//!
//! Everything between a scene file and pixels on screen.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - free-flying first-person camera
//! - **Import** ([`import`]) - glTF and OBJ files to an in-memory mesh/material graph
//! - **Resource Management** ([`resources`]) - texture cache and GPU resource arenas
//! - **Scene Management** ([`scene`]) - meshes, models and the named registry
//! - **Rendering Pipeline** ([`rendering`]) - cube shadow passes and PBR lit pass
//! - **Debug UI** ([`ui`]) - imgui panels for light, models and frame time
//!
//! Loading code never talks to wgpu directly; it goes through
//! [`resources::ResourceUploader`] so it can be tested without a GPU.

pub mod camera;
pub mod import;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod ui;

// Re-export commonly used types
pub use camera::FlyCamera;
pub use rendering::Renderer;
pub use scene::SceneState;
