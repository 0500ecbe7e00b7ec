//! Core rendering functionality
//!
//! Shader programs, the point-light shadow cube and the frame renderer.

pub mod renderer;
pub mod shader_program;
pub mod shadow;
pub mod uniform_block;

// Re-export main types
pub use renderer::Renderer;
pub use shader_program::{PipelineConfig, ProgramDesc, ProgramLibrary, ShaderProgram, StageSource};
pub use shadow::ShadowMap;
pub use uniform_block::{UniformBlock, UniformKind, UniformLayout};
