//! Shader programs: compiled stages, a render pipeline and a named uniform block
//!
//! Stages come from precompiled SPIR-V files or from the built-in WGSL
//! sources. Every stage uses the entry point `main`. Compile and pipeline
//! validation errors are captured with error scopes; a program that fails
//! stays in the library but is unusable, and draws with it are skipped.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cgmath::Matrix4;

use crate::config::{ProgramConfig, DEFAULT_PROGRAM};
use crate::error::ShaderError;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types, error_scope,
    uniform_buffer::RawUniformBuffer,
};

use super::uniform_block::{UniformBlock, UniformLayout};

pub const ENTRY_POINT: &str = "main";

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Where a stage's code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageSource {
    Spirv(PathBuf),
    Wgsl { label: &'static str, source: &'static str },
}

impl StageSource {
    fn label(&self) -> String {
        match self {
            Self::Spirv(path) => path.display().to_string(),
            Self::Wgsl { label, .. } => label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDesc {
    pub name: String,
    pub vertex: StageSource,
    pub fragment: StageSource,
    /// Accepted for compatibility with three-stage programs, never compiled.
    pub geometry: Option<PathBuf>,
}

impl ProgramDesc {
    pub fn from_config(name: &str, config: &ProgramConfig) -> Self {
        Self {
            name: name.to_string(),
            vertex: StageSource::Spirv(config.vertex.clone()),
            fragment: StageSource::Spirv(config.fragment.clone()),
            geometry: config.geometry.clone(),
        }
    }

    pub fn builtin_pbr() -> Self {
        Self {
            name: DEFAULT_PROGRAM.to_string(),
            vertex: StageSource::Wgsl {
                label: "pbr.vert.wgsl",
                source: include_str!("shaders/pbr.vert.wgsl"),
            },
            fragment: StageSource::Wgsl {
                label: "pbr.frag.wgsl",
                source: include_str!("shaders/pbr.frag.wgsl"),
            },
            geometry: None,
        }
    }

    pub fn builtin_shadow() -> Self {
        Self {
            name: "shadow".to_string(),
            vertex: StageSource::Wgsl {
                label: "shadow.vert.wgsl",
                source: include_str!("shaders/shadow.vert.wgsl"),
            },
            fragment: StageSource::Wgsl {
                label: "shadow.frag.wgsl",
                source: include_str!("shaders/shadow.frag.wgsl"),
            },
            geometry: None,
        }
    }
}

/// Fixed-function state and the bind groups after the program's own group 0.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pub vertex_layout: wgpu::VertexBufferLayout<'static>,
    pub front_face: wgpu::FrontFace,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub depth_compare: wgpu::CompareFunction,
    pub color_targets: Vec<Option<wgpu::ColorTargetState>>,
}

impl PipelineConfig {
    pub fn new(label: &str, vertex_layout: wgpu::VertexBufferLayout<'static>) -> Self {
        Self {
            label: label.to_string(),
            bind_group_layouts: Vec::new(),
            vertex_layout,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            depth_format: None,
            depth_compare: wgpu::CompareFunction::Less,
            color_targets: Vec::new(),
        }
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<wgpu::BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_cull_mode(mut self, face: Option<wgpu::Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_front_face(mut self, front_face: wgpu::FrontFace) -> Self {
        self.front_face = front_face;
        self
    }

    pub fn with_depth(mut self, format: wgpu::TextureFormat, compare: wgpu::CompareFunction) -> Self {
        self.depth_format = Some(format);
        self.depth_compare = compare;
        self
    }

    pub fn with_color_target(mut self, format: wgpu::TextureFormat) -> Self {
        self.color_targets.push(Some(wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        }));
        self
    }
}

/// Reads a SPIR-V binary, rejecting anything that is not word-aligned or lacks the magic number.
pub fn read_spirv(path: &Path) -> Result<Vec<u8>, ShaderError> {
    let bytes = std::fs::read(path).map_err(|source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    validate_spirv(path, &bytes)?;
    Ok(bytes)
}

fn validate_spirv(path: &Path, bytes: &[u8]) -> Result<(), ShaderError> {
    let invalid = || ShaderError::InvalidBinary {
        path: path.to_path_buf(),
    };
    if bytes.len() < 4 || bytes.len() % 4 != 0 {
        return Err(invalid());
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != SPIRV_MAGIC && magic.swap_bytes() != SPIRV_MAGIC {
        return Err(invalid());
    }
    Ok(())
}

pub struct ShaderProgram {
    name: String,
    pipeline: Option<wgpu::RenderPipeline>,
    uniforms: UniformBlock,
    uniform_buffer: RawUniformBuffer,
    uniform_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
    reported_unusable: Cell<bool>,
}

impl ShaderProgram {
    /// Compiles `desc` into a pipeline whose group 0 is this program's uniform block.
    ///
    /// Never fails: errors are logged and leave the program unusable.
    pub fn new(
        device: &wgpu::Device,
        desc: &ProgramDesc,
        uniforms: UniformLayout,
        config: &PipelineConfig,
    ) -> Self {
        let uniforms = UniformBlock::new(&desc.name, uniforms);
        let uniform_buffer = RawUniformBuffer::new(device, &desc.name, uniforms.bytes().len() as u64);
        let uniform_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, &format!("{} Uniform Layout", desc.name));
        let bind_group = BindGroupBuilder::new(&uniform_layout)
            .resource(uniform_buffer.binding_resource())
            .create(device, &format!("{} Uniform Bind Group", desc.name));

        if let Some(geometry) = &desc.geometry {
            log::warn!(
                "{} ({}); ignoring it",
                ShaderError::UnsupportedStage {
                    program: desc.name.clone(),
                    stage: "geometry",
                },
                geometry.display()
            );
        }

        let pipeline = match Self::create_pipeline(device, desc, &uniform_layout, config) {
            Ok(pipeline) => {
                log::info!("Compiled shader program '{}'", desc.name);
                Some(pipeline)
            }
            Err(err) => {
                log::error!("{err}");
                None
            }
        };

        Self {
            name: desc.name.clone(),
            pipeline,
            uniforms,
            uniform_buffer,
            uniform_layout,
            bind_group,
            reported_unusable: Cell::new(false),
        }
    }

    fn create_module(
        device: &wgpu::Device,
        program: &str,
        stage: &StageSource,
    ) -> Result<wgpu::ShaderModule, ShaderError> {
        let label = stage.label();
        let compile_error = |err: crate::error::GpuResourceError| ShaderError::Compile {
            program: program.to_string(),
            diagnostic: err.message,
        };

        match stage {
            StageSource::Spirv(path) => {
                let bytes = read_spirv(path)?;
                error_scope::capture(device, &label, || {
                    device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(&label),
                        source: wgpu::util::make_spirv(&bytes),
                    })
                })
                .map_err(compile_error)
            }
            StageSource::Wgsl { source, .. } => error_scope::capture(device, &label, || {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&label),
                    source: wgpu::ShaderSource::Wgsl((*source).into()),
                })
            })
            .map_err(compile_error),
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        desc: &ProgramDesc,
        uniform_layout: &BindGroupLayoutWithDesc,
        config: &PipelineConfig,
    ) -> Result<wgpu::RenderPipeline, ShaderError> {
        let vertex = Self::create_module(device, &desc.name, &desc.vertex)?;
        let fragment = Self::create_module(device, &desc.name, &desc.fragment)?;

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = std::iter::once(&uniform_layout.layout)
            .chain(config.bind_group_layouts.iter())
            .collect();

        error_scope::capture(device, &config.label, || {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(ENTRY_POINT),
                    buffers: &[config.vertex_layout.clone()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some(ENTRY_POINT),
                    targets: &config.color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: config.front_face,
                    cull_mode: config.cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: config.depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: true,
                    depth_compare: config.depth_compare,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
        .map_err(|err| ShaderError::Compile {
            program: desc.name.clone(),
            diagnostic: err.message,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pipeline, or `None` for a program that failed to build.
    ///
    /// The first `None` is logged; later ones are silent.
    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        if self.pipeline.is_none() && !self.reported_unusable.replace(true) {
            log::warn!("Shader program '{}' is unusable; skipping its draws", self.name);
        }
        self.pipeline.as_ref()
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) {
        self.uniforms.set_mat4(name, value);
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.uniforms.set_vec3(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.uniforms.set_float(name, value);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.uniforms.set_int(name, value);
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.uniforms.set_bool(name, value);
    }

    /// Uploads the uniform block if it changed since the last flush.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.uniform_buffer.update_content(queue, self.uniforms.bytes());
    }

    pub fn destroy(&self) {
        self.uniform_buffer.destroy();
    }
}

/// Lit programs by name.
#[derive(Default)]
pub struct ProgramLibrary {
    programs: HashMap<String, ShaderProgram>,
}

impl ProgramLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `program`, replacing any program with the same name.
    pub fn insert(&mut self, program: ShaderProgram) {
        if let Some(previous) = self.programs.insert(program.name().to_string(), program) {
            log::warn!("Shader program '{}' was defined twice", previous.name());
            previous.destroy();
        }
    }

    pub fn get(&self, name: &str) -> Option<&ShaderProgram> {
        self.programs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShaderProgram> {
        self.programs.values_mut()
    }

    pub fn destroy(&mut self) {
        for (_, program) in self.programs.drain() {
            program.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spirv_magic_is_accepted_in_either_byte_order() {
        let path = Path::new("shader.vert.spv");
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 16]);
        assert!(validate_spirv(path, &bytes).is_ok());

        let mut swapped = SPIRV_MAGIC.to_be_bytes().to_vec();
        swapped.extend_from_slice(&[0; 16]);
        assert!(validate_spirv(path, &swapped).is_ok());
    }

    #[test]
    fn test_misaligned_or_foreign_binary_is_rejected() {
        let path = Path::new("shader.frag.spv");
        let mut truncated = SPIRV_MAGIC.to_le_bytes().to_vec();
        truncated.push(0);
        assert!(matches!(
            validate_spirv(path, &truncated),
            Err(ShaderError::InvalidBinary { .. })
        ));
        assert!(validate_spirv(path, b"void main() {}  ").is_err());
        assert!(validate_spirv(path, &[]).is_err());
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let err = read_spirv(Path::new("shaders/missing.vert.spv")).unwrap_err();
        assert!(matches!(err, ShaderError::Io { .. }));
    }

    #[test]
    fn test_config_programs_use_spirv_stages() {
        let config = ProgramConfig {
            vertex: PathBuf::from("shaders/pbr.vert.spv"),
            fragment: PathBuf::from("shaders/pbr.frag.spv"),
            geometry: Some(PathBuf::from("shaders/pbr.geom.spv")),
        };
        let desc = ProgramDesc::from_config("custom", &config);

        assert_eq!(desc.name, "custom");
        assert_eq!(desc.vertex, StageSource::Spirv(config.vertex.clone()));
        assert_eq!(desc.geometry, config.geometry);
    }

    #[test]
    fn test_builtin_programs_use_main_entry_points() {
        for desc in [ProgramDesc::builtin_pbr(), ProgramDesc::builtin_shadow()] {
            for stage in [&desc.vertex, &desc.fragment] {
                let StageSource::Wgsl { source, .. } = stage else {
                    panic!("built-in stages are WGSL");
                };
                assert!(source.contains("fn main("));
            }
        }
    }

    #[test]
    fn test_builtin_pbr_is_the_default_program() {
        let config = crate::config::SceneConfig::from_yaml("models:\n  - name: crate\n    path: crate.obj\n").unwrap();
        assert_eq!(config.models[0].shader, DEFAULT_PROGRAM);
        assert_eq!(ProgramDesc::builtin_pbr().name, DEFAULT_PROGRAM);
    }
}
