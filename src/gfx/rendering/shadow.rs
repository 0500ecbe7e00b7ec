//! Omnidirectional shadow mapping for the point light
//!
//! Each frame the scene is rendered six times, once per cube face, storing the
//! light-to-fragment distance divided by the far plane. The lit pass samples
//! the cube with a comparison sampler to decide visibility.

use cgmath::{perspective, Deg, Matrix4, Point3, Vector3};

use crate::config::ShadowConfig;
use crate::error::GpuResourceError;
use crate::gfx::camera::camera_utils::OPENGL_TO_WGPU_MATRIX;
use crate::gfx::resources::texture_resource::{TextureResource, CUBE_FACE_COUNT};
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types, error_scope,
    uniform_buffer::UniformBuffer,
};

use super::shader_program::ShaderProgram;
use super::uniform_block::{UniformKind, UniformLayout};

/// Look direction and up vector of one cube face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeFace {
    pub direction: [f32; 3],
    pub up: [f32; 3],
}

/// Faces in cube layer order: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBE_FACES: [CubeFace; 6] = [
    CubeFace { direction: [1.0, 0.0, 0.0], up: [0.0, -1.0, 0.0] },
    CubeFace { direction: [-1.0, 0.0, 0.0], up: [0.0, -1.0, 0.0] },
    CubeFace { direction: [0.0, 1.0, 0.0], up: [0.0, 0.0, 1.0] },
    CubeFace { direction: [0.0, -1.0, 0.0], up: [0.0, 0.0, -1.0] },
    CubeFace { direction: [0.0, 0.0, 1.0], up: [0.0, -1.0, 0.0] },
    CubeFace { direction: [0.0, 0.0, -1.0], up: [0.0, -1.0, 0.0] },
];

/// Mirrors clip-space Y. Cube faces are addressed with texel rows growing
/// downwards, the opposite of a regular render target, so face passes also
/// swap their front-face winding.
#[rustfmt::skip]
pub const FLIP_Y: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, -1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
);

pub fn face_view(light: Point3<f32>, face: &CubeFace) -> Matrix4<f32> {
    Matrix4::look_at_rh(
        light,
        light + Vector3::from(face.direction),
        Vector3::from(face.up),
    )
}

/// 90 degree square projection covering exactly one face.
pub fn face_projection(near: f32, far: f32) -> Matrix4<f32> {
    FLIP_Y * OPENGL_TO_WGPU_MATRIX * perspective(Deg(90.0), 1.0, near, far)
}

pub fn cube_face_view_projections(light: [f32; 3], near: f32, far: f32) -> [Matrix4<f32>; 6] {
    let eye = Point3::from(light);
    let projection = face_projection(near, far);
    CUBE_FACES.map(|face| projection * face_view(eye, &face))
}

/// Layout of the shadow program's own uniform block.
pub fn shadow_uniform_layout() -> UniformLayout {
    UniformLayout::new()
        .array("shadow_matrices", UniformKind::Mat4, CUBE_FACE_COUNT as usize)
        .field("light_pos", UniformKind::Vec3)
        .field("far_plane", UniformKind::Float)
}

/// Selects the face matrix in a shadow pass. MUST match `FaceUniform` in the shadow shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowFaceUniform {
    pub index: u32,
    _padding: [u32; 3],
}

impl ShadowFaceUniform {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            _padding: [0; 3],
        }
    }
}

pub struct ShadowMap {
    cube: TextureResource,
    face_views: Vec<wgpu::TextureView>,
    face_uniforms: Vec<UniformBuffer<ShadowFaceUniform>>,
    face_bind_groups: Vec<wgpu::BindGroup>,
    face_layout: BindGroupLayoutWithDesc,
    lit_layout: BindGroupLayoutWithDesc,
    lit_bind_group: wgpu::BindGroup,
    resolution: u32,
    near: f32,
    far: f32,
    bias: f32,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device, config: &ShadowConfig) -> Result<Self, GpuResourceError> {
        let resolution = config.resolution.max(1);
        let cube = error_scope::capture(device, "Shadow Cube", || {
            TextureResource::create_shadow_cube(device, resolution)
        })?;
        let face_views = (0..CUBE_FACE_COUNT)
            .map(|face| cube.cube_face_view(face))
            .collect();

        let face_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(device, "Shadow Face Bind Group Layout");
        let face_uniforms: Vec<_> = (0..CUBE_FACE_COUNT)
            .map(|face| {
                UniformBuffer::new_with_data(
                    device,
                    &format!("Shadow Face {face}"),
                    &ShadowFaceUniform::new(face),
                )
            })
            .collect();
        let face_bind_groups = face_uniforms
            .iter()
            .enumerate()
            .map(|(face, uniform)| {
                BindGroupBuilder::new(&face_layout)
                    .resource(uniform.binding_resource())
                    .create(device, &format!("Shadow Face {face} Bind Group"))
            })
            .collect();

        let lit_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_depth_cube())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .create(device, "Shadow Bind Group Layout");
        let lit_bind_group = BindGroupBuilder::new(&lit_layout)
            .texture(&cube.view)
            .sampler(&cube.sampler)
            .create(device, "Shadow Bind Group");

        log::info!("Created {resolution}x{resolution} shadow cube");

        Ok(Self {
            cube,
            face_views,
            face_uniforms,
            face_bind_groups,
            face_layout,
            lit_layout,
            lit_bind_group,
            resolution,
            near: config.near,
            far: config.far,
            bias: config.bias,
        })
    }

    /// Writes the six face matrices and light parameters into the shadow program.
    pub fn write_uniforms(&self, program: &mut ShaderProgram, light_position: [f32; 3]) {
        let matrices = cube_face_view_projections(light_position, self.near, self.far);
        for (face, matrix) in matrices.into_iter().enumerate() {
            program.set_mat4(&format!("shadow_matrices[{face}]"), matrix);
        }
        program.set_vec3("light_pos", light_position);
        program.set_float("far_plane", self.far);
    }

    pub fn face_view(&self, face: usize) -> &wgpu::TextureView {
        &self.face_views[face]
    }

    pub fn face_bind_group(&self, face: usize) -> &wgpu::BindGroup {
        &self.face_bind_groups[face]
    }

    pub fn face_layout(&self) -> &wgpu::BindGroupLayout {
        &self.face_layout.layout
    }

    pub fn lit_layout(&self) -> &wgpu::BindGroupLayout {
        &self.lit_layout.layout
    }

    pub fn lit_bind_group(&self) -> &wgpu::BindGroup {
        &self.lit_bind_group
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn destroy(&self) {
        for uniform in &self.face_uniforms {
            uniform.destroy();
        }
        self.cube.texture.destroy();
    }
}
