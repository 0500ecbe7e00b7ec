//! wgpu renderer for the scene viewer
//!
//! Owns the surface, device and every GPU resource. A frame is six shadow
//! passes into the light's depth cube followed by one lit pass to the
//! surface, then an optional UI overlay.

use cgmath::Matrix4;

use crate::config::{DuplicatePolicy, ModelConfig, SceneConfig, DEFAULT_PROGRAM};
use crate::error::GpuInitError;
use crate::gfx::{
    camera::FlyCamera,
    import::AssetImporter,
    resources::{
        gpu_store::GpuStore, image_decoder::FileImageDecoder, texture_cache::TextureCache,
        texture_resource::{TextureResource, CUBE_FACE_COUNT},
    },
    scene::{DrawModel, LoadContext, Model, SceneState, Transform, Vertex},
};

use super::shader_program::{PipelineConfig, ProgramDesc, ProgramLibrary, ShaderProgram};
use super::shadow::{shadow_uniform_layout, ShadowMap};
use super::uniform_block::{UniformKind, UniformLayout};

/// Picks the surface format and the format frames are rendered through.
///
/// Gamma is applied in the lit shader, so the render target must not encode
/// sRGB again. A surface that only offers sRGB formats is drawn through a
/// linear view of the same texture.
pub fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<(wgpu::TextureFormat, wgpu::TextureFormat)> {
    if let Some(linear) = formats.iter().copied().find(|f| !f.is_srgb()) {
        return Some((linear, linear));
    }
    let surface_format = formats.first().copied()?;
    let view_format = surface_format.remove_srgb_suffix();
    log::warn!("Surface only offers sRGB formats; rendering through a {view_format:?} view of {surface_format:?}");
    Some((surface_format, view_format))
}

/// Layout of every lit program's own uniform block. MUST match `FrameUniforms` in the lit shaders.
pub fn lit_uniform_layout() -> UniformLayout {
    UniformLayout::new()
        .field("matrix_viewproj", UniformKind::Mat4)
        .field("cam_pos", UniformKind::Vec3)
        .field("light_radius", UniformKind::Float)
        .field("light_color", UniformKind::Vec3)
        .field("light_power", UniformKind::Float)
        .field("light_pos", UniformKind::Vec3)
        .field("far_plane", UniformKind::Float)
        .field("gamma", UniformKind::Float)
        .field("shadow_bias", UniformKind::Float)
}

/// Per-frame values written into every lit program.
#[derive(Debug, Clone, Copy)]
struct FrameValues {
    view_projection: Matrix4<f32>,
    camera_position: [f32; 3],
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Render target format; differs from `config.format` for an sRGB-only surface.
    format: wgpu::TextureFormat,
    depth_texture: TextureResource,
    programs: ProgramLibrary,
    shadow_program: ShaderProgram,
    shadow_map: ShadowMap,
    store: GpuStore,
    textures: TextureCache,
    importer: AssetImporter,
    scene: SceneState,
    duplicate_policy: DuplicatePolicy,
}

impl Renderer {
    /// Creates the renderer for the given window
    ///
    /// Initializes wgpu, the default texture, the shadow cube and every
    /// configured program. Programs that fail to compile are logged and left
    /// unusable; only device, surface and default resource failures are
    /// returned as errors.
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `width` - Initial surface width in pixels
    /// * `height` - Initial surface height in pixels
    /// * `scene` - Light, shadow, asset and program settings
    pub fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        scene: &SceneConfig,
    ) -> Result<Self, GpuInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("WGPU Device"),
            required_features: wgpu::Features::default(),
            required_limits: wgpu::Limits {
                max_texture_dimension_2d: 4096,
                ..wgpu::Limits::downlevel_defaults()
            },
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        }))?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured GPU error: {error}");
        }));

        let surface_capabilities = surface.get_capabilities(&adapter);
        let (surface_format, format) =
            choose_surface_format(&surface_capabilities.formats).ok_or(GpuInitError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: if format == surface_format { vec![] } else { vec![format] },
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let mut store = GpuStore::new(&device, &queue);
        let textures = TextureCache::new(
            Box::new(FileImageDecoder),
            scene.assets.default_texture.as_deref(),
            &mut store,
        )
        .map_err(GpuInitError::DefaultTexture)?;

        let shadow_map = ShadowMap::new(&device, &scene.shadow).map_err(GpuInitError::ShadowTarget)?;

        let shadow_pipeline = PipelineConfig::new("Shadow Pipeline", Vertex::position_only_desc())
            .with_bind_group_layouts(vec![
                store.model_layout().clone(),
                shadow_map.face_layout().clone(),
            ])
            .with_front_face(wgpu::FrontFace::Cw)
            .with_cull_mode(Some(wgpu::Face::Front))
            .with_depth(TextureResource::DEPTH_FORMAT, wgpu::CompareFunction::Less);
        let shadow_desc = match &scene.shadow_program {
            Some(program) => ProgramDesc::from_config("shadow", program),
            None => ProgramDesc::builtin_shadow(),
        };
        let shadow_program =
            ShaderProgram::new(&device, &shadow_desc, shadow_uniform_layout(), &shadow_pipeline);

        let lit_pipeline = PipelineConfig::new("Lit Pipeline", Vertex::desc())
            .with_bind_group_layouts(vec![
                store.model_layout().clone(),
                store.material_layout().clone(),
                shadow_map.lit_layout().clone(),
            ])
            .with_depth(TextureResource::DEPTH_FORMAT, wgpu::CompareFunction::Less)
            .with_color_target(format);

        let mut programs = ProgramLibrary::new();
        if !scene.shaders.contains_key(DEFAULT_PROGRAM) {
            programs.insert(ShaderProgram::new(
                &device,
                &ProgramDesc::builtin_pbr(),
                lit_uniform_layout(),
                &lit_pipeline,
            ));
        }
        for (name, program) in &scene.shaders {
            programs.insert(ShaderProgram::new(
                &device,
                &ProgramDesc::from_config(name, program),
                lit_uniform_layout(),
                &lit_pipeline,
            ));
        }

        Ok(Self {
            surface,
            device,
            queue,
            config,
            format,
            depth_texture,
            programs,
            shadow_program,
            shadow_map,
            store,
            textures,
            importer: AssetImporter::default(),
            scene: SceneState::new((&scene.light).into()),
            duplicate_policy: scene.duplicate_models,
        })
    }

    /// Loads and registers every model, in declaration order.
    ///
    /// Models that fail to import are registered empty so they still show in the UI.
    pub fn load_scene(&mut self, models: &[ModelConfig]) {
        for model_config in models {
            if !self.programs.contains(&model_config.shader) {
                log::warn!(
                    "Model '{}' uses unknown shader '{}'; it will not be drawn",
                    model_config.name,
                    model_config.shader
                );
            }

            let mut model = Model::load(
                &model_config.path,
                &model_config.shader,
                LoadContext {
                    importer: &self.importer,
                    textures: &mut self.textures,
                    uploader: &mut self.store,
                },
            );
            model.transform = Transform::from(model_config);

            self.scene
                .models
                .register(&model_config.name, model, self.duplicate_policy, &mut self.store);
        }

        log::info!(
            "Scene ready: {} models, {} textures",
            self.scene.models.len(),
            self.textures.texture_count()
        );
    }

    /// Renders one frame: shadow cube, lit pass, then the optional UI overlay.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn draw<F>(&mut self, camera: &FlyCamera, ui_callback: Option<F>)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => return,
            Err(err) => {
                log::error!("Failed to acquire surface texture: {err}");
                return;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.format),
                ..Default::default()
            });

        for (_, model) in self.scene.models.iter() {
            if let Some(slot) = model.transform_slot {
                self.store.write_transform(slot, model.compute_model_matrix());
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.encode_shadow_passes(&mut encoder);

        self.write_frame_uniforms(FrameValues {
            view_projection: camera.view_projection(),
            camera_position: camera.position.into(),
        });
        self.encode_lit_pass(&mut encoder, &surface_view);

        if let Some(ui_callback) = ui_callback {
            ui_callback(&self.device, &self.queue, &mut encoder, &surface_view);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    fn encode_shadow_passes(&mut self, encoder: &mut wgpu::CommandEncoder) {
        self.shadow_map
            .write_uniforms(&mut self.shadow_program, self.scene.light.position);
        self.shadow_program.flush(&self.queue);

        let resolution = self.shadow_map.resolution() as f32;
        let pipeline = self.shadow_program.pipeline();

        for face in 0..CUBE_FACE_COUNT as usize {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&format!("Shadow Pass {face}")),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.shadow_map.face_view(face),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            shadow_pass.set_viewport(0.0, 0.0, resolution, resolution, 0.0, 1.0);

            // An unusable program still clears the cube, so everything reads as lit.
            let Some(pipeline) = pipeline else {
                continue;
            };
            shadow_pass.set_pipeline(pipeline);
            shadow_pass.set_bind_group(0, self.shadow_program.bind_group(), &[]);
            shadow_pass.set_bind_group(2, self.shadow_map.face_bind_group(face), &[]);

            for (_, model) in self.scene.models.iter() {
                shadow_pass.draw_model_untextured(model, &self.store);
            }
        }
    }

    fn write_frame_uniforms(&mut self, frame: FrameValues) {
        let light = self.scene.light;
        let far_plane = self.shadow_map.far();
        let shadow_bias = self.shadow_map.bias();

        for program in self.programs.iter_mut() {
            program.set_mat4("matrix_viewproj", frame.view_projection);
            program.set_vec3("cam_pos", frame.camera_position);
            program.set_vec3("light_pos", light.position);
            program.set_vec3("light_color", light.color);
            program.set_float("light_power", light.power);
            program.set_float("light_radius", light.radius);
            program.set_float("gamma", light.gamma);
            program.set_float("far_plane", far_plane);
            program.set_float("shadow_bias", shadow_bias);
            program.flush(&self.queue);
        }
    }

    fn encode_lit_pass(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_viewport(
            0.0,
            0.0,
            self.config.width as f32,
            self.config.height as f32,
            0.0,
            1.0,
        );

        for (_, model) in self.scene.models.iter() {
            let Some(program) = self.programs.get(&model.shader) else {
                continue;
            };
            let Some(pipeline) = program.pipeline() else {
                continue;
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, program.bind_group(), &[]);
            render_pass.draw_model(model, &self.store, self.shadow_map.lit_bind_group());
        }
    }

    /// Resizes the surface and depth buffer. Zero sizes (minimised windows) are ignored.
    pub fn update_viewport_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    /// Releases every GPU resource the scene owns. The renderer draws nothing afterwards.
    pub fn cleanup(&mut self) {
        self.scene.models.clear(&mut self.store);
        self.textures.clear();
        self.store.release_all();
        self.programs.destroy();
        self.shadow_program.destroy();
        self.shadow_map.destroy();
        self.depth_texture.texture.destroy();
        log::info!("Released GPU resources");
    }

    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    pub fn texture_count(&self) -> usize {
        self.textures.texture_count()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}
