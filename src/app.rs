use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use cgmath::Vector3;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowAttributes, WindowId},
};

use crate::config::{CameraConfig, SceneConfig};
use crate::error::GpuInitError;
use crate::gfx::{
    camera::{CameraController, FlyCamera},
    rendering::Renderer,
    ui::{panel, FrameTimeHistory, UiManager},
};

/// Who receives keyboard and mouse input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Cursor free, imgui gets input.
    Ui,
    /// Cursor grabbed and hidden, input moves the camera.
    Fly,
}

impl InputMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ui => Self::Fly,
            Self::Fly => Self::Ui,
        }
    }
}

/// The interactive scene viewer
pub struct Viewer {
    config: SceneConfig,
}

impl Viewer {
    pub fn new(config: SceneConfig) -> Self {
        Self { config }
    }

    /// Opens the window and runs until the user quits
    ///
    /// Returns an error when the event loop, window or renderer could not be
    /// created. GPU resources are released before returning.
    pub fn run(self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new()
            .map_err(GpuInitError::from)
            .context("failed to start the viewer")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut state = ViewerState::new(self.config);
        event_loop
            .run_app(&mut state)
            .context("event loop terminated abnormally")?;
        state.shutdown();

        match state.init_error.take() {
            Some(err) => Err(err).context("failed to initialise the viewer"),
            None => Ok(()),
        }
    }
}

struct ViewerState {
    config: SceneConfig,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    ui: Option<UiManager>,
    camera: FlyCamera,
    controller: CameraController,
    history: FrameTimeHistory,
    mode: InputMode,
    last_frame: Instant,
    init_error: Option<GpuInitError>,
}

impl ViewerState {
    fn new(config: SceneConfig) -> Self {
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
        let camera = camera_from_config(&config.camera, aspect);

        Self {
            config,
            window: None,
            renderer: None,
            ui: None,
            camera,
            controller: CameraController::new(),
            history: FrameTimeHistory::default(),
            mode: InputMode::Ui,
            last_frame: Instant::now(),
            init_error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), GpuInitError> {
        let attributes = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(attributes)?);

        let PhysicalSize { width, height } = window.inner_size();
        let mut renderer = Renderer::new(window.clone(), width, height, &self.config)?;
        renderer.load_scene(&self.config.models);

        let ui = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window,
        );

        self.resize(width, height);
        self.window = Some(window);
        self.renderer = Some(renderer);
        self.ui = Some(ui);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let camera = &self.config.camera;
        self.camera.update_projection(
            camera.fov_degrees,
            width as f32 / height as f32,
            camera.near,
            camera.far,
        );
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.update_viewport_size(width, height);
        }
    }

    fn set_mode(&mut self, mode: InputMode) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        self.mode = mode;
        self.controller.release_all();

        match mode {
            InputMode::Fly => {
                let grabbed = window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
                if let Err(err) = grabbed {
                    log::warn!("Could not grab the cursor: {err}");
                }
                window.set_cursor_visible(false);
            }
            InputMode::Ui => {
                if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                    log::warn!("Could not release the cursor: {err}");
                }
                window.set_cursor_visible(true);
            }
        }
        log::debug!("Input mode: {mode:?}");
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state == ElementState::Pressed && !event.repeat {
            match event.physical_key {
                PhysicalKey::Code(KeyCode::Escape) => {
                    event_loop.exit();
                    return;
                }
                PhysicalKey::Code(KeyCode::Tab) => {
                    self.set_mode(self.mode.toggled());
                    return;
                }
                _ => {}
            }
        }

        if self.mode == InputMode::Fly {
            self.controller.process_key_event(event);
        }
    }

    fn redraw(&mut self) {
        let (Some(renderer), Some(window)) = (self.renderer.as_mut(), self.window.as_ref()) else {
            return;
        };

        let now = Instant::now();
        let delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        let frame_millis = delta_millis(delta);

        if self.mode == InputMode::Fly {
            self.camera
                .process_keyboard(frame_millis, self.controller.movement());
        }
        self.history.push(frame_millis as f32);

        match self.ui.as_mut() {
            Some(ui) => {
                let texture_count = renderer.texture_count();
                ui.update(window, delta, |frame| {
                    panel::frame_time(frame, &mut self.history);
                    panel::scene(frame, renderer.scene_mut(), texture_count);
                });
                renderer.draw(
                    &self.camera,
                    Some(
                        |device: &wgpu::Device,
                         queue: &wgpu::Queue,
                         encoder: &mut wgpu::CommandEncoder,
                         view: &wgpu::TextureView| {
                            ui.render(device, queue, encoder, view)
                        },
                    ),
                );
            }
            None => renderer.draw(
                &self.camera,
                None::<fn(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView)>,
            ),
        }
    }

    /// Releases GPU resources. Safe to call more than once.
    fn shutdown(&mut self) {
        self.ui = None;
        if let Some(mut renderer) = self.renderer.take() {
            renderer.cleanup();
        }
    }
}

impl ApplicationHandler for ViewerState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.init_error.is_some() {
            return;
        }

        if let Err(err) = self.init(event_loop) {
            log::error!("{err}");
            self.init_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        let is_input = matches!(
            event,
            WindowEvent::KeyboardInput { .. }
                | WindowEvent::CursorMoved { .. }
                | WindowEvent::MouseInput { .. }
                | WindowEvent::MouseWheel { .. }
        );
        if let Some(ui) = self.ui.as_mut() {
            // In fly mode imgui only tracks window state, never input.
            if self.mode == InputMode::Ui || !is_input {
                let captured = ui.handle_input(&window, window_id, &event);
                let is_hotkey = matches!(
                    &event,
                    WindowEvent::KeyboardInput {
                        event: KeyEvent {
                            physical_key: PhysicalKey::Code(KeyCode::Escape | KeyCode::Tab),
                            ..
                        },
                        ..
                    }
                );
                if captured && is_input && !is_hotkey {
                    return;
                }
            }
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::Resized(PhysicalSize { width, height }) => self.resize(width, height),
            WindowEvent::Focused(false) => self.controller.release_all(),
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self.mode == InputMode::Fly {
            self.controller.process_device_event(&event, &mut self.camera);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn camera_from_config(config: &CameraConfig, aspect: f32) -> FlyCamera {
    let mut camera = FlyCamera::new(config.fov_degrees, aspect, config.near, config.far);
    camera.position = Vector3::from(config.position);
    camera.speed = config.speed;
    camera.sensitivity = config.sensitivity;
    camera
}

fn delta_millis(delta: Duration) -> f64 {
    delta.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_toggle() {
        assert_eq!(InputMode::Ui.toggled(), InputMode::Fly);
        assert_eq!(InputMode::Fly.toggled().toggled(), InputMode::Fly);
    }

    #[test]
    fn test_camera_from_config() {
        let config = CameraConfig {
            position: [1.0, 2.0, 3.0],
            speed: 5.0,
            sensitivity: 0.25,
            ..CameraConfig::default()
        };
        let camera = camera_from_config(&config, 16.0 / 9.0);

        assert_eq!(camera.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.speed, 5.0);
        assert_eq!(camera.sensitivity, 0.25);
    }

    #[test]
    fn test_delta_millis() {
        assert_eq!(delta_millis(Duration::from_millis(250)), 250.0);
    }
}
