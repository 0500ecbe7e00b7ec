use imgui::{Condition, Drag, Ui};

use crate::gfx::scene::{Model, SceneState};

use super::frame_history::{FrameTimeHistory, MAX_HISTORY_SECONDS, MIN_HISTORY_SECONDS};

const SCENE_PANEL_WIDTH: f32 = 340.0;
const PLOT_MAX_MILLIS: f32 = 5.0;

/// Frame-time plot with an adjustable history length.
pub fn frame_time(ui: &Ui, history: &mut FrameTimeHistory) {
    ui.window("Frametime Plot")
        .position([10.0, 10.0], Condition::FirstUseEver)
        .always_auto_resize(true)
        .build(|| {
            let mut seconds = history.window_seconds();
            if ui.slider("History (s)", MIN_HISTORY_SECONDS, MAX_HISTORY_SECONDS, &mut seconds) {
                history.set_window_seconds(seconds);
            }

            let values = history.values();
            ui.plot_lines("##frametime", &values)
                .scale_min(0.0)
                .scale_max(PLOT_MAX_MILLIS)
                .graph_size([300.0, 80.0])
                .build();

            if let (Some(latest), Some(average)) = (history.latest(), history.average()) {
                ui.text(format!("{latest:.2} ms (avg {average:.2} ms)"));
            }
        });
}

/// Light settings and per-model transforms, pinned to the right edge.
pub fn scene(ui: &Ui, state: &mut SceneState, texture_count: usize) {
    let [display_width, display_height] = ui.io().display_size;

    ui.window("Scene")
        .position([display_width - SCENE_PANEL_WIDTH, 0.0], Condition::Always)
        .size([SCENE_PANEL_WIDTH, display_height], Condition::Always)
        .movable(false)
        .resizable(false)
        .collapsible(false)
        .build(|| {
            if ui.collapsing_header("Light", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                let light = &mut state.light;
                Drag::new("Power")
                    .speed(0.5)
                    .range(0.0, 10_000.0)
                    .build(ui, &mut light.power);
                Drag::new("Radius")
                    .speed(0.5)
                    .range(0.1, 10_000.0)
                    .build(ui, &mut light.radius);
                ui.color_edit3("Color", &mut light.color);
                Drag::new("Position")
                    .speed(0.1)
                    .build_array(ui, &mut light.position);
                Drag::new("Gamma")
                    .speed(0.01)
                    .range(0.1, 5.0)
                    .build(ui, &mut light.gamma);
            }

            if ui.collapsing_header("Models", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                ui.text(format!("{} models, {texture_count} textures", state.models.len()));
                for (name, model) in state.models.iter_mut() {
                    if let Some(_node) = ui.tree_node(name) {
                        model_controls(ui, model);
                    }
                }
            }
        });
}

fn model_controls(ui: &Ui, model: &mut Model) {
    let transform = &mut model.transform;

    let mut translation: [f32; 3] = transform.translation.into();
    if Drag::new("Translation")
        .speed(0.1)
        .build_array(ui, &mut translation)
    {
        transform.translation = translation.into();
    }

    let mut rotation: [f32; 3] = transform.rotation.into();
    if Drag::new("Rotation")
        .speed(0.5)
        .range(-360.0, 360.0)
        .build_array(ui, &mut rotation)
    {
        transform.rotation = rotation.into();
    }

    let mut scale: [f32; 3] = transform.scale.into();
    if Drag::new("Scale")
        .speed(0.01)
        .build_array(ui, &mut scale)
    {
        transform.scale = scale.into();
    }

    ui.text(format!(
        "{} meshes, {} vertices, {} triangles",
        model.mesh_count(),
        model.vertex_count(),
        model.triangle_count()
    ));
    ui.text_disabled(format!("shader: {}", model.shader));
}
