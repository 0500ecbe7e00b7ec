use std::collections::HashSet;

use winit::{
    event::{DeviceEvent, ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::fly_camera::{FlyCamera, MovementKeys};

/// Tracks held movement keys and forwards raw mouse motion to a [`FlyCamera`].
#[derive(Debug, Default)]
pub struct CameraController {
    keys_held: HashSet<KeyCode>,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };

        match event.state {
            ElementState::Pressed => {
                self.keys_held.insert(code);
            }
            ElementState::Released => {
                self.keys_held.remove(&code);
            }
        }
    }

    pub fn process_device_event(&self, event: &DeviceEvent, camera: &mut FlyCamera) {
        if let DeviceEvent::MouseMotion { delta } = event {
            camera.process_mouse_delta(delta.0 as f32, delta.1 as f32);
        }
    }

    /// Drops every held key, e.g. when input focus moves to the UI.
    pub fn release_all(&mut self) {
        self.keys_held.clear();
    }

    pub fn movement(&self) -> MovementKeys {
        movement_from_keys(&self.keys_held)
    }
}

fn movement_from_keys(keys: &HashSet<KeyCode>) -> MovementKeys {
    MovementKeys {
        forward: keys.contains(&KeyCode::KeyW),
        backward: keys.contains(&KeyCode::KeyS),
        left: keys.contains(&KeyCode::KeyA),
        right: keys.contains(&KeyCode::KeyD),
        down: keys.contains(&KeyCode::KeyQ),
        up: keys.contains(&KeyCode::KeyE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let keys: HashSet<KeyCode> = [KeyCode::KeyW, KeyCode::KeyD, KeyCode::KeyE]
            .into_iter()
            .collect();
        let movement = movement_from_keys(&keys);
        assert!(movement.forward && movement.right && movement.up);
        assert!(!movement.backward && !movement.left && !movement.down);
    }

    #[test]
    fn test_unrelated_keys_do_not_move() {
        let keys: HashSet<KeyCode> = [KeyCode::Space, KeyCode::Tab].into_iter().collect();
        assert!(!movement_from_keys(&keys).any());
    }

    #[test]
    fn test_release_all_clears_movement() {
        let mut controller = CameraController::new();
        controller.keys_held.insert(KeyCode::KeyS);
        assert!(controller.movement().backward);
        controller.release_all();
        assert_eq!(controller.movement(), MovementKeys::default());
    }
}
