//! First-person fly camera
//!
//! Yaw and pitch are kept in degrees. The basis vectors are derived from them
//! whenever they change, and the projection is rebuilt whenever the lens or
//! viewport aspect changes.

use cgmath::{perspective, Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3, Zero};

use super::camera_utils::OPENGL_TO_WGPU_MATRIX;

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 20.0;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const PITCH_LIMIT: f32 = 89.0;

/// The six directional inputs, sampled once per frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub up: bool,
}

impl MovementKeys {
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.down || self.up
    }
}

#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    front: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
    world_up: Vector3<f32>,
    pub speed: f32,
    pub sensitivity: f32,
    projection: Matrix4<f32>,
}

impl FlyCamera {
    /// Camera at the origin facing -Z, with the given lens.
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vector3::zero(),
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            front: -Vector3::unit_z(),
            right: Vector3::unit_x(),
            up: Vector3::unit_y(),
            world_up: Vector3::unit_y(),
            speed: DEFAULT_SPEED,
            sensitivity: DEFAULT_SENSITIVITY,
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_vectors();
        camera.update_projection(fov_degrees, aspect, near, far);
        camera
    }

    /// Rebuilds the projection. Degenerate ranges give degenerate matrices.
    pub fn update_projection(&mut self, fov_degrees: f32, aspect: f32, near: f32, far: f32) {
        self.projection = OPENGL_TO_WGPU_MATRIX * perspective(Deg(fov_degrees), aspect, near, far);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.position);
        Matrix4::look_at_rh(eye, eye + self.front, self.up)
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }

    /// Moves along front/right/up. Simultaneous keys add up and are not normalised.
    pub fn process_keyboard(&mut self, delta_millis: f64, keys: MovementKeys) {
        let velocity = self.speed * (delta_millis / 1000.0) as f32;

        if keys.forward {
            self.position += self.front * velocity;
        }
        if keys.backward {
            self.position -= self.front * velocity;
        }
        if keys.left {
            self.position -= self.right * velocity;
        }
        if keys.right {
            self.position += self.right * velocity;
        }
        if keys.down {
            self.position -= self.up * velocity;
        }
        if keys.up {
            self.position += self.up * velocity;
        }
    }

    /// Mouse look with inverted Y. Pitch is clamped to ±89°.
    pub fn process_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    fn update_vectors(&mut self) {
        let (yaw_sin, yaw_cos) = self.yaw.to_radians().sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.to_radians().sin_cos();

        self.front = Vector3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> FlyCamera {
        FlyCamera::new(110.0, 1366.0 / 768.0, 0.1, 2000.0)
    }

    fn assert_vec_close(actual: Vector3<f32>, expected: Vector3<f32>) {
        assert!(
            (actual - expected).magnitude() < 1e-5,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_initial_orientation_faces_negative_z() {
        let camera = camera();
        assert_eq!(camera.yaw(), -90.0);
        assert_eq!(camera.pitch(), 0.0);
        assert_vec_close(camera.front(), Vector3::new(0.0, 0.0, -1.0));
        assert_vec_close(camera.right(), Vector3::new(1.0, 0.0, 0.0));
        assert_vec_close(camera.up(), Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_pitch_clamped_for_any_magnitude() {
        let mut camera = camera();
        for dy in [-1.0e9_f32, -5000.0, -1.0, 0.0, 3.0, 890.0, 1.0e9] {
            camera.process_mouse_delta(0.0, dy);
            assert!(camera.pitch() >= -PITCH_LIMIT && camera.pitch() <= PITCH_LIMIT);
        }

        camera.process_mouse_delta(0.0, -1.0e6);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        camera.process_mouse_delta(0.0, 1.0e6);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn test_pitch_monotonic_within_range() {
        let mut camera = camera();
        let mut previous = camera.pitch();
        // Upward mouse motion (negative dy) raises pitch until the clamp.
        for _ in 0..2000 {
            camera.process_mouse_delta(0.0, -1.0);
            assert!(camera.pitch() >= previous);
            previous = camera.pitch();
        }
        assert_eq!(previous, PITCH_LIMIT);
    }

    #[test]
    fn test_mouse_delta_uses_sensitivity() {
        let mut camera = camera();
        camera.process_mouse_delta(100.0, 50.0);
        assert!((camera.yaw() - (-80.0)).abs() < 1e-4);
        assert!((camera.pitch() - (-5.0)).abs() < 1e-4);
    }

    #[test]
    fn test_keyboard_forward_scales_with_delta() {
        let mut camera = camera();
        camera.process_keyboard(
            500.0,
            MovementKeys {
                forward: true,
                ..Default::default()
            },
        );
        assert_vec_close(camera.position, Vector3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut camera = camera();
        camera.process_keyboard(
            250.0,
            MovementKeys {
                left: true,
                right: true,
                up: true,
                down: true,
                ..Default::default()
            },
        );
        assert_vec_close(camera.position, Vector3::zero());
    }

    #[test]
    fn test_diagonal_movement_is_not_normalised() {
        let mut camera = camera();
        camera.process_keyboard(
            1000.0,
            MovementKeys {
                forward: true,
                right: true,
                ..Default::default()
            },
        );
        assert!((camera.position.magnitude() - 20.0 * 2.0_f32.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_view_matrix_moves_world_opposite_to_camera() {
        let mut camera = camera();
        camera.position = Vector3::new(0.0, 0.0, 5.0);
        let origin = camera.view_matrix() * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((origin.z - (-5.0)).abs() < 1e-5);
    }

    #[test]
    fn test_projection_tracks_aspect() {
        let mut camera = camera();
        let wide = camera.projection();
        camera.update_projection(110.0, 1.0, 0.1, 2000.0);
        let square = camera.projection();
        assert!(square.x.x > wide.x.x);
        assert!((square.y.y - wide.y.y).abs() < 1e-6);
    }
}
