use cgmath::Matrix4;

/// Converts a GL-style clip volume (z in [-1, 1]) to wgpu's (z in [0, 1]).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{perspective, Deg, Vector4};

    #[test]
    fn test_depth_range_remap() {
        let projection = OPENGL_TO_WGPU_MATRIX * perspective(Deg(90.0), 1.0, 0.1, 100.0);

        let near = projection * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, -100.0, 1.0);

        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }
}
