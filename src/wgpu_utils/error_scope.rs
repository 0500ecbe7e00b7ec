//! Synchronous capture of wgpu validation and out-of-memory errors.

use crate::error::GpuResourceError;

/// Runs `create` inside validation and out-of-memory error scopes.
///
/// Blocks until the device reports the scopes, so only use it for load-time
/// resource creation.
pub fn capture<T>(
    device: &wgpu::Device,
    label: &str,
    create: impl FnOnce() -> T,
) -> Result<T, GpuResourceError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = create();

    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    match validation.or(out_of_memory) {
        Some(error) => Err(GpuResourceError {
            label: label.to_string(),
            message: error.to_string(),
        }),
        None => Ok(value),
    }
}
