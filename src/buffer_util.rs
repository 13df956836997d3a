use crate::error::InitializationError;
use wgpu::util::DeviceExt;

pub struct SizedBuffer {
    pub buffer: wgpu::Buffer,
    pub size: wgpu::BufferAddress,
}

pub fn make_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &T,
) -> SizedBuffer {
    let bytes = bytemuck::bytes_of(data);
    SizedBuffer {
        buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        }),
        size: bytes.len() as _,
    }
}

pub fn make_default_uniform_buffer<T: Default + bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
) -> SizedBuffer {
    make_uniform_buffer::<T>(device, label, &T::default())
}

/// Runs `create` inside validation and out-of-memory error scopes, turning
/// anything the device reports into an `InitializationError`. Without the
/// scopes wgpu hands the error to the uncaptured handler, which panics.
pub fn capture_errors<T>(
    device: &wgpu::Device,
    what: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, InitializationError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    // Scopes pop in reverse order.
    let validation = futures::executor::block_on(device.pop_error_scope());
    let out_of_memory = futures::executor::block_on(device.pop_error_scope());
    if out_of_memory.is_some() {
        return Err(InitializationError::OutOfMemory { what });
    }
    if let Some(error) = validation {
        return Err(InitializationError::Gpu {
            what,
            message: error.to_string(),
        });
    }
    Ok(value)
}

/// Copies `buffer` back to the CPU, blocking until the GPU is done. Only used
/// to inspect GPU state in tests.
#[cfg(test)]
pub fn read_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &SizedBuffer,
) -> Vec<T> {
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback buffer"),
        size: buffer.size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &readback, 0, buffer.size);
    queue.submit(Some(encoder.finish()));
    let slice = readback.slice(..);
    slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
    device.poll(wgpu::Maintain::Wait);
    let data = bytemuck::cast_slice(&slice.get_mapped_range()[..]).to_vec();
    readback.unmap();
    data
}
