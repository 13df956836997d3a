//! Builds an emitter's initial particle population on the CPU and moves it
//! into GPU-private storage with a single copy command.

use crate::buffer_util::{capture_errors, SizedBuffer};
use crate::descriptor::EmitterDescriptor;
use crate::error::InitializationError;
use crate::particles::Particle;
use log::trace;
use rand::Rng;
use wgpu::util::DeviceExt;

/// Half-width of the range random directions and accelerations are drawn from.
pub const RANDOM_RANGE: f32 = 0.002;

fn random_vector<R: Rng>(rng: &mut R) -> [f32; 3] {
    [
        rng.gen_range(-RANDOM_RANGE..=RANDOM_RANGE),
        rng.gen_range(-RANDOM_RANGE..=RANDOM_RANGE),
        rng.gen_range(-RANDOM_RANGE..=RANDOM_RANGE),
    ]
}

pub fn initial_particles<R: Rng>(descriptor: &EmitterDescriptor, rng: &mut R) -> Vec<Particle> {
    (0..descriptor.particles_count)
        .map(|_| {
            let direction = if descriptor.random_direction {
                random_vector(rng)
            } else {
                descriptor.initial_direction
            };
            let acceleration = if descriptor.random_acceleration {
                random_vector(rng)
            } else {
                descriptor.acceleration
            };
            Particle::new(
                descriptor.start_color,
                descriptor.world_pos,
                direction,
                acceleration,
                descriptor.speed,
                descriptor.scale,
            )
        })
        .collect()
}

/// Allocates private particle storage and records a copy into it from a
/// transient staging buffer. The copy lands in `encoder`, so it is ordered
/// before any pass recorded afterwards on the same encoder. The staging
/// buffer can be dropped right away; wgpu keeps it alive until the copy has
/// executed.
pub fn upload_particles(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    particles: &[Particle],
) -> Result<SizedBuffer, InitializationError> {
    let contents: &[u8] = bytemuck::cast_slice(particles);
    let size = contents.len() as wgpu::BufferAddress;
    let limit = device.limits().max_storage_buffer_binding_size as u64;
    if size > limit {
        return Err(InitializationError::TooLarge {
            what: "particle storage",
            size,
            limit,
        });
    }

    let staging = capture_errors(device, "particle staging buffer", || {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle staging"),
            contents,
            usage: wgpu::BufferUsages::COPY_SRC,
        })
    })?;
    let buffer = capture_errors(device, "particle storage", || {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle storage"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    })?;
    trace!("Uploading {} particles ({} bytes)", particles.len(), size);
    encoder.copy_buffer_to_buffer(&staging, 0, &buffer, 0, size);
    Ok(SizedBuffer { buffer, size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(7)
    }

    #[test]
    fn fixed_vectors_are_copied() {
        let descriptor = EmitterDescriptor {
            particles_count: 5,
            world_pos: [1.0, 2.0, 3.0],
            random_direction: false,
            random_acceleration: false,
            initial_direction: [0.01, 0.0, -0.01],
            acceleration: [0.0, -0.0001, 0.0],
            speed: 2.0,
            scale: 4.0,
            ..EmitterDescriptor::default()
        };
        let particles = initial_particles(&descriptor, &mut rng());
        assert_eq!(particles.len(), 5);
        for particle in &particles {
            assert_eq!(particle.position, descriptor.world_pos);
            assert_eq!(particle.color, descriptor.start_color);
            assert_eq!(particle.direction, descriptor.initial_direction);
            assert_eq!(particle.acceleration, descriptor.acceleration);
            assert_eq!(particle.speed, 2.0);
            assert_eq!(particle.scale, 4.0);
        }
    }

    #[test]
    fn random_vectors_stay_in_range() {
        let descriptor = EmitterDescriptor {
            particles_count: 1000,
            random_direction: true,
            random_acceleration: true,
            initial_direction: [5.0, 5.0, 5.0],
            acceleration: [5.0, 5.0, 5.0],
            ..EmitterDescriptor::default()
        };
        let particles = initial_particles(&descriptor, &mut rng());
        let in_range = |v: &[f32; 3]| v.iter().all(|c| c.abs() <= RANDOM_RANGE);
        assert!(particles.iter().all(|p| in_range(&p.direction)));
        assert!(particles.iter().all(|p| in_range(&p.acceleration)));
        // Not all the same draw.
        assert!(particles.iter().any(|p| p.direction != particles[0].direction));
    }

    #[test]
    fn upload_copies_into_private_storage() {
        let gpu = match crate::context::test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let descriptor = EmitterDescriptor {
            particles_count: 64,
            random_direction: false,
            ..EmitterDescriptor::default()
        };
        let particles = initial_particles(&descriptor, &mut rng());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let storage = upload_particles(&gpu.device, &mut encoder, &particles).unwrap();
        gpu.queue.submit(Some(encoder.finish()));
        assert_eq!(storage.size, 64 * std::mem::size_of::<Particle>() as u64);
        let read: Vec<Particle> =
            crate::buffer_util::read_buffer(&gpu.device, &gpu.queue, &storage);
        assert_eq!(read, particles);
    }

    #[test]
    fn storage_beyond_binding_limit_is_refused() {
        let gpu = match crate::context::test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let particle_size = std::mem::size_of::<Particle>() as u64;
        let limit = gpu.device.limits().max_storage_buffer_binding_size as u64;
        let count = (limit / particle_size + 1) as usize;
        let particles = vec![Particle::default(); count];
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        match upload_particles(&gpu.device, &mut encoder, &particles) {
            Err(InitializationError::TooLarge { what, size, limit: l }) => {
                assert_eq!(what, "particle storage");
                assert_eq!(size, count as u64 * particle_size);
                assert_eq!(l, limit);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("oversized storage was created"),
        }
    }
}
