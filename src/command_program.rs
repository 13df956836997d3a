//! Pre-recorded GPU work for one emitter.
//!
//! Each program captures the pipeline, the bind group naming its buffers and
//! the dispatch or draw geometry exactly once, at emitter construction.
//! Replaying encodes that fixed sequence into the current frame's pass. Only
//! the contents of the bound buffers change from frame to frame, never the
//! bindings or the geometry.

use crate::buffer_util::{capture_errors, SizedBuffer};
use crate::error::InitializationError;
use crate::shader_utils::{work_groups_for, WORKGROUP_SIZE};
use log::trace;
use std::sync::Arc;

/// Vertices per particle quad, drawn as a triangle strip.
pub const QUAD_VERTICES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramGeometry {
    Dispatch { work_groups: u32, invocations: u32 },
    Draw { vertices: u32, instances: u32 },
}

pub struct SimulateProgram {
    pipeline: Arc<wgpu::ComputePipeline>,
    bind_group: wgpu::BindGroup,
    work_groups: u32,
    invocations: u32,
}

impl SimulateProgram {
    pub fn record(
        device: &wgpu::Device,
        pipeline: Arc<wgpu::ComputePipeline>,
        layout: &wgpu::BindGroupLayout,
        particle_buffer: &SizedBuffer,
        descriptor_buffer: &SizedBuffer,
        particles_count: u32,
    ) -> Result<Self, InitializationError> {
        let work_groups = work_groups_for(particles_count);
        let limit = device.limits().max_compute_workgroups_per_dimension;
        if work_groups > limit {
            return Err(InitializationError::TooLarge {
                what: "simulate dispatch",
                size: work_groups as u64,
                limit: limit as u64,
            });
        }
        let bind_group = capture_errors(device, "simulate bind group", || {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Simulate bind group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: particle_buffer.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: descriptor_buffer.buffer.as_entire_binding(),
                    },
                ],
            })
        })?;
        trace!(
            "Recorded simulate program: {} work groups of {}",
            work_groups,
            WORKGROUP_SIZE
        );
        Ok(SimulateProgram {
            pipeline,
            bind_group,
            work_groups,
            invocations: particles_count,
        })
    }

    pub fn replay<'a>(&'a self, pass: &mut wgpu::ComputePass<'a>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.work_groups, 1, 1);
    }

    pub fn geometry(&self) -> ProgramGeometry {
        ProgramGeometry::Dispatch {
            work_groups: self.work_groups,
            invocations: self.invocations,
        }
    }

    pub fn pipeline(&self) -> &Arc<wgpu::ComputePipeline> {
        &self.pipeline
    }
}

pub struct DrawProgram {
    pipeline: Arc<wgpu::RenderPipeline>,
    bind_group: wgpu::BindGroup,
    instances: u32,
}

impl DrawProgram {
    pub fn record(
        device: &wgpu::Device,
        pipeline: Arc<wgpu::RenderPipeline>,
        layout: &wgpu::BindGroupLayout,
        particle_buffer: &SizedBuffer,
        camera_buffer: &SizedBuffer,
        descriptor_buffer: &SizedBuffer,
        particles_count: u32,
    ) -> Result<Self, InitializationError> {
        let bind_group = capture_errors(device, "draw bind group", || {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Draw bind group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: particle_buffer.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: camera_buffer.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: descriptor_buffer.buffer.as_entire_binding(),
                    },
                ],
            })
        })?;
        Ok(DrawProgram {
            pipeline,
            bind_group,
            instances: particles_count,
        })
    }

    pub fn replay<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..QUAD_VERTICES, 0..self.instances);
    }

    pub fn geometry(&self) -> ProgramGeometry {
        ProgramGeometry::Draw {
            vertices: QUAD_VERTICES,
            instances: self.instances,
        }
    }

    pub fn pipeline(&self) -> &Arc<wgpu::RenderPipeline> {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_util::make_default_uniform_buffer;
    use crate::context::test_gpu;
    use crate::particles::{DescriptorUniforms, Particle};
    use crate::pipeline_catalog::PipelineCatalog;
    use crate::staging::upload_particles;

    #[test]
    fn dispatch_beyond_device_limit_is_refused() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let device = &gpu.device;
        let mut catalog =
            PipelineCatalog::new(device, wgpu::TextureFormat::Rgba8UnormSrgb).unwrap();
        let pipeline = catalog.simulate_pipeline(device).unwrap();
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let particles = upload_particles(device, &mut encoder, &[Particle::default(); 4]).unwrap();
        let descriptor =
            make_default_uniform_buffer::<DescriptorUniforms>(device, "Test descriptor buffer");

        let limit = device.limits().max_compute_workgroups_per_dimension as u64;
        let count = (limit + 1) * WORKGROUP_SIZE as u64;
        if count > u32::MAX as u64 {
            return;
        }
        let result = SimulateProgram::record(
            device,
            pipeline.clone(),
            catalog.simulate_layout(),
            &particles,
            &descriptor,
            count as u32,
        );
        match result {
            Err(InitializationError::TooLarge { what, size, .. }) => {
                assert_eq!(what, "simulate dispatch");
                assert_eq!(size, limit + 1);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("oversized dispatch was recorded"),
        }

        let program = SimulateProgram::record(
            device,
            pipeline,
            catalog.simulate_layout(),
            &particles,
            &descriptor,
            4,
        )
        .unwrap();
        assert_eq!(
            program.geometry(),
            ProgramGeometry::Dispatch {
                work_groups: 1,
                invocations: 4
            }
        );
    }
}
