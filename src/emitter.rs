use crate::buffer_util::{capture_errors, make_uniform_buffer, SizedBuffer};
use crate::command_program::{DrawProgram, ProgramGeometry, SimulateProgram};
use crate::descriptor::EmitterDescriptor;
use crate::error::InitializationError;
use crate::particles::DescriptorUniforms;
use crate::pipeline_catalog::PipelineCatalog;
use crate::staging;
use log::debug;

/// Frame countdown of one emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    remaining: u32,
    total: u32,
}

impl Lifetime {
    pub fn new(total: u32) -> Self {
        Lifetime {
            remaining: total,
            total,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_dead(&self) -> bool {
        self.remaining == 0
    }

    /// Consumes one frame. Returns false, changing nothing, once dead.
    pub fn tick(&mut self) -> bool {
        if self.is_dead() {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Elapsed fraction of the lifetime, in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        let progress = 1.0 - self.remaining as f32 / self.total as f32;
        progress.max(0.0).min(1.0)
    }
}

/// One particle population with its GPU storage and the two programs that
/// simulate and draw it.
pub struct Emitter {
    descriptor: EmitterDescriptor,
    life: Lifetime,
    uniforms: DescriptorUniforms,

    // GPU interface cruft
    particle_buffer: SizedBuffer,
    descriptor_buffer: SizedBuffer,
    simulate: SimulateProgram,
    draw: DrawProgram,
}

impl Emitter {
    /// Builds an emitter from its own copy of `descriptor`. The initial
    /// particle upload is recorded into `encoder`, which must be submitted
    /// before (or as part of) the first frame that simulates this emitter.
    pub fn new(
        descriptor: EmitterDescriptor,
        device: &wgpu::Device,
        catalog: &mut PipelineCatalog,
        camera_buffer: &SizedBuffer,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<Self, InitializationError> {
        descriptor.validate()?;
        let simulate_pipeline = catalog.simulate_pipeline(device)?;
        let draw_pipeline = catalog.draw_pipeline(device, descriptor.shape)?;

        let particles = staging::initial_particles(&descriptor, &mut rand::thread_rng());
        let particle_buffer = staging::upload_particles(device, encoder, &particles)?;

        let uniforms = descriptor.uniforms_at(0.0);
        let descriptor_buffer = capture_errors(device, "descriptor buffer", || {
            make_uniform_buffer(device, "Emitter descriptor buffer", &uniforms)
        })?;

        let simulate = SimulateProgram::record(
            device,
            simulate_pipeline,
            catalog.simulate_layout(),
            &particle_buffer,
            &descriptor_buffer,
            descriptor.particles_count,
        )?;
        let draw = DrawProgram::record(
            device,
            draw_pipeline,
            catalog.draw_layout(),
            &particle_buffer,
            camera_buffer,
            &descriptor_buffer,
            descriptor.particles_count,
        )?;
        debug!(
            "New {:?} emitter: {} particles for {} frames at {:?}",
            descriptor.shape,
            descriptor.particles_count,
            descriptor.life_time_frames,
            descriptor.world_pos
        );

        Ok(Emitter {
            life: Lifetime::new(descriptor.life_time_frames),
            descriptor,
            uniforms,
            particle_buffer,
            descriptor_buffer,
            simulate,
            draw,
        })
    }

    pub fn descriptor(&self) -> &EmitterDescriptor {
        &self.descriptor
    }

    pub fn is_dead(&self) -> bool {
        self.life.is_dead()
    }

    pub fn life(&self) -> Lifetime {
        self.life
    }

    /// Last contents written to the descriptor buffer.
    pub fn uniforms(&self) -> &DescriptorUniforms {
        &self.uniforms
    }

    pub fn particles_count(&self) -> u32 {
        self.descriptor.particles_count
    }

    /// Advances one frame and writes the new progress to the descriptor
    /// buffer. Call at most once per frame.
    pub fn tick(&mut self, queue: &wgpu::Queue) {
        if !self.life.tick() {
            return;
        }
        self.uniforms = self.descriptor.uniforms_at(self.life.progress());
        queue.write_buffer(
            &self.descriptor_buffer.buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );
    }

    pub fn record_simulate<'a>(&'a self, pass: &mut wgpu::ComputePass<'a>) {
        if self.is_dead() {
            return;
        }
        self.simulate.replay(pass);
    }

    pub fn record_draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        if self.is_dead() {
            return;
        }
        self.draw.replay(pass);
    }

    pub fn simulate_geometry(&self) -> ProgramGeometry {
        self.simulate.geometry()
    }

    pub fn draw_geometry(&self) -> ProgramGeometry {
        self.draw.geometry()
    }

    pub fn simulate_program(&self) -> &SimulateProgram {
        &self.simulate
    }

    pub fn draw_program(&self) -> &DrawProgram {
        &self.draw
    }

    pub fn particle_buffer(&self) -> &SizedBuffer {
        &self.particle_buffer
    }

    pub fn descriptor_buffer(&self) -> &SizedBuffer {
        &self.descriptor_buffer
    }
}
