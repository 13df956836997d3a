use crate::emitter::Emitter;
use crate::retirement::RetirementQueue;
use log::{debug, trace};

/// The live emitters. Emitters are independent and drawn additively, so their
/// order only matters for iteration.
#[derive(Default)]
pub struct EmitterPool {
    emitters: Vec<Emitter>,
    retired: RetirementQueue<Emitter>,
}

impl EmitterPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, emitter: Emitter) {
        self.emitters.push(emitter);
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Emitter> {
        self.emitters.iter()
    }

    pub fn alive_particles(&self) -> u64 {
        self.emitters
            .iter()
            .map(|emitter| emitter.particles_count() as u64)
            .sum()
    }

    /// Emitters waiting for the GPU before their buffers are dropped.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    pub fn tick(&mut self, queue: &wgpu::Queue) {
        for emitter in &mut self.emitters {
            emitter.tick(queue);
        }
    }

    /// Moves dead emitters to the retirement queue, tagged with `frame`.
    /// Returns how many were removed.
    pub fn cull(&mut self, frame: u64) -> usize {
        let (dead, alive): (Vec<Emitter>, Vec<Emitter>) = std::mem::take(&mut self.emitters)
            .into_iter()
            .partition(|emitter| emitter.is_dead());
        self.emitters = alive;
        let culled = dead.len();
        for emitter in dead {
            self.retired.retire(frame, emitter);
        }
        if culled > 0 {
            debug!("Retired {} emitters at frame {}", culled, frame);
        }
        culled
    }

    /// Drops retired emitters whose last frame the GPU has finished.
    pub fn release_through(&mut self, completed_frame: u64) -> usize {
        let released = self.retired.release_through(completed_frame);
        if released > 0 {
            trace!(
                "Released {} emitters through frame {}",
                released,
                completed_frame
            );
        }
        released
    }

    pub fn record_simulate<'a>(&'a self, pass: &mut wgpu::ComputePass<'a>) {
        for emitter in &self.emitters {
            emitter.record_simulate(pass);
        }
    }

    pub fn record_draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        for emitter in &self.emitters {
            emitter.record_draw(pass);
        }
    }
}
