use crate::buffer_util::{make_default_uniform_buffer, SizedBuffer};
use crate::camera::Camera;
use crate::descriptor::EmitterDescriptor;
use crate::emitter::Emitter;
use crate::emitter_pool::EmitterPool;
use crate::error::{ConfigError, InitializationError};
use crate::particles::CameraUniforms;
use crate::pipeline_catalog::PipelineCatalog;
use crate::render_params::RenderParams;
use crate::retirement::FrameFence;
use log::{error, info, trace, warn};

/// Input forwarded untouched to an overlay (debug UI) collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    PointerMoved { x: f64, y: f64 },
    PointerButton { button: u8, pressed: bool },
    Scroll { dx: f64, dy: f64 },
    Key { code: u32, pressed: bool },
}

pub trait Overlay {
    fn handle_event(&mut self, event: &OverlayEvent);
}

/// What happened during one call to `Renderer::draw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub spawned: bool,
    pub culled: usize,
    pub released: usize,
    pub alive_emitters: usize,
    pub alive_particles: u64,
}

/// Host-facing surface: owns the emitter pool, the spawn template, the camera
/// and the per-frame submission sequence.
pub struct Renderer {
    catalog: PipelineCatalog,
    pool: EmitterPool,
    camera: Camera,
    camera_buffer: SizedBuffer,
    template: EmitterDescriptor,
    should_emit: bool,
    clear_color: wgpu::Color,
    window_size: (f32, f32),
    viewport_size: (u32, u32),
    overlay: Option<Box<dyn Overlay>>,

    frame: u64,
    fence: FrameFence,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        params: &RenderParams,
    ) -> Result<Self, InitializationError> {
        params.validate()?;
        let catalog = PipelineCatalog::new(device, target_format)?;
        let camera_buffer =
            make_default_uniform_buffer::<CameraUniforms>(device, "Camera uniform buffer");
        let [r, g, b, a] = params.clear_color;
        info!(
            "Renderer ready: {}x{}, {:?}",
            params.viewport_width, params.viewport_height, target_format
        );
        Ok(Renderer {
            catalog,
            pool: EmitterPool::new(),
            camera: Camera::new(&params.camera),
            camera_buffer,
            template: params.emitter.clone(),
            should_emit: params.emit_on_start,
            clear_color: wgpu::Color { r, g, b, a },
            window_size: (params.viewport_width as f32, params.viewport_height as f32),
            viewport_size: (params.viewport_width, params.viewport_height),
            overlay: None,
            frame: 0,
            fence: FrameFence::new(),
        })
    }

    pub fn pool(&self) -> &EmitterPool {
        &self.pool
    }

    pub fn catalog(&self) -> &PipelineCatalog {
        &self.catalog
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Template used for the next spawn. Alive emitters keep their own copy.
    pub fn descriptor(&self) -> &EmitterDescriptor {
        &self.template
    }

    pub fn set_descriptor(&mut self, descriptor: EmitterDescriptor) -> Result<(), ConfigError> {
        descriptor.validate()?;
        self.template = descriptor;
        Ok(())
    }

    pub fn should_emit(&self) -> bool {
        self.should_emit
    }

    pub fn toggle_should_emit(&mut self) {
        self.should_emit = !self.should_emit;
    }

    pub fn set_overlay(&mut self, overlay: Box<dyn Overlay>) {
        self.overlay = Some(overlay);
    }

    pub fn forward_event(&mut self, event: &OverlayEvent) {
        if let Some(overlay) = &mut self.overlay {
            overlay.handle_event(event);
        }
    }

    /// Size of the window in the coordinate space `set_emit_pos` receives.
    pub fn set_window_size(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            warn!("Ignoring window size ({}, {})", width, height);
            return;
        }
        self.window_size = (width, height);
    }

    /// Size of the drawable, used for the projection aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            warn!("Ignoring resize to ({}, {})", width, height);
            return;
        }
        info!("Resizing: ({}, {})", width, height);
        self.viewport_size = (width, height);
    }

    /// Moves the spawn position to the point on the z = 0 plane under window
    /// coordinates (x, y), origin at the bottom left.
    pub fn set_emit_pos(&mut self, x: f64, y: f64) {
        let (width, height) = self.window_size;
        let ndc = [
            (2.0 * x / width as f64 - 1.0) as f32,
            (2.0 * y / height as f64 - 1.0) as f32,
        ];
        let (viewport_width, viewport_height) = self.viewport_size;
        match self
            .camera
            .unproject_to_plane(ndc, viewport_width as f32, viewport_height as f32)
        {
            Some(world) => self.template.world_pos = world.into(),
            None => warn!("Emit position ({}, {}) does not hit the emitter plane", x, y),
        }
    }

    /// Builds an emitter from the current template, recording its particle
    /// upload into `encoder`. Nothing is added on failure.
    fn spawn_into(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<(), InitializationError> {
        let emitter = Emitter::new(
            self.template.clone(),
            device,
            &mut self.catalog,
            &self.camera_buffer,
            encoder,
        )?;
        self.pool.insert(emitter);
        Ok(())
    }

    /// Spawns one emitter outside the frame loop. The upload is submitted
    /// immediately, so it is ordered before the next frame.
    pub fn spawn(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<(), InitializationError> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Spawn encoder"),
        });
        self.spawn_into(device, &mut encoder)?;
        queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Runs one frame: spawn, tick and cull, simulate, refresh the camera,
    /// draw into `target` and submit. Never waits on the GPU.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
    ) -> FrameStats {
        self.frame += 1;
        let frame = self.frame;

        // Run completion callbacks for earlier frames, then free what they
        // released.
        device.poll(wgpu::Maintain::Poll);
        let released = self.pool.release_through(self.fence.completed());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame encoder"),
        });

        let mut spawned = false;
        if self.should_emit {
            match self.spawn_into(device, &mut encoder) {
                Ok(()) => spawned = true,
                Err(e) => error!("Failed to spawn emitter: {}", e),
            }
        }

        self.pool.tick(queue);
        let culled = self.pool.cull(frame);

        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Simulate emitters"),
                timestamp_writes: None,
            });
            self.pool.record_simulate(&mut cpass);
        }

        let (width, height) = self.viewport_size;
        let camera_uniforms = self.camera.uniforms(width as f32, height as f32);
        queue.write_buffer(
            &self.camera_buffer.buffer,
            0,
            bytemuck::bytes_of(&camera_uniforms),
        );

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Draw emitters"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.pool.record_draw(&mut rpass);
        }

        queue.submit(Some(encoder.finish()));
        self.fence.signal_on_completion(queue, frame);

        let stats = FrameStats {
            frame,
            spawned,
            culled,
            released,
            alive_emitters: self.pool.len(),
            alive_particles: self.pool.alive_particles(),
        };
        trace!("{:?}", stats);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{test_gpu, GpuContext};
    use crate::descriptor::Shape;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    fn target(gpu: &GpuContext, width: u32, height: u32) -> wgpu::TextureView {
        gpu.device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Test target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn params(emit_on_start: bool, life_time_frames: u32) -> RenderParams {
        RenderParams {
            viewport_width: 64,
            viewport_height: 64,
            emit_on_start,
            emitter: EmitterDescriptor {
                particles_count: 32,
                life_time_frames,
                ..EmitterDescriptor::default()
            },
            ..RenderParams::default()
        }
    }

    #[test]
    fn dying_emitter_leaves_without_replacement() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let view = target(&gpu, 64, 64);
        let mut renderer = Renderer::new(&gpu.device, FORMAT, &params(false, 1)).unwrap();
        renderer.spawn(&gpu.device, &gpu.queue).unwrap();
        assert_eq!(renderer.pool().len(), 1);
        assert_eq!(renderer.pool().iter().next().unwrap().life().remaining(), 1);

        let stats = renderer.draw(&gpu.device, &gpu.queue, &view);
        assert!(!stats.spawned);
        assert_eq!(stats.culled, 1);
        assert_eq!(renderer.pool().len(), 0);
        assert_eq!(renderer.pool().retired_len(), 1);
    }

    #[test]
    fn spawn_gate_adds_at_most_one_per_frame() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let view = target(&gpu, 64, 64);
        let mut renderer = Renderer::new(&gpu.device, FORMAT, &params(true, 3)).unwrap();
        let mut previous = 0;
        for _ in 0..10 {
            let stats = renderer.draw(&gpu.device, &gpu.queue, &view);
            assert!(stats.spawned);
            assert_eq!(stats.alive_emitters, previous + 1 - stats.culled);
            previous = stats.alive_emitters;
        }
        // A three-frame life means three emitters overlap in steady state.
        assert_eq!(previous, 2);
        assert_eq!(renderer.pool().alive_particles(), 2 * 32);

        renderer.toggle_should_emit();
        let before = renderer.pool().len();
        let stats = renderer.draw(&gpu.device, &gpu.queue, &view);
        assert!(!stats.spawned);
        assert_eq!(stats.alive_emitters, before - stats.culled);
    }

    #[test]
    fn retired_emitters_are_released_after_completion() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let view = target(&gpu, 64, 64);
        let mut renderer = Renderer::new(&gpu.device, FORMAT, &params(false, 1)).unwrap();
        renderer.spawn(&gpu.device, &gpu.queue).unwrap();
        renderer.draw(&gpu.device, &gpu.queue, &view);
        assert_eq!(renderer.pool().retired_len(), 1);

        gpu.device.poll(wgpu::Maintain::Wait);
        let stats = renderer.draw(&gpu.device, &gpu.queue, &view);
        assert_eq!(stats.released, 1);
        assert_eq!(renderer.pool().retired_len(), 0);
    }

    #[test]
    fn template_edits_do_not_reach_live_emitters() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let mut renderer = Renderer::new(&gpu.device, FORMAT, &params(false, 50)).unwrap();
        renderer.spawn(&gpu.device, &gpu.queue).unwrap();
        let original = renderer.descriptor().clone();

        let edited = EmitterDescriptor {
            shape: Shape::Triangle,
            start_color: [0.0, 1.0, 0.0, 1.0],
            particles_count: 7,
            ..original.clone()
        };
        renderer.set_descriptor(edited.clone()).unwrap();
        renderer.spawn(&gpu.device, &gpu.queue).unwrap();

        let descriptors: Vec<EmitterDescriptor> =
            renderer.pool().iter().map(|e| e.descriptor().clone()).collect();
        assert_eq!(descriptors, vec![original, edited]);
    }

    #[test]
    fn invalid_template_is_refused() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let mut renderer = Renderer::new(&gpu.device, FORMAT, &params(false, 5)).unwrap();
        let before = renderer.descriptor().clone();
        let result = renderer.set_descriptor(EmitterDescriptor {
            thickness: -1.0,
            ..before.clone()
        });
        assert_eq!(result, Err(ConfigError::ThicknessOutOfRange(-1.0)));
        assert_eq!(renderer.descriptor(), &before);
    }

    #[test]
    fn emit_pos_and_overlay_passthrough() {
        struct Recorder(Rc<RefCell<Vec<OverlayEvent>>>);
        impl Overlay for Recorder {
            fn handle_event(&mut self, event: &OverlayEvent) {
                self.0.borrow_mut().push(*event);
            }
        }

        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let mut renderer = Renderer::new(&gpu.device, FORMAT, &params(false, 5)).unwrap();
        assert_eq!(renderer.catalog().target_format(), FORMAT);
        renderer.set_window_size(200.0, 100.0);
        renderer.resize(400, 200);
        renderer.set_emit_pos(100.0, 50.0);
        let [x, y, z] = renderer.descriptor().world_pos;
        assert!(x.abs() < 1e-4 && y.abs() < 1e-4 && z.abs() < 1e-4);
        renderer.set_emit_pos(200.0, 50.0);
        assert!(renderer.descriptor().world_pos[0] > 0.0);

        // Points that miss the plane leave the spawn position alone.
        let before = renderer.descriptor().world_pos;
        renderer.set_emit_pos(std::f64::NAN, 10.0);
        assert_eq!(renderer.descriptor().world_pos, before);
        assert_eq!(renderer.descriptor().validate(), Ok(()));

        renderer.camera_mut().move_forward(0.1);
        assert!(renderer.camera().position.z < 3.0);

        let events = Rc::new(RefCell::new(Vec::new()));
        renderer.set_overlay(Box::new(Recorder(events.clone())));
        let template = renderer.descriptor().clone();
        let event = OverlayEvent::PointerButton {
            button: 1,
            pressed: true,
        };
        renderer.forward_event(&event);
        assert_eq!(*events.borrow(), vec![event]);
        assert_eq!(renderer.descriptor(), &template);
        assert!(!renderer.should_emit());
        assert_eq!(renderer.pool().len(), 0);
    }

    #[test]
    fn empty_viewport_is_refused() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let params = RenderParams {
            viewport_height: 0,
            ..params(true, 5)
        };
        match Renderer::new(&gpu.device, FORMAT, &params) {
            Err(InitializationError::InvalidConfig(ConfigError::EmptyViewport {
                width: 64,
                height: 0,
            })) => {}
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("renderer accepted an empty viewport"),
        }
    }

    #[test]
    fn failed_spawn_keeps_the_frame_going() {
        let gpu = match test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let view = target(&gpu, 64, 64);
        let mut renderer = Renderer::new(&gpu.device, FORMAT, &params(false, 10)).unwrap();
        renderer.spawn(&gpu.device, &gpu.queue).unwrap();

        let particle_size = std::mem::size_of::<crate::particles::Particle>() as u64;
        let limit = gpu.device.limits().max_storage_buffer_binding_size as u64;
        let oversized = EmitterDescriptor {
            particles_count: (limit / particle_size + 1) as u32,
            ..renderer.descriptor().clone()
        };
        renderer.set_descriptor(oversized).unwrap();
        renderer.toggle_should_emit();

        let stats = renderer.draw(&gpu.device, &gpu.queue, &view);
        assert!(!stats.spawned);
        assert_eq!(stats.culled, 0);
        assert_eq!(stats.alive_emitters, 1);
        assert_eq!(stats.alive_particles, 32);
        assert_eq!(renderer.pool().iter().next().unwrap().life().remaining(), 9);

        // The next frame still runs.
        let stats = renderer.draw(&gpu.device, &gpu.queue, &view);
        assert_eq!(stats.frame, 2);
        assert_eq!(stats.alive_emitters, 1);
    }
}
