use log::{error, info};
use sparks::frame_timer::FrameTimer;
use sparks::render_params::RenderParams;

gflags::define! {
    --config: &str = ""
}
gflags::define! {
    --frames: u32 = 600
}
gflags::define! {
    /// Toggle the spawn gate every this many frames; 0 never toggles.
    --toggle_every: u32 = 120
}
gflags::define! {
    --log_filter: &str = "warn,sparks=info"
}
gflags::define! {
    -h, --help = false
}

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

fn read_config_from_file(path: &str) -> anyhow::Result<RenderParams> {
    let params = std::fs::read_to_string(path)?.parse()?;
    Ok(params)
}

fn get_render_config() -> RenderParams {
    if CONFIG.flag.is_empty() {
        return sparks::render_params::get_render_config_from_default_file();
    }
    match read_config_from_file(CONFIG.flag) {
        Ok(params) => params,
        Err(e) => {
            error!("Failed to parse config file({}): {:?}", CONFIG.flag, e);
            RenderParams::default()
        }
    }
}

fn make_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn main() -> anyhow::Result<()> {
    gflags::parse();
    if HELP.flag {
        gflags::print_help_and_exit(0);
    }
    scrub_log::init_with_filter_string(LOG_FILTER.flag)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {:?}", e))?;

    let params = get_render_config();
    info!("Running with {:?}", params);
    let gpu = futures::executor::block_on(sparks::context::GpuContext::headless())?;
    let mut renderer = sparks::Renderer::new(&gpu.device, TARGET_FORMAT, &params)?;
    let target = make_target(&gpu.device, params.viewport_width, params.viewport_height);

    let (width, height) = (params.viewport_width as f64, params.viewport_height as f64);
    let mut timer = FrameTimer::new(params.fps);
    info!("Entering render loop...");
    for frame in 0..FRAMES.flag {
        let dt = timer.tick().as_secs_f32();
        if TOGGLE_EVERY.flag > 0 && frame > 0 && frame % TOGGLE_EVERY.flag == 0 {
            renderer.toggle_should_emit();
            info!("Spawning: {}", renderer.should_emit());
        }

        // Walk the emit point around a circle in window coordinates.
        let angle = frame as f64 * 0.05;
        renderer.set_emit_pos(
            width * (0.5 + 0.3 * angle.cos()),
            height * (0.5 + 0.3 * angle.sin()),
        );
        // Slowly dolly back and forth.
        if (frame / 240) % 2 == 0 {
            renderer.camera_mut().move_back(dt * 0.1);
        } else {
            renderer.camera_mut().move_forward(dt * 0.1);
        }

        let stats = renderer.draw(&gpu.device, &gpu.queue, &target);
        if stats.frame % params.fps.max(1.0) as u64 == 0 {
            info!(
                "frame {}: {} emitters, {} particles, {:.1} fps",
                stats.frame,
                stats.alive_emitters,
                stats.alive_particles,
                timer.measured_fps()
            );
        }
    }
    gpu.device.poll(wgpu::Maintain::Wait);
    info!("Done");
    Ok(())
}
