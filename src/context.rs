use crate::error::InitializationError;
use log::info;

/// A device and queue without a window surface.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

// Capabilities the emitter programs rely on.
const REQUIRED_DOWNLEVEL: &[(wgpu::DownlevelFlags, &str)] = &[
    (wgpu::DownlevelFlags::COMPUTE_SHADERS, "compute shaders"),
    (
        wgpu::DownlevelFlags::VERTEX_STORAGE,
        "storage buffers in vertex shaders",
    ),
];

impl GpuContext {
    pub async fn headless() -> Result<Self, InitializationError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let mut adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await;
        if adapter.is_none() {
            info!("No hardware adapter, trying a fallback adapter");
            adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    force_fallback_adapter: true,
                    compatible_surface: None,
                })
                .await;
        }
        let adapter = adapter.ok_or(InitializationError::NoAdapter)?;
        let adapter_info = adapter.get_info();
        info!(
            "Using adapter {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let downlevel = adapter.get_downlevel_capabilities();
        for (flag, missing) in REQUIRED_DOWNLEVEL {
            if !downlevel.flags.contains(*flag) {
                return Err(InitializationError::Unsupported {
                    adapter: adapter_info.name,
                    missing: *missing,
                });
            }
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Sparks device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;
        Ok(GpuContext {
            adapter,
            device,
            queue,
        })
    }
}

/// Device for tests that need real GPU objects. Returns `None`, after logging
/// why, on machines without a usable adapter so those tests can bail out.
#[cfg(test)]
pub fn test_gpu() -> Option<GpuContext> {
    match futures::executor::block_on(GpuContext::headless()) {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("Skipping GPU test: {}", e);
            None
        }
    }
}
