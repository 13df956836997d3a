use crate::buffer_util::capture_errors;
use crate::descriptor::Shape;
use crate::error::InitializationError;
use log::info;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the simulate pipeline and one draw pipeline per shape on first
/// request and hands out shared references afterwards. Pipelines are
/// immutable once built, so every emitter of a shape shares one.
pub struct PipelineCatalog {
    target_format: wgpu::TextureFormat,
    simulate_module: wgpu::ShaderModule,
    draw_module: wgpu::ShaderModule,
    simulate_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    simulate_pipeline_layout: wgpu::PipelineLayout,
    draw_pipeline_layout: wgpu::PipelineLayout,

    simulate_pipeline: Option<Arc<wgpu::ComputePipeline>>,
    draw_pipelines: HashMap<Shape, Arc<wgpu::RenderPipeline>>,
    builds: usize,
}

fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

// Particles are drawn additively, so the order emitters are drawn in does
// not change the image.
const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

impl PipelineCatalog {
    pub fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, InitializationError> {
        // Loads the shaders from WGSL
        let simulate_module = capture_errors(device, "simulate shader", || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Simulate shader module"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(crate::include_shader!(
                    "simulate.wgsl"
                ))),
            })
        })?;
        let draw_module = capture_errors(device, "particle shader", || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Particle shader module"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(crate::include_shader!(
                    "particle.wgsl"
                ))),
            })
        })?;

        let simulate_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulate bind group layout"),
            entries: &[
                // Particle storage buffer
                storage_entry(0, wgpu::ShaderStages::COMPUTE, false),
                // Descriptor uniforms
                uniform_entry(1, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw bind group layout"),
            entries: &[
                // Particle storage buffer
                storage_entry(0, wgpu::ShaderStages::VERTEX, true),
                // Camera uniforms
                uniform_entry(1, wgpu::ShaderStages::VERTEX),
                // Descriptor uniforms
                uniform_entry(2, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let simulate_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Simulate pipeline layout"),
                bind_group_layouts: &[&simulate_layout],
                push_constant_ranges: &[],
            });
        let draw_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw pipeline layout"),
            bind_group_layouts: &[&draw_layout],
            push_constant_ranges: &[],
        });

        Ok(PipelineCatalog {
            target_format,
            simulate_module,
            draw_module,
            simulate_layout,
            draw_layout,
            simulate_pipeline_layout,
            draw_pipeline_layout,
            simulate_pipeline: None,
            draw_pipelines: HashMap::new(),
            builds: 0,
        })
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    pub fn simulate_layout(&self) -> &wgpu::BindGroupLayout {
        &self.simulate_layout
    }

    pub fn draw_layout(&self) -> &wgpu::BindGroupLayout {
        &self.draw_layout
    }

    /// Number of pipelines built so far. Cache hits do not count.
    pub fn builds(&self) -> usize {
        self.builds
    }

    pub fn simulate_pipeline(
        &mut self,
        device: &wgpu::Device,
    ) -> Result<Arc<wgpu::ComputePipeline>, InitializationError> {
        if let Some(pipeline) = &self.simulate_pipeline {
            return Ok(pipeline.clone());
        }
        let module = &self.simulate_module;
        let layout = &self.simulate_pipeline_layout;
        let pipeline = Arc::new(capture_errors(device, "simulate pipeline", || {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Simulate pipeline"),
                layout: Some(layout),
                module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            })
        })?);
        info!("Built simulate pipeline");
        self.builds += 1;
        self.simulate_pipeline = Some(pipeline.clone());
        Ok(pipeline)
    }

    pub fn draw_pipeline(
        &mut self,
        device: &wgpu::Device,
        shape: Shape,
    ) -> Result<Arc<wgpu::RenderPipeline>, InitializationError> {
        if let Some(pipeline) = self.draw_pipelines.get(&shape) {
            return Ok(pipeline.clone());
        }
        let module = &self.draw_module;
        let layout = &self.draw_pipeline_layout;
        let target_format = self.target_format;
        let pipeline = Arc::new(capture_errors(device, "draw pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(shape.label()),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: shape.fragment_entry_point(),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: Some(ADDITIVE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        })?);
        info!("Built {:?} draw pipeline", shape);
        self.builds += 1;
        self.draw_pipelines.insert(shape, pipeline.clone());
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_pipelines_are_built_once_per_shape() {
        let gpu = match crate::context::test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let mut catalog =
            PipelineCatalog::new(&gpu.device, wgpu::TextureFormat::Rgba8UnormSrgb).unwrap();
        assert_eq!(catalog.builds(), 0);

        let first = catalog.draw_pipeline(&gpu.device, Shape::Circle).unwrap();
        let second = catalog.draw_pipeline(&gpu.device, Shape::Circle).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(catalog.builds(), 1);

        let square = catalog.draw_pipeline(&gpu.device, Shape::Square).unwrap();
        assert!(!Arc::ptr_eq(&first, &square));
        assert_eq!(catalog.builds(), 2);
    }

    #[test]
    fn every_shape_and_the_simulate_pipeline_build() {
        let gpu = match crate::context::test_gpu() {
            Some(gpu) => gpu,
            None => return,
        };
        let mut catalog =
            PipelineCatalog::new(&gpu.device, wgpu::TextureFormat::Bgra8UnormSrgb).unwrap();
        for shape in Shape::ALL.iter() {
            catalog.draw_pipeline(&gpu.device, *shape).unwrap();
        }
        let simulate = catalog.simulate_pipeline(&gpu.device).unwrap();
        assert!(Arc::ptr_eq(&simulate, &catalog.simulate_pipeline(&gpu.device).unwrap()));
        assert_eq!(catalog.builds(), Shape::ALL.len() + 1);
    }
}
