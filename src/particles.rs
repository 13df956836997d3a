//! CPU mirrors of the structs the shaders read. Field order, padding and
//! total size follow WGSL storage/uniform layout rules; see the structs at
//! the top of `shaders/simulate.wgsl` and `shaders/particle.wgsl`.

// This should match the struct defined in the relevant compute shader.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Particle {
    pub color: [f32; 4],
    pub position: [f32; 3],
    _padding0: f32,
    pub direction: [f32; 3],
    _padding1: f32,
    pub acceleration: [f32; 3],
    pub speed: f32,
    pub scale: f32,
    _padding2: [f32; 3],
}

impl Particle {
    pub fn new(
        color: [f32; 4],
        position: [f32; 3],
        direction: [f32; 3],
        acceleration: [f32; 3],
        speed: f32,
        scale: f32,
    ) -> Self {
        Particle {
            color,
            position,
            direction,
            acceleration,
            speed,
            scale,
            ..Particle::default()
        }
    }
}

/// Per-emitter uniforms, written by the CPU once per tick and read by both
/// the simulate and the draw pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct DescriptorUniforms {
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub current_color: [f32; 4],
    pub thickness: f32,
    pub progress: f32,
    _padding: [f32; 2],
}

impl DescriptorUniforms {
    pub fn new(start_color: [f32; 4], end_color: [f32; 4], thickness: f32, progress: f32) -> Self {
        let progress = progress.max(0.0).min(1.0);
        DescriptorUniforms {
            start_color,
            end_color,
            current_color: lerp_color(start_color, end_color, progress),
            thickness,
            progress,
            _padding: [0.0; 2],
        }
    }
}

/// Linear interpolation written as `a * (1 - t) + b * t` so that both ends
/// are exact: t == 0 yields `a` and t == 1 yields `b` bit for bit.
pub fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = a[i] * (1.0 - t) + b[i] * t;
    }
    out
}

/// Shared by every emitter's draw pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct CameraUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub position: [f32; 3],
    _padding: f32,
}

impl CameraUniforms {
    pub fn new(view: [[f32; 4]; 4], projection: [[f32; 4]; 4], position: [f32; 3]) -> Self {
        CameraUniforms {
            view,
            projection,
            position,
            _padding: 0.0,
        }
    }
}

const _: () = assert!(std::mem::size_of::<Particle>() == 80);
const _: () = assert!(std::mem::size_of::<DescriptorUniforms>() == 64);
const _: () = assert!(std::mem::size_of::<CameraUniforms>() == 144);
