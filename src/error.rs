use thiserror::Error;

/// A descriptor or selector value the emitter cannot be built from.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown shape selector {0}")]
    UnknownShape(i32),
    #[error("an emitter needs at least one particle")]
    NoParticles,
    #[error("an emitter needs a lifetime of at least one frame")]
    NoLifetime,
    #[error("thickness {0} is outside [0, 1]")]
    ThicknessOutOfRange(f32),
    #[error("scale must be positive, got {0}")]
    NonPositiveScale(f32),
    #[error("{0} is not finite")]
    NotFinite(&'static str),
    #[error("viewport {width}x{height} has no area")]
    EmptyViewport { width: u32, height: u32 },
}

/// Fatal errors while building GPU state. A failed emitter construction never
/// touches the pool.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("no suitable graphics adapter found")]
    NoAdapter,
    #[error("adapter `{adapter}` lacks {missing}")]
    Unsupported {
        adapter: String,
        missing: &'static str,
    },
    #[error("failed to request a device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create {what}: {message}")]
    Gpu { what: &'static str, message: String },
    #[error("out of memory while creating {what}")]
    OutOfMemory { what: &'static str },
    #[error("{what} needs {size} but the device allows {limit}")]
    TooLarge {
        what: &'static str,
        size: u64,
        limit: u64,
    },
    #[error("invalid emitter configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
