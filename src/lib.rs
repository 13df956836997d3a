pub mod buffer_util;
pub mod camera;
pub mod command_program;
pub mod context;
pub mod descriptor;
pub mod emitter;
pub mod emitter_pool;
pub mod error;
pub mod frame_timer;
pub mod particles;
pub mod pipeline_catalog;
pub mod render_params;
pub mod renderer;
pub mod retirement;
pub mod shader_utils;
pub mod staging;

pub use descriptor::{EmitterDescriptor, Shape};
pub use error::{ConfigError, InitializationError};
pub use renderer::{FrameStats, Overlay, OverlayEvent, Renderer};
