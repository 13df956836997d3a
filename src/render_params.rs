use crate::camera::CameraParams;
use crate::descriptor::EmitterDescriptor;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

// Parameters that configure the renderer at startup. The emitter section is
// only the initial spawn template; the host may replace it at runtime.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RenderParams {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub fps: f64,
    pub emit_on_start: bool,
    pub clear_color: [f64; 4],

    #[serde(default)]
    pub emitter: EmitterDescriptor,

    #[serde(default)]
    pub camera: CameraParams,
}

impl RenderParams {
    /// Checks everything the renderer needs before it touches the device.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::EmptyViewport {
                width: self.viewport_width,
                height: self.viewport_height,
            });
        }
        self.emitter.validate()
    }
}

impl std::str::FromStr for RenderParams {
    type Err = toml::de::Error;
    fn from_str(serialized: &str) -> Result<Self, Self::Err> {
        let params = toml::from_str(serialized)?;
        Ok(params)
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        RenderParams {
            viewport_width: 1280,
            viewport_height: 720,
            fps: 60.0,
            emit_on_start: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            emitter: EmitterDescriptor::default(),
            camera: CameraParams::default(),
        }
    }
}

pub fn get_render_config_from_default_file() -> RenderParams {
    let config_data = include_str!("../render_config.toml");
    match config_data.parse() {
        Ok(params) => params,
        Err(e) => {
            log::error!(
                "Failed to parse config file({}): {:?}",
                "../render_config.toml",
                e
            );
            RenderParams::default()
        }
    }
}
