use crate::error::ConfigError;
use crate::particles::DescriptorUniforms;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Selects the fragment program an emitter is drawn with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Square,
    Circle,
    Triangle,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Square, Shape::Circle, Shape::Triangle];

    pub fn fragment_entry_point(self) -> &'static str {
        match self {
            Shape::Square => "fs_square",
            Shape::Circle => "fs_circle",
            Shape::Triangle => "fs_triangle",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Shape::Square => "Square particle pipeline",
            Shape::Circle => "Circle particle pipeline",
            Shape::Triangle => "Triangle particle pipeline",
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Circle
    }
}

// Integer selectors as used by the inspector's radio buttons.
impl TryFrom<i32> for Shape {
    type Error = ConfigError;
    fn try_from(selector: i32) -> Result<Self, Self::Error> {
        match selector {
            0 => Ok(Shape::Square),
            1 => Ok(Shape::Circle),
            2 => Ok(Shape::Triangle),
            other => Err(ConfigError::UnknownShape(other)),
        }
    }
}

impl From<Shape> for i32 {
    fn from(shape: Shape) -> i32 {
        match shape {
            Shape::Square => 0,
            Shape::Circle => 1,
            Shape::Triangle => 2,
        }
    }
}

/// Everything needed to build one emitter. An emitter keeps its own copy, so
/// editing a template never reaches emitters that are already alive.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EmitterDescriptor {
    pub particles_count: u32,
    pub life_time_frames: u32,
    pub world_pos: [f32; 3],
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub random_direction: bool,
    pub random_acceleration: bool,
    // Used when the matching random flag is off.
    pub initial_direction: [f32; 3],
    pub acceleration: [f32; 3],
    pub speed: f32,
    pub scale: f32,
    pub thickness: f32,
    pub shape: Shape,
}

impl Default for EmitterDescriptor {
    fn default() -> Self {
        EmitterDescriptor {
            particles_count: 100,
            life_time_frames: 100,
            world_pos: [0.0, 0.0, 0.0],
            start_color: [1.0, 0.0, 0.0, 1.0],
            end_color: [0.0, 0.0, 1.0, 1.0],
            random_direction: true,
            random_acceleration: false,
            initial_direction: [0.0, 0.0, 0.0],
            acceleration: [0.0, 0.0, 0.0],
            speed: 1.0,
            scale: 10.0,
            thickness: 0.2,
            shape: Shape::Circle,
        }
    }
}

fn check_finite(name: &'static str, values: &[f32]) -> Result<(), ConfigError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::NotFinite(name))
    }
}

impl EmitterDescriptor {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particles_count == 0 {
            return Err(ConfigError::NoParticles);
        }
        if self.life_time_frames == 0 {
            return Err(ConfigError::NoLifetime);
        }
        check_finite("world_pos", &self.world_pos)?;
        check_finite("start_color", &self.start_color)?;
        check_finite("end_color", &self.end_color)?;
        check_finite("initial_direction", &self.initial_direction)?;
        check_finite("acceleration", &self.acceleration)?;
        check_finite("speed", &[self.speed])?;
        check_finite("scale", &[self.scale])?;
        check_finite("thickness", &[self.thickness])?;
        if !(0.0..=1.0).contains(&self.thickness) {
            return Err(ConfigError::ThicknessOutOfRange(self.thickness));
        }
        if self.scale <= 0.0 {
            return Err(ConfigError::NonPositiveScale(self.scale));
        }
        Ok(())
    }

    /// Uniform contents for an emitter at `progress` through its life.
    pub fn uniforms_at(&self, progress: f32) -> DescriptorUniforms {
        DescriptorUniforms::new(self.start_color, self.end_color, self.thickness, progress)
    }
}
