use crate::particles::CameraUniforms;
use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};
use serde::{Deserialize, Serialize};

pub const MIN_FOV_DEGREES: f32 = 1.0;
pub const MAX_FOV_DEGREES: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.0;

// cgmath builds OpenGL clip space (z in [-1, 1]); wgpu expects z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Initial camera state, read from the config file.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CameraParams {
    pub position: [f32; 3],
    pub fov: f32,
    pub speed_multiplier: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        CameraParams {
            position: [0.0, 0.0, 3.0],
            fov: 45.0,
            speed_multiplier: 2.5,
        }
    }
}

/// Free-look camera looking down -z with a fixed up vector.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub speed_multiplier: f32,
    fov: f32, // Degrees.
    front: Vector3<f32>,
    up: Vector3<f32>,
}

impl Default for Camera {
    fn default() -> Camera {
        Camera::new(&CameraParams::default())
    }
}

impl Camera {
    pub fn new(params: &CameraParams) -> Self {
        let mut camera = Camera {
            position: Point3::from(params.position),
            speed_multiplier: params.speed_multiplier,
            fov: MAX_FOV_DEGREES,
            front: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
        };
        camera.set_fov(params.fov);
        camera
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.max(MIN_FOV_DEGREES).min(MAX_FOV_DEGREES);
    }

    /// Zooms by `offset` degrees, clamped to the allowed field of view.
    pub fn adjust_fov(&mut self, offset: f32) {
        self.set_fov(self.fov + offset);
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    fn right(&self) -> Vector3<f32> {
        self.front.cross(self.up).normalize()
    }

    pub fn move_forward(&mut self, dt: f32) {
        self.position += self.front * (self.speed_multiplier * dt);
    }

    pub fn move_back(&mut self, dt: f32) {
        self.position -= self.front * (self.speed_multiplier * dt);
    }

    pub fn strafe_left(&mut self, dt: f32) {
        self.position -= self.right() * (self.speed_multiplier * dt);
    }

    pub fn strafe_right(&mut self, dt: f32) {
        self.position += self.right() * (self.speed_multiplier * dt);
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection in wgpu clip space.
    pub fn projection(&self, width: f32, height: f32) -> Matrix4<f32> {
        let aspect = width / height;
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(cgmath::Deg(self.fov), aspect, Z_NEAR, Z_FAR)
    }

    pub fn uniforms(&self, width: f32, height: f32) -> CameraUniforms {
        CameraUniforms::new(
            self.view().into(),
            self.projection(width, height).into(),
            self.position.into(),
        )
    }

    /// Casts a ray through `ndc` (x, y in [-1, 1]) and returns where it meets
    /// the world plane z = 0, if it does.
    pub fn unproject_to_plane(
        &self,
        ndc: [f32; 2],
        width: f32,
        height: f32,
    ) -> Option<Point3<f32>> {
        if !(width > 0.0 && height > 0.0) {
            return None;
        }
        let inverse = (self.projection(width, height) * self.view()).invert()?;
        let unproject = |z: f32| {
            let p: Vector4<f32> = inverse * Vector4::new(ndc[0], ndc[1], z, 1.0);
            Point3::new(p.x / p.w, p.y / p.w, p.z / p.w)
        };
        // wgpu clip space depth runs from 0 (near) to 1 (far).
        let near = unproject(0.0);
        let far = unproject(1.0);
        let direction = far - near;
        if direction.z.abs() < std::f32::EPSILON {
            return None;
        }
        let t = -near.z / direction.z;
        if !t.is_finite() || t < 0.0 {
            return None;
        }
        let hit = near + direction * t;
        if hit.x.is_finite() && hit.y.is_finite() && hit.z.is_finite() {
            Some(hit)
        } else {
            None
        }
    }
}
