//! Perspective camera looking down -Z at the origin

use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraParams;
use crate::consts::{CAMERA_FAR, CAMERA_NEAR};

/// Perspective camera with aspect-driven field of view adjustment
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Configured vertical fov in degrees
    base_fov: f32,
    /// Effective vertical fov in degrees (after aspect clamping)
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub min_aspect: Option<f32>,
    pub max_aspect: Option<f32>,
}

impl PerspectiveCamera {
    pub fn new(params: &CameraParams) -> Self {
        Self {
            base_fov: params.fov,
            fov: params.fov,
            aspect: 1.0,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position: Vec3::new(0.0, 0.0, params.distance),
            min_aspect: params.min_aspect,
            max_aspect: params.max_aspect,
        }
    }

    pub fn base_fov(&self) -> f32 {
        self.base_fov
    }

    /// Set the aspect ratio, widening the fov when it falls outside the clamps
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.fov = match (self.min_aspect, self.max_aspect) {
            (Some(min), _) if aspect < min => self.fov_for_clamped(min),
            (_, Some(max)) if aspect > max => self.fov_for_clamped(max),
            _ => self.base_fov,
        };
    }

    fn fov_for_clamped(&self, clamped: f32) -> f32 {
        let t = (self.base_fov.to_radians() / 2.0).tan() / (self.aspect / clamped);
        2.0 * t.atan().to_degrees()
    }

    /// Visible world width/height on the plane through the origin
    pub fn world_size(&self) -> Vec2 {
        let height = 2.0 * (self.fov.to_radians() / 2.0).tan() * self.position.length();
        Vec2::new(height * self.aspect, height)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Unit vector the camera looks along
    pub fn direction(&self) -> Vec3 {
        (-self.position).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    /// Cast a ray through `ndc` and hit the plane through the origin facing
    /// the camera
    pub fn unproject_to_plane(&self, ndc: Vec2) -> Option<Vec3> {
        let half_height = (self.fov.to_radians() / 2.0).tan();
        let eye_dir = Vec3::new(ndc.x * half_height * self.aspect, ndc.y * half_height, -1.0);
        let dir = self.view().inverse().transform_vector3(eye_dir).try_normalize()?;

        let normal = self.direction();
        let denom = normal.dot(dir);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = -normal.dot(self.position) / denom;
        (t >= 0.0).then(|| self.position + dir * t)
    }
}
