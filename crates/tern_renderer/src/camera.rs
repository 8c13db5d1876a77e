//! Thin-lens camera for primary ray generation.

use serde_json::Value;
use tern_core::config::{self, ConfigResult};
use tern_core::ConfigError;
use tern_math::sampling::sample_disk;
use tern_math::{Ray, Transform, UVec2, Vec2, Vec3};

/// Camera looking down its local -z axis.
///
/// The image plane sits at `z = -focus_distance`; its physical size follows
/// from the vertical field of view and the aspect ratio of the resolution.
#[derive(Debug, Clone)]
pub struct Camera {
    camera_to_world: Transform,
    resolution: UVec2,
    /// Physical size of the image plane
    size: Vec2,
    focus_distance: f32,
    aperture_diameter: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Transform::IDENTITY, UVec2::new(512, 512), 90.0, 1.0, 0.0)
    }
}

impl Camera {
    /// Create a camera. `vfov` is in degrees.
    pub fn new(
        camera_to_world: Transform,
        resolution: UVec2,
        vfov: f32,
        focus_distance: f32,
        aperture_diameter: f32,
    ) -> Self {
        let resolution = resolution.max(UVec2::ONE);
        let aspect = resolution.x as f32 / resolution.y as f32;
        let height = 2.0 * (vfov.to_radians() * 0.5).tan() * focus_distance;

        Self {
            camera_to_world,
            resolution,
            size: Vec2::new(aspect * height, height),
            focus_distance,
            aperture_diameter,
        }
    }

    /// Keys: `transform`, `resolution` ([512, 512]), `vertical fov` (90),
    /// `focus distance` (1), `aperture diameter` (0).
    pub fn from_json(j: &Value) -> ConfigResult<Self> {
        let xform = config::get_transform(j, "transform")?;
        let resolution = config::get_uvec2(j, "resolution", UVec2::new(512, 512))?;
        let vfov = config::get_f32(j, "vertical fov", 90.0)?;
        let focus_distance = config::get_f32(j, "focus distance", 1.0)?;
        let aperture = config::get_f32(j, "aperture diameter", 0.0)?;

        if resolution.x == 0 || resolution.y == 0 {
            return Err(ConfigError::invalid("resolution", "must be at least 1x1"));
        }
        if !(vfov > 0.0 && vfov < 180.0) {
            return Err(ConfigError::invalid("vertical fov", "must be in (0, 180) degrees"));
        }
        if !(focus_distance > 0.0) {
            return Err(ConfigError::invalid("focus distance", "must be positive"));
        }
        if aperture < 0.0 {
            return Err(ConfigError::invalid("aperture diameter", "must not be negative"));
        }

        Ok(Self::new(xform, resolution, vfov, focus_distance, aperture))
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// Override the image resolution, keeping the vertical field of view.
    pub fn with_resolution(mut self, resolution: UVec2) -> Self {
        let resolution = resolution.max(UVec2::ONE);
        let aspect = resolution.x as f32 / resolution.y as f32;
        self.size.x = aspect * self.size.y;
        self.resolution = resolution;
        self
    }

    pub fn camera_to_world(&self) -> &Transform {
        &self.camera_to_world
    }

    /// Ray through image-plane location `pixel`, in `[0, resolution]` with
    /// (0, 0) at the top-left corner. `lens` is a uniform sample for the aperture.
    pub fn generate_ray(&self, pixel: Vec2, lens: Vec2) -> Ray {
        let disk = sample_disk(lens) * (0.5 * self.aperture_diameter);
        let origin = Vec3::new(disk.x, disk.y, 0.0);

        let uv = pixel / self.resolution.as_vec2();
        let target = Vec3::new(
            (uv.x - 0.5) * self.size.x,
            (0.5 - uv.y) * self.size.y,
            -self.focus_distance,
        );

        Ray::new(
            self.camera_to_world.point(origin),
            self.camera_to_world.vector(target - origin).normalize(),
        )
    }
}
