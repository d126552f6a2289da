//! Ballpit configuration
//!
//! Passed in once by the host page (as JSON) and replaced wholesale on
//! recount. Every recognized option is enumerated here; unknown keys are
//! rejected rather than passed through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::PhysicsParams;

/// Configuration problems detected before anything is built
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("particle count must be at least 1")]
    EmptyCount,

    #[error("`{field}` must be a finite non-negative number (got {value})")]
    InvalidScalar { field: &'static str, value: f32 },

    #[error("minSize ({min}) is larger than maxSize ({max})")]
    SizeRange { min: f32, max: f32 },

    #[error("at least one color is required")]
    NoColors,

    #[error("pixel ratio clamp min ({min}) is larger than max ({max})")]
    PixelRatioRange { min: f32, max: f32 },

    #[error("camera fov must be strictly between 0 and 180 degrees (got {0})")]
    FieldOfView(f32),

    #[error("camera distance must be a finite positive number (got {0})")]
    CameraDistance(f32),

    #[error("`{field}` must be a finite positive aspect ratio (got {value})")]
    InvalidAspect { field: &'static str, value: f32 },

    #[error("camera minAspect ({min}) is larger than maxAspect ({max})")]
    AspectRange { min: f32, max: f32 },

    #[error("fixed size must be non-zero (got {width}x{height})")]
    FixedSize { width: u32, height: u32 },
}

/// How the backing store size is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SizeSource {
    /// Fixed CSS pixel size
    Fixed { width: u32, height: u32 },
    /// Track the canvas' parent element
    #[default]
    Parent,
    /// Track the browser window
    Window,
}

impl SizeSource {
    /// Whether the size follows resize events at all
    pub fn is_tracked(&self) -> bool {
        !matches!(self, SizeSource::Fixed { .. })
    }
}

/// Acceleration hint forwarded to the GPU adapter request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(pref: PowerPreference) -> Self {
        match pref {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        }
    }
}

/// Device pixel ratio bounds; `None` leaves that side unclamped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PixelRatioClamp {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl PixelRatioClamp {
    pub fn apply(&self, device_pixel_ratio: f32) -> f32 {
        match (self.min, self.max) {
            (_, Some(max)) if device_pixel_ratio > max => max,
            (Some(min), _) if device_pixel_ratio < min => min,
            _ => device_pixel_ratio,
        }
    }
}

/// Perspective camera setup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CameraParams {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Camera distance from the origin along +Z
    pub distance: f32,
    /// Below this aspect the fov is widened to keep the sides visible
    pub min_aspect: Option<f32>,
    /// Above this aspect the fov is widened to keep the top/bottom visible
    pub max_aspect: Option<f32>,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov: 50.0,
            distance: 20.0,
            min_aspect: None,
            max_aspect: Some(1.5),
        }
    }
}

impl CameraParams {
    /// Reject settings that give an empty or inverted view volume
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(ConfigError::FieldOfView(self.fov));
        }
        if !self.distance.is_finite() || self.distance <= 0.0 {
            return Err(ConfigError::CameraDistance(self.distance));
        }
        for (field, value) in [("minAspect", self.min_aspect), ("maxAspect", self.max_aspect)] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::InvalidAspect { field, value });
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_aspect, self.max_aspect) {
            if min > max {
                return Err(ConfigError::AspectRange { min, max });
            }
        }
        Ok(())
    }
}

/// Physically-based material knobs shared by every sphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MaterialParams {
    pub metalness: f32,
    pub roughness: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            metalness: 0.5,
            roughness: 0.5,
            clearcoat: 1.0,
            clearcoat_roughness: 0.15,
        }
    }
}

/// Subsurface-scattering term layered over the direct lighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ScatteringParams {
    /// How far the surface normal bends the light vector
    pub distortion: f32,
    /// Constant scattering floor
    pub ambient: f32,
    pub attenuation: f32,
    pub power: f32,
    pub scale: f32,
}

impl Default for ScatteringParams {
    fn default() -> Self {
        Self {
            distortion: 0.1,
            ambient: 0.0,
            attenuation: 0.1,
            power: 2.0,
            scale: 10.0,
        }
    }
}

/// Everything the host page can tune
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BallpitConfig {
    /// Number of spheres, including the cursor sphere at index 0
    pub count: usize,
    /// Gradient stops as 0xRRGGBB; two or more enable the gradient
    pub colors: Vec<u32>,
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub light_intensity: f32,
    pub material: MaterialParams,
    pub scattering: ScatteringParams,

    pub min_size: f32,
    pub max_size: f32,
    /// Radius of the cursor sphere
    pub size0: f32,
    pub gravity: f32,
    /// Velocity multiplier applied every step
    pub friction: f32,
    /// Wall restitution; values above 1 make walls springy
    pub wall_bounce: f32,
    pub max_velocity: f32,
    /// Initial half extents; X/Y are replaced by the visible area on resize
    pub max_x: f32,
    pub max_y: f32,
    pub max_z: f32,
    /// Show the sphere that follows the pointer
    pub follow_cursor: bool,

    pub camera: CameraParams,
    pub pixel_ratio: PixelRatioClamp,
    pub size: SizeSource,
    pub power_preference: PowerPreference,
    pub antialias: bool,
    /// Clear to transparent so the page shows through
    pub transparent: bool,
    /// Scatter seed; random when absent
    pub seed: Option<u64>,
}

impl Default for BallpitConfig {
    fn default() -> Self {
        Self {
            count: 200,
            colors: vec![0x000000, 0x000000, 0x000000],
            ambient_color: 0xffffff,
            ambient_intensity: 1.0,
            light_intensity: 200.0,
            material: MaterialParams::default(),
            scattering: ScatteringParams::default(),

            min_size: 0.5,
            max_size: 1.0,
            size0: 1.0,
            gravity: 0.5,
            friction: 0.9975,
            wall_bounce: 0.95,
            max_velocity: 0.15,
            max_x: 5.0,
            max_y: 5.0,
            max_z: 2.0,
            follow_cursor: true,

            camera: CameraParams::default(),
            pixel_ratio: PixelRatioClamp::default(),
            size: SizeSource::Parent,
            power_preference: PowerPreference::HighPerformance,
            antialias: true,
            transparent: true,
            seed: None,
        }
    }
}

/// Viewport width under which the page treats the device as mobile
pub const MOBILE_BREAKPOINT: f32 = 768.0;

/// Sphere count the page uses for a given viewport width
pub fn recommended_count(viewport_width: f32) -> usize {
    if viewport_width < MOBILE_BREAKPOINT { 30 } else { 120 }
}

impl BallpitConfig {
    /// Parse and validate a JSON config; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::EmptyCount);
        }
        if self.colors.is_empty() {
            return Err(ConfigError::NoColors);
        }

        let scalars = [
            ("ambientIntensity", self.ambient_intensity),
            ("lightIntensity", self.light_intensity),
            ("minSize", self.min_size),
            ("maxSize", self.max_size),
            ("size0", self.size0),
            ("gravity", self.gravity),
            ("friction", self.friction),
            ("wallBounce", self.wall_bounce),
            ("maxX", self.max_x),
            ("maxY", self.max_y),
            ("maxZ", self.max_z),
        ];
        for (field, value) in scalars {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidScalar { field, value });
            }
        }
        // Unbounded speed is allowed
        if self.max_velocity.is_nan() || self.max_velocity < 0.0 {
            return Err(ConfigError::InvalidScalar {
                field: "maxVelocity",
                value: self.max_velocity,
            });
        }

        if self.min_size > self.max_size {
            return Err(ConfigError::SizeRange {
                min: self.min_size,
                max: self.max_size,
            });
        }
        if let (Some(min), Some(max)) = (self.pixel_ratio.min, self.pixel_ratio.max) {
            if min > max {
                return Err(ConfigError::PixelRatioRange { min, max });
            }
        }
        if let SizeSource::Fixed { width, height } = self.size {
            if width == 0 || height == 0 {
                return Err(ConfigError::FixedSize { width, height });
            }
        }
        self.camera.validate()
    }

    /// The subset of options the physics step reads
    pub fn physics_params(&self) -> PhysicsParams {
        PhysicsParams {
            count: self.count,
            gravity: self.gravity,
            friction: self.friction,
            wall_bounce: self.wall_bounce,
            max_velocity: self.max_velocity,
            min_size: self.min_size,
            max_size: self.max_size,
            size0: self.size0,
            max_x: self.max_x,
            max_y: self.max_y,
            max_z: self.max_z,
            control_sphere0: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BallpitConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.count, 200);
        assert_eq!(config.camera.max_aspect, Some(1.5));
    }

    #[test]
    fn test_from_json_camel_case_with_defaults() {
        let config = BallpitConfig::from_json(
            r#"{
                "count": 120,
                "gravity": 0.25,
                "friction": 0.95,
                "wallBounce": 1.2,
                "followCursor": true,
                "colors": [65345, 16777215, 8947848],
                "minSize": 0.4,
                "maxSize": 0.8
            }"#,
        )
        .unwrap();

        assert_eq!(config.count, 120);
        assert_eq!(config.wall_bounce, 1.2);
        assert_eq!(config.colors, vec![0x00ff41, 0xffffff, 0x888888]);
        // Untouched keys keep their defaults
        assert_eq!(config.max_velocity, 0.15);
        assert_eq!(config.size, SizeSource::Parent);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = BallpitConfig::from_json(r#"{ "count": 10, "bogus": 1 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_size_source_json() {
        let config = BallpitConfig::from_json(r#"{ "size": { "fixed": { "width": 300, "height": 200 } } }"#)
            .unwrap();
        assert_eq!(
            config.size,
            SizeSource::Fixed {
                width: 300,
                height: 200
            }
        );
        assert!(!config.size.is_tracked());

        let config = BallpitConfig::from_json(r#"{ "size": "window" }"#).unwrap();
        assert_eq!(config.size, SizeSource::Window);
    }

    #[test]
    fn test_validation_failures() {
        let config = BallpitConfig {
            count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyCount)));

        let config = BallpitConfig {
            gravity: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScalar { field: "gravity", .. })
        ));

        let config = BallpitConfig {
            min_size: 2.0,
            max_size: 1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::SizeRange { .. })));

        let config = BallpitConfig {
            colors: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoColors)));

        let config = BallpitConfig {
            max_velocity: f32::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_camera_fov_out_of_range_rejected() {
        for fov in [-50.0, 0.0, 180.0, 200.0] {
            let json = format!(r#"{{ "count": 10, "camera": {{ "fov": {fov:?} }} }}"#);
            assert!(
                matches!(BallpitConfig::from_json(&json), Err(ConfigError::FieldOfView(_))),
                "fov {fov} accepted"
            );
        }
        let config = BallpitConfig {
            camera: CameraParams {
                fov: f32::NAN,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::FieldOfView(_))));
        assert!(BallpitConfig::from_json(r#"{ "camera": { "fov": 90.0 } }"#).is_ok());
    }

    #[test]
    fn test_camera_distance_rejected() {
        for distance in [0.0, -20.0, f32::INFINITY] {
            let config = BallpitConfig {
                camera: CameraParams {
                    distance,
                    ..Default::default()
                },
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::CameraDistance(_))));
        }
    }

    #[test]
    fn test_camera_aspect_clamps_rejected() {
        let config = BallpitConfig::from_json(r#"{ "camera": { "minAspect": -1.0 } }"#);
        assert!(matches!(
            config,
            Err(ConfigError::InvalidAspect { field: "minAspect", .. })
        ));

        let config = BallpitConfig::from_json(r#"{ "camera": { "maxAspect": 0.0 } }"#);
        assert!(matches!(
            config,
            Err(ConfigError::InvalidAspect { field: "maxAspect", .. })
        ));

        let config =
            BallpitConfig::from_json(r#"{ "camera": { "minAspect": 2.0, "maxAspect": 1.5 } }"#);
        assert!(matches!(config, Err(ConfigError::AspectRange { .. })));

        assert!(
            BallpitConfig::from_json(r#"{ "camera": { "minAspect": 0.5, "maxAspect": 1.5 } }"#)
                .is_ok()
        );
    }

    #[test]
    fn test_zero_fixed_size_rejected() {
        let config =
            BallpitConfig::from_json(r#"{ "size": { "fixed": { "width": 0, "height": 200 } } }"#);
        assert!(matches!(
            config,
            Err(ConfigError::FixedSize {
                width: 0,
                height: 200
            })
        ));
        let config =
            BallpitConfig::from_json(r#"{ "size": { "fixed": { "width": 300, "height": 0 } } }"#);
        assert!(matches!(config, Err(ConfigError::FixedSize { .. })));
    }

    #[test]
    fn test_pixel_ratio_clamp() {
        let clamp = PixelRatioClamp {
            min: Some(1.0),
            max: Some(2.0),
        };
        assert_eq!(clamp.apply(3.0), 2.0);
        assert_eq!(clamp.apply(0.5), 1.0);
        assert_eq!(clamp.apply(1.5), 1.5);
        assert_eq!(PixelRatioClamp::default().apply(3.0), 3.0);
    }

    #[test]
    fn test_recommended_count() {
        assert_eq!(recommended_count(375.0), 30);
        assert_eq!(recommended_count(1440.0), 120);
    }
}
