//! Ballpit - an interactive WebGPU background of colliding spheres
//!
//! Core modules:
//! - `sim`: Particle physics (integration, collisions, walls) and colour gradients
//! - `renderer`: Instanced sphere pipeline, camera and per-instance batch
//! - `platform`: Pointer routing, surface lifecycle and frame timing
//! - `controller`: Composition root driven by the host page
//! - `config`: JSON-facing options with validation
//! - `web`: Browser glue and the `Ballpit` JavaScript class (wasm32 only)

pub mod config;
pub mod controller;
pub mod error;
pub mod platform;
pub mod renderer;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{BallpitConfig, ConfigError};
pub use controller::BallpitController;
pub use error::{BallpitError, Result};

/// Tuning constants shared across modules
pub mod consts {
    pub use crate::config::MOBILE_BREAKPOINT;
    pub use crate::platform::time::RESIZE_DEBOUNCE_MS;
    pub use crate::sim::collision::FALLBACK_NORMAL;
    pub use crate::sim::world::CONTROL_EASING;

    /// Camera clip planes
    pub const CAMERA_NEAR: f32 = 0.1;
    pub const CAMERA_FAR: f32 = 2000.0;

    /// Minimum push multiplier for sphere-sphere impulses
    pub const PAIR_IMPULSE_FLOOR: f32 = 1.0;
    /// Minimum push multiplier for the cursor sphere, before doubling
    pub const CURSOR_IMPULSE_FLOOR: f32 = 2.0;
}
