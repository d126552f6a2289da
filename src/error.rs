//! Error types
//!
//! Construction is the only place a ballpit can fail. Once a surface is
//! running, frame and teardown problems are logged and swallowed.

use thiserror::Error;

use crate::config::ConfigError;
use crate::platform::input::SurfaceKey;

/// Errors surfaced to the embedding page
#[derive(Debug, Error)]
pub enum BallpitError {
    /// No canvas/context could be acquired for the widget
    #[error("no drawable surface: {0}")]
    SurfaceUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The same surface was registered with the pointer broker twice
    #[error("surface {0:?} is already registered for pointer input")]
    AlreadyRegistered(SurfaceKey),

    #[error("failed to create GPU surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

pub type Result<T, E = BallpitError> = std::result::Result<T, E>;
