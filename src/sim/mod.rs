//! Particle simulation
//!
//! Pure and platform-free: flat kinematic buffers, the per-frame step and
//! the color gradient. No rendering or browser dependencies.

pub mod collision;
pub mod gradient;
pub mod world;

pub use collision::{Contact, sphere_contact};
pub use gradient::{Color, ColorGradient};
pub use world::{PhysicsParams, PhysicsWorld};
