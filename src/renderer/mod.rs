//! WebGPU rendering module
//!
//! Draws every sphere with a single instanced call over a shared UV sphere
//! mesh. Everything except [`sphere_pipeline`] is plain data and runs without
//! a GPU.

pub mod batch;
pub mod camera;
pub mod material;
pub mod mesh;
pub mod sphere_pipeline;

pub use batch::{InstanceRaw, ParticleBatch};
pub use camera::PerspectiveCamera;
pub use material::MaterialUniform;
pub use sphere_pipeline::SphereRenderState;
