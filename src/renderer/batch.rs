//! Per-instance sphere data and the light rig
//!
//! [`ParticleBatch`] mirrors a [`PhysicsWorld`] into instance records for a
//! single instanced draw. The GPU side re-uploads only when
//! [`ParticleBatch::id`] or [`ParticleBatch::generation`] moves.

use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::config::BallpitConfig;
use crate::sim::{Color, ColorGradient, PhysicsWorld};

/// One sphere instance as the vertex shader reads it
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub position: [f32; 3], // offset 0
    pub scale: f32,         // offset 12
    pub color: [f32; 3],    // offset 16
    _pad: f32,              // offset 28
}

impl InstanceRaw {
    pub fn new(position: Vec3, scale: f32, color: Color) -> Self {
        Self {
            position: position.to_array(),
            scale,
            color: color.to_array(),
            _pad: 0.0,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // position + scale
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Point light riding on the controlled sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
}

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct ParticleBatch {
    id: u64,
    instances: Vec<InstanceRaw>,
    follow_cursor: bool,
    generation: u64,
    ambient: AmbientLight,
    light: PointLight,
}

impl ParticleBatch {
    /// Instances for `count` spheres, coloured from the config's stops
    pub fn new(count: usize, config: &BallpitConfig) -> Self {
        let mut batch = Self {
            id: NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed),
            instances: vec![InstanceRaw::new(Vec3::ZERO, 0.0, Color::WHITE); count],
            follow_cursor: config.follow_cursor,
            generation: 0,
            ambient: AmbientLight {
                color: Color::from_hex(config.ambient_color),
                intensity: config.ambient_intensity,
            },
            light: PointLight {
                position: Vec3::ZERO,
                color: Color::WHITE,
                intensity: config.light_intensity,
            },
        };
        let stops: Vec<Color> = config.colors.iter().copied().map(Color::from_hex).collect();
        batch.set_colors(&stops);
        batch
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[InstanceRaw] {
        &self.instances
    }

    /// Unique per constructed batch
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bumped once per [`sync`](Self::sync) or recolour
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ambient(&self) -> &AmbientLight {
        &self.ambient
    }

    pub fn light(&self) -> &PointLight {
        &self.light
    }

    /// Copy positions and radii out of the world
    pub fn sync(&mut self, world: &PhysicsWorld) {
        let positions = world.positions().chunks_exact(3);
        for (i, ((instance, p), &r)) in self
            .instances
            .iter_mut()
            .zip(positions)
            .zip(world.sizes())
            .enumerate()
        {
            instance.position = [p[0], p[1], p[2]];
            instance.scale = if i == 0 && !self.follow_cursor { 0.0 } else { r };
        }
        if world.count() > 0 {
            self.light.position = world.position(0);
        }
        self.generation += 1;
    }

    /// Tint instances along a gradient; fewer than two stops leaves them alone
    pub fn set_colors(&mut self, stops: &[Color]) -> bool {
        let Some(gradient) = ColorGradient::new(stops) else {
            return false;
        };
        let n = self.instances.len() as f32;
        for (i, instance) in self.instances.iter_mut().enumerate() {
            let color = gradient.color_at(i as f32 / n);
            instance.color = color.to_array();
            if i == 0 {
                self.light.color = color;
            }
        }
        self.generation += 1;
        true
    }

    /// World-space centres, flattened xyz
    pub fn positions(&self) -> Vec<f32> {
        self.instances.iter().flat_map(|i| i.position).collect()
    }
}
