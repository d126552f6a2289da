//! Particle world: flat kinematic buffers and the per-frame step
//!
//! Buffers are struct-of-arrays: `positions` and `velocities` hold `3 * count`
//! floats (xyz per particle), `sizes` holds one radius per particle. Index 0
//! is the cursor sphere.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{
    reflect_floor, reflect_symmetric, resolve_cursor_push, resolve_pair, sphere_contact,
};

/// Fraction of the remaining distance the cursor sphere covers per step
pub const CONTROL_EASING: f32 = 0.1;

/// Physics constants for one world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    pub count: usize,
    pub gravity: f32,
    pub friction: f32,
    pub wall_bounce: f32,
    pub max_velocity: f32,
    pub min_size: f32,
    pub max_size: f32,
    /// Radius of the cursor sphere
    pub size0: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub max_z: f32,
    /// Index 0 follows the control point instead of integrating
    pub control_sphere0: bool,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            count: 200,
            gravity: 0.5,
            friction: 0.9975,
            wall_bounce: 0.95,
            max_velocity: 0.15,
            min_size: 0.5,
            max_size: 1.0,
            size0: 1.0,
            max_x: 5.0,
            max_y: 5.0,
            max_z: 2.0,
            control_sphere0: false,
        }
    }
}

/// Owns every particle's position, velocity and radius
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    params: PhysicsParams,
    positions: Vec<f32>,
    velocities: Vec<f32>,
    sizes: Vec<f32>,
    /// Control point the cursor sphere eases toward
    center: Vec3,
}

#[inline]
fn read3(buf: &[f32], i: usize) -> Vec3 {
    Vec3::from_slice(&buf[3 * i..3 * i + 3])
}

#[inline]
fn write3(buf: &mut [f32], i: usize, v: Vec3) {
    v.write_to_slice(&mut buf[3 * i..3 * i + 3]);
}

impl PhysicsWorld {
    /// Build a world and scatter particles 1.. uniformly inside the bounds
    pub fn new(params: PhysicsParams, seed: u64) -> Self {
        let count = params.count;
        let mut world = Self {
            params,
            positions: vec![0.0; 3 * count],
            velocities: vec![0.0; 3 * count],
            sizes: vec![1.0; count],
            center: Vec3::ZERO,
        };
        let mut rng = Pcg32::seed_from_u64(seed);
        world.init_positions(&mut rng);
        world.init_sizes(&mut rng);
        world
    }

    fn init_positions(&mut self, rng: &mut Pcg32) {
        let PhysicsParams {
            max_x, max_y, max_z, ..
        } = self.params;
        if self.params.count > 0 {
            write3(&mut self.positions, 0, self.center);
        }
        for i in 1..self.params.count {
            let p = Vec3::new(
                rng.random_range(-max_x..=max_x),
                rng.random_range(-max_y..=max_y),
                rng.random_range(-max_z..=max_z),
            );
            write3(&mut self.positions, i, p);
        }
    }

    fn init_sizes(&mut self, rng: &mut Pcg32) {
        let PhysicsParams {
            min_size, max_size, ..
        } = self.params;
        if let Some(first) = self.sizes.first_mut() {
            *first = self.params.size0;
        }
        for size in self.sizes.iter_mut().skip(1) {
            *size = rng.random_range(min_size..=max_size);
        }
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    pub fn count(&self) -> usize {
        self.params.count
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    pub fn position(&self, i: usize) -> Vec3 {
        read3(&self.positions, i)
    }

    pub fn velocity(&self, i: usize) -> Vec3 {
        read3(&self.velocities, i)
    }

    pub fn radius(&self, i: usize) -> f32 {
        self.sizes[i]
    }

    /// Place a particle directly (scenario setup)
    pub fn set_particle(&mut self, i: usize, position: Vec3, velocity: Vec3) {
        write3(&mut self.positions, i, position);
        write3(&mut self.velocities, i, velocity);
    }

    pub fn set_radius(&mut self, i: usize, radius: f32) {
        self.sizes[i] = radius;
    }

    pub fn control_target(&self) -> Vec3 {
        self.center
    }

    pub fn set_control_target(&mut self, target: Vec3) {
        self.center = target;
    }

    pub fn control_enabled(&self) -> bool {
        self.params.control_sphere0
    }

    pub fn set_control_enabled(&mut self, enabled: bool) {
        self.params.control_sphere0 = enabled;
    }

    /// New half extents for X/Y (Z stays as configured)
    pub fn set_bounds(&mut self, max_x: f32, max_y: f32) {
        self.params.max_x = max_x;
        self.params.max_y = max_y;
    }

    /// Advance one step
    ///
    /// `delta` only scales gravity; velocities are added to positions as a
    /// unit-time Euler step.
    pub fn update(&mut self, delta: f32) {
        let params = self.params;
        let count = params.count;
        if count == 0 {
            return;
        }

        let mut start = 0;
        let mut cursor = Vec3::ZERO;
        if params.control_sphere0 {
            start = 1;
            cursor = read3(&self.positions, 0).lerp(self.center, CONTROL_EASING);
            write3(&mut self.positions, 0, cursor);
            write3(&mut self.velocities, 0, Vec3::ZERO);
        }

        // Integrate
        for i in start..count {
            let mut pos = read3(&self.positions, i);
            let mut vel = read3(&self.velocities, i);
            vel.y -= delta * params.gravity * self.sizes[i];
            vel *= params.friction;
            vel = vel.clamp_length_max(params.max_velocity);
            pos += vel;
            write3(&mut self.positions, i, pos);
            write3(&mut self.velocities, i, vel);
        }

        let z_limit = params.max_z.max(params.max_size);
        for i in start..count {
            let mut pos = read3(&self.positions, i);
            let mut vel = read3(&self.velocities, i);
            let radius = self.sizes[i];

            for j in i + 1..count {
                let mut other_pos = read3(&self.positions, j);
                let mut other_vel = read3(&self.velocities, j);
                if let Some(contact) = sphere_contact(pos, radius, other_pos, self.sizes[j]) {
                    resolve_pair(contact, &mut pos, &mut vel, &mut other_pos, &mut other_vel);
                    write3(&mut self.positions, j, other_pos);
                    write3(&mut self.velocities, j, other_vel);
                }
            }

            if params.control_sphere0 {
                if let Some(contact) = sphere_contact(pos, radius, cursor, self.sizes[0]) {
                    resolve_cursor_push(contact, &mut pos, &mut vel);
                }
            }

            reflect_symmetric(
                &mut pos.x,
                &mut vel.x,
                radius,
                params.max_x,
                params.max_x,
                params.wall_bounce,
            );
            if params.gravity == 0.0 {
                reflect_symmetric(
                    &mut pos.y,
                    &mut vel.y,
                    radius,
                    params.max_y,
                    params.max_y,
                    params.wall_bounce,
                );
            } else {
                reflect_floor(&mut pos.y, &mut vel.y, radius, params.max_y, params.wall_bounce);
            }
            // Generous trigger so spheres don't clip at shallow depth
            reflect_symmetric(
                &mut pos.z,
                &mut vel.z,
                radius,
                z_limit,
                params.max_z,
                params.wall_bounce,
            );

            write3(&mut self.positions, i, pos);
            write3(&mut self.velocities, i, vel);
        }
    }
}
