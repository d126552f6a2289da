//! Sphere contact tests and wall reflection
//!
//! The responses here are tuned for a lively look, not momentum
//! conservation. Keep the constants as they are.

use glam::Vec3;

use crate::consts::{CURSOR_IMPULSE_FLOOR, PAIR_IMPULSE_FLOOR};

/// Contact normal used when two centers coincide
pub const FALLBACK_NORMAL: Vec3 = Vec3::X;

/// Result of a sphere/sphere overlap test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit vector from the first sphere's center toward the second's
    pub normal: Vec3,
    /// Sum of radii minus center distance (always > 0)
    pub overlap: f32,
}

/// Overlap test between two spheres
///
/// Returns `None` when the spheres are separated or just touching.
#[inline]
pub fn sphere_contact(a: Vec3, a_radius: f32, b: Vec3, b_radius: f32) -> Option<Contact> {
    let offset = b - a;
    let dist = offset.length();
    let sum_radius = a_radius + b_radius;
    if dist < sum_radius {
        Some(Contact {
            normal: offset.try_normalize().unwrap_or(FALLBACK_NORMAL),
            overlap: sum_radius - dist,
        })
    } else {
        None
    }
}

/// Separate two free spheres by half the overlap each and kick both apart
///
/// Each impulse scales with that sphere's own speed, floored at 1.
pub fn resolve_pair(
    contact: Contact,
    pos_a: &mut Vec3,
    vel_a: &mut Vec3,
    pos_b: &mut Vec3,
    vel_b: &mut Vec3,
) {
    let correction = contact.normal * (0.5 * contact.overlap);
    let impulse_a = correction * vel_a.length().max(PAIR_IMPULSE_FLOOR);
    let impulse_b = correction * vel_b.length().max(PAIR_IMPULSE_FLOOR);

    *pos_a -= correction;
    *vel_a -= impulse_a;
    *pos_b += correction;
    *vel_b += impulse_b;
}

/// Push a free sphere out of the cursor sphere
///
/// `contact` is measured from the free sphere toward the cursor sphere. Only
/// the free sphere moves, by the full overlap, with a doubled impulse whose
/// speed factor is floored at 2.
pub fn resolve_cursor_push(contact: Contact, pos: &mut Vec3, vel: &mut Vec3) {
    let correction = contact.normal * contact.overlap;
    let impulse = correction * (vel.length().max(CURSOR_IMPULSE_FLOOR) * 2.0);

    *pos -= correction;
    *vel -= impulse;
}

/// Reflect one axis at `±limit`
///
/// The sphere is triggered when `|pos| + radius > limit` and snapped to
/// `±clamp_to`. Returns whether it bounced.
#[inline]
pub fn reflect_symmetric(
    pos: &mut f32,
    vel: &mut f32,
    radius: f32,
    limit: f32,
    clamp_to: f32,
    restitution: f32,
) -> bool {
    if pos.abs() + radius > limit {
        *pos = pos.signum() * (clamp_to - radius);
        *vel = -*vel * restitution;
        true
    } else {
        false
    }
}

/// Reflect off the floor at `-limit` only
#[inline]
pub fn reflect_floor(pos: &mut f32, vel: &mut f32, radius: f32, limit: f32, restitution: f32) -> bool {
    if *pos - radius < -limit {
        *pos = -limit + radius;
        *vel = -*vel * restitution;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_contact_overlap() {
        let contact = sphere_contact(Vec3::ZERO, 1.0, Vec3::new(1.5, 0.0, 0.0), 1.0).unwrap();
        assert!((contact.overlap - 0.5).abs() < 1e-6);
        assert!((contact.normal - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_sphere_contact_separated() {
        assert!(sphere_contact(Vec3::ZERO, 1.0, Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
        // Exactly touching is not a contact
        assert!(sphere_contact(Vec3::ZERO, 1.0, Vec3::new(2.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_coincident_centers_use_fallback_normal() {
        let p = Vec3::new(0.3, -0.2, 0.1);
        let contact = sphere_contact(p, 0.5, p, 0.5).unwrap();
        assert_eq!(contact.normal, FALLBACK_NORMAL);
        assert!((contact.overlap - 1.0).abs() < 1e-6);

        let (mut pa, mut va, mut pb, mut vb) = (p, Vec3::ZERO, p, Vec3::ZERO);
        resolve_pair(contact, &mut pa, &mut va, &mut pb, &mut vb);
        assert!(pa.is_finite() && pb.is_finite() && va.is_finite() && vb.is_finite());
        assert!(((pb - pa).length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_resolve_pair_impulse_uses_own_speed() {
        let contact = Contact {
            normal: Vec3::X,
            overlap: 0.2,
        };
        let mut pa = Vec3::ZERO;
        let mut va = Vec3::new(3.0, 0.0, 0.0);
        let mut pb = Vec3::new(1.0, 0.0, 0.0);
        let mut vb = Vec3::ZERO;
        resolve_pair(contact, &mut pa, &mut va, &mut pb, &mut vb);

        assert!((pa.x - -0.1).abs() < 1e-6);
        assert!((pb.x - 1.1).abs() < 1e-6);
        // 3 - 0.1 * 3
        assert!((va.x - 2.7).abs() < 1e-6);
        // 0 + 0.1 * max(0, 1)
        assert!((vb.x - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_cursor_push_is_boosted() {
        let contact = Contact {
            normal: Vec3::Y,
            overlap: 0.5,
        };
        let mut pos = Vec3::ZERO;
        let mut vel = Vec3::ZERO;
        resolve_cursor_push(contact, &mut pos, &mut vel);
        assert!((pos.y - -0.5).abs() < 1e-6);
        // 0.5 * max(0, 2) * 2
        assert!((vel.y - -2.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_symmetric() {
        let mut pos = 4.8;
        let mut vel = 0.3;
        assert!(reflect_symmetric(&mut pos, &mut vel, 0.5, 5.0, 5.0, 0.95));
        assert!((pos - 4.5).abs() < 1e-6);
        assert!((vel - -0.285).abs() < 1e-6);

        let mut pos = -4.8;
        let mut vel = -0.3;
        assert!(reflect_symmetric(&mut pos, &mut vel, 0.5, 5.0, 5.0, 1.0));
        assert!((pos - -4.5).abs() < 1e-6);
        assert!((vel - 0.3).abs() < 1e-6);

        let mut pos = 1.0;
        let mut vel = 0.3;
        assert!(!reflect_symmetric(&mut pos, &mut vel, 0.5, 5.0, 5.0, 1.0));
    }

    #[test]
    fn test_reflect_floor_ignores_ceiling() {
        let mut pos = 10.0;
        let mut vel = 1.0;
        assert!(!reflect_floor(&mut pos, &mut vel, 0.5, 5.0, 0.95));

        let mut pos = -4.9;
        let mut vel = -0.2;
        assert!(reflect_floor(&mut pos, &mut vel, 0.5, 5.0, 0.95));
        assert!((pos - -4.5).abs() < 1e-6);
        assert!(vel > 0.0);
    }
}
