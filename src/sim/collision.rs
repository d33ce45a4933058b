//! Narrow-phase collision tests
//!
//! Exact overlap checks between two placed shapes. Only circle/circle and
//! circle/capsule pairings are supported; every other pairing reports no
//! contact and callers must not depend on it.

use glam::DVec2;

use super::shape::{Collidable, Shape};

/// Exact overlap test between two collidables
pub fn check_collision<A, B>(a: &A, b: &B) -> bool
where
    A: Collidable + ?Sized,
    B: Collidable + ?Sized,
{
    shapes_overlap(a.pos(), a.shape(), b.pos(), b.shape())
}

/// Exact overlap test between two shapes placed at the given positions
pub fn shapes_overlap(pos_a: DVec2, shape_a: Shape, pos_b: DVec2, shape_b: Shape) -> bool {
    match (shape_a, shape_b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(pos_a, ra, pos_b, rb)
        }
        (Shape::Circle { radius: rc }, Shape::Capsule { radius, start, end }) => {
            circle_capsule(pos_a, rc, pos_b + start, pos_b + end, radius)
        }
        (Shape::Capsule { .. }, Shape::Circle { .. }) => {
            shapes_overlap(pos_b, shape_b, pos_a, shape_a)
        }
        // Capsule/capsule and anything involving an AABB have no narrow phase.
        _ => false,
    }
}

#[inline]
fn circle_circle(a: DVec2, ra: f64, b: DVec2, rb: f64) -> bool {
    let reach = ra + rb;
    a.distance_squared(b) < reach * reach
}

#[inline]
fn circle_capsule(center: DVec2, rc: f64, seg_a: DVec2, seg_b: DVec2, r_capsule: f64) -> bool {
    let reach = rc + r_capsule;
    point_segment_distance_sq(center, seg_a, seg_b) < reach * reach
}

/// Squared distance from `p` to the segment `a..b`
///
/// Uses the clamped projection parameter `t` in `[0, 1]`. A zero-length
/// segment degrades to the point distance.
pub fn point_segment_distance_sq(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance_squared(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    p.distance_squared(closest)
}
