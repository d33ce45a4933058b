//! Collision shapes and axis-aligned bounds
//!
//! Shape offsets are relative to the owning entity's position. Absolute
//! geometry is only ever computed on demand from `(pos, shape)`.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Collision shape of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle {
        radius: f64,
    },
    /// Swept circle along the segment `pos + start` .. `pos + end`
    Capsule {
        radius: f64,
        start: DVec2,
        end: DVec2,
    },
    Aabb {
        width: f64,
        height: f64,
    },
}

impl Shape {
    pub fn circle(radius: f64) -> Self {
        Shape::Circle { radius }
    }

    /// Capsule running from the owner position along `dir * length`
    pub fn capsule_along(radius: f64, dir: DVec2, length: f64) -> Self {
        Shape::Capsule {
            radius,
            start: DVec2::ZERO,
            end: dir.normalize_or_zero() * length,
        }
    }

    /// Bounds of this shape placed at `pos`
    pub fn bounds_at(&self, pos: DVec2) -> Bounds {
        match *self {
            Shape::Circle { radius } => Bounds {
                min: pos - DVec2::splat(radius),
                max: pos + DVec2::splat(radius),
            },
            Shape::Capsule { radius, start, end } => {
                let a = pos + start;
                let b = pos + end;
                Bounds {
                    min: a.min(b) - DVec2::splat(radius),
                    max: a.max(b) + DVec2::splat(radius),
                }
            }
            Shape::Aabb { width, height } => {
                let half = DVec2::new(width / 2.0, height / 2.0);
                Bounds {
                    min: pos - half,
                    max: pos + half,
                }
            }
        }
    }
}

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn min_x(&self) -> f64 {
        self.min.x
    }

    pub fn min_y(&self) -> f64 {
        self.min.y
    }

    pub fn max_x(&self) -> f64 {
        self.max.x
    }

    pub fn max_y(&self) -> f64 {
        self.max.y
    }
}

/// Anything that can be placed in the spatial hash
pub trait Collidable {
    fn id(&self) -> u32;
    fn pos(&self) -> DVec2;
    fn shape(&self) -> Shape;

    fn bounds(&self) -> Bounds {
        self.shape().bounds_at(self.pos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_bounds() {
        let b = Shape::circle(10.0).bounds_at(DVec2::new(5.0, -5.0));
        assert_eq!(b.min, DVec2::new(-5.0, -15.0));
        assert_eq!(b.max, DVec2::new(15.0, 5.0));
    }

    #[test]
    fn test_capsule_bounds_use_absolute_endpoints() {
        let shape = Shape::Capsule {
            radius: 2.0,
            start: DVec2::new(10.0, 0.0),
            end: DVec2::new(-10.0, 4.0),
        };
        let b = shape.bounds_at(DVec2::new(100.0, 100.0));
        assert_eq!(b.min, DVec2::new(88.0, 98.0));
        assert_eq!(b.max, DVec2::new(112.0, 106.0));
    }

    #[test]
    fn test_aabb_bounds() {
        let b = Shape::Aabb {
            width: 20.0,
            height: 10.0,
        }
        .bounds_at(DVec2::ZERO);
        assert_eq!(b.min_x(), -10.0);
        assert_eq!(b.max_y(), 5.0);
    }

    #[test]
    fn test_capsule_along_normalizes() {
        match Shape::capsule_along(3.0, DVec2::new(0.0, 5.0), 12.0) {
            Shape::Capsule { end, start, .. } => {
                assert_eq!(start, DVec2::ZERO);
                assert!((end - DVec2::new(0.0, 12.0)).length() < 1e-9);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
