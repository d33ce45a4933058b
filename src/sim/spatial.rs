//! Uniform-grid spatial hash (broad phase)
//!
//! The hash is rebuilt from scratch every tick: `clear`, then `add` every
//! entity. An entity whose bounds span several cells is recorded in each of
//! them. Queries return deduplicated candidates only; callers still need a
//! narrow-phase `check_collision`.

use std::collections::{HashMap, HashSet};

use glam::DVec2;

use super::shape::{Bounds, Collidable, Shape};

type CellKey = (i64, i64);

/// Value snapshot of a collidable taken at insertion time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proxy {
    pub id: u32,
    pub pos: DVec2,
    pub shape: Shape,
}

impl Collidable for Proxy {
    fn id(&self) -> u32 {
        self.id
    }

    fn pos(&self) -> DVec2 {
        self.pos
    }

    fn shape(&self) -> Shape {
        self.shape
    }
}

#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f64,
    // Only ever looked up by key, so HashMap ordering never leaks into results.
    buckets: HashMap<CellKey, Vec<Proxy>>,
}

impl SpatialHash {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            buckets: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Drop every bucket (start of tick)
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Insert an entity into every cell its bounds overlap
    pub fn add<C: Collidable + ?Sized>(&mut self, entity: &C) {
        let proxy = Proxy {
            id: entity.id(),
            pos: entity.pos(),
            shape: entity.shape(),
        };
        let ((x0, y0), (x1, y1)) = self.cell_range(&Self::get_bounds(entity));
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.buckets.entry((cx, cy)).or_default().push(proxy);
            }
        }
    }

    /// World-space bounds of an entity
    pub fn get_bounds<C: Collidable + ?Sized>(entity: &C) -> Bounds {
        entity.bounds()
    }

    /// Candidates sharing at least one cell with `entity`, each id once
    pub fn query<C: Collidable + ?Sized>(&self, entity: &C) -> Vec<Proxy> {
        self.query_bounds(&Self::get_bounds(entity))
    }

    /// Candidates within the cells covering a circle of `radius` around `pos`
    pub fn query_radius(&self, pos: DVec2, radius: f64) -> Vec<Proxy> {
        self.query_bounds(&Shape::circle(radius).bounds_at(pos))
    }

    /// Candidates sharing at least one cell with `bounds`, each id once
    pub fn query_bounds(&self, bounds: &Bounds) -> Vec<Proxy> {
        let ((x0, y0), (x1, y1)) = self.cell_range(bounds);
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                let Some(bucket) = self.buckets.get(&(cx, cy)) else {
                    continue;
                };
                for proxy in bucket {
                    if seen.insert(proxy.id) {
                        found.push(*proxy);
                    }
                }
            }
        }
        found
    }

    /// Number of non-empty cells (diagnostics)
    pub fn occupied_cells(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn cell_of(&self, v: f64) -> i64 {
        (v / self.cell_size).floor() as i64
    }

    fn cell_range(&self, b: &Bounds) -> (CellKey, CellKey) {
        (
            (self.cell_of(b.min_x()), self.cell_of(b.min_y())),
            (self.cell_of(b.max_x()), self.cell_of(b.max_y())),
        )
    }
}
