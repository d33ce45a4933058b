//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, drawn in a fixed call order
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod character;
pub mod collision;
pub mod combat;
pub mod passes;
pub mod rng;
pub mod shape;
pub mod spatial;
pub mod state;
pub mod tick;

pub use character::{Character, CharacterDef, CharacterRegistry, CharacterState};
pub use collision::{check_collision, point_segment_distance_sq};
pub use combat::{ChainBounce, apply_knockback, chain_lightning, damage_enemy, damage_player};
pub use rng::{CombatRng, Lcg};
pub use shape::{Bounds, Collidable, Shape};
pub use spatial::{Proxy, SpatialHash};
pub use state::{
    DamageOutcome, Enemy, GameEvent, GameState, Hazard, Player, Projectile, Stats, XpOrb,
};
pub use tick::{PlayerAction, PlayerIntent, TickInput, tick};
