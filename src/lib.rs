//! Shinobi Clash - deterministic combat core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spatial hash, collisions, combat resolution)
//! - `tuning`: Data-driven game balance

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

use glam::DVec2;

/// Combat constants shared by every host.
///
/// These are part of the determinism contract and are deliberately not
/// exposed through `Tuning`.
pub mod consts {
    /// Fixed simulation timestep (60 Hz lockstep)
    pub const SIM_DT: f64 = 1.0 / 60.0;

    /// Crit damage multiplier
    pub const CRIT_MULTIPLIER: f64 = 2.0;

    /// Sasuke: crit bonus while the post-dodge buff is running
    pub const SASUKE_CRIT_BONUS: f64 = 0.5;
    /// Sasuke: chance to dodge an incoming hit
    pub const SASUKE_DODGE_CHANCE: f64 = 0.15;
    /// Sasuke: seconds before another dodge can trigger
    pub const SASUKE_SHARINGAN_COOLDOWN: f64 = 5.0;
    /// Sasuke: seconds the crit buff lasts after a dodge
    pub const SASUKE_DODGE_BUFF: f64 = 2.0;

    /// Sakura: meter value that arms the burst
    pub const SAKURA_METER_MAX: f64 = 100.0;
    /// Sakura: meter gained per incoming hit
    pub const SAKURA_METER_PER_HIT: f64 = 10.0;
    /// Sakura: damage multiplier when the burst is consumed
    pub const SAKURA_BURST_MULTIPLIER: f64 = 5.0;

    /// Chain lightning damage decay per bounce
    pub const CHAIN_DECAY: f64 = 0.8;

    /// Knockback impulse decay per tick
    pub const KNOCKBACK_DECAY: f64 = 0.95;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}
