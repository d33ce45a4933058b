//! Data-driven game balance
//!
//! Values here only feed the satellite passes (spawning, movement, pickups,
//! shield regen). Numbers the damage pipeline depends on live in
//! `crate::consts`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Balance values. Any subset may be overridden from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Broad phase ===
    pub cell_size: f64,

    // === Enemies ===
    pub enemy_hp: f64,
    pub enemy_speed: f64,
    pub enemy_contact_damage: f64,
    /// Seconds between contact hits from the same enemy
    pub enemy_attack_cooldown: f64,
    pub bleed_interval: f64,
    pub bleed_damage_per_stack: f64,
    pub spawn_interval: f64,
    pub spawn_radius: f64,

    // === Experience ===
    pub xp_per_kill: u32,
    pub magnet_radius: f64,
    pub magnet_speed: f64,
    pub pickup_radius: f64,

    // === Gaara ===
    pub gaara_shield_max: f64,
    /// Idle seconds before the shield starts regenerating
    pub gaara_shield_regen_delay: f64,
    /// Shield points per second once regenerating
    pub gaara_shield_regen_rate: f64,

    // === Player actions ===
    pub attack_cooldown: f64,
    /// Impulse per point of `Stats::knockback`
    pub knockback_force: f64,
    pub projectile_damage: f64,
    pub projectile_speed: f64,
    pub projectile_radius: f64,
    pub projectile_length: f64,
    pub projectile_ttl: f64,
    pub chain_damage: f64,
    pub chain_range: f64,
    pub chain_bounces: u32,
    pub hazard_radius: f64,
    pub hazard_damage: f64,
    pub hazard_tick_interval: f64,
    pub hazard_ttl: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            cell_size: 64.0,

            enemy_hp: 30.0,
            enemy_speed: 60.0,
            enemy_contact_damage: 8.0,
            enemy_attack_cooldown: 1.0,
            bleed_interval: 0.5,
            bleed_damage_per_stack: 2.0,
            spawn_interval: 1.5,
            spawn_radius: 400.0,

            xp_per_kill: 1,
            magnet_radius: 120.0,
            magnet_speed: 250.0,
            pickup_radius: 20.0,

            gaara_shield_max: 40.0,
            gaara_shield_regen_delay: 3.0,
            gaara_shield_regen_rate: 10.0,

            attack_cooldown: 0.5,
            knockback_force: 120.0,
            projectile_damage: 12.0,
            projectile_speed: 420.0,
            projectile_radius: 5.0,
            projectile_length: 18.0,
            projectile_ttl: 1.5,
            chain_damage: 50.0,
            chain_range: 180.0,
            chain_bounces: 4,
            hazard_radius: 60.0,
            hazard_damage: 4.0,
            hazard_tick_interval: 0.5,
            hazard_ttl: 4.0,
        }
    }
}

impl Tuning {
    /// Parse a JSON override on top of the defaults, then validate
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!("loaded tuning overrides");
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        fn positive(field: &'static str, v: f64) -> Result<(), TuningError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: "must be a positive number",
                })
            }
        }
        fn non_negative(field: &'static str, v: f64) -> Result<(), TuningError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: "must be zero or greater",
                })
            }
        }

        positive("cell_size", self.cell_size)?;
        positive("enemy_hp", self.enemy_hp)?;
        positive("bleed_interval", self.bleed_interval)?;
        positive("spawn_interval", self.spawn_interval)?;
        positive("hazard_tick_interval", self.hazard_tick_interval)?;
        non_negative("enemy_speed", self.enemy_speed)?;
        non_negative("enemy_contact_damage", self.enemy_contact_damage)?;
        non_negative("enemy_attack_cooldown", self.enemy_attack_cooldown)?;
        non_negative("bleed_damage_per_stack", self.bleed_damage_per_stack)?;
        non_negative("spawn_radius", self.spawn_radius)?;
        non_negative("magnet_radius", self.magnet_radius)?;
        non_negative("magnet_speed", self.magnet_speed)?;
        non_negative("pickup_radius", self.pickup_radius)?;
        non_negative("gaara_shield_max", self.gaara_shield_max)?;
        non_negative("gaara_shield_regen_delay", self.gaara_shield_regen_delay)?;
        non_negative("gaara_shield_regen_rate", self.gaara_shield_regen_rate)?;
        non_negative("attack_cooldown", self.attack_cooldown)?;
        non_negative("knockback_force", self.knockback_force)?;
        non_negative("projectile_damage", self.projectile_damage)?;
        non_negative("projectile_speed", self.projectile_speed)?;
        non_negative("projectile_radius", self.projectile_radius)?;
        non_negative("projectile_length", self.projectile_length)?;
        non_negative("projectile_ttl", self.projectile_ttl)?;
        non_negative("chain_damage", self.chain_damage)?;
        non_negative("chain_range", self.chain_range)?;
        non_negative("hazard_radius", self.hazard_radius)?;
        non_negative("hazard_damage", self.hazard_damage)?;
        non_negative("hazard_ttl", self.hazard_ttl)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let tuning = Tuning::from_json(r#"{ "cell_size": 32.0, "chain_bounces": 2 }"#).unwrap();
        assert_eq!(tuning.cell_size, 32.0);
        assert_eq!(tuning.chain_bounces, 2);
        assert_eq!(tuning.enemy_hp, Tuning::default().enemy_hp);
    }

    #[test]
    fn test_rejects_zero_cell_size() {
        let err = Tuning::from_json(r#"{ "cell_size": 0.0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "cell_size", .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = Tuning::from_json("{ cell_size: ").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse tuning"));
    }
}
