//! Combat resolution engine
//!
//! The only code allowed to change combatant health. Every rule that
//! modifies a hit runs here in a fixed order, and every random roll is drawn
//! from the caller's stream in that same order, so two hosts fed the same
//! inputs end the tick with identical state.
//!
//! Nothing here renders or spawns. Kills and damage numbers are reported
//! through `DamageOutcome` and the caller turns them into events and drops.

use std::collections::BTreeSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::rng::CombatRng;
use super::state::{DamageOutcome, Enemy, Player};
use crate::consts::*;

/// Damage an enemy on behalf of `source`
///
/// Order: dead check, crit roll (one draw), character multipliers, health.
pub fn damage_enemy<R: CombatRng + ?Sized>(
    enemy: &mut Enemy,
    base_amount: f64,
    source: &mut Player,
    rng: &mut R,
) -> DamageOutcome {
    if enemy.dead {
        return DamageOutcome::blocked();
    }

    let crit_bonus = source.char_state.as_ref().map_or(0.0, |s| s.crit_bonus());
    let crit_chance = (source.stats.crit_chance + crit_bonus).max(0.0);

    let is_crit = rng.next_f64() < crit_chance;
    let mut final_damage = if is_crit {
        base_amount * CRIT_MULTIPLIER
    } else {
        base_amount
    };

    if let Some(state) = source.char_state.as_mut() {
        final_damage = state.apply_outgoing(final_damage);
    }

    enemy.hp -= final_damage;
    let killed = enemy.hp <= 0.0;
    if killed {
        enemy.hp = 0.0;
        enemy.dead = true;
        log::debug!("enemy {} killed by player {}", enemy.id, source.id);
    }

    DamageOutcome {
        final_damage,
        is_crit,
        blocked: false,
        killed,
    }
}

/// Damage a player
///
/// Invincibility is absolute. Past that, defensive hooks run in a fixed
/// priority (dodge, then shield) and any leftover damage reaches hp. Victims
/// never crit.
pub fn damage_player<R: CombatRng + ?Sized>(
    player: &mut Player,
    base_amount: f64,
    rng: &mut R,
) -> DamageOutcome {
    if player.invincible || player.dead {
        return DamageOutcome::blocked();
    }

    let Some(state) = player.char_state.as_mut() else {
        return apply_player_damage(player, base_amount);
    };

    // Charges on every attempt that got this far, blocked or not.
    state.charge_on_hit();

    if state.try_dodge(rng) {
        log::debug!("player {} dodged", player.id);
        return DamageOutcome::blocked();
    }

    match state.absorb(base_amount) {
        Some(remaining) if remaining <= 0.0 => DamageOutcome::blocked(),
        Some(remaining) => apply_player_damage(player, remaining),
        None => apply_player_damage(player, base_amount),
    }
}

fn apply_player_damage(player: &mut Player, amount: f64) -> DamageOutcome {
    player.hp = (player.hp - amount).clamp(0.0, player.max_hp);
    let killed = player.hp <= 0.0;
    if killed {
        player.dead = true;
        log::debug!("player {} downed", player.id);
    }
    DamageOutcome {
        final_damage: amount,
        is_crit: false,
        blocked: false,
        killed,
    }
}

/// One hop of a chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainBounce {
    pub target_id: u32,
    /// Damage sent into this hop before crit/character multipliers
    pub damage: f64,
    pub outcome: DamageOutcome,
}

/// Bounce damage between nearest targets, decaying per hop
///
/// Each hop picks the closest live enemy to the current origin that is not
/// in `exclude_ids` and lies strictly inside `range`. Equal distances go to
/// the lowest id. Running out of targets ends the chain early.
#[allow(clippy::too_many_arguments)]
pub fn chain_lightning<R: CombatRng + ?Sized>(
    enemies: &mut [Enemy],
    source: &mut Player,
    origin: DVec2,
    damage: f64,
    max_bounces: u32,
    range: f64,
    mut exclude_ids: BTreeSet<u32>,
    rng: &mut R,
) -> Vec<ChainBounce> {
    let mut bounces = Vec::new();
    let mut origin = origin;
    let mut damage = damage;

    for _ in 0..max_bounces {
        let Some(index) = nearest_target(enemies, origin, range, &exclude_ids) else {
            break;
        };
        let target = &mut enemies[index];
        let outcome = damage_enemy(target, damage, source, rng);
        bounces.push(ChainBounce {
            target_id: target.id,
            damage,
            outcome,
        });
        exclude_ids.insert(target.id);
        origin = target.pos;
        damage *= CHAIN_DECAY;
    }

    log::debug!("chain lightning hit {} targets", bounces.len());
    bounces
}

fn nearest_target(
    enemies: &[Enemy],
    origin: DVec2,
    range: f64,
    exclude_ids: &BTreeSet<u32>,
) -> Option<usize> {
    let mut best: Option<(f64, u32, usize)> = None;
    for (index, enemy) in enemies.iter().enumerate() {
        if enemy.dead || exclude_ids.contains(&enemy.id) {
            continue;
        }
        let dist = origin.distance(enemy.pos);
        if dist >= range {
            continue;
        }
        let closer = match best {
            None => true,
            Some((best_dist, best_id, _)) => {
                dist < best_dist || (dist == best_dist && enemy.id < best_id)
            }
        };
        if closer {
            best = Some((dist, enemy.id, index));
        }
    }
    best.map(|(_, _, index)| index)
}

/// Replace an enemy's push with an impulse pointing away from `source_pos`
pub fn apply_knockback(enemy: &mut Enemy, source_pos: DVec2, force: f64) {
    let angle = (enemy.pos.y - source_pos.y).atan2(enemy.pos.x - source_pos.x);
    enemy.push = DVec2::new(angle.cos() * force, angle.sin() * force);
}
