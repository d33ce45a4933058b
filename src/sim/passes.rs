//! Per-tick entity update passes
//!
//! Movement, status ticking and contact checks for everything that is not a
//! player. None of these passes touch `hp` directly: all damage goes through
//! a `DamageSink`, so crits and character hooks apply no matter what the
//! damage source was.

use std::collections::BTreeSet;

use glam::DVec2;

use super::collision::check_collision;
use super::combat::{self, ChainBounce, apply_knockback};
use super::rng::CombatRng;
use super::spatial::{Proxy, SpatialHash};
use super::state::{DamageOutcome, Enemy, GameEvent, Hazard, Player, Projectile, XpOrb, find_mut};
use crate::consts::KNOCKBACK_DECAY;
use crate::tuning::Tuning;

/// Damage callback used by every pass
pub trait DamageSink {
    fn damage_enemy(&mut self, enemy: &mut Enemy, amount: f64, source: &mut Player) -> DamageOutcome;
    fn damage_player(&mut self, player: &mut Player, amount: f64) -> DamageOutcome;
}

/// An enemy death reported during the tick; the driver turns it into a drop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kill {
    pub enemy_id: u32,
    pub pos: DVec2,
    pub xp_value: u32,
}

/// `DamageSink` backed by the combat engine and the match RNG stream
///
/// Records presentation events and kills as it goes.
pub struct EngineSink<'a, R: CombatRng + ?Sized> {
    rng: &'a mut R,
    events: &'a mut Vec<GameEvent>,
    kills: Vec<Kill>,
}

impl<'a, R: CombatRng + ?Sized> EngineSink<'a, R> {
    pub fn new(rng: &'a mut R, events: &'a mut Vec<GameEvent>) -> Self {
        Self {
            rng,
            events,
            kills: Vec::new(),
        }
    }

    /// Kills in the order they happened
    pub fn into_kills(self) -> Vec<Kill> {
        self.kills
    }

    /// Chain lightning through the engine, recording beams and kills
    pub fn chain_lightning(
        &mut self,
        enemies: &mut [Enemy],
        source: &mut Player,
        origin: DVec2,
        damage: f64,
        max_bounces: u32,
        range: f64,
    ) -> Vec<ChainBounce> {
        let bounces = combat::chain_lightning(
            enemies,
            source,
            origin,
            damage,
            max_bounces,
            range,
            BTreeSet::new(),
            &mut *self.rng,
        );

        let mut from = origin;
        for bounce in &bounces {
            let Some(target) = enemies.iter().find(|e| e.id == bounce.target_id) else {
                continue;
            };
            self.events.push(GameEvent::ChainBeam {
                from,
                to: target.pos,
            });
            self.record_enemy_hit(target, &bounce.outcome);
            from = target.pos;
        }
        bounces
    }

    fn record_enemy_hit(&mut self, enemy: &Enemy, outcome: &DamageOutcome) {
        if outcome.blocked {
            return;
        }
        self.events.push(GameEvent::DamageText {
            pos: enemy.pos,
            amount: outcome.final_damage,
            crit: outcome.is_crit,
        });
        if outcome.killed {
            self.events.push(GameEvent::EnemyKilled {
                enemy_id: enemy.id,
                pos: enemy.pos,
            });
            self.kills.push(Kill {
                enemy_id: enemy.id,
                pos: enemy.pos,
                xp_value: enemy.xp_value,
            });
        }
    }
}

impl<R: CombatRng + ?Sized> DamageSink for EngineSink<'_, R> {
    fn damage_enemy(&mut self, enemy: &mut Enemy, amount: f64, source: &mut Player) -> DamageOutcome {
        let outcome = combat::damage_enemy(enemy, amount, source, &mut *self.rng);
        self.record_enemy_hit(enemy, &outcome);
        outcome
    }

    fn damage_player(&mut self, player: &mut Player, amount: f64) -> DamageOutcome {
        let outcome = combat::damage_player(player, amount, &mut *self.rng);
        if outcome.blocked {
            self.events.push(GameEvent::Blocked {
                player_id: player.id,
            });
        } else {
            self.events.push(GameEvent::PlayerHit {
                player_id: player.id,
                amount: outcome.final_damage,
            });
            if outcome.killed {
                self.events.push(GameEvent::PlayerDowned {
                    player_id: player.id,
                });
            }
        }
        outcome
    }
}

/// Index of the closest live player to `pos`; ties go to the lowest id
pub fn nearest_player(players: &[Player], pos: DVec2) -> Option<usize> {
    let mut best: Option<(f64, usize)> = None;
    // Players are sorted by id, so strict `<` keeps the lowest id on ties.
    for (index, player) in players.iter().enumerate() {
        if player.dead {
            continue;
        }
        let d = pos.distance_squared(player.pos);
        if best.is_none_or(|(best_d, _)| d < best_d) {
            best = Some((d, index));
        }
    }
    best.map(|(_, index)| index)
}

/// Advance character timers (dodge buff, sharingan, shield regen) and
/// attack cooldowns
pub fn tick_character_timers(players: &mut [Player], tuning: &Tuning, dt: f64) {
    for player in players.iter_mut().filter(|p| !p.dead) {
        player.attack_cooldown = (player.attack_cooldown - dt).max(0.0);
        if let Some(state) = player.char_state.as_mut() {
            state.tick_timers(dt, tuning);
        }
    }
}

/// Bleed, movement, knockback integration and contact damage
pub fn update_enemies<S: DamageSink>(
    enemies: &mut [Enemy],
    players: &mut [Player],
    tuning: &Tuning,
    dt: f64,
    sink: &mut S,
) {
    for enemy in enemies.iter_mut() {
        if enemy.dead {
            continue;
        }

        if enemy.bleed_stacks > 0 {
            enemy.dot_timer -= dt;
            if enemy.dot_timer <= 0.0 {
                enemy.dot_timer += tuning.bleed_interval;
                let amount = enemy.bleed_stacks as f64 * tuning.bleed_damage_per_stack;
                let source = match enemy.bleed_source {
                    Some(id) => find_mut(players, id, |p| p.id),
                    None => None,
                };
                if let Some(source) = source {
                    sink.damage_enemy(enemy, amount, source);
                }
                if enemy.dead {
                    continue;
                }
            }
        }

        enemy.root_timer = (enemy.root_timer - dt).max(0.0);
        enemy.rooted = enemy.root_timer > 0.0;
        if !enemy.rooted {
            if let Some(target) = nearest_player(players, enemy.pos) {
                let dir = (players[target].pos - enemy.pos).normalize_or_zero();
                enemy.pos += dir * tuning.enemy_speed * enemy.speed_mult * dt;
            }
        }

        enemy.pos += enemy.push * dt;
        enemy.push *= KNOCKBACK_DECAY;

        enemy.attack_cooldown = (enemy.attack_cooldown - dt).max(0.0);
        if enemy.attack_cooldown > 0.0 {
            continue;
        }
        let contact = tuning.enemy_contact_damage * (1.0 - enemy.damage_debuff).max(0.0);
        if let Some(player) = players
            .iter_mut()
            .find(|p| !p.dead && check_collision(&*enemy, &**p))
        {
            sink.damage_player(player, contact);
            enemy.attack_cooldown = tuning.enemy_attack_cooldown;
        }
    }
    log::trace!("enemy pass: {} enemies", enemies.len());
}

/// Rebuild the enemy broad phase from live enemies
pub fn rebuild_enemy_grid(grid: &mut SpatialHash, enemies: &[Enemy]) {
    grid.clear();
    for enemy in enemies.iter().filter(|e| !e.dead) {
        grid.add(enemy);
    }
}

/// Candidates from the grid, narrowed to real overlaps, in id order
fn overlapping(grid: &SpatialHash, probe: &impl super::shape::Collidable) -> Vec<Proxy> {
    let mut hits: Vec<Proxy> = grid
        .query(probe)
        .into_iter()
        .filter(|c| check_collision(probe, c))
        .collect();
    hits.sort_by_key(|p| p.id);
    hits
}

/// Move projectiles and resolve their hits
pub fn update_projectiles<S: DamageSink>(
    projectiles: &mut [Projectile],
    enemies: &mut [Enemy],
    players: &mut [Player],
    grid: &SpatialHash,
    tuning: &Tuning,
    dt: f64,
    sink: &mut S,
) {
    for proj in projectiles.iter_mut() {
        if proj.dead {
            continue;
        }
        proj.pos += proj.vel * dt;
        proj.ttl -= dt;
        if proj.ttl <= 0.0 {
            proj.dead = true;
            continue;
        }

        for candidate in overlapping(grid, &*proj) {
            if proj.hit_ids.contains(&candidate.id) {
                continue;
            }
            let Some(enemy) = find_mut(enemies, candidate.id, |e| e.id) else {
                continue;
            };
            if enemy.dead {
                continue;
            }
            let Some(owner) = find_mut(players, proj.owner, |p| p.id) else {
                proj.dead = true;
                break;
            };

            sink.damage_enemy(enemy, proj.damage, owner);
            apply_knockback(enemy, proj.pos, owner.stats.knockback * tuning.knockback_force);
            proj.hit_ids.push(enemy.id);

            if proj.pierce_left == 0 {
                proj.dead = true;
                break;
            }
            proj.pierce_left -= 1;
        }
    }
}

/// Tick hazards: periodic damage, roots and bleed on enemies inside
pub fn update_hazards<S: DamageSink>(
    hazards: &mut [Hazard],
    enemies: &mut [Enemy],
    players: &mut [Player],
    grid: &SpatialHash,
    tuning: &Tuning,
    dt: f64,
    sink: &mut S,
) {
    for hazard in hazards.iter_mut() {
        if hazard.ttl <= 0.0 {
            continue;
        }
        hazard.ttl -= dt;
        hazard.tick_timer -= dt;
        if hazard.tick_timer > 0.0 {
            continue;
        }
        hazard.tick_timer += hazard.tick_interval;

        let Some(owner) = find_mut(players, hazard.owner, |p| p.id) else {
            hazard.ttl = 0.0;
            continue;
        };

        for candidate in overlapping(grid, &*hazard) {
            let Some(enemy) = find_mut(enemies, candidate.id, |e| e.id) else {
                continue;
            };
            if enemy.dead {
                continue;
            }
            sink.damage_enemy(enemy, hazard.damage, owner);
            if enemy.dead {
                continue;
            }
            if hazard.roots {
                enemy.root_timer = enemy.root_timer.max(hazard.tick_interval);
                enemy.rooted = true;
            }
            if hazard.bleed > 0 {
                if enemy.bleed_stacks == 0 {
                    enemy.dot_timer = tuning.bleed_interval;
                }
                enemy.bleed_stacks += hazard.bleed;
                enemy.bleed_source = Some(owner.id);
            }
        }
    }
}

/// Pull orbs toward nearby players and collect the ones in reach
pub fn update_xp_orbs(
    orbs: &mut [XpOrb],
    players: &mut [Player],
    tuning: &Tuning,
    dt: f64,
    events: &mut Vec<GameEvent>,
) {
    for orb in orbs.iter_mut().filter(|o| !o.collected) {
        let Some(index) = nearest_player(players, orb.pos) else {
            return;
        };
        let player = &mut players[index];
        let to_player = player.pos - orb.pos;
        let dist = to_player.length();

        if dist < tuning.pickup_radius {
            orb.collected = true;
            let gained = player.gain_xp(orb.value);
            if gained > 0 {
                log::debug!("player {} reached level {}", player.id, player.level);
                events.push(GameEvent::LevelUp {
                    player_id: player.id,
                    level: player.level,
                });
            }
        } else if dist < tuning.magnet_radius && dist > 0.0 {
            let step = (tuning.magnet_speed * dt).min(dist);
            orb.pos += to_player / dist * step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::Lcg;
    use crate::sim::shape::Shape;

    /// Records every call and applies flat damage
    #[derive(Default)]
    struct Recorder {
        enemy_hits: Vec<(u32, f64, u32)>,
        player_hits: Vec<(u32, f64)>,
    }

    impl DamageSink for Recorder {
        fn damage_enemy(&mut self, enemy: &mut Enemy, amount: f64, source: &mut Player) -> DamageOutcome {
            self.enemy_hits.push((enemy.id, amount, source.id));
            enemy.hp -= amount;
            let killed = enemy.hp <= 0.0;
            enemy.dead = killed;
            DamageOutcome {
                final_damage: amount,
                killed,
                ..Default::default()
            }
        }

        fn damage_player(&mut self, player: &mut Player, amount: f64) -> DamageOutcome {
            self.player_hits.push((player.id, amount));
            DamageOutcome {
                final_damage: amount,
                ..Default::default()
            }
        }
    }

    fn grid_of(enemies: &[Enemy]) -> SpatialHash {
        let mut grid = SpatialHash::new(Tuning::default().cell_size);
        rebuild_enemy_grid(&mut grid, enemies);
        grid
    }

    #[test]
    fn test_enemy_moves_toward_nearest_player() {
        let tuning = Tuning::default();
        let mut players = vec![
            Player::new(1, DVec2::new(500.0, 0.0)),
            Player::new(2, DVec2::new(-100.0, 0.0)),
        ];
        let mut enemies = vec![Enemy::new(3, DVec2::ZERO, 10.0)];
        update_enemies(&mut enemies, &mut players, &tuning, 0.5, &mut Recorder::default());
        assert!((enemies[0].pos.x - (-tuning.enemy_speed * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_rooted_enemy_only_drifts_with_push() {
        let tuning = Tuning::default();
        let mut players = vec![Player::new(1, DVec2::new(500.0, 0.0))];
        let mut enemy = Enemy::new(2, DVec2::ZERO, 10.0);
        enemy.root_timer = 1.0;
        enemy.push = DVec2::new(0.0, 10.0);
        let mut enemies = vec![enemy];

        update_enemies(&mut enemies, &mut players, &tuning, 0.1, &mut Recorder::default());
        assert!(enemies[0].rooted);
        assert_eq!(enemies[0].pos.x, 0.0);
        assert!((enemies[0].pos.y - 1.0).abs() < 1e-9);
        assert!((enemies[0].push.y - 10.0 * KNOCKBACK_DECAY).abs() < 1e-9);
    }

    #[test]
    fn test_bleed_routes_through_sink() {
        let tuning = Tuning::default();
        let mut players = vec![Player::new(1, DVec2::new(900.0, 0.0))];
        let mut enemy = Enemy::new(2, DVec2::ZERO, 100.0);
        enemy.bleed_stacks = 3;
        enemy.bleed_source = Some(1);
        enemy.dot_timer = 0.01;
        let mut enemies = vec![enemy];
        let mut sink = Recorder::default();

        update_enemies(&mut enemies, &mut players, &tuning, 0.02, &mut sink);
        assert_eq!(
            sink.enemy_hits,
            vec![(2, 3.0 * tuning.bleed_damage_per_stack, 1)]
        );
        assert!(enemies[0].dot_timer > 0.0);
    }

    #[test]
    fn test_contact_damage_respects_cooldown_and_debuff() {
        let tuning = Tuning::default();
        let mut players = vec![Player::new(1, DVec2::ZERO)];
        let mut enemy = Enemy::new(2, DVec2::new(5.0, 0.0), 10.0);
        enemy.damage_debuff = 0.5;
        let mut enemies = vec![enemy];
        let mut sink = Recorder::default();

        update_enemies(&mut enemies, &mut players, &tuning, 0.01, &mut sink);
        update_enemies(&mut enemies, &mut players, &tuning, 0.01, &mut sink);
        assert_eq!(sink.player_hits, vec![(1, tuning.enemy_contact_damage * 0.5)]);
    }

    fn bolt(id: u32, owner: u32, pos: DVec2, vel: DVec2, pierce: u32) -> Projectile {
        Projectile {
            id,
            owner,
            pos,
            vel,
            shape: Shape::capsule_along(4.0, vel, 16.0),
            damage: 7.0,
            pierce_left: pierce,
            ttl: 1.0,
            hit_ids: Vec::new(),
            dead: false,
        }
    }

    #[test]
    fn test_projectile_hits_once_and_knocks_back() {
        let tuning = Tuning::default();
        let mut players = vec![Player::new(1, DVec2::new(-300.0, 0.0))];
        let mut enemies = vec![
            Enemy::new(2, DVec2::new(20.0, 0.0), 100.0),
            Enemy::new(3, DVec2::new(30.0, 0.0), 100.0),
        ];
        let grid = grid_of(&enemies);
        let mut projectiles = vec![bolt(4, 1, DVec2::ZERO, DVec2::new(100.0, 0.0), 0)];
        let mut sink = Recorder::default();

        update_projectiles(&mut projectiles, &mut enemies, &mut players, &grid, &tuning, 0.01, &mut sink);
        // Both overlap; without piercing only the lowest id is hit
        assert_eq!(sink.enemy_hits, vec![(2, 7.0, 1)]);
        assert!(projectiles[0].dead);
        assert!(enemies[0].push.x > 0.0);
        assert_eq!(enemies[1].push, DVec2::ZERO);
    }

    #[test]
    fn test_piercing_projectile_hits_each_enemy_once() {
        let tuning = Tuning::default();
        let mut players = vec![Player::new(1, DVec2::new(-300.0, 0.0))];
        let mut enemies = vec![
            Enemy::new(2, DVec2::new(20.0, 0.0), 100.0),
            Enemy::new(3, DVec2::new(30.0, 0.0), 100.0),
        ];
        let grid = grid_of(&enemies);
        let mut projectiles = vec![bolt(4, 1, DVec2::ZERO, DVec2::new(1.0, 0.0), 2)];
        let mut sink = Recorder::default();

        for _ in 0..3 {
            update_projectiles(&mut projectiles, &mut enemies, &mut players, &grid, &tuning, 0.01, &mut sink);
        }
        assert_eq!(sink.enemy_hits.len(), 2);
        assert!(!projectiles[0].dead);
        assert_eq!(projectiles[0].pierce_left, 0);
    }

    #[test]
    fn test_hazard_ticks_roots_and_bleeds() {
        let tuning = Tuning::default();
        let mut players = vec![Player::new(1, DVec2::new(-300.0, 0.0))];
        let mut enemies = vec![
            Enemy::new(2, DVec2::new(10.0, 0.0), 100.0),
            Enemy::new(3, DVec2::new(400.0, 0.0), 100.0),
        ];
        let grid = grid_of(&enemies);
        let mut hazards = vec![Hazard {
            id: 5,
            owner: 1,
            pos: DVec2::ZERO,
            shape: Shape::circle(50.0),
            damage: 4.0,
            tick_interval: 0.5,
            tick_timer: 0.0,
            ttl: 2.0,
            roots: true,
            bleed: 2,
        }];
        let mut sink = Recorder::default();

        update_hazards(&mut hazards, &mut enemies, &mut players, &grid, &tuning, 0.1, &mut sink);
        assert_eq!(sink.enemy_hits, vec![(2, 4.0, 1)]);
        assert!(enemies[0].rooted);
        assert_eq!(enemies[0].bleed_stacks, 2);
        assert_eq!(enemies[0].bleed_source, Some(1));

        // Not due again until the interval passes
        update_hazards(&mut hazards, &mut enemies, &mut players, &grid, &tuning, 0.1, &mut sink);
        assert_eq!(sink.enemy_hits.len(), 1);
    }

    #[test]
    fn test_orbs_magnetize_then_collect() {
        let tuning = Tuning::default();
        let mut players = vec![Player::new(1, DVec2::ZERO)];
        let mut orbs = vec![
            XpOrb {
                id: 2,
                pos: DVec2::new(100.0, 0.0),
                value: 10,
                collected: false,
            },
            XpOrb {
                id: 3,
                pos: DVec2::new(1000.0, 0.0),
                value: 10,
                collected: false,
            },
        ];
        let mut events = Vec::new();

        update_xp_orbs(&mut orbs, &mut players, &tuning, 0.1, &mut events);
        assert!(orbs[0].pos.x < 100.0);
        assert_eq!(orbs[1].pos.x, 1000.0);

        for _ in 0..20 {
            update_xp_orbs(&mut orbs, &mut players, &tuning, 0.1, &mut events);
        }
        assert!(orbs[0].collected);
        assert!(!orbs[1].collected);
        assert_eq!(players[0].level, 2);
        assert_eq!(events, vec![GameEvent::LevelUp { player_id: 1, level: 2 }]);
    }

    #[test]
    fn test_engine_sink_records_kills() {
        let mut rng = Lcg::new(1);
        let mut events = Vec::new();
        let mut player = Player::new(1, DVec2::ZERO);
        let mut enemy = Enemy::new(2, DVec2::new(3.0, 4.0), 5.0);

        let mut sink = EngineSink::new(&mut rng, &mut events);
        let outcome = sink.damage_enemy(&mut enemy, 10.0, &mut player);
        assert!(outcome.killed);
        let kills = sink.into_kills();
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].enemy_id, 2);
        assert!(events.contains(&GameEvent::EnemyKilled {
            enemy_id: 2,
            pos: DVec2::new(3.0, 4.0),
        }));
    }

    #[test]
    fn test_nearest_player_ties_go_to_lowest_id() {
        let players = vec![
            Player::new(1, DVec2::new(10.0, 0.0)),
            Player::new(2, DVec2::new(-10.0, 0.0)),
        ];
        assert_eq!(nearest_player(&players, DVec2::ZERO), Some(0));
    }
}
