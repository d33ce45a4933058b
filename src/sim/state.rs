//! Game state and core simulation types
//!
//! Everything a tick reads or writes lives here. Collections are kept sorted
//! by id so that iteration order is identical on every host.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::character::{Character, CharacterRegistry, CharacterState};
use super::rng::Lcg;
use super::shape::{Collidable, Shape};
use super::spatial::SpatialHash;
use crate::tuning::Tuning;

/// Player combat stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub damage_mult: f64,
    pub area_mult: f64,
    pub cooldown_mult: f64,
    /// Probability in [0, 1]
    pub crit_chance: f64,
    /// Knockback force applied by this player's hits
    pub knockback: f64,
    /// Extra enemies a projectile may pass through
    pub piercing: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            damage_mult: 1.0,
            area_mult: 1.0,
            cooldown_mult: 1.0,
            crit_chance: 0.0,
            knockback: 1.0,
            piercing: 0,
        }
    }
}

/// A player-controlled combatant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub pos: DVec2,
    pub shape: Shape,
    pub hp: f64,
    pub max_hp: f64,
    pub move_speed: f64,
    pub stats: Stats,
    /// Active character payload; `None` for an unaffiliated player
    pub char_state: Option<CharacterState>,
    pub invincible: bool,
    pub dead: bool,
    pub xp: u32,
    pub level: u32,
    pub xp_to_next: u32,
    /// Seconds until the basic attack is ready again
    pub attack_cooldown: f64,
}

impl Player {
    pub fn new(id: u32, pos: DVec2) -> Self {
        Self {
            id,
            pos,
            shape: Shape::circle(14.0),
            hp: 100.0,
            max_hp: 100.0,
            move_speed: 150.0,
            stats: Stats::default(),
            char_state: None,
            invincible: false,
            dead: false,
            xp: 0,
            level: 1,
            xp_to_next: 10,
            attack_cooldown: 0.0,
        }
    }

    pub fn character(&self) -> Option<Character> {
        self.char_state.as_ref().map(CharacterState::character)
    }

    /// Add xp and roll over levels; returns how many levels were gained
    pub fn gain_xp(&mut self, amount: u32) -> u32 {
        self.xp += amount;
        let mut gained = 0;
        while self.xp >= self.xp_to_next {
            self.xp -= self.xp_to_next;
            self.level += 1;
            self.xp_to_next = (self.xp_to_next as f64 * 1.2).ceil() as u32;
            gained += 1;
        }
        gained
    }
}

impl Collidable for Player {
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

/// An enemy combatant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub pos: DVec2,
    pub shape: Shape,
    pub hp: f64,
    pub max_hp: f64,
    pub dead: bool,
    pub bleed_stacks: u32,
    /// Player credited with bleed ticks
    pub bleed_source: Option<u32>,
    /// Seconds until the next bleed tick
    pub dot_timer: f64,
    /// Knockback impulse, integrated and decayed by the enemy pass
    pub push: DVec2,
    pub rooted: bool,
    /// Seconds of root left; `rooted` mirrors `root_timer > 0`
    pub root_timer: f64,
    /// Fraction of contact damage removed, in [0, 1]
    pub damage_debuff: f64,
    pub speed_mult: f64,
    pub attack_cooldown: f64,
    pub xp_value: u32,
}

impl Enemy {
    pub fn new(id: u32, pos: DVec2, hp: f64) -> Self {
        Self {
            id,
            pos,
            shape: Shape::circle(12.0),
            hp,
            max_hp: hp,
            dead: false,
            bleed_stacks: 0,
            bleed_source: None,
            dot_timer: 0.0,
            push: DVec2::ZERO,
            rooted: false,
            root_timer: 0.0,
            damage_debuff: 0.0,
            speed_mult: 1.0,
            attack_cooldown: 0.0,
            xp_value: 1,
        }
    }
}

impl Collidable for Enemy {
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

/// A moving damage source fired by a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub owner: u32,
    pub pos: DVec2,
    pub vel: DVec2,
    pub shape: Shape,
    pub damage: f64,
    /// Enemies it may still pass through after the next hit
    pub pierce_left: u32,
    pub ttl: f64,
    /// Enemies already hit (each is damaged at most once)
    pub hit_ids: Vec<u32>,
    pub dead: bool,
}

impl Collidable for Projectile {
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

/// A stationary area effect that damages enemies periodically
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub id: u32,
    pub owner: u32,
    pub pos: DVec2,
    pub shape: Shape,
    pub damage: f64,
    pub tick_interval: f64,
    pub tick_timer: f64,
    pub ttl: f64,
    /// Roots enemies caught in it
    pub roots: bool,
    /// Bleed stacks applied per tick
    pub bleed: u32,
}

impl Collidable for Hazard {
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

/// Experience dropped by a killed enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpOrb {
    pub id: u32,
    pub pos: DVec2,
    pub value: u32,
    pub collected: bool,
}

/// Result of one damage resolution
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub final_damage: f64,
    pub is_crit: bool,
    pub blocked: bool,
    pub killed: bool,
}

impl DamageOutcome {
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::default()
        }
    }
}

/// Presentation requests emitted by the simulation (rendering is external)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    DamageText { pos: DVec2, amount: f64, crit: bool },
    PlayerHit { player_id: u32, amount: f64 },
    Blocked { player_id: u32 },
    EnemyKilled { enemy_id: u32, pos: DVec2 },
    PlayerDowned { player_id: u32 },
    ChainBeam { from: DVec2, to: DVec2 },
    LevelUp { player_id: u32, level: u32 },
}

/// Complete match state (deterministic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Match seed for reproducibility
    pub seed: u32,
    pub rng: Lcg,
    pub tuning: Tuning,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Seconds until the next enemy spawn
    pub spawn_timer: f64,
    /// Players (sorted by id)
    pub players: Vec<Player>,
    /// Enemies (sorted by id, i.e. spawn order)
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub hazards: Vec<Hazard>,
    pub orbs: Vec<XpOrb>,
    /// Requests produced during the last tick
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Enemy broad phase, rebuilt every tick
    #[serde(skip, default = "empty_grid")]
    pub enemy_grid: SpatialHash,
    next_id: u32,
}

fn empty_grid() -> SpatialHash {
    SpatialHash::new(Tuning::default().cell_size)
}

impl GameState {
    /// Create a match with one player per roster entry, placed on a ring
    pub fn new(
        seed: u32,
        tuning: Tuning,
        registry: &CharacterRegistry,
        roster: &[Option<Character>],
    ) -> Self {
        let mut state = Self {
            seed,
            rng: Lcg::new(seed),
            enemy_grid: SpatialHash::new(tuning.cell_size),
            spawn_timer: tuning.spawn_interval,
            tuning,
            time_ticks: 0,
            players: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            hazards: Vec::new(),
            orbs: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        };

        let count = roster.len().max(1) as f64;
        for (i, character) in roster.iter().enumerate() {
            let id = state.next_entity_id();
            let angle = std::f64::consts::TAU * i as f64 / count;
            let pos = crate::polar_to_cartesian(40.0, angle);
            let player = registry.spawn_player(id, *character, pos, &state.tuning);
            state.players.push(player);
        }

        log::info!("match seeded with {seed}, {} players", state.players.len());
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_enemy(&mut self, pos: DVec2) -> u32 {
        let id = self.next_entity_id();
        let mut enemy = Enemy::new(id, pos, self.tuning.enemy_hp);
        enemy.xp_value = self.tuning.xp_per_kill;
        self.enemies.push(enemy);
        id
    }

    pub fn spawn_orb(&mut self, pos: DVec2, value: u32) -> u32 {
        let id = self.next_entity_id();
        self.orbs.push(XpOrb {
            id,
            pos,
            value,
            collected: false,
        });
        id
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        find(&self.players, id, |p| p.id)
    }

    pub fn player_mut(&mut self, id: u32) -> Option<&mut Player> {
        find_mut(&mut self.players, id, |p| p.id)
    }

    pub fn enemy(&self, id: u32) -> Option<&Enemy> {
        find(&self.enemies, id, |e| e.id)
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.players.sort_by_key(|p| p.id);
        self.enemies.sort_by_key(|e| e.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.hazards.sort_by_key(|h| h.id);
        self.orbs.sort_by_key(|o| o.id);
    }
}

/// Binary search in an id-sorted slice
pub fn find<T>(items: &[T], id: u32, key: impl Fn(&T) -> u32) -> Option<&T> {
    items.binary_search_by_key(&id, key).ok().map(|i| &items[i])
}

pub fn find_mut<T>(items: &mut [T], id: u32, key: impl Fn(&T) -> u32) -> Option<&mut T> {
    match items.binary_search_by_key(&id, key) {
        Ok(i) => Some(&mut items[i]),
        Err(_) => None,
    }
}
