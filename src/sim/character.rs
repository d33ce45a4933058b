//! Playable characters and their combat hooks
//!
//! Per-character behavior is a closed set. Each hook is an exhaustive match
//! on `CharacterState`, so adding a character forces every call site in the
//! combat engine to decide what it does there.

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::rng::CombatRng;
use super::shape::Shape;
use super::state::{Player, Stats};
use crate::consts::*;
use crate::tuning::Tuning;

/// Character tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Character {
    Naruto,
    Sasuke,
    Sakura,
    Gaara,
}

impl Character {
    pub const ALL: [Character; 4] = [
        Character::Naruto,
        Character::Sasuke,
        Character::Sakura,
        Character::Gaara,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Character::Naruto => "naruto",
            Character::Sasuke => "sasuke",
            Character::Sakura => "sakura",
            Character::Gaara => "gaara",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "naruto" => Some(Character::Naruto),
            "sasuke" => Some(Character::Sasuke),
            "sakura" => Some(Character::Sakura),
            "gaara" => Some(Character::Gaara),
            _ => None,
        }
    }
}

/// Per-character runtime payload; exactly one variant is live per player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CharacterState {
    Naruto,
    Sasuke {
        /// Seconds left on the post-dodge crit buff
        dodge_buff_timer: f64,
        sharingan_cooldown: f64,
    },
    Gaara {
        shield_hp: f64,
        shield_max: f64,
        /// Seconds since the shield last absorbed anything
        shield_regen_timer: f64,
    },
    Sakura {
        meter: f64,
    },
}

impl CharacterState {
    /// Fresh state for a character at spawn
    pub fn initial(character: Character, tuning: &Tuning) -> Self {
        match character {
            Character::Naruto => CharacterState::Naruto,
            Character::Sasuke => CharacterState::Sasuke {
                dodge_buff_timer: 0.0,
                sharingan_cooldown: 0.0,
            },
            Character::Gaara => CharacterState::Gaara {
                shield_hp: tuning.gaara_shield_max,
                shield_max: tuning.gaara_shield_max,
                shield_regen_timer: 0.0,
            },
            Character::Sakura => CharacterState::Sakura { meter: 0.0 },
        }
    }

    pub fn character(&self) -> Character {
        match self {
            CharacterState::Naruto => Character::Naruto,
            CharacterState::Sasuke { .. } => Character::Sasuke,
            CharacterState::Gaara { .. } => Character::Gaara,
            CharacterState::Sakura { .. } => Character::Sakura,
        }
    }

    /// Attacker-side crit chance bonus
    pub fn crit_bonus(&self) -> f64 {
        match self {
            CharacterState::Sasuke {
                dodge_buff_timer, ..
            } if *dodge_buff_timer > 0.0 => SASUKE_CRIT_BONUS,
            CharacterState::Naruto
            | CharacterState::Sasuke { .. }
            | CharacterState::Gaara { .. }
            | CharacterState::Sakura { .. } => 0.0,
        }
    }

    /// Attacker-side multiplier applied after the crit roll
    pub fn apply_outgoing(&mut self, damage: f64) -> f64 {
        match self {
            CharacterState::Sakura { meter } if *meter >= SAKURA_METER_MAX => {
                *meter = 0.0;
                log::debug!("sakura burst consumed");
                damage * SAKURA_BURST_MULTIPLIER
            }
            CharacterState::Naruto
            | CharacterState::Sasuke { .. }
            | CharacterState::Gaara { .. }
            | CharacterState::Sakura { .. } => damage,
        }
    }

    /// Resource charge on any incoming hit attempt that got past invincibility
    pub fn charge_on_hit(&mut self) {
        match self {
            CharacterState::Sakura { meter } => {
                *meter = (*meter + SAKURA_METER_PER_HIT).min(SAKURA_METER_MAX);
            }
            CharacterState::Naruto | CharacterState::Sasuke { .. } | CharacterState::Gaara { .. } => {}
        }
    }

    /// Dodge check; draws from the stream only when the dodge is available
    pub fn try_dodge<R: CombatRng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match self {
            CharacterState::Sasuke {
                dodge_buff_timer,
                sharingan_cooldown,
            } => {
                if *dodge_buff_timer > 0.0 || *sharingan_cooldown > 0.0 {
                    return false;
                }
                if rng.next_f64() < SASUKE_DODGE_CHANCE {
                    *sharingan_cooldown = SASUKE_SHARINGAN_COOLDOWN;
                    *dodge_buff_timer = SASUKE_DODGE_BUFF;
                    return true;
                }
                false
            }
            CharacterState::Naruto | CharacterState::Gaara { .. } | CharacterState::Sakura { .. } => {
                false
            }
        }
    }

    /// Shield absorption; returns the damage left over for hp, or `None`
    /// when no shield is up
    pub fn absorb(&mut self, amount: f64) -> Option<f64> {
        match self {
            CharacterState::Gaara {
                shield_hp,
                shield_regen_timer,
                ..
            } if *shield_hp > 0.0 => {
                let absorbed = shield_hp.min(amount);
                *shield_hp -= absorbed;
                *shield_regen_timer = 0.0;
                if *shield_hp <= 0.0 {
                    log::debug!("gaara shield broken");
                }
                Some(amount - absorbed)
            }
            CharacterState::Naruto
            | CharacterState::Sasuke { .. }
            | CharacterState::Gaara { .. }
            | CharacterState::Sakura { .. } => None,
        }
    }

    /// Advance per-character timers by one tick
    pub fn tick_timers(&mut self, dt: f64, tuning: &Tuning) {
        match self {
            CharacterState::Sasuke {
                dodge_buff_timer,
                sharingan_cooldown,
            } => {
                *dodge_buff_timer = (*dodge_buff_timer - dt).max(0.0);
                *sharingan_cooldown = (*sharingan_cooldown - dt).max(0.0);
            }
            CharacterState::Gaara {
                shield_hp,
                shield_max,
                shield_regen_timer,
            } => {
                *shield_regen_timer += dt;
                if *shield_regen_timer >= tuning.gaara_shield_regen_delay && *shield_hp < *shield_max {
                    *shield_hp = (*shield_hp + tuning.gaara_shield_regen_rate * dt).min(*shield_max);
                }
            }
            CharacterState::Naruto | CharacterState::Sakura { .. } => {}
        }
    }
}

/// Static definition of a playable character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDef {
    pub character: Character,
    pub display_name: String,
    pub max_hp: f64,
    pub move_speed: f64,
    pub radius: f64,
    pub stats: Stats,
}

/// Lookup table of every playable character, built once per match
#[derive(Debug, Clone)]
pub struct CharacterRegistry {
    defs: BTreeMap<Character, CharacterDef>,
}

impl Default for CharacterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(CharacterDef {
            character: Character::Naruto,
            display_name: "Naruto".into(),
            max_hp: 120.0,
            move_speed: 160.0,
            radius: 14.0,
            stats: Stats {
                damage_mult: 1.1,
                ..Stats::default()
            },
        });
        registry.register(CharacterDef {
            character: Character::Sasuke,
            display_name: "Sasuke".into(),
            max_hp: 90.0,
            move_speed: 180.0,
            radius: 13.0,
            stats: Stats {
                crit_chance: 0.1,
                ..Stats::default()
            },
        });
        registry.register(CharacterDef {
            character: Character::Sakura,
            display_name: "Sakura".into(),
            max_hp: 100.0,
            move_speed: 150.0,
            radius: 13.0,
            stats: Stats {
                knockback: 1.5,
                ..Stats::default()
            },
        });
        registry.register(CharacterDef {
            character: Character::Gaara,
            display_name: "Gaara".into(),
            max_hp: 100.0,
            move_speed: 130.0,
            radius: 15.0,
            stats: Stats {
                area_mult: 1.25,
                ..Stats::default()
            },
        });
        registry
    }
}

impl CharacterRegistry {
    pub fn empty() -> Self {
        Self {
            defs: BTreeMap::new(),
        }
    }

    /// Add or replace a definition
    pub fn register(&mut self, def: CharacterDef) {
        self.defs.insert(def.character, def);
    }

    pub fn get(&self, character: Character) -> Option<&CharacterDef> {
        self.defs.get(&character)
    }

    /// Lookup by string tag (character select hands us names)
    pub fn lookup(&self, tag: &str) -> Option<&CharacterDef> {
        Character::from_str(tag).and_then(|c| self.get(c))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Build a player for `character`, or an unaffiliated player when the
    /// character is `None` or not registered
    pub fn spawn_player(
        &self,
        id: u32,
        character: Option<Character>,
        pos: DVec2,
        tuning: &Tuning,
    ) -> Player {
        let def = character.and_then(|c| self.get(c));
        let mut player = Player::new(id, pos);
        if let Some(def) = def {
            player.hp = def.max_hp;
            player.max_hp = def.max_hp;
            player.move_speed = def.move_speed;
            player.shape = Shape::circle(def.radius);
            player.stats = def.stats.clone();
            player.char_state = Some(CharacterState::initial(def.character, tuning));
        }
        player
    }
}
