//! Shinobi Clash headless replay
//!
//! Plays a scripted match twice from the same seed and checks that both runs
//! end in byte-identical state. Pass a tuning JSON file as the first argument
//! to replay with overrides.

#[cfg(not(target_arch = "wasm32"))]
mod replay {
    use std::process::ExitCode;

    use glam::DVec2;
    use shinobi_clash::Tuning;
    use shinobi_clash::consts::SIM_DT;
    use shinobi_clash::sim::{
        Character, CharacterRegistry, GameEvent, GameState, PlayerAction, PlayerIntent, TickInput,
        tick,
    };

    const SEED: u32 = 0x5EED_2024;
    const TICKS: u64 = 60 * 60;

    fn load_tuning() -> Result<Tuning, String> {
        let Some(path) = std::env::args().nth(1) else {
            return Ok(Tuning::default());
        };
        let json = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
        Tuning::from_json(&json).map_err(|e| format!("{path}: {e}"))
    }

    /// Each player circles and cycles through its three actions
    fn script(t: u64, state: &GameState) -> TickInput {
        let intents = state
            .players
            .iter()
            .map(|p| {
                let phase = t as f64 / 90.0 + p.id as f64;
                let action = match (t + 7 * p.id as u64) % 45 {
                    0 => Some(PlayerAction::ChainLightning),
                    15 => Some(PlayerAction::PlaceHazard {
                        offset: DVec2::new(phase.cos(), phase.sin()) * 40.0,
                        roots: p.id % 2 == 0,
                        bleed: 1,
                    }),
                    30 => Some(PlayerAction::Fire {
                        aim: DVec2::new(-phase.sin(), phase.cos()),
                    }),
                    _ => None,
                };
                PlayerIntent {
                    player_id: p.id,
                    move_dir: DVec2::new(-phase.sin(), phase.cos()),
                    action,
                }
            })
            .collect();
        TickInput { intents }
    }

    struct Summary {
        kills: usize,
        downs: usize,
        snapshot: String,
    }

    fn play(tuning: &Tuning) -> Result<Summary, serde_json::Error> {
        let registry = CharacterRegistry::default();
        let roster: Vec<Option<Character>> = Character::ALL.iter().copied().map(Some).collect();
        let mut state = GameState::new(SEED, tuning.clone(), &registry, &roster);

        let mut kills = 0;
        let mut downs = 0;
        for t in 0..TICKS {
            let input = script(t, &state);
            tick(&mut state, &input, SIM_DT);
            for event in &state.events {
                match event {
                    GameEvent::EnemyKilled { .. } => kills += 1,
                    GameEvent::PlayerDowned { .. } => downs += 1,
                    _ => {}
                }
            }
        }

        Ok(Summary {
            kills,
            downs,
            snapshot: serde_json::to_string(&state)?,
        })
    }

    pub fn run() -> ExitCode {
        env_logger::init();

        let tuning = match load_tuning() {
            Ok(t) => t,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        };

        let (a, b) = match (play(&tuning), play(&tuning)) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                log::error!("snapshot failed: {e}");
                return ExitCode::FAILURE;
            }
        };

        log::info!(
            "{TICKS} ticks from seed {SEED:#x}: {} kills, {} downs",
            a.kills,
            a.downs
        );

        if a.snapshot != b.snapshot {
            log::error!("replays diverged");
            return ExitCode::FAILURE;
        }
        log::info!("replays match ({} bytes of state)", a.snapshot.len());
        ExitCode::SUCCESS
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    replay::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
