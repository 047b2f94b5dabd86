/// Session: everything that outlives a single attempt at a level.
///
/// Owns lives, score, coins, the level timer and the current world/level,
/// and rebuilds the `WorldState` on death and on level advance. The high
/// score lives in memory only and survives `restart`.
///
/// ```text
///   Playing ──PlayerDied──▶ Dying(respawn delay) ──▶ Playing (same level)
///      │                                        └──▶ GameOver (no lives)
///      └──LevelComplete──▶ Playing (next level) / Won (after 8-4)
/// ```

use crate::config::GameConfig;
use crate::domain::entity::{FrameInput, PlayerMode, PowerState};
use crate::domain::rules::{COINS_PER_LIFE, TIME_BONUS_PER_SECOND};
use super::event::GameEvent;
use super::level::{self, generate};
use super::player;
use super::step::step;
use super::world::WorldState;

/// Simulation ticks per game-clock second.
pub const TICKS_PER_SECOND: u32 = 60;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Dying { remaining: u32 },
    GameOver,
    Won,
}

pub struct Session {
    config: GameConfig,
    pub state: WorldState,
    pub phase: Phase,
    pub world: u8,
    pub level: u8,
    pub lives: u32,
    pub score: u32,
    pub high_score: u32,
    pub coins: u32,
    pub time_ticks: u32,
}

impl Session {
    pub fn new(config: GameConfig) -> Self {
        let (world, level) = (config.general.start_world, config.general.start_level);
        let state = WorldState::load(generate(world, level), PowerState::Small, &config);
        Session {
            lives: config.general.lives,
            time_ticks: config.timing.level_time_ticks,
            config,
            state,
            phase: Phase::Playing,
            world,
            level,
            score: 0,
            high_score: 0,
            coins: 0,
        }
    }

    pub fn time_left_secs(&self) -> u32 {
        self.time_ticks.div_ceil(TICKS_PER_SECOND)
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver | Phase::Won)
    }

    /// Advance one tick. Returns the step's events plus any the session
    /// itself raised (time-out death, coin extra life).
    pub fn tick(&mut self, input: FrameInput) -> Vec<GameEvent> {
        match self.phase {
            Phase::GameOver | Phase::Won => return vec![],
            Phase::Dying { remaining } => {
                // Keep the death animation (and the enemies) moving.
                let events = step(&mut self.state, FrameInput::empty());
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.respawn_or_game_over();
                } else {
                    self.phase = Phase::Dying { remaining };
                }
                return events;
            }
            Phase::Playing => {}
        }

        let mut events = step(&mut self.state, input);

        if self.state.player.mode == PlayerMode::Playing {
            self.time_ticks = self.time_ticks.saturating_sub(1);
            if self.time_ticks == 0 {
                log::info!("time up on {}-{}", self.world, self.level);
                player::kill(&mut self.state, &mut events);
            }
        }

        let raised = self.apply(&events);
        events.extend(raised);
        events
    }

    /// Fold score/life/progression events into the session.
    /// Returns events raised as a consequence (extra life from coins).
    pub fn apply(&mut self, events: &[GameEvent]) -> Vec<GameEvent> {
        let mut raised = vec![];
        for e in events {
            match e {
                GameEvent::PointsAwarded { points, .. } => self.score = self.score.saturating_add(*points),
                GameEvent::CoinCollected => {
                    self.coins += 1;
                    if self.coins >= COINS_PER_LIFE {
                        self.coins -= COINS_PER_LIFE;
                        self.lives += 1;
                        raised.push(GameEvent::ExtraLife);
                    }
                }
                GameEvent::ExtraLife => self.lives += 1,
                GameEvent::PlayerDied => self.on_player_death(),
                GameEvent::LevelComplete => self.on_level_complete(),
                _ => {}
            }
        }
        raised
    }

    pub fn on_player_death(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        self.lives = self.lives.saturating_sub(1);
        log::info!("player died on {}-{}, {} lives left", self.world, self.level, self.lives);
        self.phase = Phase::Dying { remaining: self.config.timing.respawn_delay_ticks.max(1) };
    }

    pub fn on_level_complete(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        let bonus = self.time_left_secs() * TIME_BONUS_PER_SECOND;
        self.score = self.score.saturating_add(bonus);
        let power = self.state.player.power;

        match level::next_level(self.world, self.level) {
            Some((w, l)) => {
                log::info!("cleared {}-{} (+{bonus} time bonus), next {w}-{l}", self.world, self.level);
                self.world = w;
                self.level = l;
                self.load(power);
            }
            None => {
                log::info!("cleared the final castle, score {}", self.score);
                self.record_high_score();
                self.phase = Phase::Won;
            }
        }
    }

    fn respawn_or_game_over(&mut self) {
        if self.lives == 0 {
            log::info!("game over, score {}", self.score);
            self.record_high_score();
            self.phase = Phase::GameOver;
            return;
        }
        self.load(PowerState::Small);
    }

    fn load(&mut self, power: PowerState) {
        self.state = WorldState::load(generate(self.world, self.level), power, &self.config);
        self.time_ticks = self.config.timing.level_time_ticks;
        self.phase = Phase::Playing;
    }

    fn record_high_score(&mut self) {
        if self.score > self.high_score {
            log::info!("new high score {}", self.score);
            self.high_score = self.score;
        }
    }

    /// Start over from the configured first level, keeping the high score.
    pub fn restart(&mut self) {
        self.record_high_score();
        let high_score = self.high_score;
        *self = Session::new(self.config.clone());
        self.high_score = high_score;
    }
}
