/// Fixed game rules: actor geometry, speeds, point values, jump reach.
///
/// Anything a player might want to retune lives in `config::PhysicsConfig`
/// / `config::TimingConfig` instead. Values here shape level geometry and
/// entity behaviour and are not meant to be changed at runtime.

use crate::config::PhysicsConfig;

use super::grid::TILE;

// ── Player geometry ──

pub const PLAYER_WIDTH: f32 = 24.0;
pub const SMALL_HEIGHT: f32 = 32.0;
pub const BIG_HEIGHT: f32 = 52.0;

/// Pixels per tick the player slides down the flagpole.
pub const FLAG_SLIDE_SPEED: f32 = 3.0;

/// Upward hop when the player dies.
pub const DEATH_HOP: f32 = 10.0;

// ── Enemies ──

pub const WALKER_SPEED: f32 = 1.0;
pub const SHELL_SPEED: f32 = 10.0;
pub const ENEMY_WIDTH: f32 = 28.0;
pub const WALKER_HEIGHT: f32 = 28.0;
pub const KOOPA_HEIGHT: f32 = 40.0;
pub const SHELL_HEIGHT: f32 = 28.0;
pub const PIRANHA_WIDTH: f32 = 24.0;
pub const PIRANHA_HEIGHT: f32 = 44.0;

/// Ticks a squashed walker stays on screen.
pub const SQUASH_TICKS: u32 = 30;
/// Ticks an idle shell waits before the koopa climbs back out.
pub const SHELL_REVIVE_TICKS: u32 = 300;
/// Upward hop of an enemy knocked off the level.
pub const KNOCK_HOP: f32 = 6.0;

pub const PIRANHA_HIDDEN_TICKS: u32 = 90;
pub const PIRANHA_EXPOSED_TICKS: u32 = 60;
pub const PIRANHA_SPEED: f32 = 1.0;
/// A piranha stays in its pipe while the player is this close (pixels).
pub const PIRANHA_SHY_DISTANCE: f32 = 48.0;

/// Extra distance below the grid before an actor counts as gone.
pub const KILL_MARGIN: f32 = 64.0;
/// Enemies wake up once they are this far inside the right screen edge.
pub const WAKE_MARGIN: f32 = 2.0 * TILE;

// ── Items / projectiles ──

pub const ITEM_SIZE: f32 = 28.0;
pub const ITEM_POP: f32 = 5.0;
pub const ITEM_SPEED: f32 = 2.0;
pub const STAR_SPEED: f32 = 3.0;
pub const STAR_BOUNCE: f32 = 9.0;

pub const FIREBALL_SIZE: f32 = 12.0;
pub const FIREBALL_SPEED: f32 = 9.0;
pub const FIREBALL_DROP: f32 = 3.0;
pub const FIREBALL_BOUNCE_DAMPING: f32 = 0.8;
pub const FIREBALL_MIN_BOUNCE: f32 = 4.0;
pub const FIREBALL_MAX_BOUNCES: u32 = 4;
pub const FIREBALL_LIFETIME: u32 = 150;
pub const MAX_FIREBALLS: usize = 2;

// ── Effects ──

pub const POPUP_TICKS: u32 = 45;
pub const COIN_BOUNCE_TICKS: u32 = 30;
pub const PARTICLE_TICKS: u32 = 40;

// ── Level geometry ──

/// Widest pit the generator is allowed to cut, in tiles.
pub const MAX_GAP: usize = 4;
/// Tallest pipe, in tiles (including the lip).
pub const MAX_PIPE_HEIGHT: usize = 4;

// ── Scoring ──

pub const COIN_POINTS: u32 = 200;
pub const POWERUP_POINTS: u32 = 1000;
pub const BRICK_POINTS: u32 = 50;
pub const KICK_POINTS: u32 = 400;
pub const FIRE_KILL_POINTS: u32 = 200;
pub const TIME_BONUS_PER_SECOND: u32 = 50;
pub const COINS_PER_LIFE: u32 = 100;

const MAX_CHAIN_POINTS: u32 = 8000;

/// Points for the `chain`-th consecutive stomp without touching ground.
/// The first stomp scores `base`; each further one doubles, capped.
pub fn chain_points(base: u32, chain: u32) -> u32 {
    let shift = chain.min(7);
    base.saturating_mul(1 << shift).min(MAX_CHAIN_POINTS)
}

/// Flagpole bonus by contact height: higher grabs pay more.
pub fn flag_points(contact_y: f32, ground_row: usize) -> u32 {
    let rows_above = ((ground_row as f32 * TILE - contact_y) / TILE).max(0.0);
    match rows_above as u32 {
        0..=2 => 100,
        3..=4 => 400,
        5..=6 => 800,
        7..=8 => 2000,
        _ => 5000,
    }
}

// ══════════════════════════════════════════════════════════════
// Jump reach
// ══════════════════════════════════════════════════════════════

/// Shape of a jump under the per-tick integration the player uses:
/// velocity is set to `-power`, then every tick gravity is added before
/// the position moves.
#[derive(Clone, Copy, Debug)]
pub struct JumpProfile {
    /// Highest rise above the take-off point, pixels.
    pub apex: f32,
    /// Ticks until the actor is back at take-off height.
    pub airtime: u32,
}

pub fn jump_profile(physics: &PhysicsConfig, power: f32) -> JumpProfile {
    let mut vy = -power;
    let mut y = 0.0f32;
    let mut apex = 0.0f32;
    let mut airtime = 0;
    loop {
        y += vy;
        airtime += 1;
        apex = apex.max(-y);
        vy = (vy + physics.gravity).min(physics.max_fall);
        if y >= 0.0 || airtime > 10_000 {
            break;
        }
    }
    JumpProfile { apex, airtime }
}

/// Horizontal distance covered by a maximal jump at full run speed.
pub fn max_jump_distance(physics: &PhysicsConfig) -> f32 {
    jump_profile(physics, physics.high_jump).airtime as f32 * physics.run_speed
}

/// Highest ledge (pixels) a standing jump can clear.
pub fn max_jump_height(physics: &PhysicsConfig) -> f32 {
    jump_profile(physics, physics.high_jump).apex
}
