/// WorldState: everything one running level owns.
///
/// ## Tile Architecture
///
/// Two layers, see `domain::grid`:
///   - `grid`:   tile types. Only block hits mutate it, one way.
///   - `blocks`: sparse per-cell state (bump, spent, collected coin).
///
/// `block_contents` says what each dispensable block holds; whether it has
/// already been handed out lives in `blocks`.
///
/// ## Camera
///
/// World pixels, right-scrolling only. The camera follows the player once
/// they pass `SCROLL_MARGIN` of the view and never scrolls back left.
/// The player is clamped to the left edge of the view.
///
/// Lives, score and the level timer are not here: they belong to
/// `sim::session::Session`, which rebuilds a `WorldState` per attempt.

use std::collections::BTreeMap;

use crate::config::{GameConfig, PhysicsConfig, TimingConfig};
use crate::domain::entity::{Effect, Enemy, Fireball, Item, Player, PowerState};
use crate::domain::grid::{BlockStates, TileGrid};
use super::event::GameEvent;
use super::level::{BlockContent, LevelLayout, LevelType};

/// Visible width in world pixels.
pub const VIEW_WIDTH: f32 = 800.0;
/// Fraction of the view the player may cross before the camera follows.
pub const SCROLL_MARGIN: f32 = 0.42;

#[derive(Clone, Debug)]
pub struct Camera {
    /// World x of the left edge of the view.
    pub x: f32,
    pub view_w: f32,
}

impl Camera {
    pub fn new(view_w: f32) -> Self {
        Camera { x: 0.0, view_w }
    }

    /// Scroll right to keep `target_x` inside the margin. Never scrolls back.
    pub fn follow(&mut self, target_x: f32, world_w: f32) {
        let trigger = self.x + self.view_w * SCROLL_MARGIN;
        if target_x > trigger {
            self.x = target_x - self.view_w * SCROLL_MARGIN;
        }
        self.x = self.x.min((world_w - self.view_w).max(0.0)).max(0.0);
    }

    pub fn right(&self) -> f32 {
        self.x + self.view_w
    }
}

pub struct WorldState {
    // ── Level ──
    pub world: u8,
    pub level: u8,
    pub level_type: LevelType,
    pub ground_row: usize,
    pub flag_column: usize,

    // ── Tile layers ──
    pub grid: TileGrid,
    pub blocks: BlockStates,
    pub block_contents: BTreeMap<(usize, usize), BlockContent>,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub items: Vec<Item>,
    pub fireballs: Vec<Fireball>,
    pub effects: Vec<Effect>,

    // ── Tuning ──
    pub physics: PhysicsConfig,
    pub timing: TimingConfig,

    // ── Meta ──
    pub camera: Camera,
    pub tick: u64,
}

// ── Construction ──

impl WorldState {
    /// Build a fresh attempt at `layout`, the player entering with `power`.
    pub fn load(layout: LevelLayout, power: PowerState, config: &GameConfig) -> Self {
        let ground_row = layout.ground_row();
        let player = Player::at_start(layout.start_column, ground_row, power);
        let enemies = layout.enemies.iter().map(Enemy::spawn).collect();

        log::info!(
            "loaded level {}-{} ({}), start column {}",
            layout.world,
            layout.level,
            layout.level_type.name(),
            layout.start_column
        );

        WorldState {
            world: layout.world,
            level: layout.level,
            level_type: layout.level_type,
            ground_row,
            flag_column: layout.flag_column,
            grid: layout.grid,
            blocks: BlockStates::new(),
            block_contents: layout.block_contents,
            player,
            enemies,
            items: vec![],
            fireballs: vec![],
            effects: vec![],
            physics: config.physics.clone(),
            timing: config.timing.clone(),
            camera: Camera::new(VIEW_WIDTH),
            tick: 0,
        }
    }
}

// ── Shared helpers for the tick passes ──

impl WorldState {
    /// Award points: event for the session, popup for the renderer.
    pub fn award(&mut self, points: u32, x: f32, y: f32, events: &mut Vec<GameEvent>) {
        self.effects.push(Effect::popup(x, y, points));
        events.push(GameEvent::PointsAwarded { points, x, y });
    }

    /// Pixel y of the walking surface.
    pub fn ground_y(&self) -> f32 {
        self.ground_row as f32 * crate::domain::grid::TILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_only_scrolls_right() {
        let mut cam = Camera::new(800.0);
        cam.follow(100.0, 5000.0);
        assert_eq!(cam.x, 0.0);
        cam.follow(1000.0, 5000.0);
        let far = cam.x;
        assert!(far > 0.0);
        assert!(1000.0 - far <= 800.0 * SCROLL_MARGIN + 1e-3);
        cam.follow(200.0, 5000.0);
        assert_eq!(cam.x, far);
    }

    #[test]
    fn camera_stops_at_level_end() {
        let mut cam = Camera::new(800.0);
        cam.follow(10_000.0, 2000.0);
        assert_eq!(cam.x, 1200.0);
    }

    #[test]
    fn load_places_player_on_ground() {
        let layout = super::super::level::generate(1, 2);
        let w = WorldState::load(layout, PowerState::Big, &GameConfig::default());
        assert_eq!(w.player.bottom(), 14.0 * crate::domain::grid::TILE);
        assert_eq!(w.player.power, PowerState::Big);
        assert!(!w.enemies.is_empty());
        assert!(w.enemies.iter().all(|e| !e.awake));
    }
}
