/// Per-tick update rules for everything that is not the player.
///
/// Each function advances one entity by one tick against the static grid.
/// Interactions between entities (stomps, shells, fireballs hitting
/// enemies) are not handled here; see `sim::contact`.

use crate::config::PhysicsConfig;

use super::entity::{Effect, EffectKind, Enemy, EnemyKind, EnemyState, Facing, Fireball, Item, ItemKind, PopupPhase};
use super::grid::TileGrid;
use super::physics::{self, has_footing_at};
use super::rules::*;

#[inline]
fn fall(vy: f32, physics: &PhysicsConfig) -> f32 {
    (vy + physics.gravity).min(physics.max_fall)
}

fn below_kill_plane(grid: &TileGrid, y: f32) -> bool {
    y > grid.pixel_height() + KILL_MARGIN
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

/// Advance one enemy. `player_cx` is the player's horizontal centre, used
/// by piranhas to stay put while the player is next to the pipe.
pub fn update_enemy(e: &mut Enemy, grid: &TileGrid, physics: &PhysicsConfig, player_cx: f32) {
    match e.state {
        EnemyState::Patrol => patrol(e, grid, physics),
        EnemyState::Squashed { remaining } => {
            let remaining = remaining.saturating_sub(1);
            e.state = if remaining == 0 { EnemyState::Dead } else { EnemyState::Squashed { remaining } };
        }
        EnemyState::ShellIdle { revive } => {
            settle(e, grid, physics);
            let revive = revive.saturating_sub(1);
            if revive == 0 {
                e.leave_shell();
            } else {
                e.state = EnemyState::ShellIdle { revive };
            }
        }
        EnemyState::ShellSliding => slide(e, grid, physics),
        EnemyState::Lurking { phase, remaining, top } => lurk(e, phase, remaining, top, player_cx),
        EnemyState::Knocked => {
            e.vy = fall(e.vy, physics);
            e.x += e.vx;
            e.y += e.vy;
        }
        EnemyState::Dead => {}
    }

    if e.state != EnemyState::Dead && below_kill_plane(grid, e.y) {
        e.state = EnemyState::Dead;
    }
}

/// Walk at constant speed, turning around at walls and ledges.
fn patrol(e: &mut Enemy, grid: &TileGrid, physics: &PhysicsConfig) {
    e.vx = e.facing.sign() * e.speed;
    e.vy = fall(e.vy, physics);
    let m = physics::resolve(grid, e.bounds(), e.vx, e.vy);
    e.x = m.bounds.x;
    e.y = m.bounds.y;
    e.grounded = m.grounded();
    if e.grounded {
        e.vy = 0.0;
    }

    if m.hit_wall() {
        e.facing = e.facing.flip();
        return;
    }
    if e.grounded {
        let probe = match e.facing {
            Facing::Right => m.bounds.right() + 1.0,
            Facing::Left => m.bounds.x - 1.0,
        };
        if !has_footing_at(grid, probe, m.bounds.bottom()) {
            e.facing = e.facing.flip();
        }
    }
}

/// Idle shells still obey gravity.
fn settle(e: &mut Enemy, grid: &TileGrid, physics: &PhysicsConfig) {
    e.vy = fall(e.vy, physics);
    let m = physics::resolve(grid, e.bounds(), 0.0, e.vy);
    e.y = m.bounds.y;
    e.grounded = m.grounded();
    if e.grounded {
        e.vy = 0.0;
    }
}

/// A kicked shell: fast, no ledge checks, rebounds off walls.
fn slide(e: &mut Enemy, grid: &TileGrid, physics: &PhysicsConfig) {
    e.vy = fall(e.vy, physics);
    let m = physics::resolve(grid, e.bounds(), e.vx, e.vy);
    e.x = m.bounds.x;
    e.y = m.bounds.y;
    e.grounded = m.grounded();
    if e.grounded {
        e.vy = 0.0;
    }
    if m.hit_wall() {
        e.vx = -e.vx;
        e.facing = e.facing.flip();
    }
}

fn lurk(e: &mut Enemy, phase: PopupPhase, remaining: u32, top: f32, player_cx: f32) {
    let (phase, remaining) = match phase {
        PopupPhase::Hidden => {
            let remaining = remaining.saturating_sub(1);
            let shy = (player_cx - e.bounds().center_x()).abs() < PIRANHA_SHY_DISTANCE;
            if remaining == 0 && !shy {
                (PopupPhase::Rising, 0)
            } else {
                (PopupPhase::Hidden, remaining)
            }
        }
        PopupPhase::Rising => {
            e.y = (e.y - PIRANHA_SPEED).max(top - e.h);
            if e.y <= top - e.h {
                (PopupPhase::Exposed, PIRANHA_EXPOSED_TICKS)
            } else {
                (PopupPhase::Rising, 0)
            }
        }
        PopupPhase::Exposed => {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                (PopupPhase::Sinking, 0)
            } else {
                (PopupPhase::Exposed, remaining)
            }
        }
        PopupPhase::Sinking => {
            e.y = (e.y + PIRANHA_SPEED).min(top);
            if e.y >= top {
                (PopupPhase::Hidden, PIRANHA_HIDDEN_TICKS)
            } else {
                (PopupPhase::Sinking, 0)
            }
        }
    };
    e.state = EnemyState::Lurking { phase, remaining, top };
}

/// Wake a dormant enemy once it is close to the visible window.
pub fn maybe_wake(e: &mut Enemy, camera_x: f32, view_width: f32) {
    if e.awake {
        return;
    }
    if e.x < camera_x + view_width + WAKE_MARGIN {
        e.awake = true;
        if e.kind != EnemyKind::Piranha {
            e.vx = e.facing.sign() * e.speed;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Items
// ══════════════════════════════════════════════════════════════

pub fn update_item(item: &mut Item, grid: &TileGrid, physics: &PhysicsConfig) {
    if !item.active {
        return;
    }
    item.vy = fall(item.vy, physics);
    let m = physics::resolve(grid, item.bounds(), item.vx, item.vy);
    item.x = m.bounds.x;
    item.y = m.bounds.y;
    if m.hit_wall() {
        item.vx = -item.vx;
    }
    if m.grounded() {
        item.vy = if item.kind == ItemKind::Star { -STAR_BOUNCE } else { 0.0 };
    } else if m.blocked.contains(physics::Blocked::ABOVE) {
        item.vy = 0.0;
    }
    if below_kill_plane(grid, item.y) {
        item.active = false;
    }
}

// ══════════════════════════════════════════════════════════════
// Fireballs
// ══════════════════════════════════════════════════════════════

/// Advance a fireball. Returns `true` if it burst against a wall this tick.
pub fn update_fireball(f: &mut Fireball, grid: &TileGrid, physics: &PhysicsConfig) -> bool {
    if !f.active {
        return false;
    }
    f.lifetime = f.lifetime.saturating_sub(1);
    if f.lifetime == 0 {
        f.active = false;
        return false;
    }

    f.vy = fall(f.vy, physics);
    let impact = f.vy;
    let m = physics::resolve(grid, f.bounds(), f.vx, f.vy);
    f.x = m.bounds.x;
    f.y = m.bounds.y;

    if m.hit_wall() {
        f.active = false;
        return true;
    }
    if m.grounded() {
        f.bounces += 1;
        if f.bounces > FIREBALL_MAX_BOUNCES {
            f.active = false;
            return false;
        }
        f.vy = -(impact.abs() * FIREBALL_BOUNCE_DAMPING).max(FIREBALL_MIN_BOUNCE);
    } else if m.blocked.contains(physics::Blocked::ABOVE) {
        f.vy = 0.0;
    }

    if f.x + FIREBALL_SIZE < 0.0 || f.x > grid.pixel_width() || below_kill_plane(grid, f.y) {
        f.active = false;
    }
    false
}

// ══════════════════════════════════════════════════════════════
// Effects
// ══════════════════════════════════════════════════════════════

/// Advance an effect. Returns `false` once it has expired.
pub fn update_effect(fx: &mut Effect, physics: &PhysicsConfig) -> bool {
    match fx.kind {
        EffectKind::Particle | EffectKind::CoinBounce => {
            fx.vy += physics.gravity;
        }
        EffectKind::ScorePopup { .. } => {}
    }
    fx.x += fx.vx;
    fx.y += fx.vy;
    fx.remaining = fx.remaining.saturating_sub(1);
    fx.remaining > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::EnemySpawn;
    use crate::domain::grid::{grid_from_rows, TILE};

    fn walker(col: usize, row: usize) -> Enemy {
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Walker, col, row, speed: WALKER_SPEED });
        e.awake = true;
        e
    }

    fn run(e: &mut Enemy, grid: &TileGrid, ticks: usize) {
        let p = PhysicsConfig::default();
        for _ in 0..ticks {
            update_enemy(e, grid, &p, -1000.0);
        }
    }

    #[test]
    fn walker_turns_at_walls() {
        let g = grid_from_rows(&[
            "      ",
            "#    #",
            "######",
        ]);
        let mut e = walker(2, 1);
        let mut turned = false;
        let p = PhysicsConfig::default();
        for _ in 0..400 {
            let before = e.facing;
            update_enemy(&mut e, &g, &p, -1000.0);
            turned |= e.facing != before;
            assert!(e.x >= TILE && e.x + e.w <= 5.0 * TILE);
        }
        assert!(turned);
        assert_eq!(e.y + e.h, 2.0 * TILE);
    }

    #[test]
    fn walker_turns_at_ledges() {
        let g = grid_from_rows(&[
            "      ",
            "      ",
            "###   ",
        ]);
        let mut e = walker(1, 1);
        e.facing = Facing::Right;
        run(&mut e, &g, 400);
        assert_eq!(e.y + e.h, 2.0 * TILE, "walker fell off the ledge");
        assert!(e.x + e.w <= 3.0 * TILE);
    }

    #[test]
    fn squashed_walker_expires() {
        let g = grid_from_rows(&["   ", "###"]);
        let mut e = walker(1, 0);
        e.state = EnemyState::Squashed { remaining: SQUASH_TICKS };
        run(&mut e, &g, SQUASH_TICKS as usize - 1);
        assert!(matches!(e.state, EnemyState::Squashed { remaining: 1 }));
        run(&mut e, &g, 1);
        assert_eq!(e.state, EnemyState::Dead);
    }

    #[test]
    fn idle_shell_revives() {
        let g = grid_from_rows(&["   ", "   ", "###"]);
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Koopa, col: 1, row: 1, speed: 1.0 });
        e.enter_shell();
        run(&mut e, &g, SHELL_REVIVE_TICKS as usize);
        assert_eq!(e.state, EnemyState::Patrol);
        assert_eq!(e.h, KOOPA_HEIGHT);
        assert_eq!(e.y + e.h, 2.0 * TILE);
    }

    #[test]
    fn sliding_shell_rebounds_off_wall() {
        let g = grid_from_rows(&[
            "          ",
            "         #",
            "##########",
        ]);
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Koopa, col: 5, row: 1, speed: 1.0 });
        e.enter_shell();
        e.kick(Facing::Right);
        run(&mut e, &g, 15);
        assert!(e.vx < 0.0);
        assert_eq!(e.facing, Facing::Left);
        assert!(e.x + e.w <= 9.0 * TILE);
    }

    #[test]
    fn knocked_enemy_leaves_through_the_floor() {
        let g = grid_from_rows(&["   ", "###"]);
        let mut e = walker(1, 0);
        e.knock(Facing::Right);
        run(&mut e, &g, 200);
        assert_eq!(e.state, EnemyState::Dead);
    }

    #[test]
    fn piranha_cycles_through_phases() {
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Piranha, col: 4, row: 10, speed: 1.0 });
        let top = 10.0 * TILE;
        let g = TileGrid::new(10, 15);
        let p = PhysicsConfig::default();
        let far = -1000.0;

        for _ in 0..PIRANHA_HIDDEN_TICKS {
            update_enemy(&mut e, &g, &p, far);
        }
        assert!(matches!(e.state, EnemyState::Lurking { phase: PopupPhase::Rising, .. }));

        let rise = (PIRANHA_HEIGHT / PIRANHA_SPEED) as usize;
        for _ in 0..rise {
            update_enemy(&mut e, &g, &p, far);
        }
        assert!(matches!(e.state, EnemyState::Lurking { phase: PopupPhase::Exposed, .. }));
        assert_eq!(e.y, top - e.h);

        for _ in 0..PIRANHA_EXPOSED_TICKS as usize + rise {
            update_enemy(&mut e, &g, &p, far);
        }
        assert!(e.is_hidden());
        assert_eq!(e.y, top);
    }

    #[test]
    fn piranha_stays_hidden_with_player_beside_pipe() {
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Piranha, col: 4, row: 10, speed: 1.0 });
        let g = TileGrid::new(10, 15);
        let p = PhysicsConfig::default();
        let near = e.bounds().center_x() + 10.0;
        for _ in 0..PIRANHA_HIDDEN_TICKS * 3 {
            update_enemy(&mut e, &g, &p, near);
        }
        assert!(e.is_hidden());
    }

    #[test]
    fn wake_near_camera() {
        let mut e = walker(40, 10);
        e.awake = false;
        maybe_wake(&mut e, 0.0, 800.0);
        assert!(!e.awake);
        maybe_wake(&mut e, 600.0, 800.0);
        assert!(e.awake);
    }

    #[test]
    fn star_rebounds_on_landing() {
        let g = grid_from_rows(&["    ", "    ", "####"]);
        let p = PhysicsConfig::default();
        let mut star = Item::pop_from(ItemKind::Star, 1, 2, Facing::Right);
        star.vx = 0.0;
        let mut bounced = false;
        for _ in 0..60 {
            update_item(&mut star, &g, &p);
            bounced |= star.vy == -STAR_BOUNCE;
        }
        assert!(bounced);
        assert!(star.active);
    }

    #[test]
    fn mushroom_reverses_on_wall() {
        let g = grid_from_rows(&[
            "    #",
            "#####",
        ]);
        let p = PhysicsConfig::default();
        let mut m = Item::pop_from(ItemKind::Mushroom, 2, 1, Facing::Right);
        m.vy = 0.0;
        for _ in 0..60 {
            update_item(&mut m, &g, &p);
        }
        assert!(m.vx < 0.0);
    }

    #[test]
    fn fireball_bounces_with_damping() {
        let g = grid_from_rows(&[
            "                                        ",
            "                                        ",
            "########################################",
        ]);
        let p = PhysicsConfig::default();
        let mut f = Fireball::launch(10.0, 40.0, Facing::Right);
        let mut peaks = vec![];
        for _ in 0..100 {
            let before = f.bounces;
            update_fireball(&mut f, &g, &p);
            if !f.active {
                break;
            }
            if f.bounces > before {
                peaks.push(-f.vy);
            }
        }
        assert!(!peaks.is_empty());
        assert!(peaks.iter().all(|&v| v >= FIREBALL_MIN_BOUNCE));
    }

    #[test]
    fn fireball_bursts_on_wall() {
        let g = grid_from_rows(&[
            "    #",
            "    #",
            "#####",
        ]);
        let p = PhysicsConfig::default();
        let mut f = Fireball::launch(60.0, 36.0, Facing::Right);
        let mut burst = false;
        for _ in 0..20 {
            burst |= update_fireball(&mut f, &g, &p);
        }
        assert!(burst);
        assert!(!f.active);
    }

    #[test]
    fn fireball_lifetime_runs_out() {
        let g = TileGrid::new(400, 15);
        let p = PhysicsConfig { gravity: 0.0, ..PhysicsConfig::default() };
        let mut f = Fireball::launch(0.0, 100.0, Facing::Right);
        f.vy = 0.0;
        f.vx = 0.5;
        for _ in 0..FIREBALL_LIFETIME {
            update_fireball(&mut f, &g, &p);
        }
        assert!(!f.active);
    }

    #[test]
    fn effects_expire() {
        let p = PhysicsConfig::default();
        let mut fx = Effect::popup(0.0, 100.0, 200);
        let mut ticks = 0;
        while update_effect(&mut fx, &p) {
            ticks += 1;
        }
        assert_eq!(ticks, POPUP_TICKS - 1);
        assert!(fx.y < 100.0);
    }
}
