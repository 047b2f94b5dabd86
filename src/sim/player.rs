/// Player controller: movement, power states, damage, death, flag slide.
///
/// Per tick in `Playing` mode:
///   1. Horizontal acceleration / friction, speed clamp
///   2. Jump (fresh press while grounded)
///   3. Gravity
///   4. Collision resolve (head hits forwarded to `blocks`)
///   5. Screen / level edge clamp
///   6. Timers
///   7. Lava and kill plane
///   8. Coin tiles
///   9. Flagpole
///  10. Fire
///
/// Death is checked before anything that could merely hurt, so a tick that
/// both damages and kills the player resolves as a single death.

use crate::domain::entity::{FrameInput, Facing, Fireball, ItemKind, PlayerMode, PowerState};
use crate::domain::grid::TILE;
use crate::domain::physics::{self, Blocked};
use crate::domain::rules::{self, *};
use crate::domain::tile::Tile;
use super::blocks;
use super::event::GameEvent;
use super::world::WorldState;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn update_player(world: &mut WorldState, input: FrameInput, events: &mut Vec<GameEvent>) {
    match world.player.mode {
        PlayerMode::Playing => {}
        PlayerMode::Dying => {
            let p = &mut world.player;
            p.vy = (p.vy + world.physics.gravity).min(world.physics.max_fall);
            p.y += p.vy;
            return;
        }
        PlayerMode::FlagSliding => {
            resolve_flag_slide(world, events);
            return;
        }
        PlayerMode::LevelComplete => return,
    }

    resolve_walk(world, input);
    resolve_jump(world, input, events);
    resolve_motion(world, events);
    if world.player.mode != PlayerMode::Playing {
        return;
    }
    resolve_timers(world);
    if resolve_hazards(world, events) {
        return;
    }
    resolve_coins(world, events);
    if resolve_flagpole(world, events) {
        return;
    }
    resolve_fire(world, input, events);
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

fn resolve_walk(world: &mut WorldState, input: FrameInput) {
    let phys = &world.physics;
    let p = &mut world.player;

    let dir = match (input.contains(FrameInput::LEFT), input.contains(FrameInput::RIGHT)) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };
    let top_speed = if input.contains(FrameInput::RUN) { phys.run_speed } else { phys.walk_speed };
    let accel = if p.grounded { phys.accel } else { phys.air_accel };

    let before = p.vx.abs();
    if dir != 0.0 {
        if p.vx * dir < 0.0 {
            p.vx += dir * (phys.decel + accel);
        } else {
            p.vx += dir * accel;
        }
        p.facing = if dir < 0.0 { Facing::Left } else { Facing::Right };
    } else if p.grounded {
        p.vx *= phys.friction;
        if p.vx.abs() < 0.1 {
            p.vx = 0.0;
        }
    }

    // Letting go of run bleeds speed instead of snapping to walk speed.
    if p.vx.abs() > top_speed {
        let limit = if before > top_speed { (before - phys.decel).max(top_speed) } else { top_speed };
        p.vx = p.vx.signum() * p.vx.abs().min(limit);
    }
}

fn resolve_jump(world: &mut WorldState, input: FrameInput, events: &mut Vec<GameEvent>) {
    let p = &mut world.player;
    let pressed = input.contains(FrameInput::JUMP);
    let fresh = pressed && !p.jump_held;
    p.jump_held = pressed;

    if fresh && p.grounded {
        p.vy = if input.contains(FrameInput::RUN) { -world.physics.high_jump } else { -world.physics.jump_power };
        p.grounded = false;
        events.push(GameEvent::Jumped);
    }
}

fn resolve_motion(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let phys = &world.physics;
    let p = &mut world.player;
    p.vy = (p.vy + phys.gravity).min(phys.max_fall);

    let m = physics::resolve(&world.grid, p.bounds(), p.vx, p.vy);
    p.x = m.bounds.x;
    p.y = m.bounds.y;
    if m.hit_wall() {
        p.vx = 0.0;
    }
    p.grounded = m.grounded();
    if p.grounded {
        p.vy = 0.0;
        p.stomp_chain = 0;
    }
    if m.blocked.contains(Blocked::ABOVE) {
        p.vy = 0.0;
    }
    if p.vx != 0.0 && p.grounded {
        p.anim = p.anim.wrapping_add(1);
    }

    // Edges: left side of the view, right side of the level.
    let min_x = world.camera.x;
    let max_x = world.grid.pixel_width() - p.width();
    if p.x < min_x {
        p.x = min_x;
        p.vx = p.vx.max(0.0);
    } else if p.x > max_x {
        p.x = max_x;
        p.vx = p.vx.min(0.0);
    }

    if let Some((col, row)) = m.head_hit {
        blocks::hit_block(world, col, row, events);
    }
}

fn resolve_timers(world: &mut WorldState) {
    let p = &mut world.player;
    p.invuln_timer = p.invuln_timer.saturating_sub(1);
    p.star_timer = p.star_timer.saturating_sub(1);
    p.fire_cooldown = p.fire_cooldown.saturating_sub(1);
}

// ══════════════════════════════════════════════════════════════
// Terrain interactions
// ══════════════════════════════════════════════════════════════

/// Lava and the kill plane. Returns `true` if the player died.
fn resolve_hazards(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let b = world.player.bounds();
    let in_lava = physics::find_overlap(&world.grid, &b, Tile::is_lethal).is_some();
    let fell = b.y > world.grid.pixel_height();
    if in_lava || fell {
        log::debug!("player died: {}", if in_lava { "lava" } else { "fell" });
        kill(world, events);
        return true;
    }
    false
}

fn resolve_coins(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let b = world.player.bounds();
    let (c0, c1) = b.col_span();
    let (r0, r1) = b.row_span();
    for row in r0.max(0)..=r1 {
        for col in c0.max(0)..=c1 {
            if world.grid.tile_at(col, row) != Tile::Coin {
                continue;
            }
            let (c, r) = (col as usize, row as usize);
            if world.blocks.collect(c, r) {
                events.push(GameEvent::CoinCollected);
                world.award(COIN_POINTS, c as f32 * TILE, r as f32 * TILE, events);
            }
        }
    }
}

/// Returns `true` if the player grabbed the pole this tick.
fn resolve_flagpole(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let b = world.player.bounds();
    // The pole counts at any height, so a jump clearing its top still grabs it.
    let (c0, c1) = b.col_span();
    let flag = world.flag_column as i32;
    let col = if (c0..=c1).contains(&flag) && b.bottom() <= world.ground_y() {
        world.flag_column
    } else if let Some((col, _)) = physics::find_overlap(&world.grid, &b, Tile::is_flagpole) {
        col as usize
    } else {
        return false;
    };
    let points = rules::flag_points(b.y, world.ground_row);
    let p = &mut world.player;
    let x = p.x;
    p.mode = PlayerMode::FlagSliding;
    p.flag_x = col as f32 * TILE + TILE / 2.0;
    p.x = p.flag_x - p.width();
    p.vx = 0.0;
    p.vy = 0.0;
    p.flag_timer = 0;
    p.flag_landed = false;
    p.star_timer = 0;

    log::debug!("flagpole grabbed at y={:.0}, {points} points", b.y);
    events.push(GameEvent::FlagTouched { points });
    world.award(points, x, b.y, events);
    true
}

fn resolve_flag_slide(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let target = world.ground_y() - world.player.height();
    let delay = world.timing.flag_delay_ticks;
    let p = &mut world.player;
    p.vx = 0.0;

    if !p.flag_landed {
        p.y = (p.y + FLAG_SLIDE_SPEED).min(target);
        if p.y >= target {
            p.flag_landed = true;
            p.grounded = true;
        } else {
            return;
        }
    } else {
        p.flag_timer += 1;
    }

    if p.flag_landed && p.flag_timer >= delay {
        p.mode = PlayerMode::LevelComplete;
        events.push(GameEvent::LevelComplete);
    }
}

// ══════════════════════════════════════════════════════════════
// Fire
// ══════════════════════════════════════════════════════════════

fn resolve_fire(world: &mut WorldState, input: FrameInput, events: &mut Vec<GameEvent>) {
    let pressed = input.contains(FrameInput::FIRE);
    let fresh = pressed && !world.player.fire_held;
    world.player.fire_held = pressed;

    let p = &world.player;
    if !fresh || p.power != PowerState::Fire || p.fire_cooldown > 0 {
        return;
    }
    if world.fireballs.iter().filter(|f| f.active).count() >= MAX_FIREBALLS {
        return;
    }
    let x = match p.facing {
        Facing::Right => p.x + p.width(),
        Facing::Left => p.x - FIREBALL_SIZE,
    };
    let y = p.y + p.height() / 3.0;
    world.fireballs.push(Fireball::launch(x, y, p.facing));
    world.player.fire_cooldown = world.timing.fire_cooldown_ticks;
    events.push(GameEvent::FireballThrown);
}

// ══════════════════════════════════════════════════════════════
// Damage / death / pickups
// ══════════════════════════════════════════════════════════════

/// A hit from an enemy. Ignored while star-powered or invulnerable.
pub fn damage(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let p = &world.player;
    if p.mode != PlayerMode::Playing || p.has_star() || p.is_invulnerable() {
        return;
    }
    match p.power.downgrade() {
        Some(lower) => {
            let from = p.power;
            let p = &mut world.player;
            p.set_power(lower);
            p.invuln_timer = world.timing.invuln_ticks;
            log::debug!("player hit: {from:?} -> {lower:?}");
            events.push(GameEvent::PowerChanged { from, to: lower });
        }
        None => kill(world, events),
    }
}

/// Kill the player regardless of power. Emits `PlayerDied` exactly once.
pub fn kill(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let p = &mut world.player;
    if p.mode != PlayerMode::Playing {
        return;
    }
    p.mode = PlayerMode::Dying;
    p.vx = 0.0;
    p.vy = -DEATH_HOP;
    p.star_timer = 0;
    p.invuln_timer = 0;
    events.push(GameEvent::PlayerDied);
}

pub fn collect_item(world: &mut WorldState, kind: ItemKind, events: &mut Vec<GameEvent>) {
    let (x, y) = (world.player.x, world.player.y);
    match kind {
        ItemKind::Mushroom => upgrade(world, PowerState::Big, events),
        ItemKind::FireFlower => upgrade(world, PowerState::Fire, events),
        ItemKind::Star => {
            world.player.star_timer = world.timing.star_ticks;
            events.push(GameEvent::StarStarted);
        }
        ItemKind::OneUp => {
            events.push(GameEvent::ExtraLife);
            return;
        }
    }
    world.award(POWERUP_POINTS, x, y, events);
}

/// Raise power to at least `to`; never lowers it.
fn upgrade(world: &mut WorldState, to: PowerState, events: &mut Vec<GameEvent>) {
    let from = world.player.power;
    if to <= from {
        return;
    }
    world.player.set_power(to);
    log::debug!("power up: {from:?} -> {to:?}");
    events.push(GameEvent::PowerChanged { from, to });
}
