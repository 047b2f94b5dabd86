/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Player (input, movement, block hits, hazards, pickups on tiles)
///   2. Enemies (wake near camera, per-kind behaviour, removal)
///   3. Items
///   4. Fireballs
///   5. Entity contacts (stomp / damage / fire / shells / items)
///   6. Effects and block bump timers
///   7. Camera
///
/// Lives, score and level progression react to the returned events in
/// `sim::session`; nothing here reads or writes them.

use crate::domain::behavior;
use crate::domain::entity::{Effect, FrameInput, PlayerMode};
use super::contact;
use super::event::GameEvent;
use super::player;
use super::world::WorldState;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    player::update_player(world, input, &mut events);
    resolve_enemies(world);
    resolve_items(world);
    resolve_fireballs(world, &mut events);
    contact::resolve_contacts(world, &mut events);
    resolve_effects(world);
    resolve_camera(world);

    events
}

// ══════════════════════════════════════════════════════════════
// Entity passes
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(world: &mut WorldState) {
    let player_cx = world.player.bounds().center_x();
    let (cam_x, view_w) = (world.camera.x, world.camera.view_w);
    for e in world.enemies.iter_mut() {
        behavior::maybe_wake(e, cam_x, view_w);
        if e.awake {
            behavior::update_enemy(e, &world.grid, &world.physics, player_cx);
        }
    }
    world.enemies.retain(|e| e.state != crate::domain::entity::EnemyState::Dead);
}

fn resolve_items(world: &mut WorldState) {
    for item in world.items.iter_mut() {
        behavior::update_item(item, &world.grid, &world.physics);
    }
    world.items.retain(|it| it.active);
}

fn resolve_fireballs(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for f in world.fireballs.iter_mut() {
        if behavior::update_fireball(f, &world.grid, &world.physics) {
            events.push(GameEvent::FireballBurst { x: f.x, y: f.y });
            world.effects.push(Effect::puff(f.x, f.y));
        }
    }
    world.fireballs.retain(|f| f.active);
}

fn resolve_effects(world: &mut WorldState) {
    let physics = &world.physics;
    world.effects.retain_mut(|fx| behavior::update_effect(fx, physics));
    world.blocks.tick();
}

fn resolve_camera(world: &mut WorldState) {
    if world.player.mode == PlayerMode::Dying {
        return;
    }
    let target = world.player.bounds().center_x();
    world.camera.follow(target, world.grid.pixel_width());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::{EffectKind, EnemyKind, EnemySpawn, EnemyState, Enemy, Facing, Fireball, Player, PowerState};
    use crate::domain::grid::{grid_from_rows, TILE};
    use crate::domain::tile::Tile;
    use crate::sim::level::{generate, BlockContent};

    fn scenario(rows: &[&str], contents: &[((usize, usize), BlockContent)]) -> WorldState {
        let mut layout = generate(1, 1);
        layout.grid = grid_from_rows(rows);
        layout.enemies.clear();
        layout.block_contents = contents.iter().copied().collect();
        let ground = rows.len() - 1;
        let mut w = WorldState::load(layout, PowerState::Small, &GameConfig::default());
        w.ground_row = ground;
        w.player = Player::at_start(2, ground, PowerState::Small);
        w
    }

    fn run(w: &mut WorldState, input: FrameInput, ticks: usize) -> Vec<GameEvent> {
        (0..ticks).flat_map(|_| step(w, input)).collect()
    }

    #[test]
    fn jumping_into_question_block_spawns_mushroom_once() {
        let mut w = scenario(
            &[
                "          ",
                "          ",
                "  ?       ",
                "          ",
                "          ",
                "##########",
            ],
            &[((2, 2), BlockContent::PowerUp)],
        );
        run(&mut w, FrameInput::empty(), 2);
        let mut events = run(&mut w, FrameInput::JUMP, 1);
        events.extend(run(&mut w, FrameInput::empty(), 60));
        events.extend(run(&mut w, FrameInput::JUMP, 1));
        events.extend(run(&mut w, FrameInput::empty(), 60));

        let spawned = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ItemSpawned { kind: crate::domain::entity::ItemKind::Mushroom, .. }))
            .count();
        assert_eq!(spawned, 1);
        assert_eq!(w.grid.get(2, 2), Tile::Used);
    }

    #[test]
    fn fireball_bursts_into_smoke_on_a_wall() {
        let mut w = scenario(
            &[
                "          ",
                "          ",
                "        H ",
                "        H ",
                "##########",
            ],
            &[],
        );
        w.fireballs.push(Fireball::launch(4.0 * TILE, 3.0 * TILE + 8.0, Facing::Right));
        let events = run(&mut w, FrameInput::empty(), 30);
        assert!(events.iter().any(|e| matches!(e, GameEvent::FireballBurst { .. })));
        assert!(w.fireballs.is_empty());
        assert!(w.effects.iter().any(|e| e.kind == EffectKind::Particle));
    }

    #[test]
    fn running_stomp_on_walker() {
        let mut w = scenario(
            &[
                "                    ",
                "                    ",
                "                    ",
                "                    ",
                "####################",
            ],
            &[],
        );
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Walker, col: 2, row: 3, speed: 0.0 });
        e.awake = true;
        w.enemies.push(e);
        // Start well above the walker and fall onto it.
        w.player.y = 0.0;
        w.player.x = w.enemies[0].x;
        let events = run(&mut w, FrameInput::empty(), 30);
        assert!(events.contains(&GameEvent::EnemyStomped { kind: EnemyKind::Walker }));
        assert!(!events.contains(&GameEvent::PlayerDied));
        assert!(w.enemies.iter().all(|e| matches!(e.state, EnemyState::Squashed { .. })) || w.enemies.is_empty());
    }

    #[test]
    fn squashed_enemy_is_removed_after_timer() {
        let mut w = scenario(&["          ", "          ", "##########"], &[]);
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Walker, col: 6, row: 1, speed: 1.0 });
        e.awake = true;
        e.state = EnemyState::Squashed { remaining: 3 };
        w.enemies.push(e);
        run(&mut w, FrameInput::empty(), 3);
        assert!(w.enemies.is_empty());
    }

    #[test]
    fn fatal_fall_reports_one_death() {
        let mut w = scenario(
            &[
                "          ",
                "          ",
                "          ",
                "          ",
                "####  ####",
            ],
            &[],
        );
        let events = run(&mut w, FrameInput::RIGHT, 200);
        assert_eq!(events.iter().filter(|e| **e == GameEvent::PlayerDied).count(), 1);
        assert_eq!(w.player.mode, PlayerMode::Dying);
    }

    #[test]
    fn camera_follows_right_only() {
        let mut w = scenario(
            &[
                "                                                                                ",
                "                                                                                ",
                "################################################################################",
            ],
            &[],
        );
        run(&mut w, FrameInput::RIGHT | FrameInput::RUN, 120);
        let far = w.camera.x;
        assert!(far > 0.0);
        run(&mut w, FrameInput::LEFT, 120);
        assert_eq!(w.camera.x, far);
        assert!(w.player.x >= far - 1e-3);
    }

    #[test]
    fn fireballs_in_flight_are_capped() {
        let mut w = scenario(
            &[
                "                                        ",
                "                                        ",
                "                                        ",
                "########################################",
            ],
            &[],
        );
        w.player.set_power(PowerState::Fire);
        let mut peak = 0;
        for i in 0..120 {
            let input = if i % 2 == 0 { FrameInput::FIRE } else { FrameInput::empty() };
            step(&mut w, input);
            peak = peak.max(w.fireballs.len());
        }
        assert_eq!(peak, crate::domain::rules::MAX_FIREBALLS);
    }

    #[test]
    fn star_power_expires_during_play() {
        let mut w = scenario(&["          ", "          ", "##########"], &[]);
        w.player.star_timer = 5;
        run(&mut w, FrameInput::empty(), 5);
        assert!(!w.player.has_star());
        assert_eq!(w.player.x, 2.0 * TILE);
    }
}
