/// Collision & effects dispatch between entities.
///
/// Order within a tick:
///   1. Player ↔ enemies   (stomp / kick / star kill / damage)
///   2. Fireballs ↔ enemies
///   3. Sliding shells ↔ enemies
///   4. Player ↔ items
///
/// Only awake, active, non-hidden enemies take part. Every outcome pushes
/// an event and, where points are involved, a score popup.

use crate::domain::entity::{Effect, Enemy, EnemyKind, EnemyState, Facing, PlayerMode};
use crate::domain::physics::{overlaps_solid, Aabb};
use crate::domain::rules::*;
use super::event::GameEvent;
use super::player;
use super::world::WorldState;

pub fn resolve_contacts(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    resolve_player_enemies(world, events);
    resolve_fireball_hits(world, events);
    resolve_shell_hits(world, events);
    resolve_item_pickups(world, events);
}

fn touchable(e: &Enemy) -> bool {
    e.awake && e.is_active() && !e.is_hidden()
}

// ══════════════════════════════════════════════════════════════
// Player ↔ enemies
// ══════════════════════════════════════════════════════════════

enum Contact {
    StarKill,
    Kick(Facing),
    Stomp,
    Hurt,
}

fn classify(world: &WorldState, e: &Enemy) -> Contact {
    let p = &world.player;
    if p.has_star() {
        return Contact::StarKill;
    }
    if let EnemyState::ShellIdle { .. } = e.state {
        let away = if p.bounds().center_x() < e.bounds().center_x() { Facing::Right } else { Facing::Left };
        return Contact::Kick(away);
    }
    // Falling, and last tick's feet were above the enemy's middle.
    let prev_bottom = p.bottom() - p.vy;
    if e.kind.stompable() && p.vy > 0.0 && prev_bottom <= e.bounds().center_y() {
        return Contact::Stomp;
    }
    Contact::Hurt
}

fn resolve_player_enemies(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for i in 0..world.enemies.len() {
        if world.player.mode != PlayerMode::Playing {
            return;
        }
        let e = &world.enemies[i];
        if !touchable(e) || !world.player.bounds().intersects(&e.bounds()) {
            continue;
        }
        match classify(world, e) {
            Contact::StarKill => {
                let (away, points) = (world.player.facing, world.enemies[i].kind.points());
                knock_enemy(world, i, away, points, events);
            }
            Contact::Kick(dir) => kick_shell(world, i, dir, events),
            Contact::Stomp => stomp(world, i, events),
            Contact::Hurt => player::damage(world, events),
        }
    }
}

fn stomp(world: &mut WorldState, i: usize, events: &mut Vec<GameEvent>) {
    let chain = world.player.stomp_chain;
    let e = &mut world.enemies[i];
    let kind = e.kind;
    match (kind, e.state) {
        (EnemyKind::Walker, _) => {
            e.state = EnemyState::Squashed { remaining: SQUASH_TICKS };
            e.vx = 0.0;
        }
        (_, EnemyState::ShellSliding) => {
            e.vx = 0.0;
            e.state = EnemyState::ShellIdle { revive: SHELL_REVIVE_TICKS };
        }
        _ => e.enter_shell(),
    }
    let (ex, ey) = (e.x, e.y);

    let p = &mut world.player;
    p.y = ey - p.height();
    p.vy = -world.physics.stomp_bounce;
    p.grounded = false;
    p.stomp_chain += 1;

    events.push(GameEvent::EnemyStomped { kind });
    world.award(chain_points(kind.points(), chain), ex, ey, events);
}

fn kick_shell(world: &mut WorldState, i: usize, dir: Facing, events: &mut Vec<GameEvent>) {
    let pb = world.player.bounds();
    let e = &mut world.enemies[i];
    e.kick(dir);

    // Start clear of the player so the kick isn't an instant side hit.
    let clear_x = match dir {
        Facing::Right => pb.right(),
        Facing::Left => pb.x - e.w,
    };
    let moved = Aabb::new(clear_x, e.y, e.w, e.h);
    if !overlaps_solid(&world.grid, &moved) {
        e.x = clear_x;
    }
    let (ex, ey) = (e.x, e.y);

    events.push(GameEvent::ShellKicked);
    world.award(KICK_POINTS, ex, ey, events);
}

fn knock_enemy(world: &mut WorldState, i: usize, away: Facing, points: u32, events: &mut Vec<GameEvent>) {
    let e = &mut world.enemies[i];
    e.knock(away);
    let (kind, ex, ey) = (e.kind, e.x, e.y);
    events.push(GameEvent::EnemyKilled { kind });
    world.award(points, ex, ey, events);
}

// ══════════════════════════════════════════════════════════════
// Projectiles
// ══════════════════════════════════════════════════════════════

fn resolve_fireball_hits(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for f in 0..world.fireballs.len() {
        if !world.fireballs[f].active {
            continue;
        }
        let fb = world.fireballs[f].bounds();
        let Some(i) = world.enemies.iter().position(|e| touchable(e) && fb.intersects(&e.bounds())) else {
            continue;
        };
        world.fireballs[f].active = false;
        events.push(GameEvent::FireballBurst { x: fb.x, y: fb.y });
        world.effects.push(Effect::puff(fb.x, fb.y));

        if !world.enemies[i].kind.fire_immune() {
            let away = if world.fireballs[f].vx < 0.0 { Facing::Left } else { Facing::Right };
            knock_enemy(world, i, away, FIRE_KILL_POINTS, events);
        }
    }
}

fn resolve_shell_hits(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for s in 0..world.enemies.len() {
        if world.enemies[s].state != EnemyState::ShellSliding {
            continue;
        }
        let shell = world.enemies[s].bounds();
        let dir = world.enemies[s].facing;
        for t in 0..world.enemies.len() {
            if t == s {
                continue;
            }
            let target = &world.enemies[t];
            if !touchable(target) || target.kind.shell_immune() || !shell.intersects(&target.bounds()) {
                continue;
            }
            let hit_shell = target.state == EnemyState::ShellSliding;
            let points = target.kind.points();
            knock_enemy(world, t, dir, points, events);
            // Two sliding shells take each other out.
            if hit_shell {
                let points = world.enemies[s].kind.points();
                knock_enemy(world, s, dir.flip(), points, events);
                break;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Items
// ══════════════════════════════════════════════════════════════

fn resolve_item_pickups(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.player.mode != PlayerMode::Playing {
        return;
    }
    let pb = world.player.bounds();
    for i in 0..world.items.len() {
        let item = &mut world.items[i];
        if !item.active || !pb.intersects(&item.bounds()) {
            continue;
        }
        item.active = false;
        let kind = item.kind;
        player::collect_item(world, kind, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::{EffectKind, EnemySpawn, Fireball, Item, ItemKind, Player, PowerState};
    use crate::domain::grid::{grid_from_rows, TILE};
    use crate::sim::level::generate;

    fn arena() -> WorldState {
        let mut layout = generate(1, 1);
        layout.grid = grid_from_rows(&[
            "                    ",
            "                    ",
            "                    ",
            "                    ",
            "####################",
        ]);
        layout.enemies.clear();
        let mut w = WorldState::load(layout, PowerState::Small, &GameConfig::default());
        w.ground_row = 4;
        w.player = Player::at_start(2, 4, PowerState::Small);
        w.player.grounded = true;
        w
    }

    fn enemy(kind: EnemyKind, col: usize) -> Enemy {
        let mut e = Enemy::spawn(&EnemySpawn { kind, col, row: 3, speed: 1.0 });
        e.awake = true;
        e
    }

    /// Place the player falling onto the enemy's head.
    fn drop_onto(w: &mut WorldState, e: &Enemy) {
        w.player.x = e.x;
        w.player.vy = 4.0;
        w.player.y = e.y - w.player.height() + 2.0;
        w.player.grounded = false;
    }

    #[test]
    fn stomp_squashes_walker_and_bounces() {
        let mut w = arena();
        let e = enemy(EnemyKind::Walker, 6);
        drop_onto(&mut w, &e);
        w.enemies.push(e);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert!(matches!(w.enemies[0].state, EnemyState::Squashed { .. }));
        assert_eq!(w.player.vy, -w.physics.stomp_bounce);
        assert!(ev.contains(&GameEvent::EnemyStomped { kind: EnemyKind::Walker }));
        assert!(ev.iter().any(|e| matches!(e, GameEvent::PointsAwarded { points: 100, .. })));
        assert!(w.player.is_alive());
        assert_eq!(w.player.power, PowerState::Small);
    }

    #[test]
    fn stomp_chain_doubles() {
        let mut w = arena();
        w.player.stomp_chain = 2;
        let e = enemy(EnemyKind::Walker, 6);
        drop_onto(&mut w, &e);
        w.enemies.push(e);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::PointsAwarded { points: 400, .. })));
        assert_eq!(w.player.stomp_chain, 3);
    }

    #[test]
    fn side_contact_hurts_small_player_fatally() {
        let mut w = arena();
        let e = enemy(EnemyKind::Walker, 2);
        w.enemies.push(e);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert_eq!(w.player.mode, PlayerMode::Dying);
        assert_eq!(ev.iter().filter(|e| **e == GameEvent::PlayerDied).count(), 1);
    }

    #[test]
    fn side_contact_shrinks_big_player() {
        let mut w = arena();
        w.player.set_power(PowerState::Big);
        w.enemies.push(enemy(EnemyKind::Walker, 2));
        w.enemies.push(enemy(EnemyKind::Walker, 2));
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        // Second overlap in the same tick is absorbed by the invulnerability window.
        assert_eq!(w.player.power, PowerState::Small);
        assert!(w.player.is_alive());
    }

    #[test]
    fn koopa_stomp_then_kick() {
        let mut w = arena();
        let e = enemy(EnemyKind::Koopa, 6);
        drop_onto(&mut w, &e);
        w.enemies.push(e);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert!(matches!(w.enemies[0].state, EnemyState::ShellIdle { .. }));

        // Walk into the idle shell from the left.
        w.player.y = w.ground_y() - w.player.height();
        w.player.vy = 0.0;
        w.player.x = w.enemies[0].x - 10.0;
        ev.clear();
        resolve_contacts(&mut w, &mut ev);
        assert_eq!(w.enemies[0].state, EnemyState::ShellSliding);
        assert!(w.enemies[0].vx > 0.0);
        assert!(ev.contains(&GameEvent::ShellKicked));
        assert!(!w.player.bounds().intersects(&w.enemies[0].bounds()));
        assert!(w.player.is_alive());
    }

    #[test]
    fn piranha_cannot_be_stomped() {
        let mut w = arena();
        let mut e = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Piranha, col: 6, row: 2, speed: 1.0 });
        e.awake = true;
        e.state = EnemyState::Lurking {
            phase: crate::domain::entity::PopupPhase::Exposed,
            remaining: 10,
            top: 2.0 * TILE,
        };
        e.y = 2.0 * TILE - e.h;
        drop_onto(&mut w, &e);
        w.enemies.push(e);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert_eq!(w.player.mode, PlayerMode::Dying);
    }

    #[test]
    fn star_kills_on_contact() {
        let mut w = arena();
        w.player.star_timer = 100;
        w.enemies.push(enemy(EnemyKind::Koopa, 2));
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert_eq!(w.enemies[0].state, EnemyState::Knocked);
        assert!(w.player.is_alive());
    }

    #[test]
    fn fireball_kills_but_beetle_shrugs() {
        let mut w = arena();
        let walker = enemy(EnemyKind::Walker, 8);
        let beetle = enemy(EnemyKind::Beetle, 14);
        w.fireballs.push(Fireball::launch(walker.x, walker.y + 4.0, Facing::Right));
        w.fireballs.push(Fireball::launch(beetle.x, beetle.y + 4.0, Facing::Right));
        w.enemies.push(walker);
        w.enemies.push(beetle);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert_eq!(w.enemies[0].state, EnemyState::Knocked);
        assert_eq!(w.enemies[1].state, EnemyState::Patrol);
        assert!(w.fireballs.iter().all(|f| !f.active));
        assert_eq!(ev.iter().filter(|e| matches!(e, GameEvent::FireballBurst { .. })).count(), 2);
        assert_eq!(w.effects.iter().filter(|e| e.kind == EffectKind::Particle).count(), 2);
    }

    #[test]
    fn sliding_shell_clears_enemies_but_not_piranhas() {
        let mut w = arena();
        let mut shell = enemy(EnemyKind::Koopa, 10);
        shell.enter_shell();
        shell.kick(Facing::Right);
        let walker = enemy(EnemyKind::Walker, 10);
        let mut piranha = Enemy::spawn(&EnemySpawn { kind: EnemyKind::Piranha, col: 9, row: 3, speed: 1.0 });
        piranha.awake = true;
        piranha.state = EnemyState::Lurking {
            phase: crate::domain::entity::PopupPhase::Exposed,
            remaining: 10,
            top: 4.0 * TILE,
        };
        piranha.y = shell.y;
        w.enemies.push(shell);
        w.enemies.push(walker);
        w.enemies.push(piranha);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert_eq!(w.enemies[1].state, EnemyState::Knocked);
        assert!(matches!(w.enemies[2].state, EnemyState::Lurking { .. }));
        assert_eq!(w.enemies[0].state, EnemyState::ShellSliding);
    }

    #[test]
    fn dormant_enemies_do_not_interact() {
        let mut w = arena();
        let mut e = enemy(EnemyKind::Walker, 2);
        e.awake = false;
        w.enemies.push(e);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        assert!(w.player.is_alive());
        assert!(ev.is_empty());
    }

    #[test]
    fn item_pickup_applies_once() {
        let mut w = arena();
        let mut m = Item::pop_from(ItemKind::Mushroom, 2, 4, Facing::Right);
        m.y = w.player.y;
        w.items.push(m);
        let mut ev = vec![];
        resolve_contacts(&mut w, &mut ev);
        resolve_contacts(&mut w, &mut ev);
        assert_eq!(w.player.power, PowerState::Big);
        assert_eq!(ev.iter().filter(|e| matches!(e, GameEvent::PowerChanged { .. })).count(), 1);
        assert!(!w.items[0].active);
    }
}
