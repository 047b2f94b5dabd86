/// Block interaction: what happens when the player's head strikes a tile.
///
///   Question  → dispense content once, becomes Used
///   Invisible → dispense content once (1-up by default), becomes Used
///   Brick     → star brick: dispense once, becomes Used
///               big/fire: shatter to Empty + 4 fragments
///               small:    bump only
///   Used/Hard → nothing
///
/// Every effective hit also bumps the cell and knocks out enemies
/// standing on top of it. Tile type transitions are one-way, so hitting
/// the same block again is a no-op past the first dispense.

use crate::domain::entity::{Effect, Facing, Item, ItemKind, PowerState};
use crate::domain::grid::TILE;
use crate::domain::rules::*;
use crate::domain::tile::Tile;
use super::event::GameEvent;
use super::level::BlockContent;
use super::world::WorldState;

pub fn hit_block(world: &mut WorldState, col: usize, row: usize, events: &mut Vec<GameEvent>) {
    let tile = world.grid.get(col, row);
    if !tile.is_bumpable() {
        return;
    }
    match tile {
        Tile::Question => {
            let content = world.block_contents.get(&(col, row)).copied().unwrap_or(BlockContent::Coin);
            empty_block(world, col, row, content, events);
        }
        Tile::Invisible => {
            let content = world.block_contents.get(&(col, row)).copied().unwrap_or(BlockContent::OneUp);
            empty_block(world, col, row, content, events);
        }
        t if t.is_breakable() => {
            if let Some(content) = world.block_contents.get(&(col, row)).copied() {
                empty_block(world, col, row, content, events);
            } else if world.player.power >= PowerState::Big {
                shatter(world, col, row, events);
            } else {
                bump(world, col, row, events);
            }
        }
        _ => {}
    }
}

/// Hand out `content` and turn the block into a Used block.
fn empty_block(world: &mut WorldState, col: usize, row: usize, content: BlockContent, events: &mut Vec<GameEvent>) {
    if !world.blocks.mark_spent(col, row) {
        return;
    }
    world.grid.set(col, row, Tile::Used);
    events.push(GameEvent::BlockEmptied { col, row });
    bump(world, col, row, events);
    dispense(world, col, row, content, events);
}

fn dispense(world: &mut WorldState, col: usize, row: usize, content: BlockContent, events: &mut Vec<GameEvent>) {
    let kind = match content {
        BlockContent::Coin => {
            world.effects.push(Effect::coin_bounce(col, row));
            events.push(GameEvent::CoinCollected);
            world.award(COIN_POINTS, col as f32 * TILE, (row as f32 - 1.0) * TILE, events);
            return;
        }
        BlockContent::PowerUp if world.player.power == PowerState::Small => ItemKind::Mushroom,
        BlockContent::PowerUp => ItemKind::FireFlower,
        BlockContent::Star => ItemKind::Star,
        BlockContent::OneUp => ItemKind::OneUp,
    };
    log::debug!("block ({col}, {row}) dispensed {kind:?}");
    // Items drift away from the side the player hit from.
    let facing = if world.player.bounds().center_x() < (col as f32 + 0.5) * TILE {
        Facing::Right
    } else {
        Facing::Left
    };
    world.items.push(Item::pop_from(kind, col, row, facing));
    events.push(GameEvent::ItemSpawned { kind, col, row });
}

fn shatter(world: &mut WorldState, col: usize, row: usize, events: &mut Vec<GameEvent>) {
    world.grid.set(col, row, Tile::Empty);
    world.effects.extend(Effect::brick_fragments(col, row));
    events.push(GameEvent::BrickShattered { col, row });
    world.award(BRICK_POINTS, col as f32 * TILE, row as f32 * TILE, events);
    knock_from_below(world, col, row, events);
}

fn bump(world: &mut WorldState, col: usize, row: usize, events: &mut Vec<GameEvent>) {
    world.blocks.bump(col, row);
    events.push(GameEvent::BlockBumped { col, row });
    knock_from_below(world, col, row, events);
}

/// Enemies standing on the struck cell are knocked off; items get a hop;
/// a coin resting on top is collected.
fn knock_from_below(world: &mut WorldState, col: usize, row: usize, events: &mut Vec<GameEvent>) {
    let left = col as f32 * TILE;
    let right = left + TILE;
    let top = row as f32 * TILE;
    let on_top = |x: f32, w: f32, bottom: f32| x < right && x + w > left && (bottom - top).abs() <= 2.0;

    let mut knocked = vec![];
    for (i, e) in world.enemies.iter_mut().enumerate() {
        if e.is_active() && !e.is_hidden() && on_top(e.x, e.w, e.y + e.h) {
            let away = if e.x + e.w / 2.0 < left + TILE / 2.0 { Facing::Left } else { Facing::Right };
            e.knock(away);
            knocked.push(i);
        }
    }
    for i in knocked {
        let (kind, x, y) = (world.enemies[i].kind, world.enemies[i].x, world.enemies[i].y);
        events.push(GameEvent::EnemyKilled { kind });
        world.award(kind.points(), x, y, events);
    }

    for item in world.items.iter_mut().filter(|it| it.active) {
        if on_top(item.x, ITEM_SIZE, item.y + ITEM_SIZE) {
            item.vy = -ITEM_POP;
            item.vx = -item.vx;
        }
    }

    if row > 0 && world.grid.get(col, row - 1) == Tile::Coin && world.blocks.collect(col, row - 1) {
        world.effects.push(Effect::coin_bounce(col, row - 1));
        events.push(GameEvent::CoinCollected);
        world.award(COIN_POINTS, left, top - TILE, events);
    }
}
