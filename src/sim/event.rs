/// Events emitted during a simulation step.
/// The presentation layer consumes these for animation/sound; the session
/// consumes the score/life/progression ones.

use crate::domain::entity::{EnemyKind, ItemKind, PowerState};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    // ── Score / progression deltas ──
    PointsAwarded { points: u32, x: f32, y: f32 },
    CoinCollected,
    ExtraLife,

    // ── Player ──
    Jumped,
    PowerChanged { from: PowerState, to: PowerState },
    StarStarted,
    FireballThrown,
    FlagTouched { points: u32 },
    PlayerDied,
    LevelComplete,

    // ── Blocks ──
    BlockBumped { col: usize, row: usize },
    BrickShattered { col: usize, row: usize },
    BlockEmptied { col: usize, row: usize },
    ItemSpawned { kind: ItemKind, col: usize, row: usize },

    // ── Enemies / projectiles ──
    EnemyStomped { kind: EnemyKind },
    EnemyKilled { kind: EnemyKind },
    ShellKicked,
    FireballBurst { x: f32, y: f32 },
}
