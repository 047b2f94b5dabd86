/// Entities: Player, Enemy, Item, Fireball, Effect.
///
/// All positions are the top-left corner of the actor's box in world
/// pixels. Entities never reference one another; interactions are worked
/// out by the contact pass in `sim::contact`.

use bitflags::bitflags;

use super::grid::TILE;
use super::physics::Aabb;
use super::rules::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flip(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

bitflags! {
    /// Logical actions held during one tick. Edge detection (fresh jump,
    /// fresh fire) is done by the player controller against last tick.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct FrameInput: u8 {
        const LEFT  = 1 << 0;
        const RIGHT = 1 << 1;
        const RUN   = 1 << 2;
        const JUMP  = 1 << 3;
        const FIRE  = 1 << 4;
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

/// Upgrade tier. Ordered: `Small < Big < Fire`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum PowerState {
    Small,
    Big,
    Fire,
}

impl PowerState {
    pub fn height(self) -> f32 {
        match self {
            PowerState::Small => SMALL_HEIGHT,
            PowerState::Big | PowerState::Fire => BIG_HEIGHT,
        }
    }

    /// One step down after taking a hit. `None` means the hit is fatal.
    pub fn downgrade(self) -> Option<PowerState> {
        match self {
            PowerState::Fire => Some(PowerState::Big),
            PowerState::Big => Some(PowerState::Small),
            PowerState::Small => None,
        }
    }
}

/// What the player controller is currently running.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerMode {
    Playing,
    Dying,
    FlagSliding,
    LevelComplete,
}

/// Externally visible status, derived from mode + timers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerStatus {
    Normal,
    Invulnerable,
    StarPowered,
    Dying,
    FlagSliding,
    LevelComplete,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub facing: Facing,
    pub power: PowerState,
    pub grounded: bool,
    pub mode: PlayerMode,
    pub invuln_timer: u32,
    pub star_timer: u32,
    pub fire_cooldown: u32,
    /// Walk-cycle phase for the renderer.
    pub anim: u32,
    /// x of the flagpole the player is sliding on.
    pub flag_x: f32,
    /// Ticks spent at the bottom of the pole.
    pub flag_timer: u32,
    pub flag_landed: bool,
    /// Consecutive stomps since last touching ground.
    pub stomp_chain: u32,
    pub jump_held: bool,
    pub fire_held: bool,
}

impl Player {
    pub fn new(x: f32, y: f32, power: PowerState) -> Self {
        Player {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            facing: Facing::Right,
            power,
            grounded: false,
            mode: PlayerMode::Playing,
            invuln_timer: 0,
            star_timer: 0,
            fire_cooldown: 0,
            anim: 0,
            flag_x: 0.0,
            flag_timer: 0,
            flag_landed: false,
            stomp_chain: 0,
            jump_held: false,
            fire_held: false,
        }
    }

    /// Standing on `ground_row` at `col`.
    pub fn at_start(col: usize, ground_row: usize, power: PowerState) -> Self {
        let y = ground_row as f32 * TILE - power.height();
        Player::new(col as f32 * TILE, y, power)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        PLAYER_WIDTH
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.power.height()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width(), self.height())
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height()
    }

    /// Change power state keeping the feet where they are.
    pub fn set_power(&mut self, power: PowerState) {
        let bottom = self.bottom();
        self.power = power;
        self.y = bottom - power.height();
    }

    pub fn has_star(&self) -> bool {
        self.star_timer > 0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invuln_timer > 0
    }

    pub fn is_alive(&self) -> bool {
        self.mode != PlayerMode::Dying
    }

    pub fn status(&self) -> PlayerStatus {
        match self.mode {
            PlayerMode::Dying => PlayerStatus::Dying,
            PlayerMode::FlagSliding => PlayerStatus::FlagSliding,
            PlayerMode::LevelComplete => PlayerStatus::LevelComplete,
            PlayerMode::Playing if self.has_star() => PlayerStatus::StarPowered,
            PlayerMode::Playing if self.is_invulnerable() => PlayerStatus::Invulnerable,
            PlayerMode::Playing => PlayerStatus::Normal,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum EnemyKind {
    /// Patrols, dies to a stomp.
    Walker,
    /// Retreats into a kickable shell when stomped.
    Koopa,
    /// Koopa-like, but fireballs bounce off it.
    Beetle,
    /// Lives in a pipe, cannot be stomped.
    Piranha,
}

impl EnemyKind {
    pub fn points(self) -> u32 {
        match self {
            EnemyKind::Walker | EnemyKind::Koopa | EnemyKind::Beetle => 100,
            EnemyKind::Piranha => 200,
        }
    }

    pub fn has_shell(self) -> bool {
        matches!(self, EnemyKind::Koopa | EnemyKind::Beetle)
    }

    pub fn stompable(self) -> bool {
        !matches!(self, EnemyKind::Piranha)
    }

    pub fn fire_immune(self) -> bool {
        matches!(self, EnemyKind::Beetle)
    }

    pub fn shell_immune(self) -> bool {
        matches!(self, EnemyKind::Piranha)
    }

    fn size(self) -> (f32, f32) {
        match self {
            EnemyKind::Walker | EnemyKind::Beetle => (ENEMY_WIDTH, WALKER_HEIGHT),
            EnemyKind::Koopa => (ENEMY_WIDTH, KOOPA_HEIGHT),
            EnemyKind::Piranha => (PIRANHA_WIDTH, PIRANHA_HEIGHT),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PopupPhase {
    Hidden,
    Rising,
    Exposed,
    Sinking,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EnemyState {
    Patrol,
    Squashed { remaining: u32 },
    ShellIdle { revive: u32 },
    ShellSliding,
    /// Piranha cycle. `top` is the pipe lip y.
    Lurking { phase: PopupPhase, remaining: u32, top: f32 },
    /// Killed by fire/star/shell: hops and falls through everything.
    Knocked,
    Dead,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EnemySpawn {
    pub kind: EnemyKind,
    pub col: usize,
    /// Row the enemy stands in; for a piranha, the pipe lip row.
    pub row: usize,
    pub speed: f32,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub w: f32,
    pub h: f32,
    pub facing: Facing,
    pub speed: f32,
    pub grounded: bool,
    /// Dormant until the camera gets close.
    pub awake: bool,
    pub state: EnemyState,
}

impl Enemy {
    pub fn spawn(s: &EnemySpawn) -> Self {
        let (w, h) = s.kind.size();
        let (x, y, state) = match s.kind {
            EnemyKind::Piranha => {
                let top = s.row as f32 * TILE;
                let x = (s.col + 1) as f32 * TILE - w / 2.0;
                let phase = EnemyState::Lurking {
                    phase: PopupPhase::Hidden,
                    remaining: PIRANHA_HIDDEN_TICKS,
                    top,
                };
                (x, top, phase)
            }
            _ => {
                let x = s.col as f32 * TILE + (TILE - w) / 2.0;
                let y = (s.row + 1) as f32 * TILE - h;
                (x, y, EnemyState::Patrol)
            }
        };
        Enemy {
            kind: s.kind,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            w,
            h,
            facing: Facing::Left,
            speed: s.speed,
            grounded: false,
            awake: false,
            state,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.w, self.h)
    }

    /// Still takes part in contact checks.
    pub fn is_active(&self) -> bool {
        !matches!(
            self.state,
            EnemyState::Squashed { .. } | EnemyState::Knocked | EnemyState::Dead
        )
    }

    /// Inside its pipe and out of reach.
    pub fn is_hidden(&self) -> bool {
        matches!(self.state, EnemyState::Lurking { phase: PopupPhase::Hidden, .. })
    }

    /// Knock off the level, flying away from `from`.
    pub fn knock(&mut self, from: Facing) {
        self.state = EnemyState::Knocked;
        self.vy = -KNOCK_HOP;
        self.vx = from.sign() * 2.0;
        self.grounded = false;
    }

    /// Shrink a shell enemy to shell height, keeping its feet planted.
    pub fn enter_shell(&mut self) {
        let bottom = self.y + self.h;
        self.h = SHELL_HEIGHT;
        self.y = bottom - self.h;
        self.vx = 0.0;
        self.state = EnemyState::ShellIdle { revive: SHELL_REVIVE_TICKS };
    }

    pub fn leave_shell(&mut self) {
        let (_, h) = self.kind.size();
        let bottom = self.y + self.h;
        self.h = h;
        self.y = bottom - h;
        self.state = EnemyState::Patrol;
    }

    pub fn kick(&mut self, toward: Facing) {
        self.facing = toward;
        self.vx = toward.sign() * SHELL_SPEED;
        self.state = EnemyState::ShellSliding;
    }
}

// ══════════════════════════════════════════════════════════════
// Items
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ItemKind {
    Mushroom,
    FireFlower,
    Star,
    OneUp,
}

#[derive(Clone, Debug)]
pub struct Item {
    pub kind: ItemKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub active: bool,
}

impl Item {
    /// Pop out of the top of block (col, row).
    pub fn pop_from(kind: ItemKind, col: usize, row: usize, facing: Facing) -> Self {
        let speed = if kind == ItemKind::Star { STAR_SPEED } else { ITEM_SPEED };
        Item {
            kind,
            x: col as f32 * TILE + (TILE - ITEM_SIZE) / 2.0,
            y: row as f32 * TILE - ITEM_SIZE,
            vx: facing.sign() * speed,
            vy: -ITEM_POP,
            active: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, ITEM_SIZE, ITEM_SIZE)
    }
}

// ══════════════════════════════════════════════════════════════
// Fireballs
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Fireball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub bounces: u32,
    pub lifetime: u32,
    pub active: bool,
}

impl Fireball {
    pub fn launch(x: f32, y: f32, facing: Facing) -> Self {
        Fireball {
            x,
            y,
            vx: facing.sign() * FIREBALL_SPEED,
            vy: FIREBALL_DROP,
            bounces: 0,
            lifetime: FIREBALL_LIFETIME,
            active: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, FIREBALL_SIZE, FIREBALL_SIZE)
    }
}

// ══════════════════════════════════════════════════════════════
// Ephemeral effects
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectKind {
    /// Brick fragment / fire puff; falls under gravity.
    Particle,
    ScorePopup { points: u32 },
    CoinBounce,
}

#[derive(Clone, Debug)]
pub struct Effect {
    pub kind: EffectKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub remaining: u32,
}

impl Effect {
    pub fn popup(x: f32, y: f32, points: u32) -> Self {
        Effect { kind: EffectKind::ScorePopup { points }, x, y, vx: 0.0, vy: -1.0, remaining: POPUP_TICKS }
    }

    pub fn coin_bounce(col: usize, row: usize) -> Self {
        Effect {
            kind: EffectKind::CoinBounce,
            x: col as f32 * TILE + 8.0,
            y: (row as f32 - 1.0) * TILE,
            vx: 0.0,
            vy: -8.0,
            remaining: COIN_BOUNCE_TICKS,
        }
    }

    pub fn particle(x: f32, y: f32, vx: f32, vy: f32) -> Self {
        Effect { kind: EffectKind::Particle, x, y, vx, vy, remaining: PARTICLE_TICKS }
    }

    /// Smoke left where a fireball bursts.
    pub fn puff(x: f32, y: f32) -> Self {
        Effect::particle(x, y, 0.0, -2.0)
    }

    /// Four fragments flying out of a smashed brick.
    pub fn brick_fragments(col: usize, row: usize) -> [Effect; 4] {
        let cx = col as f32 * TILE + TILE / 2.0;
        let cy = row as f32 * TILE + TILE / 2.0;
        [
            Effect::particle(cx - 8.0, cy - 8.0, -2.0, -8.0),
            Effect::particle(cx + 8.0, cy - 8.0, 2.0, -8.0),
            Effect::particle(cx - 8.0, cy + 8.0, -2.0, -5.0),
            Effect::particle(cx + 8.0, cy + 8.0, 2.0, -5.0),
        ]
    }
}
