/// Procedural level generator.
///
/// `generate(world, level)` builds one of the 32 levels from a fixed seed,
/// so the same pair always yields the same layout.
///
/// ## Layout (columns, left to right)
///
///   0 .. 16            flat run-up, player starts at column 3
///   16 .. stairs       middle section: features picked per level type
///   stairs .. flag     8-step Hard staircase, then flat approach
///   flag               flagpole at `width - 20`
///   flag + 4 ..        castle
///
/// Features in the middle section are placed left to right with at least
/// two flat columns between them, so no two pits ever merge.
///
/// ## Tile legend used in the tests' ASCII dumps
///   '#' = Ground/Hard   'B' = Brick   '?' = Question   'I' = Invisible
///   '[' ']' = pipe lip  '|' = pole    'L' = Lava       '=' = Bridge

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::domain::entity::{EnemyKind, EnemySpawn};
use crate::domain::grid::{TileGrid, GRID_HEIGHT, GRID_WIDTH};
use crate::domain::rules::{MAX_GAP, MAX_PIPE_HEIGHT, WALKER_SPEED};
use crate::domain::tile::Tile;

pub const WORLDS: u8 = 8;
pub const LEVELS_PER_WORLD: u8 = 4;

const START_COLUMN: usize = 3;
const RUN_UP: usize = 16;
const FLAG_FROM_END: usize = 20;
const STAIR_STEPS: usize = 8;
const BLOCK_LIFT: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum LevelType {
    Overworld,
    Underground,
    Athletic,
    Night,
    Castle,
}

impl LevelType {
    pub fn classify(world: u8, level: u8) -> LevelType {
        if level == 2 && matches!(world, 1 | 4 | 7) {
            LevelType::Underground
        } else if level == 4 {
            LevelType::Castle
        } else if level == 3 && matches!(world, 1 | 3 | 5 | 7) {
            LevelType::Athletic
        } else if matches!(world, 3 | 6) {
            LevelType::Night
        } else {
            LevelType::Overworld
        }
    }

    /// Row whose top edge is the walking surface.
    pub fn ground_row(self) -> usize {
        match self {
            LevelType::Underground | LevelType::Castle => 14,
            _ => 13,
        }
    }

    fn ground_tile(self) -> Tile {
        match self {
            LevelType::Underground => Tile::UndergroundGround,
            LevelType::Castle => Tile::Hard,
            _ => Tile::Ground,
        }
    }

    fn brick_tile(self) -> Tile {
        match self {
            LevelType::Underground => Tile::UndergroundBrick,
            _ => Tile::Brick,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LevelType::Overworld => "Overworld",
            LevelType::Underground => "Underground",
            LevelType::Athletic => "Athletic",
            LevelType::Night => "Night",
            LevelType::Castle => "Castle",
        }
    }
}

/// What a question/brick/invisible block hands out when hit from below.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum BlockContent {
    Coin,
    /// Mushroom for a small player, fire flower otherwise.
    PowerUp,
    Star,
    OneUp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelLayout {
    pub world: u8,
    pub level: u8,
    pub level_type: LevelType,
    pub grid: TileGrid,
    pub enemies: Vec<EnemySpawn>,
    pub start_column: usize,
    pub flag_column: usize,
    /// Dispensable content per block cell. Bricks without an entry are plain.
    pub block_contents: BTreeMap<(usize, usize), BlockContent>,
}

impl LevelLayout {
    pub fn ground_row(&self) -> usize {
        self.level_type.ground_row()
    }
}

/// Fixed seed for a (world, level) pair.
pub fn level_seed(world: u8, level: u8) -> u64 {
    0x5EED_1985_u64
        .wrapping_mul(31)
        .wrapping_add(world as u64 * 1_000_003)
        .wrapping_add(level as u64 * 7_919)
}

/// Next level in sequence, or `None` after the last castle.
pub fn next_level(world: u8, level: u8) -> Option<(u8, u8)> {
    if level < LEVELS_PER_WORLD {
        Some((world, level + 1))
    } else if world < WORLDS {
        Some((world + 1, 1))
    } else {
        None
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Build level `world-level`. Out-of-range inputs are clamped.
pub fn generate(world: u8, level: u8) -> LevelLayout {
    let world = world.clamp(1, WORLDS);
    let level = level.clamp(1, LEVELS_PER_WORLD);
    let level_type = LevelType::classify(world, level);

    let mut b = Builder::new(world, level_type, level_seed(world, level));
    b.lay_ground();
    let stairs = b.flag_column() - STAIR_STEPS - 3;
    b.middle_section(RUN_UP, stairs - 2);
    b.terminal_section(stairs);
    b.scatter_clouds(stairs);
    b.place_enemies(RUN_UP + 4, stairs - 2);

    log::debug!(
        "generated {world}-{level} ({}): {} enemies, {} content blocks",
        level_type.name(),
        b.enemies.len(),
        b.contents.len()
    );

    LevelLayout {
        world,
        level,
        level_type,
        flag_column: b.flag_column(),
        grid: b.grid,
        enemies: b.enemies,
        start_column: START_COLUMN,
        block_contents: b.contents,
    }
}

// ══════════════════════════════════════════════════════════════
// Builder
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
enum Feature {
    Pit,
    Blocks,
    Pipe,
    Stairs,
    CoinArc,
    Platform,
    CeilingWall,
    LavaBridge,
}

fn feature_weights(t: LevelType) -> &'static [(Feature, u32)] {
    match t {
        LevelType::Overworld | LevelType::Night => &[
            (Feature::Pit, 2),
            (Feature::Blocks, 3),
            (Feature::Pipe, 2),
            (Feature::Stairs, 1),
            (Feature::CoinArc, 1),
        ],
        LevelType::Underground => &[
            (Feature::Pit, 2),
            (Feature::Blocks, 3),
            (Feature::Pipe, 2),
            (Feature::CeilingWall, 2),
            (Feature::Stairs, 1),
        ],
        LevelType::Athletic => &[
            (Feature::Pit, 4),
            (Feature::Platform, 3),
            (Feature::Blocks, 1),
            (Feature::CoinArc, 2),
        ],
        LevelType::Castle => &[
            (Feature::Pit, 3),
            (Feature::LavaBridge, 2),
            (Feature::Blocks, 1),
            (Feature::Stairs, 2),
        ],
    }
}

struct Builder {
    world: u8,
    level_type: LevelType,
    ground: usize,
    grid: TileGrid,
    enemies: Vec<EnemySpawn>,
    contents: BTreeMap<(usize, usize), BlockContent>,
    rng: Pcg32,
}

impl Builder {
    fn new(world: u8, level_type: LevelType, seed: u64) -> Self {
        Builder {
            world,
            level_type,
            ground: level_type.ground_row(),
            grid: TileGrid::new(GRID_WIDTH, GRID_HEIGHT),
            enemies: Vec::new(),
            contents: BTreeMap::new(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    fn flag_column(&self) -> usize {
        self.grid.width() - FLAG_FROM_END
    }

    fn lay_ground(&mut self) {
        let w = self.grid.width();
        let tile = self.level_type.ground_tile();
        match self.level_type {
            LevelType::Underground => {
                self.grid.fill(0, 0, w, 2, tile);
                self.grid.fill(0, 14, w, 1, tile);
            }
            LevelType::Castle => self.grid.fill(0, 14, w, 1, tile),
            _ => self.grid.fill(0, 13, w, 2, tile),
        }
    }

    fn pick_feature(&mut self) -> Feature {
        let table = feature_weights(self.level_type);
        let total: u32 = table.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.random_range(0..total);
        for &(f, w) in table {
            if roll < w {
                return f;
            }
            roll -= w;
        }
        table[0].0
    }

    // ── Middle section ──

    fn middle_section(&mut self, from: usize, to: usize) {
        let mut col = from;
        while col < to {
            let feature = self.pick_feature();
            let used = self.place(feature, col, to - col);
            col += used + self.rng.random_range(2..=5);
        }
    }

    /// Place `feature` starting at `col` within `room` columns.
    /// Returns the number of columns consumed (0 if it did not fit).
    fn place(&mut self, feature: Feature, col: usize, room: usize) -> usize {
        match feature {
            Feature::Pit => {
                let widest = MAX_GAP.min(2 + self.world as usize / 2);
                let w = self.rng.random_range(2..=widest);
                if w > room {
                    return 0;
                }
                self.cut_pit(col, w);
                w
            }
            Feature::Blocks => self.block_row(col, room),
            Feature::Pipe => {
                if room < 2 {
                    return 0;
                }
                let h = self.rng.random_range(2..=MAX_PIPE_HEIGHT);
                let piranha = self.rng.random_bool(0.15 + 0.05 * self.world as f64);
                self.pipe(col, h, piranha);
                2
            }
            Feature::Stairs => {
                let h = self.rng.random_range(2..=4usize);
                if 2 * h > room {
                    return 0;
                }
                for i in 0..h {
                    self.column_of(col + i, i + 1, Tile::Hard);
                    self.column_of(col + 2 * h - 1 - i, i + 1, Tile::Hard);
                }
                2 * h
            }
            Feature::CoinArc => {
                if room < 5 {
                    return 0;
                }
                for (i, lift) in [3, 4, 5, 4, 3].into_iter().enumerate() {
                    self.grid.set(col + i, self.ground - lift, Tile::Coin);
                }
                5
            }
            Feature::Platform => {
                let w = self.rng.random_range(3..=5usize);
                if w > room {
                    return 0;
                }
                let row = self.ground - self.rng.random_range(4..=5usize);
                self.grid.fill(col, row, w, 1, Tile::Platform);
                self.grid.fill(col + 1, row - 2, w - 2, 1, Tile::Coin);
                w
            }
            Feature::CeilingWall => {
                let w = self.rng.random_range(1..=3usize);
                if w > room {
                    return 0;
                }
                let depth = self.rng.random_range(2..=5usize);
                self.grid.fill(col, 2, w, depth, self.level_type.brick_tile());
                w
            }
            Feature::LavaBridge => {
                let span = self.rng.random_range(5..=8usize);
                if span + 2 > room {
                    return 0;
                }
                let deck = self.ground - 1;
                self.grid.set(col, deck, Tile::Hard);
                self.grid.fill(col + 1, deck, span, 1, Tile::Bridge);
                self.grid.fill(col + 1, self.ground, span, 1, Tile::Lava);
                self.grid.set(col + span + 1, deck, Tile::Hard);
                span + 2
            }
        }
    }

    fn cut_pit(&mut self, col: usize, w: usize) {
        match self.level_type {
            LevelType::Castle => self.grid.fill(col, 14, w, 1, Tile::Lava),
            LevelType::Underground => self.grid.fill(col, 14, w, 1, Tile::Empty),
            _ => self.grid.fill(col, 13, w, 2, Tile::Empty),
        }
    }

    /// A solid column `h` tiles tall standing on the ground.
    fn column_of(&mut self, col: usize, h: usize, tile: Tile) {
        self.grid.fill(col, self.ground - h, 1, h, tile);
    }

    fn pipe(&mut self, col: usize, h: usize, piranha: bool) {
        let lip = self.ground - h;
        self.grid.set(col, lip, Tile::PipeTopLeft);
        self.grid.set(col + 1, lip, Tile::PipeTopRight);
        for row in lip + 1..self.ground {
            self.grid.set(col, row, Tile::PipeLeft);
            self.grid.set(col + 1, row, Tile::PipeRight);
        }
        if piranha && self.level_type != LevelType::Castle {
            self.enemies.push(EnemySpawn { kind: EnemyKind::Piranha, col, row: lip, speed: 1.0 });
        }
    }

    fn block_row(&mut self, col: usize, room: usize) -> usize {
        let w = self.rng.random_range(3..=6usize);
        let hidden = self.rng.random_bool(0.12);
        let used = if hidden { w + 2 } else { w };
        if used > room {
            return 0;
        }
        let row = self.ground - BLOCK_LIFT;
        let brick = self.level_type.brick_tile();
        for c in col..col + w {
            if self.rng.random_bool(0.35) {
                self.grid.set(c, row, Tile::Question);
                let content = if self.rng.random_bool(0.3) { BlockContent::PowerUp } else { BlockContent::Coin };
                self.contents.insert((c, row), content);
            } else {
                self.grid.set(c, row, brick);
                if self.rng.random_bool(0.05) {
                    self.contents.insert((c, row), BlockContent::Star);
                }
            }
        }

        // Upper tier, one coin block in the middle.
        if w >= 4 && self.rng.random_bool(0.3) {
            let upper = row - BLOCK_LIFT;
            self.grid.fill(col + 1, upper, w - 2, 1, brick);
            let mid = col + w / 2;
            self.grid.set(mid, upper, Tile::Question);
            self.contents.insert((mid, upper), BlockContent::Coin);
        }

        if hidden {
            let c = col + w + 1;
            self.grid.set(c, row, Tile::Invisible);
            self.contents.insert((c, row), BlockContent::OneUp);
        }
        used
    }

    // ── Terminal section ──

    fn terminal_section(&mut self, stairs: usize) {
        for i in 0..STAIR_STEPS {
            self.column_of(stairs + i, i + 1, Tile::Hard);
        }

        let flag = self.flag_column();
        self.grid.set(flag, 2, Tile::FlagTop);
        for row in 3..self.ground {
            self.grid.set(flag, row, Tile::Flagpole);
        }

        let castle = flag + 4;
        let top = self.ground - 5;
        self.grid.fill(castle, top, 5, 5, Tile::Castle);
        self.grid.fill(castle + 2, self.ground - 2, 1, 2, Tile::CastleDoor);
    }

    fn scatter_clouds(&mut self, until: usize) {
        if matches!(self.level_type, LevelType::Underground | LevelType::Castle) {
            return;
        }
        let mut col = self.rng.random_range(4..12usize);
        while col + 3 < until {
            let row = self.rng.random_range(1..=3usize);
            let w = self.rng.random_range(2..=3usize);
            for c in col..col + w {
                if self.grid.get(c, row) == Tile::Empty {
                    self.grid.set(c, row, Tile::Cloud);
                }
            }
            col += self.rng.random_range(10..18usize);
        }
    }

    // ── Enemies ──

    fn enemy_pool(&self) -> Vec<EnemyKind> {
        let mut pool = vec![EnemyKind::Walker, EnemyKind::Walker];
        if self.world >= 2 {
            pool.push(EnemyKind::Koopa);
        }
        if self.world >= 4 {
            pool.push(EnemyKind::Beetle);
        }
        pool
    }

    fn enemy_budget(&self) -> usize {
        let base = match self.level_type {
            LevelType::Overworld | LevelType::Underground => 8,
            LevelType::Night => 10,
            LevelType::Athletic | LevelType::Castle => 5,
        };
        base + self.world as usize
    }

    /// Can a ground enemy stand in `col`?
    fn open_ground(&self, col: usize) -> bool {
        let g = self.ground;
        self.grid.get(col, g).is_solid()
            && self.grid.get(col, g - 1) == Tile::Empty
            && self.grid.get(col, g - 2) == Tile::Empty
    }

    fn place_enemies(&mut self, from: usize, to: usize) {
        let pool = self.enemy_pool();
        let speed = WALKER_SPEED * (1.0 + 0.08 * (self.world as f32 - 1.0));
        let budget = self.enemy_budget();
        let mut placed = 0;

        for _ in 0..budget * 10 {
            if placed == budget {
                break;
            }
            let col = self.rng.random_range(from..to);
            let crowded = self
                .enemies
                .iter()
                .any(|e| e.kind != EnemyKind::Piranha && e.col.abs_diff(col) < 3);
            if crowded || !self.open_ground(col) {
                continue;
            }
            let kind = pool[self.rng.random_range(0..pool.len())];
            self.enemies.push(EnemySpawn { kind, col, row: self.ground - 1, speed });
            placed += 1;
        }
        self.enemies.sort_by_key(|e| e.col);
    }
}
