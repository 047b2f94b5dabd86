/// The static tile layer and its sparse interaction side-table.
///
/// ## Two layers
///
///   - `TileGrid`   : tile type per cell. Written by the generator; after
///                     that only the one-way block transitions touch it
///                     (brick → empty, question/invisible → used).
///   - `BlockStates`: transient per-cell state keyed by `(col, row)`:
///                     bump animation, "content already dispensed",
///                     "coin already collected". Absent key = pristine cell.
///
/// Out-of-bounds reads return `Tile::Empty`, so anything that leaves the
/// grid (e.g. falling down a pit) drifts into the kill-plane path instead
/// of hitting an invisible wall.

use std::collections::BTreeMap;

use super::tile::Tile;

/// Size of one tile in world pixels.
pub const TILE: f32 = 32.0;
pub const GRID_WIDTH: usize = 224;
pub const GRID_HEIGHT: usize = 15;

/// Ticks a bumped block stays raised.
pub const BUMP_TICKS: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    tiles: Vec<Vec<Tile>>,
    width: usize,
    height: usize,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        TileGrid { tiles: vec![vec![Tile::Empty; width]; height], width, height }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width of the grid in world pixels.
    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * TILE
    }

    /// Height of the grid in world pixels. Doubles as the kill plane.
    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * TILE
    }

    /// Tile at signed tile coordinates. Anything outside the grid is empty.
    #[inline]
    pub fn tile_at(&self, col: i32, row: i32) -> Tile {
        if col < 0 || row < 0 {
            return Tile::Empty;
        }
        let (c, r) = (col as usize, row as usize);
        if c >= self.width || r >= self.height {
            return Tile::Empty;
        }
        self.tiles[r][c]
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Tile {
        self.tile_at(col as i32, row as i32)
    }

    /// Tile under a world-space point.
    pub fn tile_at_point(&self, x: f32, y: f32) -> Tile {
        self.tile_at(to_tile(x), to_tile(y))
    }

    pub fn is_solid(&self, col: i32, row: i32) -> bool {
        self.tile_at(col, row).is_solid()
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, tile: Tile) {
        if col < self.width && row < self.height {
            self.tiles[row][col] = tile;
        }
    }

    /// Fill a rectangle of cells, clipped to the grid.
    pub fn fill(&mut self, col: usize, row: usize, w: usize, h: usize, tile: Tile) {
        for r in row..row + h {
            for c in col..col + w {
                self.set(c, r, tile);
            }
        }
    }

    pub fn rows(&self) -> &[Vec<Tile>] {
        &self.tiles
    }

    /// Can an actor stand on the cell at (`col`, `row`)? Solid and one-way tiles both count.
    pub fn column_has_footing(&self, col: usize, row: usize) -> bool {
        let t = self.get(col, row);
        t.is_solid() || t.is_one_way()
    }
}

/// World coordinate → tile index (floor division).
#[inline]
pub fn to_tile(v: f32) -> i32 {
    (v / TILE).floor() as i32
}

// ══════════════════════════════════════════════════════════════
// Block side-table
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockState {
    /// Remaining ticks of the bump animation.
    pub bump: u32,
    /// Content already dispensed (one-shot).
    pub spent: bool,
    /// Coin tile already picked up.
    pub collected: bool,
}

impl BlockState {
    fn is_pristine(&self) -> bool {
        *self == BlockState::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlockStates {
    cells: BTreeMap<(usize, usize), BlockState>,
}

impl BlockStates {
    pub fn new() -> Self {
        BlockStates::default()
    }

    pub fn get(&self, col: usize, row: usize) -> BlockState {
        self.cells.get(&(col, row)).copied().unwrap_or_default()
    }

    pub fn bump(&mut self, col: usize, row: usize) {
        self.cells.entry((col, row)).or_default().bump = BUMP_TICKS;
    }

    pub fn is_bumping(&self, col: usize, row: usize) -> bool {
        self.get(col, row).bump > 0
    }

    /// Mark the cell's content as dispensed. Returns `false` if it already was.
    pub fn mark_spent(&mut self, col: usize, row: usize) -> bool {
        let cell = self.cells.entry((col, row)).or_default();
        if cell.spent {
            return false;
        }
        cell.spent = true;
        true
    }

    pub fn is_spent(&self, col: usize, row: usize) -> bool {
        self.get(col, row).spent
    }

    /// Collect the coin at (col, row). Returns `false` if already collected.
    pub fn collect(&mut self, col: usize, row: usize) -> bool {
        let cell = self.cells.entry((col, row)).or_default();
        if cell.collected {
            return false;
        }
        cell.collected = true;
        true
    }

    pub fn is_collected(&self, col: usize, row: usize) -> bool {
        self.get(col, row).collected
    }

    /// Vertical render offset for a bumping block (pixels, negative = up).
    pub fn bump_offset(&self, col: usize, row: usize) -> f32 {
        let b = self.get(col, row).bump;
        if b == 0 {
            return 0.0;
        }
        let half = BUMP_TICKS / 2;
        let lift = if b > half { BUMP_TICKS - b } else { b };
        -(lift as f32) * 1.6
    }

    /// Advance bump animations; drop entries that are back to pristine.
    pub fn tick(&mut self) {
        for cell in self.cells.values_mut() {
            cell.bump = cell.bump.saturating_sub(1);
        }
        self.cells.retain(|_, c| !c.is_pristine());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════
// Test support
// ══════════════════════════════════════════════════════════════

/// Build a grid from an ASCII diagram.
/// Legend:  '#'=Ground  'B'=Brick  '?'=Question  'U'=Used  'H'=Hard
///          'I'=Invisible  '|'=Flagpole  'F'=FlagTop  'L'=Lava  '='=Bridge
///          'o'=Coin  '['/']'=pipe top  '{'/'}'=pipe body  'P'=Platform
///          'C'=Castle  ' '=Empty
#[cfg(test)]
pub fn grid_from_rows(rows: &[&str]) -> TileGrid {
    let height = rows.len();
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut grid = TileGrid::new(width, height);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let tile = match ch {
                '#' => Tile::Ground,
                'B' => Tile::Brick,
                '?' => Tile::Question,
                'U' => Tile::Used,
                'H' => Tile::Hard,
                'I' => Tile::Invisible,
                '|' => Tile::Flagpole,
                'F' => Tile::FlagTop,
                'L' => Tile::Lava,
                '=' => Tile::Bridge,
                'o' => Tile::Coin,
                '[' => Tile::PipeTopLeft,
                ']' => Tile::PipeTopRight,
                '{' => Tile::PipeLeft,
                '}' => Tile::PipeRight,
                'P' => Tile::Platform,
                'C' => Tile::Castle,
                _ => Tile::Empty,
            };
            grid.set(x, y, tile);
        }
    }
    grid
}
