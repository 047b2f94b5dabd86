/// Collision resolver: the one place actors meet terrain.
///
/// ## Model
///
/// Every actor is an axis-aligned box (`Aabb`) in world pixels. Motion is
/// resolved one axis at a time (horizontal, then vertical) so corners are
/// never cut.
///
/// For each axis the resolver sweeps every tile column (or row) between the
/// box's current leading edge and its requested leading edge, nearest first.
/// The first column/row with a blocking tile in the box's cross-span stops
/// the box flush against that tile's boundary. Because every intermediate
/// column is visited, no displacement is large enough to tunnel.
///
/// ## Edge convention
///
/// A box covers `[x, x + w)`. Spans are computed with a small `EDGE`
/// inset on the far side, so a box resting exactly on a boundary does
/// not count as overlapping the next cell.
///
/// ## Blocking rules
///
/// ┌──────────────┬─────────────┬──────────────┐
/// │ Axis         │ Solid tiles │ One-way tile │
/// ├──────────────┼─────────────┼──────────────┤
/// │ Left / Right │ block       │ pass         │
/// │ Up           │ block       │ pass         │
/// │ Down         │ block       │ block        │
/// └──────────────┴─────────────┴──────────────┘
///
/// Only rows strictly below the previous bottom edge are swept when moving
/// down, so a one-way tile only ever catches an actor that started above it.

use bitflags::bitflags;

use super::grid::{to_tile, TileGrid, TILE};
use super::tile::Tile;

const EDGE: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Aabb { x, y, w, h }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Inclusive range of tile columns the box overlaps.
    pub fn col_span(&self) -> (i32, i32) {
        (to_tile(self.x), to_tile(self.right() - EDGE))
    }

    /// Inclusive range of tile rows the box overlaps.
    pub fn row_span(&self) -> (i32, i32) {
        (to_tile(self.y), to_tile(self.bottom() - EDGE))
    }
}

bitflags! {
    /// Which sides were stopped by terrain this move.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Blocked: u8 {
        const LEFT  = 1 << 0;
        const RIGHT = 1 << 1;
        const ABOVE = 1 << 2;
        const BELOW = 1 << 3;
    }
}

/// Outcome of a two-axis resolve.
#[derive(Clone, Copy, Debug)]
pub struct Motion {
    pub bounds: Aabb,
    pub blocked: Blocked,
    /// Tile struck by the actor's head, if an upward move was stopped.
    pub head_hit: Option<(usize, usize)>,
}

impl Motion {
    pub fn grounded(&self) -> bool {
        self.blocked.contains(Blocked::BELOW)
    }

    pub fn hit_wall(&self) -> bool {
        self.blocked.intersects(Blocked::LEFT | Blocked::RIGHT)
    }
}

// ══════════════════════════════════════════════════════════════
// Single-axis sweeps
// ══════════════════════════════════════════════════════════════

/// Move horizontally by `dx`, stopping flush against the first solid column.
pub fn move_x(grid: &TileGrid, b: Aabb, dx: f32) -> (Aabb, Blocked) {
    let mut out = b;
    if dx == 0.0 {
        return (out, Blocked::empty());
    }
    let (r0, r1) = b.row_span();
    let column_blocks = |c: i32| (r0..=r1).any(|r| grid.is_solid(c, r));

    if dx > 0.0 {
        let first = to_tile(b.right() - EDGE) + 1;
        let last = to_tile(b.right() + dx - EDGE).min(grid.width() as i32);
        for c in first..=last {
            if column_blocks(c) {
                out.x = (c as f32 * TILE - b.w).clamp(b.x, b.x + dx);
                return (out, Blocked::RIGHT);
            }
        }
    } else {
        let first = to_tile(b.x) - 1;
        let last = to_tile(b.x + dx).max(-1);
        for c in (last..=first).rev() {
            if column_blocks(c) {
                out.x = ((c + 1) as f32 * TILE).clamp(b.x + dx, b.x);
                return (out, Blocked::LEFT);
            }
        }
    }
    out.x = b.x + dx;
    (out, Blocked::empty())
}

/// Move vertically by `dy`. Returns the struck tile when stopped going up.
pub fn move_y(grid: &TileGrid, b: Aabb, dy: f32) -> (Aabb, Blocked, Option<(usize, usize)>) {
    let mut out = b;
    if dy == 0.0 {
        return (out, Blocked::empty(), None);
    }
    let (c0, c1) = b.col_span();

    if dy > 0.0 {
        let lands = |t: Tile| t.is_solid() || t.is_one_way();
        let first = to_tile(b.bottom() - EDGE) + 1;
        let last = to_tile(b.bottom() + dy - EDGE).min(grid.height() as i32);
        for r in first..=last {
            if (c0..=c1).any(|c| lands(grid.tile_at(c, r))) {
                out.y = (r as f32 * TILE - b.h).clamp(b.y, b.y + dy);
                return (out, Blocked::BELOW, None);
            }
        }
    } else {
        let first = to_tile(b.y) - 1;
        let last = to_tile(b.y + dy).max(-1);
        for r in (last..=first).rev() {
            if (c0..=c1).any(|c| grid.is_solid(c, r)) {
                out.y = ((r + 1) as f32 * TILE).clamp(b.y + dy, b.y);
                let hit = struck_tile(grid, &b, c0, c1, r);
                return (out, Blocked::ABOVE, hit);
            }
        }
    }
    out.y = b.y + dy;
    (out, Blocked::empty(), None)
}

/// The single tile a head-bump lands on: the one under the box's centre if
/// solid, otherwise the first solid tile across the span.
fn struck_tile(grid: &TileGrid, b: &Aabb, c0: i32, c1: i32, row: i32) -> Option<(usize, usize)> {
    if row < 0 {
        return None;
    }
    let centre = to_tile(b.center_x());
    let col = if grid.is_solid(centre, row) {
        Some(centre)
    } else {
        (c0..=c1).find(|&c| grid.is_solid(c, row))
    }?;
    if col < 0 {
        return None;
    }
    Some((col as usize, row as usize))
}

/// Horizontal then vertical resolve of a full displacement.
pub fn resolve(grid: &TileGrid, b: Aabb, dx: f32, dy: f32) -> Motion {
    let (after_x, bx) = move_x(grid, b, dx);
    let (after_y, by, head_hit) = move_y(grid, after_x, dy);
    Motion { bounds: after_y, blocked: bx | by, head_hit }
}

// ══════════════════════════════════════════════════════════════
// Overlap queries
// ══════════════════════════════════════════════════════════════

/// First tile (row-major) overlapped by the box that satisfies `pred`.
pub fn find_overlap(grid: &TileGrid, b: &Aabb, pred: impl Fn(Tile) -> bool) -> Option<(i32, i32)> {
    let (c0, c1) = b.col_span();
    let (r0, r1) = b.row_span();
    for r in r0..=r1 {
        for c in c0..=c1 {
            if pred(grid.tile_at(c, r)) {
                return Some((c, r));
            }
        }
    }
    None
}

/// Does the box overlap any solid tile?
pub fn overlaps_solid(grid: &TileGrid, b: &Aabb) -> bool {
    find_overlap(grid, b, Tile::is_solid).is_some()
}

/// Is there footing directly beneath the point `(x, bottom)`?
pub fn has_footing_at(grid: &TileGrid, x: f32, bottom: f32) -> bool {
    let t = grid.tile_at(to_tile(x), to_tile(bottom + EDGE));
    t.is_solid() || t.is_one_way()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::grid_from_rows;
    use proptest::prelude::*;

    #[test]
    fn lands_on_ground_and_sets_below() {
        let g = grid_from_rows(&[
            "    ",
            "    ",
            "####",
        ]);
        let b = Aabb::new(10.0, 20.0, 24.0, 32.0);
        let m = resolve(&g, b, 0.0, 30.0);
        assert!(m.grounded());
        assert_eq!(m.bounds.y, 64.0 - 32.0);
    }

    #[test]
    fn wall_stops_at_boundary_not_centre() {
        let g = grid_from_rows(&[
            "   #",
            "   #",
        ]);
        let b = Aabb::new(40.0, 0.0, 24.0, 32.0);
        let (out, blocked) = move_x(&g, b, 40.0);
        assert_eq!(blocked, Blocked::RIGHT);
        assert_eq!(out.right(), 96.0);
    }

    #[test]
    fn wall_on_left() {
        let g = grid_from_rows(&[
            "#   ",
        ]);
        let b = Aabb::new(40.0, 0.0, 24.0, 32.0);
        let (out, blocked) = move_x(&g, b, -20.0);
        assert_eq!(blocked, Blocked::LEFT);
        assert_eq!(out.x, 32.0);
    }

    #[test]
    fn fast_mover_does_not_tunnel_through_thin_wall() {
        let g = grid_from_rows(&[
            "    #       ",
        ]);
        // 60 px per tick is almost two tiles.
        let b = Aabb::new(80.0, 0.0, 24.0, 32.0);
        let (out, blocked) = move_x(&g, b, 60.0);
        assert_eq!(blocked, Blocked::RIGHT);
        assert_eq!(out.right(), 128.0);
    }

    #[test]
    fn head_hit_reports_centre_tile() {
        let g = grid_from_rows(&[
            " B? ",
            "    ",
            "    ",
        ]);
        // Box straddles columns 1 and 2, centre in column 2.
        let b = Aabb::new(58.0, 70.0, 24.0, 24.0);
        let m = resolve(&g, b, 0.0, -50.0);
        assert!(m.blocked.contains(Blocked::ABOVE));
        assert_eq!(m.head_hit, Some((2, 0)));
        assert_eq!(m.bounds.y, 32.0);
    }

    #[test]
    fn no_head_hit_through_passable_tiles() {
        let g = grid_from_rows(&[
            " o= ",
            "    ",
            "    ",
        ]);
        let b = Aabb::new(40.0, 70.0, 24.0, 24.0);
        let m = resolve(&g, b, 0.0, -60.0);
        assert!(m.head_hit.is_none());
        assert_eq!(m.bounds.y, 10.0);
    }

    #[test]
    fn bridge_catches_only_from_above() {
        let g = grid_from_rows(&[
            "    ",
            "    ",
            "====",
            "    ",
        ]);
        let above = Aabb::new(10.0, 20.0, 24.0, 32.0);
        let m = resolve(&g, above, 0.0, 20.0);
        assert!(m.grounded());
        assert_eq!(m.bounds.bottom(), 64.0);

        let below = Aabb::new(10.0, 100.0, 24.0, 20.0);
        let m = resolve(&g, below, 0.0, -40.0);
        assert!(!m.blocked.contains(Blocked::ABOVE));
        assert_eq!(m.bounds.y, 60.0);
    }

    #[test]
    fn resting_on_ground_is_not_overlap() {
        let g = grid_from_rows(&[
            "    ",
            "####",
        ]);
        let b = Aabb::new(0.0, 0.0, 24.0, 32.0);
        assert!(!overlaps_solid(&g, &b));
        assert!(has_footing_at(&g, 12.0, b.bottom()));
        let (out, blocked) = move_x(&g, b, 8.0);
        assert!(blocked.is_empty());
        assert_eq!(out.x, 8.0);
    }

    #[test]
    fn falling_off_grid_is_unblocked() {
        let g = grid_from_rows(&["    ", "    "]);
        let b = Aabb::new(0.0, 40.0, 24.0, 32.0);
        let m = resolve(&g, b, 0.0, 12.0);
        assert!(!m.grounded());
        assert_eq!(m.bounds.y, 52.0);
    }

    fn random_grid(cells: &[bool], w: usize, h: usize) -> TileGrid {
        let mut g = TileGrid::new(w, h);
        for (i, solid) in cells.iter().enumerate() {
            if *solid {
                g.set(i % w, i / w, Tile::Hard);
            }
        }
        g
    }

    fn clear_under(g: &mut TileGrid, b: &Aabb) {
        let (c0, c1) = b.col_span();
        let (r0, r1) = b.row_span();
        for r in r0..=r1 {
            for c in c0..=c1 {
                if c >= 0 && r >= 0 {
                    g.set(c as usize, r as usize, Tile::Empty);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn resolve_never_overlaps_or_overshoots(
            cells in prop::collection::vec(prop::bool::weighted(0.3), 12 * 10),
            x in 0.0f32..300.0,
            y in 0.0f32..250.0,
            w in 8.0f32..40.0,
            h in 8.0f32..60.0,
            d in -80.0f32..80.0,
            vertical in any::<bool>(),
        ) {
            let mut g = random_grid(&cells, 12, 10);
            let b = Aabb::new(x, y, w, h);
            clear_under(&mut g, &b);

            let out = if vertical { move_y(&g, b, d).0 } else { move_x(&g, b, d).0 };
            let moved = if vertical { out.y - b.y } else { out.x - b.x };

            prop_assert!(moved * d >= 0.0, "moved against the request: {moved} vs {d}");
            prop_assert!(moved.abs() <= d.abs() + 1e-3, "overshoot: {moved} vs {d}");
            prop_assert!(!overlaps_solid(&g, &out), "ended inside terrain: {out:?}");
        }

        #[test]
        fn thin_wall_always_stops_mover(
            x in 0.0f32..200.0,
            w in 8.0f32..32.0,
            speed in 0.5f32..64.0,
        ) {
            let mut g = TileGrid::new(16, 4);
            g.fill(10, 0, 1, 4, Tile::Brick);
            let wall = 10.0 * TILE;
            let b = Aabb::new(x.min(wall - w), 32.0, w, 32.0);
            let (out, blocked) = move_x(&g, b, speed);
            prop_assert!(out.right() <= wall + 1e-3);
            prop_assert_eq!(blocked.contains(Blocked::RIGHT), b.right() + speed > wall + 1e-3);
        }

        #[test]
        fn all_solid_grid_never_moves_past_request(
            x in 32.0f32..200.0,
            y in 32.0f32..150.0,
            d in -64.0f32..64.0,
            vertical in any::<bool>(),
        ) {
            let mut g = TileGrid::new(12, 10);
            g.fill(0, 0, 12, 10, Tile::Ground);
            let b = Aabb::new(x, y, 24.0, 32.0);
            let out = if vertical { move_y(&g, b, d).0 } else { move_x(&g, b, d).0 };
            let moved = if vertical { out.y - b.y } else { out.x - b.x };
            prop_assert!(moved * d >= 0.0);
            prop_assert!(moved.abs() <= d.abs() + 1e-3);
            // The box never reaches into a column/row it did not already touch.
            prop_assert!(out.col_span().0 >= b.col_span().0 && out.col_span().1 <= b.col_span().1);
            prop_assert!(out.row_span().0 >= b.row_span().0 && out.row_span().1 <= b.row_span().1);
        }
    }
}
