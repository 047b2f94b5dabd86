/// Terminal renderer: double-buffered and diff-based.
///
///   1. Compose the frame into `front` (one `Cell` per terminal column)
///   2. Compare against `back`, the frame currently on screen
///   3. Queue commands only for changed cells, flush once
///   4. Swap
///
/// One tile is two terminal columns by one row. Entities are placed on
/// the cell containing their centre, so motion is quantized to tiles
/// while the simulation keeps full pixel precision.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use sidescroller::domain::entity::{EffectKind, EnemyKind, EnemyState, ItemKind, PlayerMode, PowerState};
use sidescroller::domain::grid::{to_tile, TILE};
use sidescroller::domain::tile::Tile;
use sidescroller::sim::level::LevelType;
use sidescroller::sim::session::{Phase, Session};
use sidescroller::sim::world::WorldState;

// ── Cell ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never produced by composition, so a back buffer full of these
    /// forces every cell to repaint.
    const INVALID: Cell = Cell { ch: '\u{0}', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Background of an existing cell, so sprites keep the sky behind them.
    fn bg_at(&self, x: usize, y: usize) -> Color {
        self.get(x, y).bg
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Two-column glyph for one tile, keeping the background.
    fn put_sprite(&mut self, x: usize, y: usize, glyph: [char; 2], fg: Color) {
        for (i, ch) in glyph.into_iter().enumerate() {
            let bg = self.bg_at(x + i, y);
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Layout ──

const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.fit_terminal()?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn fit_terminal(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize == self.term_w && th as usize == self.term_h {
            return Ok(());
        }
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))
    }

    pub fn render(&mut self, session: &Session, paused: bool) -> io::Result<()> {
        self.fit_terminal()?;
        self.front.cells.fill(Cell::BLANK);

        self.compose_hud(session);
        self.compose_level(&session.state);

        match session.phase {
            Phase::GameOver => self.compose_banner("GAME OVER", "[Enter] new game  [Q] quit"),
            Phase::Won => self.compose_banner("THANK YOU FOR PLAYING", "[Enter] new game  [Q] quit"),
            Phase::Playing | Phase::Dying { .. } if paused => self.compose_banner("PAUSED", "[P] resume"),
            _ => {}
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose ──

    fn compose_hud(&mut self, s: &Session) {
        let hud = format!(
            " WORLD {}-{}  SCORE {:06}  HI {:06}  COINS x{:02}  LIVES x{}  TIME {:03} ",
            s.world,
            s.level,
            s.score,
            s.high_score.max(s.score),
            s.coins,
            s.lives,
            s.time_left_secs()
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, Cell::BASE_BG);
    }

    fn compose_level(&mut self, w: &WorldState) {
        let view_cols = (self.term_w / CELL_W).min(to_tile(w.camera.view_w).max(1) as usize);
        let view_rows = self.term_h.saturating_sub(MAP_ROW).min(w.grid.height());
        let first_col = to_tile(w.camera.x).max(0) as usize;
        let sky = sky_color(w.level_type);

        // Terrain
        for row in 0..view_rows {
            for vc in 0..view_cols {
                let col = first_col + vc;
                let (glyph, fg, bg) = tile_look(w.grid.get(col, row), sky, w.tick);
                let x = vc * CELL_W;
                let y = MAP_ROW + row;
                // Bumped blocks flash.
                let fg = if w.blocks.bump_offset(col, row) < 0.0 { Color::White } else { fg };
                let glyph = if w.grid.get(col, row) == Tile::Coin && w.blocks.is_collected(col, row) {
                    [' ', ' ']
                } else {
                    glyph
                };
                self.front.set(x, y, Cell::new(glyph[0], fg, bg));
                self.front.set(x + 1, y, Cell::new(glyph[1], fg, bg));
            }
        }

        let to_screen = |px: f32, py: f32| -> Option<(usize, usize)> {
            let col = to_tile(px) - first_col as i32;
            let row = to_tile(py);
            if col < 0 || row < 0 || col as usize >= view_cols || row as usize >= view_rows {
                None
            } else {
                Some((col as usize * CELL_W, MAP_ROW + row as usize))
            }
        };

        for item in &w.items {
            let b = item.bounds();
            if let Some((x, y)) = to_screen(b.center_x(), b.center_y()) {
                let (glyph, fg) = match item.kind {
                    ItemKind::Mushroom => (['(', ')'], Color::Red),
                    ItemKind::FireFlower => (['{', '}'], Color::DarkYellow),
                    ItemKind::Star => (['*', '*'], Color::Yellow),
                    ItemKind::OneUp => (['(', ')'], Color::Green),
                };
                self.front.put_sprite(x, y, glyph, fg);
            }
        }

        for e in &w.enemies {
            if e.is_hidden() {
                continue;
            }
            let b = e.bounds();
            let Some((x, y)) = to_screen(b.center_x(), b.center_y()) else {
                continue;
            };
            let glyph = match (e.kind, e.state) {
                (_, EnemyState::Squashed { .. }) => ['_', '_'],
                (_, EnemyState::Knocked) => ['x', 'x'],
                (_, EnemyState::ShellIdle { .. } | EnemyState::ShellSliding) => ['[', ']'],
                (EnemyKind::Walker, _) => ['@', '@'],
                (EnemyKind::Koopa, _) => ['K', 'o'],
                (EnemyKind::Beetle, _) => ['B', 'e'],
                (EnemyKind::Piranha, _) => ['V', 'V'],
            };
            let fg = match e.kind {
                EnemyKind::Walker => Color::DarkYellow,
                EnemyKind::Koopa => Color::Green,
                EnemyKind::Beetle => Color::DarkBlue,
                EnemyKind::Piranha => Color::Red,
            };
            self.front.put_sprite(x, y, glyph, fg);
        }

        for f in &w.fireballs {
            let b = f.bounds();
            if let Some((x, y)) = to_screen(b.center_x(), b.center_y()) {
                self.front.put_sprite(x, y, ['o', ' '], Color::DarkYellow);
            }
        }

        self.compose_player(w, &to_screen);

        for fx in &w.effects {
            let Some((x, y)) = to_screen(fx.x, fx.y) else {
                continue;
            };
            match fx.kind {
                EffectKind::Particle => self.front.put_sprite(x, y, ['.', '\''], Color::DarkYellow),
                EffectKind::CoinBounce => self.front.put_sprite(x, y, ['$', ' '], Color::Yellow),
                EffectKind::ScorePopup { points } => {
                    let text = points.to_string();
                    for (i, ch) in text.chars().enumerate() {
                        let bg = self.front.bg_at(x + i, y);
                        self.front.set(x + i, y, Cell::new(ch, Color::White, bg));
                    }
                }
            }
        }
    }

    fn compose_player(&mut self, w: &WorldState, to_screen: &dyn Fn(f32, f32) -> Option<(usize, usize)>) {
        let p = &w.player;
        // Blink while invulnerable after a hit.
        if p.mode == PlayerMode::Playing && p.invuln_timer > 0 && (p.invuln_timer / 4) % 2 == 0 {
            return;
        }
        let fg = if p.has_star() {
            rainbow(w.tick)
        } else {
            match p.power {
                PowerState::Small => Color::Red,
                PowerState::Big => Color::Magenta,
                PowerState::Fire => Color::White,
            }
        };
        let b = p.bounds();
        let head = if p.mode == PlayerMode::Dying { ['x', 'x'] } else { ['M', 'M'] };
        if p.power == PowerState::Small {
            if let Some((x, y)) = to_screen(b.center_x(), b.center_y()) {
                self.front.put_sprite(x, y, head, fg);
            }
        } else {
            if let Some((x, y)) = to_screen(b.center_x(), b.y + TILE / 2.0) {
                self.front.put_sprite(x, y, head, fg);
            }
            if let Some((x, y)) = to_screen(b.center_x(), b.bottom() - TILE / 2.0) {
                self.front.put_sprite(x, y, ['|', '|'], fg);
            }
        }
    }

    fn compose_banner(&mut self, title: &str, hint: &str) {
        let mid = MAP_ROW + 5;
        let width = title.len().max(hint.len()) + 6;
        let x0 = self.term_w.saturating_sub(width) / 2;
        for dy in 0..4 {
            self.front.put_str(x0, mid + dy, &" ".repeat(width), Color::White, Color::Black);
        }
        self.front.put_str(x0 + (width - title.len()) / 2, mid + 1, title, Color::Yellow, Color::Black);
        self.front.put_str(x0 + (width - hint.len()) / 2, mid + 2, hint, Color::Grey, Color::Black);
    }
}

// ── Palette ──

fn sky_color(level_type: LevelType) -> Color {
    match level_type {
        LevelType::Overworld | LevelType::Athletic => Color::Rgb { r: 92, g: 148, b: 252 },
        LevelType::Night | LevelType::Underground | LevelType::Castle => Color::Black,
    }
}

fn tile_look(tile: Tile, sky: Color, tick: u64) -> ([char; 2], Color, Color) {
    let brown = Color::Rgb { r: 200, g: 76, b: 12 };
    match tile {
        Tile::Empty | Tile::Invisible => ([' ', ' '], Color::White, sky),
        Tile::Ground => (['▓', '▓'], brown, sky),
        Tile::UndergroundGround => (['▓', '▓'], Color::DarkCyan, sky),
        Tile::Brick => (['▤', '▤'], brown, sky),
        Tile::UndergroundBrick => (['▤', '▤'], Color::Cyan, sky),
        Tile::Question => {
            let face = if (tick / 16) % 2 == 0 { Color::Yellow } else { Color::DarkYellow };
            (['?', '?'], Color::Black, face)
        }
        Tile::Used => (['▒', '▒'], Color::DarkYellow, sky),
        Tile::Hard => (['█', '█'], Color::Grey, sky),
        Tile::PipeTopLeft => (['[', '='], Color::Green, sky),
        Tile::PipeTopRight => (['=', ']'], Color::Green, sky),
        Tile::PipeLeft => ([' ', '|'], Color::Green, Color::DarkGreen),
        Tile::PipeRight => (['|', ' '], Color::Green, Color::DarkGreen),
        Tile::Flagpole => ([' ', '|'], Color::Grey, sky),
        Tile::FlagTop => (['<', '|'], Color::Green, sky),
        Tile::Castle => (['▚', '▚'], Color::DarkGrey, sky),
        Tile::CastleDoor => (['▐', '▌'], Color::Black, Color::Black),
        Tile::Coin => (['$', ' '], Color::Yellow, sky),
        Tile::Bridge => (['=', '='], Color::DarkYellow, sky),
        Tile::Lava => (['~', '~'], Color::Yellow, Color::DarkRed),
        Tile::Cloud => (['░', '░'], Color::White, sky),
        Tile::Vine => (['§', ' '], Color::Green, sky),
        Tile::Platform => (['▔', '▔'], Color::White, sky),
    }
}

fn rainbow(tick: u64) -> Color {
    const CYCLE: [Color; 4] = [Color::Red, Color::Yellow, Color::Green, Color::Cyan];
    CYCLE[((tick / 4) % CYCLE.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invisible_blocks_draw_as_sky() {
        let sky = sky_color(LevelType::Overworld);
        assert_eq!(tile_look(Tile::Invisible, sky, 0), tile_look(Tile::Empty, sky, 0));
    }

    #[test]
    fn sprites_keep_background() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.set(0, 0, Cell::new(' ', Color::White, Color::Blue));
        fb.put_sprite(0, 0, ['M', 'M'], Color::Red);
        assert_eq!(fb.get(0, 0).bg, Color::Blue);
        assert_eq!(fb.get(0, 0).ch, 'M');
    }

    #[test]
    fn hud_shows_high_score() {
        let mut session = Session::new(sidescroller::config::GameConfig::default());
        session.score = 700;
        session.high_score = 4200;
        let mut r = Renderer::new();
        r.term_w = 100;
        r.front.resize(100, 2);
        r.compose_hud(&session);
        let row: String = (0..100).map(|x| r.front.get(x, HUD_ROW).ch).collect();
        assert!(row.contains("SCORE 000700"));
        assert!(row.contains("HI 004200"));
    }

    #[test]
    fn writes_outside_buffer_are_ignored() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.put_str(1, 1, "abc", Color::White, Color::Black);
        assert_eq!(fb.get(1, 1).ch, 'a');
        assert!(fb.get(5, 5) == Cell::BLANK);
    }
}
