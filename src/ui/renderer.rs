/// Terminal view of the arena, title and game-over screens.
///
/// Each frame is composed into `front`, compared cell by cell against
/// `back` (what the terminal already shows), and only changed cells are
/// queued. One flush per frame, then the buffers swap.
///
/// Entities only hand over sprite names ("bomb", "explosion_center", ...).
/// The `SpriteSheet` maps each name to a two-column glyph, so one arena
/// tile is two terminal columns wide.

use std::collections::HashMap;
use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::grid::TilePos;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, also used
    /// for `Clear` so the gaps between rows match.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

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
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Sprite sheet: logical name → glyph ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Glyph {
    pub chars: [char; 2],
    pub fg: Color,
    pub bg: Color,
}

const fn glyph(a: char, b: char, fg: Color, bg: Color) -> Glyph {
    Glyph { chars: [a, b], fg, bg }
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

pub struct SpriteSheet {
    glyphs: HashMap<&'static str, Glyph>,
}

impl SpriteSheet {
    const MISSING: Glyph = glyph('?', '?', Color::Magenta, Color::Reset);

    pub fn new() -> Self {
        let fire = rgb(120, 30, 0);
        let entries = [
            ("floor", glyph(' ', ' ', Color::Reset, Color::Reset)),
            ("wall", glyph('█', '█', rgb(120, 120, 120), rgb(70, 70, 70))),
            ("block", glyph('▒', '▒', rgb(180, 120, 60), rgb(100, 65, 30))),
            ("powerup_bomb", glyph('+', 'B', rgb(255, 220, 50), Color::Reset)),
            ("powerup_range", glyph('+', 'R', rgb(255, 120, 40), Color::Reset)),
            ("powerup_speed", glyph('+', 'S', rgb(80, 220, 255), Color::Reset)),
            ("bomb", glyph('(', ')', rgb(200, 200, 200), Color::Reset)),
            ("bomb_lit", glyph('(', ')', rgb(255, 60, 60), Color::Reset)),
            ("explosion_center", glyph('▓', '▓', rgb(255, 240, 120), fire)),
            ("explosion_horizontal", glyph('═', '═', rgb(255, 200, 60), fire)),
            ("explosion_vertical", glyph('║', '║', rgb(255, 200, 60), fire)),
            ("explosion_end_horizontal", glyph('─', '─', rgb(255, 140, 40), fire)),
            ("explosion_end_vertical", glyph('│', '│', rgb(255, 140, 40), fire)),
            ("player_human", glyph('◄', '►', rgb(80, 255, 80), Color::Reset)),
            ("player_ai_1", glyph('[', ']', rgb(255, 90, 90), Color::Reset)),
            ("player_ai_2", glyph('[', ']', rgb(90, 160, 255), Color::Reset)),
            ("player_ai_3", glyph('[', ']', rgb(230, 120, 255), Color::Reset)),
        ];
        SpriteSheet { glyphs: entries.into_iter().collect() }
    }

    pub fn get(&self, name: &str) -> Glyph {
        self.glyphs.get(name).copied().unwrap_or(Self::MISSING)
    }
}

// ── Renderer ──

/// Each arena tile = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MAP_COL: usize = 2;

const HUD_BG: Color = rgb(20, 20, 60);
const ACCENT: Color = rgb(255, 200, 50);
const GOOD: Color = rgb(80, 255, 80);
const BAD: Color = rgb(255, 60, 60);

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    sprites: SpriteSheet,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            sprites: SpriteSheet::new(),
            term_w: 0,
            term_h: 0,
            last_phase: None,
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
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back differs from front everywhere.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change: clear for a clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, world: &WorldState) {
        self.front.clear();
        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Instructions => self.compose_instructions(),
            Phase::Playing => self.compose_game(world),
            Phase::GameOverWin | Phase::GameOverLose => {
                self.compose_game(world);
                self.compose_game_over(world);
            }
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        // Position of the terminal cursor, if known.
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

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

    // ── Compose: arena ──

    fn draw_sprite(&mut self, pos: TilePos, name: &str) {
        if pos.row < 0 || pos.col < 0 { return; }
        let g = self.sprites.get(name);
        let row = MAP_ROW + pos.row as usize;
        let col = MAP_COL + pos.col as usize * CELL_W;
        self.front.set(col, row, Cell::new(g.chars[0], g.fg, g.bg));
        self.front.set(col + 1, row, Cell::new(g.chars[1], g.fg, g.bg));
    }

    fn compose_game(&mut self, w: &WorldState) {
        self.compose_hud(w);

        // Layers, bottom to top: tiles, bombs, explosions, players.
        for pos in w.grid.positions() {
            let tile = w.grid.get(pos).unwrap_or_default();
            self.draw_sprite(pos, tile.sprite());
        }
        for b in &w.bombs {
            self.draw_sprite(b.pos, b.sprite());
        }
        for e in &w.explosions {
            self.draw_sprite(e.pos, e.sprite());
        }
        let blink_off = (w.anim_tick / 4) % 2 == 1;
        for p in w.players.iter().filter(|p| p.is_alive()) {
            if p.immunity_remaining > 0.0 && blink_off { continue; }
            self.draw_sprite(p.occupied_tile(), p.sprite());
        }

        let help_row = MAP_ROW + w.grid.rows + 1;
        let help = " ←→↑↓/WASD Move   SPACE/X Bomb   ESC Title   │  Pad: D-pad  A/X Bomb";
        self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_hud(&mut self, w: &WorldState) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let Some(me) = w.human() else { return };
        let hearts: String = "♥".repeat(me.lives as usize);
        let hud = format!(
            " BLAST GRID  Lives:{:<5} Bombs:{}/{}  Range:{}  Speed:{:<4}  Rivals:{}  {:>4.0}s ",
            hearts,
            me.max_bombs - me.bombs_in_flight.min(me.max_bombs),
            me.max_bombs,
            me.bomb_range,
            me.mover.speed,
            w.living_ais(),
            w.match_time,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    // ── Static screens ──

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r"  ___  _            _      ___      _     _ ",
            r" | _ )| | __ _  ___| |_   / __|_ _ (_) __| |",
            r" | _ \| |/ _` |(_-<|  _| | (_ | '_|| |/ _` |",
            r" |___/|_|\__,_|/__/ \__|  \___|_|  |_|\__,_|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, ACCENT, Color::Reset);
        }
        self.front.put_str(8, 7, "━━━ bombs, blocks and three hungry bots ━━━", rgb(180, 140, 50), Color::Reset);

        if let Some(err) = &w.init_error {
            self.front.put_str(4, 10, "✕ Could not start:", BAD, Color::Reset);
            let max = self.front.width.saturating_sub(8).max(1);
            let chars: Vec<char> = err.chars().collect();
            for (i, chunk) in chars.chunks(max).take(4).enumerate() {
                let line: String = chunk.iter().collect();
                self.front.put_str(6, 11 + i, &line, Color::White, Color::Reset);
            }
            self.front.put_str(4, 16, "Fix config.toml and relaunch.   Q  Quit", Color::DarkGrey, Color::Reset);
            return;
        }

        self.front.put_str(8, 10, "ENTER   Start", GOOD, Color::Reset);
        self.front.put_str(8, 11, "  Q     Quit", Color::White, Color::Reset);
        if w.matches_played > 0 {
            let played = format!("Matches played: {}", w.matches_played);
            self.front.put_str(8, 13, &played, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_instructions(&mut self) {
        self.front.put_str(4, 1, "How to play", ACCENT, Color::Reset);
        let lines = [
            "Blow up the blocks, grab power-ups and be the last one standing.",
            "",
            "  ←→↑↓ / WASD   Move one tile",
            "  SPACE / X     Drop a bomb",
            "  ESC           Back to title",
            "",
            "Bombs explode in a cross. Walls stop the blast; blocks absorb it.",
            "A blast that reaches another bomb sets it off too.",
            "After a hit you blink and are safe for a moment.",
        ];
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(4, 3 + i, line, Color::White, Color::Reset);
        }

        let legend = [
            ("powerup_bomb", "one more bomb at a time"),
            ("powerup_range", "longer blast"),
            ("powerup_speed", "faster steps"),
        ];
        for (i, (name, text)) in legend.iter().enumerate() {
            let g = self.sprites.get(name);
            let row = 14 + i;
            self.front.set(6, row, Cell::new(g.chars[0], g.fg, g.bg));
            self.front.set(7, row, Cell::new(g.chars[1], g.fg, g.bg));
            self.front.put_str(10, row, text, Color::White, Color::Reset);
        }
        self.front.put_str(4, 18, "▸ ENTER: Fight!", GOOD, Color::Reset);
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let won = w.phase == Phase::GameOverWin;
        let (label, color) = if won {
            ("║        ★  YOU  WIN  ★         ║", ACCENT)
        } else {
            ("║        ✕  GAME OVER  ✕        ║", BAD)
        };
        let top = MAP_ROW + w.grid.rows / 2 - 1;
        let box_art = [
            "╔═══════════════════════════════╗",
            label,
            "║   ENTER / ESC: Back to Title  ║",
            "╚═══════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(MAP_COL + 2, top + i, l, color, rgb(10, 10, 20));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bomb::Bomb;
    use crate::domain::player::PlayerKind;

    fn renderer(w: usize, h: usize) -> Renderer {
        let mut r = Renderer::new();
        r.front.resize(w, h);
        r
    }

    #[test]
    fn every_entity_sprite_is_in_the_sheet() {
        let sheet = SpriteSheet::new();
        for name in [
            "floor", "wall", "block", "bomb", "bomb_lit", "explosion_center",
            "explosion_end_vertical", "player_human", "player_ai_3", "powerup_speed",
        ] {
            assert_ne!(sheet.get(name), SpriteSheet::MISSING, "{name}");
        }
        assert_eq!(sheet.get("nope"), SpriteSheet::MISSING);
    }

    #[test]
    fn arena_draws_two_columns_per_tile() {
        let mut w = WorldState::from_rows(&[
            "#####",
            "#   #",
            "#####",
        ]);
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.bombs.push(Bomb::new(TilePos::new(1, 3), 0, 1, 3.0));
        let mut r = renderer(80, 10);
        r.compose(&w);

        let row = r.front.row_text(MAP_ROW + 1);
        assert_eq!(&row[..MAP_COL], "  ");
        let arena: String = row.chars().skip(MAP_COL).take(10).collect();
        assert_eq!(arena, "██◄►  ()██");
        assert!(r.front.row_text(HUD_ROW).contains("Lives:♥♥♥"));
    }

    #[test]
    fn title_shows_init_error() {
        let err = anyhow::anyhow!("bad rows");
        let w = WorldState::failed(&err);
        let mut r = renderer(80, 24);
        r.compose(&w);
        assert!(r.front.row_text(10).contains("Could not start"));
        assert!(r.front.row_text(11).contains("bad rows"));
        assert!(!(0..24).any(|y| r.front.row_text(y).contains("ENTER   Start")));
    }

    #[test]
    fn game_over_banner_matches_outcome() {
        let mut w = WorldState::from_rows(&["#########"; 9]);
        w.phase = Phase::GameOverWin;
        let mut r = renderer(80, 20);
        r.compose(&w);
        assert!((0..20).any(|y| r.front.row_text(y).contains("YOU  WIN")));

        w.phase = Phase::GameOverLose;
        r.compose(&w);
        assert!((0..20).any(|y| r.front.row_text(y).contains("GAME OVER")));
    }
}
