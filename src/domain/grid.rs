/// The arena grid: a fixed `[row][col]` array of tiles.
///
/// ## Layout invariants
///
///   - The outer border is Solid.
///   - Every cell at an even row AND even column is Solid.
///   - Those cells are fixed at generation time and never change.
///   - Only Breakable cells ever change, exactly once, to Empty.
///
/// Spawn corners sit one cell in from each corner. Their 3×3
/// neighbourhoods never receive Breakable blocks, so every spawn point
/// is always legally occupiable with at least one free step out.

use rand::Rng;

use super::tile::{PowerUpKind, Tile, TileKind};

/// Discrete tile coordinate. Signed so neighbour arithmetic can step
/// off the map and be rejected by a bounds check.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TilePos {
    pub row: i32,
    pub col: i32,
}

impl TilePos {
    pub const fn new(row: i32, col: i32) -> Self {
        TilePos { row, col }
    }

    pub fn step(self, dir: Dir) -> TilePos {
        let (dcol, drow) = dir.delta();
        TilePos { row: self.row + drow, col: self.col + dcol }
    }

    pub fn offset(self, dir: Dir, n: i32) -> TilePos {
        let (dcol, drow) = dir.delta();
        TilePos { row: self.row + drow * n, col: self.col + dcol * n }
    }

    pub fn manhattan(self, other: TilePos) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    /// Cardinal direction from `self` to an adjacent tile.
    pub fn dir_to(self, next: TilePos) -> Option<Dir> {
        Dir::ALL.into_iter().find(|&d| self.step(d) == next)
    }
}

/// Cardinal direction. `ALL` is the fixed exploration order used by the
/// pathfinder for tie-breaking: up, down, left, right.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    /// `(delta_col, delta_row)`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Dir::Left | Dir::Right)
    }
}

#[derive(Clone, Debug)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<Vec<Tile>>,
}

// ── Generation ──

impl Grid {
    /// Build a fresh arena. `density` is the chance that a non-fixed,
    /// non-spawn cell receives a Breakable block.
    pub fn generate<R: Rng>(rows: usize, cols: usize, density: f64, rng: &mut R) -> Self {
        let spawns = spawn_corners(rows, cols);
        let density = density.clamp(0.0, 1.0);
        let mut cells = vec![vec![Tile::EMPTY; cols]; rows];

        for (r, row) in cells.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                if is_fixed_wall(rows, cols, r, c) {
                    *cell = Tile::SOLID;
                    continue;
                }
                let pos = TilePos::new(r as i32, c as i32);
                let near_spawn = spawns.iter().any(|s| {
                    (s.row - pos.row).abs() <= 1 && (s.col - pos.col).abs() <= 1
                });
                if !near_spawn && rng.gen_bool(density) {
                    *cell = Tile::BREAKABLE;
                }
            }
        }

        Grid { rows, cols, cells }
    }
}

/// Border cells and even/even cells are permanent walls.
pub fn is_fixed_wall(rows: usize, cols: usize, r: usize, c: usize) -> bool {
    r == 0 || c == 0 || r + 1 == rows || c + 1 == cols || (r % 2 == 0 && c % 2 == 0)
}

/// The four spawn points, in player order: top-left first (the human),
/// then top-right, bottom-left, bottom-right.
pub fn spawn_corners(rows: usize, cols: usize) -> [TilePos; 4] {
    let last_r = rows as i32 - 2;
    let last_c = cols as i32 - 2;
    [
        TilePos::new(1, 1),
        TilePos::new(1, last_c),
        TilePos::new(last_r, 1),
        TilePos::new(last_r, last_c),
    ]
}

// ── Queries ──

impl Grid {
    #[inline]
    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.row >= 0 && pos.col >= 0
            && (pos.row as usize) < self.rows
            && (pos.col as usize) < self.cols
    }

    /// Tile at `pos`, or `None` when off the map.
    #[inline]
    pub fn get(&self, pos: TilePos) -> Option<Tile> {
        if self.in_bounds(pos) {
            Some(self.cells[pos.row as usize][pos.col as usize])
        } else {
            None
        }
    }

    /// Out of bounds reads as Solid.
    #[inline]
    pub fn kind(&self, pos: TilePos) -> TileKind {
        self.get(pos).map_or(TileKind::Solid, |t| t.kind)
    }

    #[inline]
    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.get(pos).is_some_and(|t| t.is_walkable())
    }

    pub fn positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.rows).flat_map(move |r| {
            (0..self.cols).map(move |c| TilePos::new(r as i32, c as i32))
        })
    }
}

// ── Mutation ──
//
// The only two transitions the arena allows: a Breakable block becomes
// Empty (optionally leaving a power-up), and a power-up is picked up.

impl Grid {
    /// Destroy the Breakable block at `pos`. Returns false (no change)
    /// for anything that is not currently Breakable.
    pub fn break_block(&mut self, pos: TilePos, drop: Option<PowerUpKind>) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let cell = &mut self.cells[pos.row as usize][pos.col as usize];
        if cell.kind != TileKind::Breakable {
            return false;
        }
        *cell = Tile { kind: TileKind::Empty, power_up: drop };
        true
    }

    /// Remove and return the power-up lying at `pos`, if any.
    pub fn take_power_up(&mut self, pos: TilePos) -> Option<PowerUpKind> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells[pos.row as usize][pos.col as usize].power_up.take()
    }
}

// ── Test helpers ──

#[cfg(test)]
impl Grid {
    /// Build a grid from an ASCII diagram.
    /// Legend:  '#'=Solid  '+'=Breakable  'b'/'r'/'s'=power-up on Empty
    ///          anything else = Empty
    pub fn parse(rows: &[&str]) -> Self {
        let cells: Vec<Vec<Tile>> = rows.iter().map(|row| {
            row.chars().map(|ch| match ch {
                '#' => Tile::SOLID,
                '+' => Tile::BREAKABLE,
                'b' => Tile { kind: TileKind::Empty, power_up: Some(PowerUpKind::BombCapacity) },
                'r' => Tile { kind: TileKind::Empty, power_up: Some(PowerUpKind::Range) },
                's' => Tile { kind: TileKind::Empty, power_up: Some(PowerUpKind::Speed) },
                _ => Tile::EMPTY,
            }).collect()
        }).collect();
        Grid { rows: cells.len(), cols: cells[0].len(), cells }
    }
}
