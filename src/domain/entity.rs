/// Tile-locked movement shared by every player, human or AI.
///
/// A `Mover` has two views of its position:
///   - continuous pixel coordinates `(x, y)` for rendering and collision
///   - a discrete `current` tile and a `target` tile
///
/// At rest, `current == target` and `(x, y) == current * tile_size`.
/// `attempt_move` only arms a move; `update` interpolates toward the
/// target at `speed` pixels/second, clamps on arrival, then settles
/// `current = target`. Moves are cardinal only.

use super::grid::{Dir, Grid, TilePos};

/// Frame input for the local human: movement is continuous (held key),
/// bomb placement is edge-triggered (fresh press).
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<Dir>,
    pub place_bomb: bool,
}

#[derive(Clone, Debug)]
pub struct Mover {
    pub x: f32,
    pub y: f32,
    pub current: TilePos,
    pub target: TilePos,
    /// Directional velocity sign per axis: `(dx, dy)`, each in -1..=1.
    pub dx: i32,
    pub dy: i32,
    pub moving: bool,
    /// Pixels per second.
    pub speed: f32,
    tile_size: f32,
}

impl Mover {
    pub fn new(at: TilePos, tile_size: f32, speed: f32) -> Self {
        Mover {
            x: at.col as f32 * tile_size,
            y: at.row as f32 * tile_size,
            current: at,
            target: at,
            dx: 0,
            dy: 0,
            moving: false,
            speed,
            tile_size,
        }
    }

    /// Try to start a one-tile move. Rejected (no state change) when
    /// already moving, when the request is not a single cardinal step,
    /// or when the destination is off-map, Solid or Breakable.
    pub fn attempt_move(&mut self, delta_col: i32, delta_row: i32, grid: &Grid) -> bool {
        if self.moving {
            return false;
        }
        if (delta_col != 0) == (delta_row != 0) {
            return false;
        }
        let dest = TilePos::new(
            self.current.row + delta_row.signum(),
            self.current.col + delta_col.signum(),
        );
        if !grid.is_walkable(dest) {
            return false;
        }
        self.target = dest;
        self.dx = delta_col.signum();
        self.dy = delta_row.signum();
        self.moving = true;
        true
    }

    pub fn attempt_dir(&mut self, dir: Dir, grid: &Grid) -> bool {
        let (dc, dr) = dir.delta();
        self.attempt_move(dc, dr, grid)
    }

    /// Advance the interpolation by `dt` seconds. Returns true on the
    /// frame the mover settles on its target tile.
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.moving {
            return false;
        }
        let step = self.speed * dt;
        let tx = self.target.col as f32 * self.tile_size;
        let ty = self.target.row as f32 * self.tile_size;

        let arrived_x = advance_axis(&mut self.x, self.dx, tx, step);
        let arrived_y = advance_axis(&mut self.y, self.dy, ty, step);

        if arrived_x && arrived_y {
            self.moving = false;
            self.dx = 0;
            self.dy = 0;
            self.current = self.target;
            return true;
        }
        false
    }

    /// Stop mid-step and settle on the nearest tile.
    pub fn halt(&mut self) {
        let at = self.nearest_tile();
        self.x = at.col as f32 * self.tile_size;
        self.y = at.row as f32 * self.tile_size;
        self.current = at;
        self.target = at;
        self.dx = 0;
        self.dy = 0;
        self.moving = false;
    }

    /// Tile nearest the mover's pixel position.
    pub fn nearest_tile(&self) -> TilePos {
        TilePos::new(
            (self.y / self.tile_size).round() as i32,
            (self.x / self.tile_size).round() as i32,
        )
    }
}

/// Move `pos` toward `target` along one axis, clamping on overshoot.
/// An idle axis (`sign == 0`) counts as arrived.
fn advance_axis(pos: &mut f32, sign: i32, target: f32, step: f32) -> bool {
    if sign == 0 {
        return true;
    }
    *pos += sign as f32 * step;
    let reached = if sign > 0 { *pos >= target } else { *pos <= target };
    if reached {
        *pos = target;
    }
    reached
}
