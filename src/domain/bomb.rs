/// Bombs and explosion segments: plain countdown entities.
///
/// A `Bomb` captures its owner's range at placement, so later range
/// upgrades never reach bombs already on the field. Its owner is held
/// by id only and looked up again at detonation.
///
/// An `Explosion` is one tile of blast. Its shape/orientation only
/// pick the sprite; the hazard is simply "this tile, while live".

use super::grid::{Dir, TilePos};

#[derive(Clone, Debug)]
pub struct Bomb {
    pub pos: TilePos,
    pub owner: usize,
    pub range: u32,
    pub timer: f32,
    fuse: f32,
}

impl Bomb {
    pub fn new(pos: TilePos, owner: usize, range: u32, fuse: f32) -> Self {
        Bomb { pos, owner, range, timer: fuse, fuse }
    }

    /// Fraction of the fuse already burnt: 0.0 fresh, 1.0 expired.
    pub fn elapsed_fraction(&self) -> f32 {
        if self.fuse <= 0.0 {
            return 1.0;
        }
        (1.0 - self.timer / self.fuse).clamp(0.0, 1.0)
    }

    /// Chain reaction: another blast reached this bomb. It detonates on
    /// its own next update, never inside the blast that triggered it.
    pub fn ignite(&mut self) {
        self.timer = 0.0;
    }

    /// Advance one frame. Returns true when the fuse has run out.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.timer -= dt;
        self.timer <= 0.0
    }

    pub fn sprite(&self) -> &'static str {
        if self.elapsed_fraction() >= 0.66 { "bomb_lit" } else { "bomb" }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl From<Dir> for Orientation {
    fn from(d: Dir) -> Self {
        if d.is_horizontal() { Orientation::Horizontal } else { Orientation::Vertical }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlastShape {
    Center,
    Arm(Orientation),
    End(Orientation),
}

#[derive(Clone, Debug)]
pub struct Explosion {
    pub pos: TilePos,
    pub shape: BlastShape,
    pub timer: f32,
}

impl Explosion {
    pub fn new(pos: TilePos, shape: BlastShape, lifetime: f32) -> Self {
        Explosion { pos, shape, timer: lifetime }
    }

    /// Advance one frame. Returns true once the blast has faded.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.timer -= dt;
        self.timer <= 0.0
    }

    pub fn is_live(&self) -> bool {
        self.timer > 0.0
    }

    pub fn sprite(&self) -> &'static str {
        match self.shape {
            BlastShape::Center => "explosion_center",
            BlastShape::Arm(Orientation::Horizontal) => "explosion_horizontal",
            BlastShape::Arm(Orientation::Vertical) => "explosion_vertical",
            BlastShape::End(Orientation::Horizontal) => "explosion_end_horizontal",
            BlastShape::End(Orientation::Vertical) => "explosion_end_vertical",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bomb_counts_down_to_detonation() {
        let mut b = Bomb::new(TilePos::new(1, 1), 0, 2, 3.0);
        assert!(!b.tick(1.0));
        assert!((b.elapsed_fraction() - 1.0 / 3.0).abs() < 1e-4);
        assert!(!b.tick(1.5));
        assert!(b.tick(0.5));
        assert!((b.elapsed_fraction() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn ignite_zeroes_the_fuse_but_does_not_detonate_by_itself() {
        let mut b = Bomb::new(TilePos::new(1, 1), 0, 2, 3.0);
        b.ignite();
        assert_eq!(b.timer, 0.0);
        // Detonation is reported by the next tick, whatever dt is.
        assert!(b.tick(0.0));
    }

    #[test]
    fn explosion_lifetime() {
        let mut e = Explosion::new(TilePos::new(2, 2), BlastShape::Center, 0.5);
        assert!(e.is_live());
        assert!(!e.tick(0.3));
        assert!(e.tick(0.3));
        assert!(!e.is_live());
    }

    #[test]
    fn orientation_follows_direction() {
        assert_eq!(Orientation::from(Dir::Left), Orientation::Horizontal);
        assert_eq!(Orientation::from(Dir::Down), Orientation::Vertical);
    }
}
