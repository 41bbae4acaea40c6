/// Player: a `Mover` plus resources, damage timing and power-ups.
///
/// Humans and AIs share this struct. `kind` is fixed at construction;
/// an AI additionally carries an `AiBrain` with its transient decision
/// state (mode, cached path, cooldown, target id).

use super::ai::AiBrain;
use super::bomb::Bomb;
use super::entity::Mover;
use super::grid::TilePos;
use super::tile::PowerUpKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerKind {
    Human,
    Ai,
}

/// Starting values and fixed increments, copied out of the config.
#[derive(Clone, Copy, Debug)]
pub struct PlayerStats {
    pub speed: f32,
    pub speed_increment: f32,
    pub max_bombs: u32,
    pub bomb_range: u32,
    pub lives: u32,
    pub immunity: f32,
}

/// What `take_damage` did, for the caller to turn into events.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hit {
    Immune,
    Wounded,
    Killed,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: usize,
    kind: PlayerKind,
    pub mover: Mover,
    pub max_bombs: u32,
    pub bombs_in_flight: u32,
    pub bomb_range: u32,
    pub lives: u32,
    dead: bool,
    pub immunity_remaining: f32,
    immunity_grant: f32,
    speed_increment: f32,
    /// `Some` for every AI player. Taken out while the brain thinks.
    pub brain: Option<AiBrain>,
}

impl Player {
    pub fn new(id: usize, kind: PlayerKind, at: TilePos, tile_size: f32, stats: &PlayerStats) -> Self {
        Player {
            id,
            kind,
            mover: Mover::new(at, tile_size, stats.speed),
            max_bombs: stats.max_bombs,
            bombs_in_flight: 0,
            bomb_range: stats.bomb_range,
            lives: stats.lives,
            dead: false,
            immunity_remaining: 0.0,
            immunity_grant: stats.immunity,
            speed_increment: stats.speed_increment,
            brain: match kind {
                PlayerKind::Ai => Some(AiBrain::new()),
                PlayerKind::Human => None,
            },
        }
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    pub fn is_ai(&self) -> bool {
        self.kind == PlayerKind::Ai
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    pub fn tile(&self) -> TilePos {
        self.mover.current
    }

    /// Tile used for blast and pickup overlap: nearest to the pixel centre.
    pub fn occupied_tile(&self) -> TilePos {
        self.mover.nearest_tile()
    }

    pub fn has_spare_bomb(&self) -> bool {
        self.bombs_in_flight < self.max_bombs
    }

    /// Advance timers and movement. Returns true if the player settled
    /// on a new tile this frame. AI decisions run separately in `sim::step`.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.dead {
            return false;
        }
        if self.immunity_remaining > 0.0 {
            self.immunity_remaining = (self.immunity_remaining - dt).max(0.0);
        }
        self.mover.update(dt)
    }

    /// Would `place_bomb` succeed right now?
    pub fn can_place_bomb(&self, bombs: &[Bomb]) -> bool {
        let here = self.tile();
        !self.dead && self.has_spare_bomb() && !bombs.iter().any(|b| b.pos == here)
    }

    /// Drop a bomb on `current` (not `target`: a mid-step player drops
    /// where it is coming from). Range is captured now.
    pub fn place_bomb(&mut self, bombs: &[Bomb], fuse: f32) -> Option<Bomb> {
        if !self.can_place_bomb(bombs) {
            return None;
        }
        self.bombs_in_flight += 1;
        Some(Bomb::new(self.tile(), self.id, self.bomb_range, fuse))
    }

    /// Credit back one bomb after detonation. Floors at zero.
    pub fn bomb_returned(&mut self) {
        self.bombs_in_flight = self.bombs_in_flight.saturating_sub(1);
    }

    pub fn take_damage(&mut self) -> Hit {
        if self.dead || self.immunity_remaining > 0.0 {
            return Hit::Immune;
        }
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.dead = true;
            self.mover.halt();
            return Hit::Killed;
        }
        self.immunity_remaining = self.immunity_grant;
        Hit::Wounded
    }

    pub fn apply_power_up(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::BombCapacity => self.max_bombs += 1,
            PowerUpKind::Range => self.bomb_range += 1,
            PowerUpKind::Speed => self.mover.speed += self.speed_increment,
        }
    }

    pub fn sprite(&self) -> &'static str {
        match (self.kind, self.id) {
            (PlayerKind::Human, _) => "player_human",
            (PlayerKind::Ai, 1) => "player_ai_1",
            (PlayerKind::Ai, 2) => "player_ai_2",
            (PlayerKind::Ai, _) => "player_ai_3",
        }
    }
}

#[cfg(test)]
pub(crate) fn test_stats() -> PlayerStats {
    PlayerStats {
        speed: 128.0,
        speed_increment: 32.0,
        max_bombs: 1,
        bomb_range: 2,
        lives: 3,
        immunity: 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Grid;

    fn human_at(row: i32, col: i32) -> Player {
        Player::new(0, PlayerKind::Human, TilePos::new(row, col), 32.0, &test_stats())
    }

    #[test]
    fn kind_and_brain_agree() {
        let ai = Player::new(1, PlayerKind::Ai, TilePos::new(1, 1), 32.0, &test_stats());
        assert!(ai.is_ai());
        assert!(ai.brain.is_some());
        let h = human_at(1, 1);
        assert!(!h.is_ai());
        assert!(h.brain.is_none());
    }

    #[test]
    fn capacity_limits_placement() {
        let mut p = human_at(1, 1);
        let first = p.place_bomb(&[], 3.0).expect("first bomb");
        assert_eq!(p.bombs_in_flight, 1);
        assert!(p.place_bomb(&[first.clone()], 3.0).is_none());
        p.bomb_returned();
        assert_eq!(p.bombs_in_flight, 0);
        assert!(p.place_bomb(&[], 3.0).is_some());
    }

    #[test]
    fn no_stacking_on_an_occupied_tile() {
        let mut p = human_at(1, 1);
        p.max_bombs = 3;
        let b = p.place_bomb(&[], 3.0).expect("bomb");
        assert!(p.place_bomb(&[b], 3.0).is_none());
        assert_eq!(p.bombs_in_flight, 1);
    }

    #[test]
    fn bomb_drops_on_current_tile_mid_step() {
        let g = Grid::parse(&["    "]);
        let mut p = human_at(0, 1);
        assert!(p.mover.attempt_move(1, 0, &g));
        p.update(0.1);
        assert!(p.mover.moving);
        let b = p.place_bomb(&[], 3.0).expect("bomb");
        assert_eq!(b.pos, TilePos::new(0, 1));
    }

    #[test]
    fn range_is_captured_at_placement() {
        let mut p = human_at(1, 1);
        let b = p.place_bomb(&[], 3.0).expect("bomb");
        p.apply_power_up(PowerUpKind::Range);
        assert_eq!(p.bomb_range, 3);
        assert_eq!(b.range, 2);
    }

    #[test]
    fn credit_back_floors_at_zero() {
        let mut p = human_at(1, 1);
        p.bomb_returned();
        p.bomb_returned();
        assert_eq!(p.bombs_in_flight, 0);
    }

    #[test]
    fn immunity_blocks_damage() {
        let mut p = human_at(1, 1);
        assert_eq!(p.take_damage(), Hit::Wounded);
        assert_eq!(p.lives, 2);
        assert!((p.immunity_remaining - 2.0).abs() < 1e-4);
        assert_eq!(p.take_damage(), Hit::Immune);
        assert_eq!(p.lives, 2);

        p.update(1.0);
        assert_eq!(p.take_damage(), Hit::Immune);
        p.update(1.0);
        assert!(p.immunity_remaining <= 0.0);
        assert_eq!(p.take_damage(), Hit::Wounded);
        assert_eq!(p.lives, 1);
    }

    #[test]
    fn death_is_permanent() {
        let mut p = human_at(1, 1);
        p.lives = 1;
        assert_eq!(p.take_damage(), Hit::Killed);
        assert!(p.is_dead());
        assert_eq!(p.lives, 0);
        p.update(10.0);
        assert_eq!(p.take_damage(), Hit::Immune);
        p.apply_power_up(PowerUpKind::BombCapacity);
        assert!(p.is_dead());
        assert!(p.place_bomb(&[], 3.0).is_none());
    }

    #[test]
    fn dying_mid_step_leaves_the_mover_at_rest() {
        let g = Grid::parse(&["    "]);
        let mut p = human_at(0, 1);
        p.lives = 1;
        assert!(p.mover.attempt_move(1, 0, &g));
        assert_eq!(p.take_damage(), Hit::Killed);
        assert!(!p.mover.moving);
        assert_eq!(p.mover.current, TilePos::new(0, 1));
        assert_eq!(p.mover.target, p.mover.current);
        assert_eq!((p.mover.dx, p.mover.dy), (0, 0));
        assert!((p.mover.x - 32.0).abs() < 1e-4 && p.mover.y.abs() < 1e-4);
    }

    #[test]
    fn power_ups_stack() {
        let mut p = human_at(1, 1);
        p.apply_power_up(PowerUpKind::BombCapacity);
        p.apply_power_up(PowerUpKind::BombCapacity);
        p.apply_power_up(PowerUpKind::Speed);
        p.apply_power_up(PowerUpKind::Speed);
        assert_eq!(p.max_bombs, 3);
        assert!((p.mover.speed - 192.0).abs() < 1e-4);
    }
}
