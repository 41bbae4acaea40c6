/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileKind {
    Empty,
    Solid,     // Permanent wall
    Breakable, // Destroyed by a blast, may drop a power-up
}

/// Permanent, stacking upgrades left behind by destroyed blocks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PowerUpKind {
    BombCapacity,
    Range,
    Speed,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::BombCapacity,
        PowerUpKind::Range,
        PowerUpKind::Speed,
    ];

    pub fn sprite(self) -> &'static str {
        match self {
            PowerUpKind::BombCapacity => "powerup_bomb",
            PowerUpKind::Range => "powerup_range",
            PowerUpKind::Speed => "powerup_speed",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Tile {
    pub kind: TileKind,
    pub power_up: Option<PowerUpKind>,
}

impl Tile {
    pub const EMPTY: Tile = Tile { kind: TileKind::Empty, power_up: None };
    pub const SOLID: Tile = Tile { kind: TileKind::Solid, power_up: None };
    pub const BREAKABLE: Tile = Tile { kind: TileKind::Breakable, power_up: None };

    /// Can an entity occupy this cell?
    pub fn is_walkable(self) -> bool {
        self.kind == TileKind::Empty
    }

    pub fn sprite(self) -> &'static str {
        match (self.kind, self.power_up) {
            (TileKind::Solid, _) => "wall",
            (TileKind::Breakable, _) => "block",
            (TileKind::Empty, Some(p)) => p.sprite(),
            (TileKind::Empty, None) => "floor",
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::EMPTY
    }
}
