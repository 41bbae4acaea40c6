/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound; the log gets them too.

use crate::domain::grid::TilePos;
use crate::domain::tile::PowerUpKind;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    BombPlaced { player: usize, pos: TilePos },
    Detonated { pos: TilePos, owner: usize },
    ChainIgnited { pos: TilePos },
    BlockBroken { pos: TilePos, drop: Option<PowerUpKind> },
    PowerUpCollected { player: usize, kind: PowerUpKind },
    PlayerHit { player: usize, lives: u32 },
    PlayerDied { player: usize },
    PlayerMoved { player: usize },
    MatchWon,
    MatchLost,
}

/// A named sound with an optional volume override.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoundCue {
    pub name: &'static str,
    pub volume: Option<f32>,
}

impl GameEvent {
    pub fn sound(&self) -> Option<SoundCue> {
        let (name, volume) = match self {
            GameEvent::BombPlaced { .. } => ("bomb_place", None),
            GameEvent::Detonated { .. } => ("explosion", None),
            GameEvent::BlockBroken { .. } => ("block_break", None),
            GameEvent::PowerUpCollected { .. } => ("powerup_collect", None),
            GameEvent::PlayerHit { .. } => ("player_hit", None),
            GameEvent::PlayerDied { .. } => ("player_die", None),
            // Footsteps are frequent; keep them quiet.
            GameEvent::PlayerMoved { .. } => ("player_move", Some(0.3)),
            GameEvent::ChainIgnited { .. } | GameEvent::MatchWon | GameEvent::MatchLost => return None,
        };
        Some(SoundCue { name, volume })
    }
}
