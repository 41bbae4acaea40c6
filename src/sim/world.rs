/// WorldState: the complete snapshot of a running game.
///
/// ## Ownership
///
/// The world is the single owner of the arena: the grid and the live
/// players, bombs and explosions. Everything else refers to players by
/// id only (bomb owner, AI target) and looks them up here when needed.
/// Nothing is mutated outside `sim::step` and the phase helpers below.
///
/// ## Match lifecycle
///
/// `start_match` throws the whole arena away and builds a fresh one:
/// new grid, players respawned at the corners, no bombs or explosions.
/// Dead players stay in `players` until the next restart.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::GameConfig;
use crate::domain::ai::AiTuning;
use crate::domain::bomb::{Bomb, Explosion};
use crate::domain::grid::{spawn_corners, Grid, TilePos};
use crate::domain::player::{Player, PlayerKind, PlayerStats};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Instructions,
    Playing,
    GameOverWin,
    GameOverLose,
}

impl Phase {
    pub fn is_game_over(self) -> bool {
        matches!(self, Phase::GameOverWin | Phase::GameOverLose)
    }
}

pub struct WorldState {
    // ── Arena ──
    pub grid: Grid,
    pub players: Vec<Player>,
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<Explosion>,

    // ── Settings ──
    pub config: GameConfig,
    pub rng: StdRng,

    // ── Meta ──
    pub phase: Phase,
    /// Set when configuration failed to load. The title screen shows it
    /// and the match can never start.
    pub init_error: Option<String>,
    /// How many human players were spawned in the current match.
    pub humans_spawned: usize,
    /// Seconds of play in the current match.
    pub match_time: f32,
    pub matches_played: u32,

    // ── Animation ──
    pub anim_tick: u32,
}

// ── Construction ──

impl WorldState {
    pub fn new(config: GameConfig) -> Self {
        let mut rng = match config.ai.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let grid = Grid::generate(
            config.arena.rows,
            config.arena.cols,
            config.arena.breakable_density,
            &mut rng,
        );
        WorldState {
            grid,
            players: vec![],
            bombs: vec![],
            explosions: vec![],
            config,
            rng,
            phase: Phase::Title,
            init_error: None,
            humans_spawned: 0,
            match_time: 0.0,
            matches_played: 0,
            anim_tick: 0,
        }
    }

    /// A world that failed to initialize. It stays on the title screen.
    pub fn failed(err: &anyhow::Error) -> Self {
        let mut world = WorldState::new(GameConfig::default());
        world.init_error = Some(format!("{err:#}"));
        world
    }

    pub fn can_start(&self) -> bool {
        self.init_error.is_none()
    }
}

// ── Phase transitions ──

impl WorldState {
    /// Discard the arena and begin a new match.
    pub fn start_match(&mut self) {
        if !self.can_start() {
            return;
        }
        let arena = self.config.arena.clone();
        self.grid = Grid::generate(arena.rows, arena.cols, arena.breakable_density, &mut self.rng);
        self.bombs.clear();
        self.explosions.clear();

        let corners = spawn_corners(arena.rows, arena.cols);
        let stats = self.config.player_stats();
        self.players.clear();
        self.spawn(PlayerKind::Human, corners[0], &stats);
        for &corner in corners.iter().skip(1).take(self.config.ai.count) {
            self.spawn(PlayerKind::Ai, corner, &stats);
        }
        self.humans_spawned = 1;

        self.match_time = 0.0;
        self.matches_played += 1;
        self.phase = Phase::Playing;
        tracing::info!(
            matches = self.matches_played,
            rows = arena.rows,
            cols = arena.cols,
            ai = self.config.ai.count,
            "match started"
        );
    }

    pub fn return_to_title(&mut self) {
        self.phase = Phase::Title;
        self.bombs.clear();
        self.explosions.clear();
        self.players.clear();
        self.humans_spawned = 0;
    }

    fn spawn(&mut self, kind: PlayerKind, at: TilePos, stats: &PlayerStats) -> usize {
        let id = self.players.len();
        self.players.push(Player::new(id, kind, at, self.config.arena.tile_size, stats));
        id
    }
}

// ── Queries ──

impl WorldState {
    pub fn ai_tuning(&self) -> AiTuning {
        self.config.ai_tuning()
    }

    pub fn player_mut(&mut self, id: usize) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn human(&self) -> Option<&Player> {
        self.players.iter().find(|p| !p.is_ai())
    }

    pub fn living_humans(&self) -> usize {
        self.players.iter().filter(|p| !p.is_ai() && p.is_alive()).count()
    }

    pub fn living_ais(&self) -> usize {
        self.players.iter().filter(|p| p.is_ai() && p.is_alive()).count()
    }

    /// Is a live explosion covering `pos`?
    pub fn is_hazard(&self, pos: TilePos) -> bool {
        self.explosions.iter().any(|e| e.pos == pos && e.is_live())
    }
}

// ── Test helpers ──

#[cfg(test)]
impl WorldState {
    /// A playing world on a hand-drawn grid, seeded, with no players.
    pub fn from_rows(rows: &[&str]) -> Self {
        let mut world = WorldState::new(GameConfig::default());
        world.rng = StdRng::seed_from_u64(7);
        world.grid = Grid::parse(rows);
        world.phase = Phase::Playing;
        world
    }

    pub fn add_player(&mut self, kind: PlayerKind, at: TilePos) -> usize {
        let stats = self.config.player_stats();
        if kind == PlayerKind::Human {
            self.humans_spawned += 1;
        }
        self.spawn(kind, at, &stats)
    }
}
