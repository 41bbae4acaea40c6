/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// A missing file or missing keys fall back to defaults. A file that is
/// present but unreadable, malformed or out of range is an error: the
/// game shows it on the title screen and will not start a match.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::domain::ai::AiTuning;
use crate::domain::player::PlayerStats;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub arena: ArenaConfig,
    pub timing: TimingConfig,
    pub player: PlayerConfig,
    pub ai: AiConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug)]
pub struct ArenaConfig {
    pub rows: usize,
    pub cols: usize,
    pub tile_size: f32,
    pub breakable_density: f64,
    pub powerup_chance: f64,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub max_frame_delta: f32, // clamp on measured delta (tab-away / terminal stall)
    pub bomb_fuse: f32,
    pub explosion_lifetime: f32,
    pub immunity: f32,
}

#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub speed: f32,           // pixels per second
    pub speed_increment: f32, // per Speed power-up
    pub start_bombs: u32,
    pub start_range: u32,
    pub start_lives: u32,
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub count: usize,
    pub bomb_cooldown: f32,
    pub danger_threshold: f32,
    pub offense_distance: i32,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub place_bomb: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    arena: TomlArena,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    ai: TomlAi,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlArena {
    #[serde(default = "default_rows")]
    rows: usize,
    #[serde(default = "default_cols")]
    cols: usize,
    #[serde(default = "default_tile_size")]
    tile_size: f32,
    #[serde(default = "default_density")]
    breakable_density: f64,
    #[serde(default = "default_powerup_chance")]
    powerup_chance: f64,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_max_delta")]
    max_frame_delta: f32,
    #[serde(default = "default_fuse")]
    bomb_fuse: f32,
    #[serde(default = "default_explosion")]
    explosion_lifetime: f32,
    #[serde(default = "default_immunity")]
    immunity: f32,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_speed")]
    speed: f32,
    #[serde(default = "default_speed_increment")]
    speed_increment: f32,
    #[serde(default = "default_start_bombs")]
    start_bombs: u32,
    #[serde(default = "default_start_range")]
    start_range: u32,
    #[serde(default = "default_start_lives")]
    start_lives: u32,
}

#[derive(Deserialize, Debug)]
struct TomlAi {
    #[serde(default = "default_ai_count")]
    count: usize,
    #[serde(default = "default_ai_cooldown")]
    bomb_cooldown: f32,
    #[serde(default = "default_danger")]
    danger_threshold: f32,
    #[serde(default = "default_offense")]
    offense_distance: i32,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_place_bomb")]
    place_bomb: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

// ── Defaults ──

fn default_rows() -> usize { 13 }
fn default_cols() -> usize { 15 }
fn default_tile_size() -> f32 { 32.0 }
fn default_density() -> f64 { 0.7 }
fn default_powerup_chance() -> f64 { 0.3 }
fn default_frame_ms() -> u64 { 16 }
fn default_max_delta() -> f32 { 0.1 }
fn default_fuse() -> f32 { 3.0 }
fn default_explosion() -> f32 { 0.5 }
fn default_immunity() -> f32 { 2.0 }
fn default_speed() -> f32 { 128.0 }   // 4 tiles/s at 32px
fn default_speed_increment() -> f32 { 32.0 }
fn default_start_bombs() -> u32 { 1 }
fn default_start_range() -> u32 { 2 }
fn default_start_lives() -> u32 { 3 }
fn default_ai_count() -> usize { 3 }
fn default_ai_cooldown() -> f32 { 1.5 }
fn default_danger() -> f32 { 0.9 }
fn default_offense() -> i32 { 3 }

fn default_place_bomb() -> Vec<String> { vec!["A".into(), "X".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlArena {
    fn default() -> Self {
        TomlArena {
            rows: default_rows(),
            cols: default_cols(),
            tile_size: default_tile_size(),
            breakable_density: default_density(),
            powerup_chance: default_powerup_chance(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_ms: default_frame_ms(),
            max_frame_delta: default_max_delta(),
            bomb_fuse: default_fuse(),
            explosion_lifetime: default_explosion(),
            immunity: default_immunity(),
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            speed: default_speed(),
            speed_increment: default_speed_increment(),
            start_bombs: default_start_bombs(),
            start_range: default_start_range(),
            start_lives: default_start_lives(),
        }
    }
}

impl Default for TomlAi {
    fn default() -> Self {
        TomlAi {
            count: default_ai_count(),
            bomb_cooldown: default_ai_cooldown(),
            danger_threshold: default_danger(),
            offense_distance: default_offense(),
            seed: None,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            place_bomb: default_place_bomb(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    pub fn load() -> Result<Self> {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        tracing::info!("no config.toml found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let cfg = Self::from_toml_str(&text)
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: TomlConfig = toml::from_str(text).context("config.toml parse error")?;
        let cfg = GameConfig::from(raw);
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let a = &self.arena;
        if a.rows < 5 || a.cols < 5 || a.rows % 2 == 0 || a.cols % 2 == 0 {
            bail!("arena must be at least 5x5 with odd rows and cols, got {}x{}", a.rows, a.cols);
        }
        if a.tile_size <= 0.0 {
            bail!("tile_size must be positive");
        }
        for (name, p) in [("breakable_density", a.breakable_density), ("powerup_chance", a.powerup_chance)] {
            if !(0.0..=1.0).contains(&p) {
                bail!("{name} must be within 0.0..=1.0, got {p}");
            }
        }
        let t = &self.timing;
        if t.bomb_fuse <= 0.0 || t.explosion_lifetime <= 0.0 || t.max_frame_delta <= 0.0 {
            bail!("bomb_fuse, explosion_lifetime and max_frame_delta must be positive");
        }
        // A blast is ticked in the frame it appears, before the hit check.
        if t.explosion_lifetime <= t.max_frame_delta {
            bail!(
                "explosion_lifetime ({}) must exceed max_frame_delta ({})",
                t.explosion_lifetime,
                t.max_frame_delta
            );
        }
        if self.player.speed <= 0.0 {
            bail!("player speed must be positive");
        }
        if self.player.start_lives == 0 || self.player.start_bombs == 0 {
            bail!("start_lives and start_bombs must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.ai.danger_threshold) {
            bail!("danger_threshold must be within 0.0..=1.0");
        }
        Ok(())
    }

    pub fn player_stats(&self) -> PlayerStats {
        PlayerStats {
            speed: self.player.speed,
            speed_increment: self.player.speed_increment,
            max_bombs: self.player.start_bombs,
            bomb_range: self.player.start_range,
            lives: self.player.start_lives,
            immunity: self.timing.immunity,
        }
    }

    pub fn ai_tuning(&self) -> AiTuning {
        AiTuning {
            danger_threshold: self.ai.danger_threshold,
            offense_distance: self.ai.offense_distance,
            bomb_cooldown: self.ai.bomb_cooldown,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from(TomlConfig::default())
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        GameConfig {
            arena: ArenaConfig {
                rows: t.arena.rows,
                cols: t.arena.cols,
                tile_size: t.arena.tile_size,
                breakable_density: t.arena.breakable_density,
                powerup_chance: t.arena.powerup_chance,
            },
            timing: TimingConfig {
                frame_ms: t.timing.frame_ms,
                max_frame_delta: t.timing.max_frame_delta,
                bomb_fuse: t.timing.bomb_fuse,
                explosion_lifetime: t.timing.explosion_lifetime,
                immunity: t.timing.immunity,
            },
            player: PlayerConfig {
                speed: t.player.speed,
                speed_increment: t.player.speed_increment,
                start_bombs: t.player.start_bombs,
                start_range: t.player.start_range,
                start_lives: t.player.start_lives,
            },
            ai: AiConfig {
                // Only three corners are left after the human spawns.
                count: t.ai.count.min(3),
                bomb_cooldown: t.ai.bomb_cooldown,
                danger_threshold: t.ai.danger_threshold,
                offense_distance: t.ai.offense_distance,
                seed: t.ai.seed,
            },
            gamepad: GamepadConfig {
                place_bomb: t.gamepad.place_bomb,
                confirm: t.gamepad.confirm,
                cancel: t.gamepad.cancel,
            },
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so a linked binary still finds its config.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").expect("defaults");
        assert_eq!(cfg.arena.rows, 13);
        assert_eq!(cfg.arena.cols, 15);
        assert_eq!(cfg.ai.count, 3);
        assert!((cfg.timing.bomb_fuse - 3.0).abs() < 1e-6);
        assert_eq!(cfg.gamepad.place_bomb, vec!["A".to_string(), "X".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[arena]\nrows = 9\n\n[ai]\ncount = 7\nseed = 42\n",
        ).expect("valid");
        assert_eq!(cfg.arena.rows, 9);
        assert_eq!(cfg.arena.cols, 15);
        assert_eq!(cfg.ai.count, 3);
        assert_eq!(cfg.ai.seed, Some(42));
        assert_eq!(cfg.player.start_lives, 3);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(GameConfig::from_toml_str("[arena\nrows = 9").is_err());
    }

    #[test]
    fn even_dimensions_rejected() {
        let err = GameConfig::from_toml_str("[arena]\nrows = 12\n").unwrap_err();
        assert!(format!("{err:#}").contains("odd"));
    }

    #[test]
    fn probabilities_must_be_in_range() {
        assert!(GameConfig::from_toml_str("[arena]\npowerup_chance = 1.5\n").is_err());
        assert!(GameConfig::from_toml_str("[arena]\nbreakable_density = -0.1\n").is_err());
    }

    #[test]
    fn blast_must_outlive_one_frame() {
        let err = GameConfig::from_toml_str("[timing]\nexplosion_lifetime = 0.04\nmax_frame_delta = 0.05\n")
            .expect_err("short blast accepted");
        assert!(format!("{err:#}").contains("explosion_lifetime"));
        assert!(GameConfig::from_toml_str("[timing]\nexplosion_lifetime = 0.1\n").is_err());
        assert!(GameConfig::from_toml_str("[timing]\nexplosion_lifetime = 0.2\n").is_ok());
    }

    #[test]
    fn derived_views_follow_config() {
        let cfg = GameConfig::from_toml_str(
            "[player]\nstart_range = 4\n[timing]\nimmunity = 1.0\n[ai]\nbomb_cooldown = 2.0\n",
        ).expect("valid");
        let stats = cfg.player_stats();
        assert_eq!(stats.bomb_range, 4);
        assert!((stats.immunity - 1.0).abs() < 1e-6);
        assert!((cfg.ai_tuning().bomb_cooldown - 2.0).abs() < 1e-6);
    }
}
