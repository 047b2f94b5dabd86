/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// ```toml
/// [physics]
/// run_speed = 7.5
///
/// [timing]
/// star_ticks = 480
///
/// [general]
/// lives = 5
/// ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Public Config Structs ──

#[derive(Clone, Debug, Default)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub timing: TimingConfig,
    pub general: GeneralConfig,
}

/// Movement tuning. Velocities are pixels per tick, `y` grows downward,
/// so jump powers are applied as negative vertical velocity.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub jump_power: f32,
    pub high_jump: f32,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub accel: f32,
    pub decel: f32,
    pub air_accel: f32,
    pub friction: f32,
    pub max_fall: f32,
    pub stomp_bounce: f32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub star_ticks: u32,
    pub invuln_ticks: u32,
    pub flag_delay_ticks: u32,
    pub fire_cooldown_ticks: u32,
    pub level_time_ticks: u32,
    pub respawn_delay_ticks: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub lives: u32,
    pub start_world: u8,
    pub start_level: u8,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── TOML Schema ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: PhysicsConfig,
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    general: GeneralConfig,
}

// ── Defaults ──

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gravity: 0.55,
            jump_power: 11.5,
            high_jump: 13.0,
            walk_speed: 4.5,
            run_speed: 7.0,
            accel: 0.4,
            decel: 0.2,
            air_accel: 0.3,
            friction: 0.88,
            max_fall: 12.0,
            stomp_bounce: 8.0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            tick_rate_ms: 16,         // ~60 ticks per second
            star_ticks: 600,
            invuln_ticks: 120,
            flag_delay_ticks: 120,
            fire_cooldown_ticks: 15,
            level_time_ticks: 400 * 60,
            respawn_delay_ticks: 150,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig { lives: 3, start_world: 1, start_level: 1 }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(cfg) => {
                    log::info!("Loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    log::warn!("{e}; using default settings");
                    return GameConfig::default();
                }
            }
        }
        GameConfig::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: TomlConfig = toml::from_str(text)?;
        let mut general = raw.general;
        general.start_world = general.start_world.clamp(1, 8);
        general.start_level = general.start_level.clamp(1, 4);
        Ok(GameConfig { physics: raw.physics, timing: raw.timing, general })
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
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
