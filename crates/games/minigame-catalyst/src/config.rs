use glam::Vec2;
use serde::{Deserialize, Serialize};

use minigame_core::time::DEFAULT_FIXED_RATE_HZ;

use crate::cauldron::CauldronConfig;
use crate::droplets::DropletConfig;
use crate::enemies::{EnemyConfig, EnemySpawnerConfig};
use crate::player::PlayerConfig;
use crate::powerups::PowerupConfig;
use crate::scoring::REQUIRED_DROPS;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "MINIGAME_CATALYST_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/catalyst.toml";

/// Static level geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub floor_min: Vec2,
    pub floor_max: Vec2,
    /// Walls keeping the player inside the floor span.
    pub wall_height: f32,
    pub player_spawn: Vec2,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            floor_min: Vec2::new(-14.0, -4.0),
            floor_max: Vec2::new(14.0, -2.5),
            wall_height: 10.0,
            player_spawn: Vec2::new(0.0, -1.8),
        }
    }
}

/// Top-level Catalyst configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalystConfig {
    pub arena: ArenaConfig,
    pub player: PlayerConfig,
    pub cauldron: CauldronConfig,
    pub droplets: DropletConfig,
    pub enemy: EnemyConfig,
    pub enemy_spawner: EnemySpawnerConfig,
    pub powerups: PowerupConfig,
    pub required_drops: u32,
    pub fixed_rate_hz: f32,
    /// RNG seed, overridable per run through `GameConfig.custom["seed"]`.
    pub seed: u64,
}

impl Default for CatalystConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            player: PlayerConfig::default(),
            cauldron: CauldronConfig::default(),
            droplets: DropletConfig::default(),
            enemy: EnemyConfig::default(),
            enemy_spawner: EnemySpawnerConfig::default(),
            powerups: PowerupConfig::default(),
            required_drops: REQUIRED_DROPS,
            fixed_rate_hz: DEFAULT_FIXED_RATE_HZ,
            seed: 42,
        }
    }
}

impl CatalystConfig {
    /// Load config from a TOML file. Falls back to defaults if the file is
    /// missing or unparseable.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<CatalystConfig>(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    CatalystConfig::default()
                },
            },
            Err(_) => {
                tracing::debug!("No config at {path}, using defaults");
                CatalystConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: CatalystConfig = toml::from_str(
            r#"
            required_drops = 5

            [player]
            jump_height = 6.0
            max_health = 3

            [player.rays]
            horizontal_ray_count = 6
            "#,
        )
        .unwrap();
        assert_eq!(cfg.required_drops, 5);
        assert_eq!(cfg.player.jump_height, 6.0);
        assert_eq!(cfg.player.max_health, 3);
        assert_eq!(cfg.player.rays.horizontal_ray_count, 6);
        assert_eq!(cfg.player.time_to_jump_apex, 0.4);
        assert_eq!(cfg.enemy.contact_damage, 1);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn vectors_parse_as_pairs() {
        let cfg: CatalystConfig = toml::from_str(
            r#"
            [arena]
            player_spawn = [1.0, 2.0]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.arena.player_spawn, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = CatalystConfig::load_from("/nonexistent/catalyst.toml");
        assert_eq!(cfg.required_drops, REQUIRED_DROPS);
        assert_eq!(cfg.player.max_health, 9);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("catalyst-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "required_drops = \"lots\"").unwrap();
        let cfg = CatalystConfig::load_from(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);
        assert_eq!(cfg.required_drops, REQUIRED_DROPS);
    }

    #[test]
    fn example_config_file_parses() {
        let text = include_str!("../../../../config/catalyst.toml");
        let cfg: CatalystConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.required_drops, REQUIRED_DROPS);
    }
}
