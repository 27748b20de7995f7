use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::state::Position;

/// Board dimension used when nothing else is configured
pub const DEFAULT_GRID_SIZE: usize = 15;

/// Tick period used when nothing else is configured
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 200;

/// Configuration for the game
///
/// The defaults reproduce the classic board: a 15x15 square grid ticking
/// every 200ms, with the snake starting in the middle cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width and height of the square game grid
    pub grid_size: usize,
    /// Milliseconds between two ticks
    pub tick_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with a custom grid size
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            ..Default::default()
        }
    }

    /// Read a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults, so `{"grid_size": 20}` is
    /// a complete file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: GameConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config in {:?}", path))?;
        Ok(config)
    }

    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if all parameters are valid, `Err(String)` with an error message otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_size < 2 {
            return Err(format!(
                "grid_size must be at least 2, got {}",
                self.grid_size
            ));
        }

        if self.grid_size > i32::MAX as usize {
            return Err(format!("grid_size is too large: {}", self.grid_size));
        }

        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be at least 1".to_string());
        }

        Ok(())
    }

    /// Cell the snake starts on
    pub fn start_position(&self) -> Position {
        let center = (self.grid_size / 2) as i32;
        Position::new(center, center)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.grid_size, 15);
        assert_eq!(config.tick_interval(), Duration::from_millis(200));
        assert_eq!(config.start_position(), Position::new(7, 7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_config() {
        let config = GameConfig::new(20);
        assert_eq!(config.grid_size, 20);
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(config.start_position(), Position::new(10, 10));
    }

    #[test]
    fn test_validation() {
        assert!(GameConfig::new(1).validate().is_err());
        assert!(GameConfig::new(2).validate().is_ok());

        let config = GameConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snake.json");
        std::fs::write(&path, r#"{ "tick_interval_ms": 120 }"#).unwrap();

        let config = GameConfig::load(&path).unwrap();
        assert_eq!(config.grid_size, 15);
        assert_eq!(config.tick_interval_ms, 120);
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        let err = GameConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));

        let missing = temp_dir.path().join("missing.json");
        assert!(GameConfig::load(&missing).is_err());
    }
}
