//! Typed, serde-backed engine configuration, loaded from / saved to JSON.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldConfig {
    /// Active-set radius, in chunks, around the view center.
    pub view_radius: i32,
    pub worker_threads: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            view_radius: 6,
            worker_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveConfig {
    pub base_directory: String,
    pub autosave_interval_seconds: u64,
    pub continuous_save: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        SaveConfig {
            base_directory: "saves".to_string(),
            autosave_interval_seconds: 300,
            continuous_save: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineConfig {
    pub world: WorldConfig,
    pub save: SaveConfig,
    pub log_level: LogLevel,
}

impl EngineConfig {
    /// Load from `path`, creating and saving a default config if absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        if path.exists() {
            let text = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            let config: EngineConfig =
                serde_json::from_str(&text).map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
            crate::logging::log_at(
                LogLevel::Summary,
                "EngineConfig",
                &format!("✅ Loaded configuration from: {}", path.display()),
            );
            Ok(config)
        } else {
            crate::logging::log_at(
                LogLevel::Summary,
                "EngineConfig",
                &format!("⚠️ No config file found, creating default at: {}", path.display()),
            );
            let config = EngineConfig::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|e| format!("failed to serialize config: {e}"))?;
        fs::write(path, text).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        crate::logging::log_at(
            LogLevel::Summary,
            "EngineConfig",
            &format!("💾 Saved configuration to: {}", path.display()),
        );
        Ok(())
    }

    pub fn default_path(save_root: impl AsRef<Path>) -> PathBuf {
        save_root.as_ref().join("config").join("settings.json")
    }
}
