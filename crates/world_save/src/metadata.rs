//! World-level save metadata (`metadata.json`) and the opaque player blob (`player.json`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Camera navigation mode, persisted alongside the player's pose.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraMode {
    #[default]
    FreeFlying,
    FirstPerson,
}

/// World-level metadata for one save: owner-supplied fields plus version,
/// timestamp, and player pose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub version: String,
    pub world_name: String,
    pub player_position: [f32; 3],
    pub play_time_seconds: u64,
    pub camera_mode: CameraMode,
    pub camera_yaw: f32,
    pub camera_pitch: f32,
}

impl SaveMetadata {
    pub fn new(world_name: &str) -> Self {
        SaveMetadata {
            version: "1.0.0".to_string(),
            world_name: world_name.to_string(),
            player_position: [0.0, 70.0, 0.0],
            play_time_seconds: 0,
            camera_mode: CameraMode::FreeFlying,
            camera_yaw: 0.0,
            camera_pitch: 0.0,
        }
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read metadata {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse metadata {}: {}", path.display(), e))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create save directory {}: {}", parent.display(), e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write metadata {}: {}", path.display(), e))
    }
}

/// `player.json` is an opaque owner-supplied blob; this crate never
/// interprets its contents, only round-trips it.
pub fn save_player_blob(path: &Path, blob: &serde_json::Value) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create save directory {}: {}", parent.display(), e))?;
    }
    let content = serde_json::to_string_pretty(blob)
        .map_err(|e| format!("Failed to serialize player data: {}", e))?;
    fs::write(path, content).map_err(|e| format!("Failed to write player data {}: {}", path.display(), e))
}

/// Default placeholder blob written for a brand-new save, mirroring the
/// minimal player.json shape used before a richer player system exists.
pub fn default_player_blob() -> serde_json::Value {
    serde_json::json!({ "version": "1.0.0", "placeholder": true })
}

pub fn load_player_blob(path: &Path) -> Result<serde_json::Value, String> {
    if !path.exists() {
        return Ok(default_player_blob());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read player data {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse player data {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("world_save_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let dir = scratch_dir("metadata_roundtrip");
        let path = dir.join("metadata.json");
        let meta = SaveMetadata::new("My World");
        meta.save(&path).unwrap();
        let loaded = SaveMetadata::load(&path).unwrap();
        assert_eq!(loaded.world_name, "My World");
        assert_eq!(loaded.camera_mode, CameraMode::FreeFlying);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_player_blob_falls_back_to_default() {
        let dir = scratch_dir("player_missing");
        let path = dir.join("player.json");
        let blob = load_player_blob(&path).unwrap();
        assert_eq!(blob["placeholder"], true);
    }

    #[test]
    fn player_blob_round_trips() {
        let dir = scratch_dir("player_roundtrip");
        let path = dir.join("player.json");
        let blob = serde_json::json!({"inventory": ["sword", "shield"]});
        save_player_blob(&path, &blob).unwrap();
        let loaded = load_player_blob(&path).unwrap();
        assert_eq!(loaded, blob);
        let _ = fs::remove_dir_all(&dir);
    }
}
