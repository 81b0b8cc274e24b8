//! `chunks/manifest.json`: the list of persisted columns, merged incrementally
//! across saves rather than rewritten from scratch.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::timestamp::now_iso8601;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub x: i64,
    pub z: i64,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "chunksVersion")]
    pub chunks_version: u32,
    #[serde(rename = "lastSaved")]
    pub last_saved: String,
    pub chunks: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            chunks_version: 1,
            last_saved: now_iso8601(),
            chunks: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read manifest {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse manifest {}: {}", path.display(), e))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create chunks directory {}: {}", parent.display(), e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize manifest: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write manifest {}: {}", path.display(), e))
    }

    /// Merges freshly-saved keys into the manifest: each named key's entry is
    /// replaced with a fresh timestamp, any keys not mentioned are kept
    /// unchanged. Safe to call repeatedly for incremental/continuous saves.
    pub fn merge(&mut self, keys: impl IntoIterator<Item = (i64, i64)>) {
        let now = now_iso8601();
        for (x, z) in keys {
            if let Some(entry) = self.chunks.iter_mut().find(|e| e.x == x && e.z == z) {
                entry.last_modified = now.clone();
            } else {
                self.chunks.push(ManifestEntry { x, z, last_modified: now.clone() });
            }
        }
        self.last_saved = now;
    }
}
