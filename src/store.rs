//! Durable key-value preferences backed by one JSON object on disk.
//!
//! Reads never fail: a missing key, a corrupt file or a value of the wrong
//! shape all read back as the type's default. Every `set` rewrites the file.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub mod keys {
    pub const FAVORITES: &str = "favorites";
    pub const PLAYLISTS: &str = "playlists";
    pub const RECENT: &str = "recent";
    pub const SETTINGS: &str = "settings";
    pub const QUEUE: &str = "queue";
    pub const CURRENT_PLAYLIST: &str = "current_playlist";
}

#[derive(Debug, Default)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl PreferenceStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match read_values(&path) {
            Ok(values) => values,
            Err(err) => {
                warn!(path = %path.display(), "ignoring unreadable preferences: {err:#}");
                preserve_corrupt(&path);
                Map::new()
            }
        };
        Self {
            path: Some(path),
            values,
        }
    }

    pub fn get<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get_or(key, T::default)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, fallback: impl FnOnce() -> T) -> T {
        let Some(value) = self.values.get(key) else {
            return fallback();
        };
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(key, "stored preference has an unexpected shape: {err}");
                fallback()
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to encode preference {key}"))?;
        self.values.insert(key.to_string(), value);
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.values)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        debug!(path = %path.display(), "preferences saved");
        Ok(())
    }
}

fn read_values(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read preferences {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    let values: Map<String, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse preferences {}", path.display()))?;
    Ok(values)
}

// The next save would overwrite the file, so keep the unreadable copy around.
fn preserve_corrupt(path: &Path) {
    if !path.exists() {
        return;
    }
    let backup = path.with_extension("json.corrupt");
    if let Err(err) = fs::rename(path, &backup) {
        warn!(path = %path.display(), "could not move corrupt preferences aside: {err}");
    }
}
