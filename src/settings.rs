//! Durable key/value settings, surviving restarts — one JSON file under the
//! user config dir.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

/// XP goal, persisted across runs.
pub const TARGET_XP: &str = "target_xp";
/// Random answer picking instead of answer discovery.
pub const SAFE_MODE: &str = "safe_mode";

pub struct Settings {
    path: PathBuf,
    values: Map<String, Value>,
}

impl Settings {
    /// Open the default per-user settings file.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Settings("no user config directory".into()))?
            .join("duofarm");
        Self::open(dir.join("settings.json"))
    }

    /// Open a settings file. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| Error::Settings(format!("corrupt settings file: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values })
    }

    /// Read a value, falling back to `default` when the key is missing or
    /// holds a value of the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(default)
    }

    /// Write a value and persist the store immediately.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| Error::Settings(e.to_string()))?;
        self.values.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| Error::Settings(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        debug!("settings saved: {key}");
        Ok(())
    }
}
