use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use emolens_core::shared::constants::{
    DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT, REALTIME_TICK_INTERVAL, UPLOAD_MAX_DIMENSION,
    UPLOAD_QUALITY,
};

/// Persisted defaults. Every field falls back individually, so older or
/// hand-edited files keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Camera spec, e.g. `v4l2:/dev/video0`. `None` picks the platform default.
    pub camera: Option<String>,
    pub interval_ms: u64,
    pub max_dimension: u32,
    pub quality: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            camera: None,
            interval_ms: REALTIME_TICK_INTERVAL.as_millis() as u64,
            max_dimension: UPLOAD_MAX_DIMENSION,
            quality: UPLOAD_QUALITY,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("EmoLens").join("settings.json"))
    }

    /// Loads from `path`, or from the per-user config file when `None`.
    /// A missing or unreadable file yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).or_else(Self::config_path);
        let settings = path
            .as_deref()
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("Ignoring malformed settings file: {e}");
                    None
                }
            });
        settings.unwrap_or_default()
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(Self::config_path)
            .ok_or("no config directory available")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
