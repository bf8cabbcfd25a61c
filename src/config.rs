// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, FlashMode, SessionOptions};
use crate::constants::{CHANNEL_NAME, synthetic};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name under the user config dir
const CONFIG_DIR: &str = "camera-support";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the method channel the plugin answers on
    pub channel_name: String,
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// Flash mode a new session starts with
    pub default_flash_mode: FlashMode,
    /// Preview rate of the synthetic camera
    pub synthetic_frame_rate: u32,
    /// Last directory photos were written to from the command line
    pub photo_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_name: CHANNEL_NAME.to_string(),
            backend: CameraBackendType::default(),
            default_flash_mode: FlashMode::default(),
            synthetic_frame_rate: synthetic::DEFAULT_FRAME_RATE,
            photo_dir: None,
        }
    }
}

impl Config {
    /// `<config_dir>/camera-support/config.json`, if the platform has a config dir
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`. A missing file gives defaults silently; an unreadable
    /// one gives defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_slice::<Config>(&data) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Write to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::path().ok_or_else(|| AppError::Config("no config directory".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        crate::storage::write_atomic(path, &data)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Session settings derived from this config
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            initial_flash_mode: self.default_flash_mode,
        }
    }

    /// Clamp values that would make the session unusable
    fn sanitized(mut self) -> Self {
        self.synthetic_frame_rate = self.synthetic_frame_rate.max(1);
        self
    }
}
