//! TOML-backed routing configuration.
//!
//! Only channel bindings and tuning knobs live here. Everything the
//! accounting depends on is reconstructed from the event log instead, so a
//! lost config file costs future routing, never historical correctness.
//!
//! Stored at `~/.config/studyhall/config.toml` (or `studyhall-dev` when
//! `STUDYHALL_ENV=dev`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::clock::DEFAULT_UTC_OFFSET_HOURS;
use crate::error::ConfigError;
use crate::replay::DEFAULT_SCAN_WINDOW_DAYS;

/// Clock configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_offset_hours")]
    pub utc_offset_hours: i32,
}

/// Replay tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_scan_window")]
    pub scan_window_days: i64,
}

/// Where one community's log, panel, and settlement messages live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBindings {
    #[serde(default)]
    pub log_channel: Option<String>,
    #[serde(default)]
    pub panel_channel: Option<String>,
    #[serde(default)]
    pub panel_message: Option<String>,
    #[serde(default)]
    pub settlement_channel: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallConfig {
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    /// Keyed by community id.
    #[serde(default)]
    pub communities: HashMap<String, ChannelBindings>,
}

fn default_offset_hours() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}
fn default_scan_window() -> i64 {
    DEFAULT_SCAN_WINDOW_DAYS
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_offset_hours(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            scan_window_days: default_scan_window(),
        }
    }
}

/// Returns `~/.config/studyhall[-dev]/` based on STUDYHALL_ENV.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYHALL_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base.join("studyhall-dev")
    } else {
        base.join("studyhall")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

impl HallConfig {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Missing file is not an error; it means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let raw =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn bindings_mut(&mut self, community_id: &str) -> &mut ChannelBindings {
        self.communities
            .entry(community_id.to_string())
            .or_default()
    }
}
