//! Runtime configuration

use crate::platform::Size;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, usually read from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub engine: EngineSettings,
}

impl Config {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Initial window parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl WindowConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "WebWindow".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Settings applied to every browser instance once it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub script_enabled: bool,
    pub default_script_dialogs: bool,
    pub web_message_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            script_enabled: true,
            default_script_dialogs: true,
            web_message_enabled: true,
        }
    }
}
