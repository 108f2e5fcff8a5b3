use std::path::Path;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::error::FlowResult;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub timer: TimerConfig,
    pub storage: StorageConfig,
    pub profile: ProfileConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// One of `gemini`, `ollama`, `codex`.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TimerConfig {
    pub session_minutes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            session_minutes: 25,
        }
    }
}

impl TimerConfig {
    pub fn session_secs(&self) -> u32 {
        self.session_minutes.max(1).saturating_mul(60)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProfileConfig {
    pub display_name: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            display_name: "You".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> FlowResult<Self> {
        toml::from_str(raw).map_err(|err| FlowError::Config(err.to_string()))
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> FlowResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|err| FlowError::Config(format!("{}: {err}", path.display())))
    }
}
