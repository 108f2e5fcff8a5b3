use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Local CLI that runs the text-generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Ollama,
    Gemini,
    Codex,
}

impl Provider {
    /// Unknown or missing names fall back to ollama.
    pub fn resolve(name: Option<&str>) -> Self {
        match name.unwrap_or("ollama").trim().to_ascii_lowercase().as_str() {
            "codex" => Self::Codex,
            "gemini" => Self::Gemini,
            _ => Self::Ollama,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
            Self::Codex => "codex",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Codex => "gpt-5",
            Self::Gemini => "gemini-2.5-pro",
            Self::Ollama => "phi3:mini-128k",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub provider: Provider,
    pub model: String,
    pub timeout: Duration,
}

impl ExtractionRequest {
    pub fn new(provider: Option<&str>, model: Option<&str>, timeout_secs: u64) -> Self {
        let provider = Provider::resolve(provider);
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(provider.default_model())
            .to_string();
        Self {
            provider,
            model,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }
}

impl Default for ExtractionRequest {
    fn default() -> Self {
        Self::new(None, None, DEFAULT_TIMEOUT_SECS)
    }
}
