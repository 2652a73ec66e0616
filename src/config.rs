//! Runtime configuration loaded from the environment.

use std::path::PathBuf;

use secrecy::SecretString;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default model id for all three role agents.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Default interpreter used to launch the test runner.
pub const DEFAULT_PYTHON: &str = "python3";

/// Default verification/repair budget per pipeline.
pub const DEFAULT_MAX_ITER: usize = 5;

/// Settings for the generation pipeline.
///
/// Loaded once from the environment (a `.env` file is honored) and shared by
/// value; nothing here mutates after startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API key for the completion backend.
    pub api_key: Option<SecretString>,
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,
    /// Model id sent with every completion request.
    pub model: String,
    /// Sampling temperature, serialized only when set.
    pub temperature: Option<f32>,
    /// Completion token limit, serialized only when set.
    pub max_tokens: Option<u32>,
    /// Interpreter used to run the pytest subprocess.
    pub python: String,
    /// Root directory for audit artifacts and persisted conversations.
    pub artifact_root: PathBuf,
    /// Verification loop budget.
    pub max_iter: usize,
}

impl Settings {
    /// Load settings from the environment, honoring a `.env` file if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().map(SecretString::from),
            base_url: std::env::var("SPECSMITH_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("SPECSMITH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: std::env::var("SPECSMITH_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok()),
            max_tokens: std::env::var("SPECSMITH_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok()),
            python: std::env::var("SPECSMITH_PYTHON")
                .unwrap_or_else(|_| DEFAULT_PYTHON.to_string()),
            artifact_root: std::env::var("SPECSMITH_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_artifact_root()),
            max_iter: std::env::var("SPECSMITH_MAX_ITER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_ITER),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            python: DEFAULT_PYTHON.to_string(),
            artifact_root: default_artifact_root(),
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

fn default_artifact_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".specsmith")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let settings = Settings::default();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.max_iter, 5);
        assert!(settings.artifact_root.ends_with(".specsmith"));
        assert!(settings.temperature.is_none());
    }
}
