use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "encounter-narrative";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ═══════════════════════════════════════════════════════════
// Defaults
// ═══════════════════════════════════════════════════════════

/// Backend attempts per narrative, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Backoff before the second attempt; doubles each further attempt.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
/// Upper bound on a single backoff delay.
pub const MAX_BACKOFF_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_MAX_TOKENS: u32 = 16000;
/// Seeds both encounter sampling and backend sampling when supported.
pub const DEFAULT_SEED: u64 = 313;

pub const DEFAULT_DATA_DIR: &str = "data/synthea";
pub const DEFAULT_OUTPUT_DIR: &str = "data/results";
pub const DEFAULT_OLLAMA_MODEL: &str = "medgemma";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=info", env!("CARGO_CRATE_NAME"))
}

// ═══════════════════════════════════════════════════════════
// Generation configuration
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ollama,
    Openai,
}

impl BackendKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::Ollama => DEFAULT_OLLAMA_MODEL,
            BackendKind::Openai => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::Ollama => crate::pipeline::narrative::OLLAMA_DEFAULT_URL,
            BackendKind::Openai => crate::pipeline::narrative::OPENAI_DEFAULT_URL,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max attempts must be at least 1 (got {0})")]
    MaxAttempts(u32),

    #[error("temperature must be within [0, 2] (got {0})")]
    Temperature(f32),

    #[error("max tokens must be positive")]
    MaxTokens,

    #[error("request timeout must be positive")]
    Timeout,
}

/// Everything the narrative generator and its backend need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub backend: BackendKind,
    pub model: String,
    pub base_url: String,
    /// Bearer token for OpenAI-compatible servers. Never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: Option<u64>,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let backend = BackendKind::Ollama;
        Self {
            backend,
            model: backend.default_model().to_string(),
            base_url: backend.default_base_url().to_string(),
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            seed: Some(DEFAULT_SEED),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::MaxAttempts(self.max_attempts));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Temperature(self.temperature));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::MaxTokens);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Timeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = GenerationConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.seed, Some(313));
        assert_eq!(cfg.model, "medgemma");
    }

    #[test]
    fn rejects_zero_attempts() {
        let cfg = GenerationConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::MaxAttempts(0)));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        for t in [-0.1, 2.5, f32::NAN] {
            let cfg = GenerationConfig {
                temperature: t,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(ConfigError::Temperature(_))));
        }
    }

    #[test]
    fn rejects_zero_tokens_and_timeout() {
        let cfg = GenerationConfig {
            max_tokens: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::MaxTokens));
        let cfg = GenerationConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Timeout));
    }

    #[test]
    fn api_key_never_serialized() {
        let cfg = GenerationConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("\"backend\":\"ollama\""));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: GenerationConfig =
            serde_json::from_str(r#"{"backend":"openai","model":"gpt-4o-mini"}"#).unwrap();
        assert_eq!(cfg.backend, BackendKind::Openai);
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn log_filter_names_crate() {
        assert!(default_log_filter().contains("encounter_narrative_lib"));
    }
}
