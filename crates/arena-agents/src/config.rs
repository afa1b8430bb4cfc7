//! Arena configuration: competition parameters plus endpoint and sandbox.
//!
//! Resolution order, lowest to highest: built-in defaults, TOML file,
//! environment, CLI flags (applied by the binary).

use std::path::Path;

use anyhow::{Context, Result};
use competition::CompetitionConfig;
use rig::providers::openai;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub api_key: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
        }
    }
}

/// Local interpreter used by the sandbox tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub interpreter: String,
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            timeout_secs: 10,
        }
    }
}

/// Top-level arena configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub competition: CompetitionConfig,
    pub endpoint: EndpointConfig,
    pub sandbox: SandboxConfig,
    /// Retries for transient model-call failures (429/502/503, connection).
    pub max_model_retries: u32,
    /// Tool-loop depth for a single prompt.
    pub max_turns_per_call: usize,
    /// Tool calls allowed in a single prompt before it is cut off.
    pub max_tool_calls_per_turn: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            competition: CompetitionConfig::default(),
            endpoint: EndpointConfig::default(),
            sandbox: SandboxConfig::default(),
            max_model_retries: 3,
            max_turns_per_call: 8,
            max_tool_calls_per_turn: 12,
        }
    }
}

impl ArenaConfig {
    /// Defaults, then the optional TOML file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse arena TOML")
    }

    /// Overlay `ARENA_*` variables read through `lookup`.
    ///
    /// `ARENA_API_KEY` falls back to `OPENAI_API_KEY`. Unparseable numeric
    /// values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ARENA_BASE_URL") {
            self.endpoint.url = url;
        }
        if let Some(key) = lookup("ARENA_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.endpoint.api_key = key;
        }
        if let Some(model) = lookup("ARENA_MODEL") {
            self.competition.model.model_name = model;
        }
        if let Some(python) = lookup("ARENA_PYTHON") {
            self.sandbox.interpreter = python;
        }
        if let Some(rounds) = lookup("ARENA_MAX_ROUNDS") {
            match rounds.trim().parse::<u32>() {
                Ok(n) => self.competition.max_rounds = n,
                Err(e) => tracing::warn!(value = %rounds, error = %e, "Ignoring ARENA_MAX_ROUNDS"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.competition
            .validate()
            .context("Invalid competition settings")?;
        if self.endpoint.url.trim().is_empty() {
            anyhow::bail!("endpoint url is empty");
        }
        if self.sandbox.interpreter.trim().is_empty() {
            anyhow::bail!("sandbox interpreter is empty");
        }
        if self.sandbox.timeout_secs == 0 {
            anyhow::bail!("sandbox timeout_secs must be greater than zero");
        }
        if self.max_turns_per_call == 0 {
            anyhow::bail!("max_turns_per_call must be greater than zero");
        }
        Ok(())
    }

    /// Build the rig client for the configured endpoint.
    pub fn client(&self) -> Result<openai::CompletionsClient> {
        let api_key = if self.endpoint.api_key.is_empty() {
            "not-needed"
        } else {
            self.endpoint.api_key.as_str()
        };
        openai::CompletionsClient::builder()
            .api_key(api_key)
            .base_url(&self.endpoint.url)
            .build()
            .with_context(|| format!("Failed to build client for {}", self.endpoint.url))
    }
}

/// Check if an inference endpoint is reachable (GET {url}/models).
pub async fn check_endpoint(url: &str, api_key: Option<&str>) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    let mut request = reqwest::Client::new()
        .get(&models_url)
        .timeout(std::time::Duration::from_secs(5));
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        request = request.bearer_auth(key);
    }
    match request.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ArenaConfig::default();
        assert_eq!(config.sandbox.interpreter, "python3");
        assert_eq!(config.sandbox.timeout_secs, 10);
        assert_eq!(config.max_model_retries, 3);
        assert_eq!(config.competition.max_rounds, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = ArenaConfig::from_toml_str(
            r#"
            max_tool_calls_per_turn = 4

            [competition]
            max_rounds = 5
            review_time_secs = 120

            [competition.model]
            model_name = "qwen2.5-coder"

            [competition.scoring_rules]
            correctness = 6

            [endpoint]
            url = "http://localhost:8080/v1"
            "#,
        )
        .unwrap();
        assert_eq!(config.competition.max_rounds, 5);
        assert_eq!(config.competition.review_time_secs, 120);
        assert_eq!(config.competition.model.model_name, "qwen2.5-coder");
        assert_eq!(config.competition.model.max_tokens, 1500);
        assert_eq!(config.competition.scoring_rules.correctness, 6);
        assert_eq!(config.competition.scoring_rules.efficiency, 3);
        assert_eq!(config.endpoint.url, "http://localhost:8080/v1");
        assert_eq!(config.max_tool_calls_per_turn, 4);
        assert_eq!(config.sandbox.interpreter, "python3");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ArenaConfig::from_toml_str("[competition]\nmax_rounds = 5\n").unwrap();
        config.apply_env(env(&[
            ("ARENA_MAX_ROUNDS", "2"),
            ("ARENA_MODEL", "gpt-4o"),
            ("ARENA_PYTHON", "/usr/bin/python3.12"),
            ("OPENAI_API_KEY", "sk-fallback"),
        ]));
        assert_eq!(config.competition.max_rounds, 2);
        assert_eq!(config.competition.model.model_name, "gpt-4o");
        assert_eq!(config.sandbox.interpreter, "/usr/bin/python3.12");
        assert_eq!(config.endpoint.api_key, "sk-fallback");
    }

    #[test]
    fn test_arena_key_beats_openai_key() {
        let mut config = ArenaConfig::default();
        config.apply_env(env(&[
            ("ARENA_API_KEY", "sk-arena"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]));
        assert_eq!(config.endpoint.api_key, "sk-arena");
    }

    #[test]
    fn test_bad_round_env_ignored() {
        let mut config = ArenaConfig::default();
        config.apply_env(env(&[("ARENA_MAX_ROUNDS", "many")]));
        assert_eq!(config.competition.max_rounds, 3);
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let mut config = ArenaConfig::default();
        config.competition.max_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArenaConfig::from_toml_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
