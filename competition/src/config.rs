//! Run-level configuration supplied at construction.
//!
//! Every field has a default, so an empty TOML table or `{}` is a valid
//! configuration. The model settings are opaque to the kernel and only
//! plumbed through to the agents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::RubricWeights;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_rounds must be at least 1")]
    NoRounds,

    #[error("temperature {0} outside 0.0..=2.0")]
    Temperature(f64),

    #[error("max_tokens {0} below minimum of 100")]
    MaxTokens(u64),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("model_name is empty")]
    EmptyModel,
}

/// Model selection and sampling for every role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 1500,
        }
    }
}

/// Competition parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionConfig {
    pub max_rounds: u32,
    pub model: ModelSettings,
    /// Wall-clock allowance for the round controller and each solver turn.
    pub time_per_round_secs: u64,
    /// Wall-clock allowance for the reviewer turn.
    pub review_time_secs: u64,
    pub scoring_rules: RubricWeights,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            model: ModelSettings::default(),
            time_per_round_secs: 600,
            review_time_secs: 300,
            scoring_rules: RubricWeights::default(),
        }
    }
}

impl CompetitionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        if self.model.model_name.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Temperature(self.model.temperature));
        }
        if self.model.max_tokens < 100 {
            return Err(ConfigError::MaxTokens(self.model.max_tokens));
        }
        if self.time_per_round_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "time_per_round_secs",
            });
        }
        if self.review_time_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "review_time_secs",
            });
        }
        Ok(())
    }
}
