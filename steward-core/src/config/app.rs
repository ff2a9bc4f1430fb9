use super::approval::ApprovalConfig;
use super::error::ConfigError;
use super::model::ModelConfig;
use crate::model::CooldownPolicy;
use std::path::Path;
use std::time::Duration;

/// Application configuration loaded from steward.toml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub system_prompt: Option<String>,
    pub max_iterations: usize,
    /// Stored history messages replayed per request.
    pub history_limit: usize,
    pub tool_timeout: Duration,
    pub request_timeout: Duration,
    /// Sorted by priority, ties in file order.
    pub models: Vec<ModelConfig>,
    pub cooldown: CooldownConfig,
    pub approval: ApprovalConfig,
}

/// `[cooldown]` section, in seconds per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownConfig {
    pub rate_limited: Duration,
    pub service_unavailable: Duration,
    pub context_too_long: Duration,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        let policy = CooldownPolicy::default();
        Self {
            rate_limited: policy.rate_limited,
            service_unavailable: policy.service_unavailable,
            context_too_long: policy.context_too_long,
        }
    }
}

impl From<CooldownConfig> for CooldownPolicy {
    fn from(config: CooldownConfig) -> Self {
        Self {
            rate_limited: config.rate_limited,
            service_unavailable: config.service_unavailable,
            context_too_long: config.context_too_long,
        }
    }
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    pub fn cooldown_policy(&self) -> CooldownPolicy {
        self.cooldown.into()
    }
}
