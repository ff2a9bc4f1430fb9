use std::time::Duration;

use crate::config::AppConfig;
use crate::constants::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_ITERATIONS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TOOL_TIMEOUT_SECS,
};

/// Limits and prompt applied to every request an [`Agent`](super::Agent) serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub system_prompt: Option<String>,
    /// Hard cap on model calls per request.
    pub max_iterations: usize,
    pub history_limit: usize,
    /// Bound for each tool invocation, excluding time spent awaiting approval.
    pub tool_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl From<&AppConfig> for AgentConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            max_iterations: config.max_iterations,
            history_limit: config.history_limit,
            tool_timeout: config.tool_timeout,
            request_timeout: config.request_timeout,
        }
    }
}
