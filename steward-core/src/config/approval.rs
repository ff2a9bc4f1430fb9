use serde::Deserialize;
use std::time::Duration;

use crate::constants::DEFAULT_APPROVAL_TIMEOUT_SECS;

/// `[approval]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalConfig {
    pub timeout: Duration,
    pub rules: Vec<ApprovalRuleConfig>,
}

/// A call is dangerous when `tool` matches its name (`*` matches any tool)
/// and, if set, `pattern` matches the string form of `argument` (or of the
/// whole argument object when `argument` is unset).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApprovalRuleConfig {
    pub tool: String,
    #[serde(default)]
    pub argument: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl ApprovalRuleConfig {
    pub fn tool(name: impl Into<String>) -> Self {
        Self {
            tool: name.into(),
            argument: None,
            pattern: None,
        }
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_APPROVAL_TIMEOUT_SECS),
            rules: vec![ApprovalRuleConfig::tool("shell")],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawApprovalConfig {
    pub(super) timeout_secs: Option<u64>,
    pub(super) rules: Option<Vec<ApprovalRuleConfig>>,
}

impl From<RawApprovalConfig> for ApprovalConfig {
    fn from(raw: RawApprovalConfig) -> Self {
        let defaults = ApprovalConfig::default();
        Self {
            timeout: raw
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            rules: raw.rules.unwrap_or(defaults.rules),
        }
    }
}
