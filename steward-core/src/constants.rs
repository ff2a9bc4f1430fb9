//! Application constants
//!
//! Single source of truth for paths and default limits.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/steward.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

pub const DEFAULT_MAX_ITERATIONS: usize = 8;
pub const DEFAULT_HISTORY_LIMIT: usize = 40;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 120;
