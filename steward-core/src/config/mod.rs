pub mod app;
pub mod approval;
pub mod error;
pub mod loader;
pub mod model;

pub use crate::constants::CONFIG_PATH;

pub use app::{AppConfig, CooldownConfig};
pub use approval::{ApprovalConfig, ApprovalRuleConfig};
pub use error::ConfigError;
pub use loader::{ensure_env_loaded, expand_path, load_config, parse_config};
pub use model::{ModelConfig, ProviderKind};
