pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, approval, session, tooling};
pub use config::{AppConfig, ConfigError};
pub use domain::types;
pub use infrastructure::model;

pub use agent::{Agent, AgentConfig, AgentError};
pub use domain::{AgentResponse, Message, ToolCall, ToolResult};
