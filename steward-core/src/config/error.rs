use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no models configured - at least one [[models]] entry is required")]
    NoModelsConfigured,

    #[error("model id '{id}' is configured more than once")]
    DuplicateModel { id: String },

    #[error("model '{model}' uses unknown provider '{provider}' (expected openai or ollama)")]
    UnknownProvider { model: String, provider: String },

    #[error("model '{model}' is missing required field 'endpoint'")]
    MissingEndpoint { model: String },

    #[error("model '{model}' is missing required field 'model'")]
    MissingModelName { model: String },

    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("approval rule for tool '{tool}' has an invalid pattern: {source}")]
    InvalidRulePattern {
        tool: String,
        #[source]
        source: regex::Error,
    },
}
