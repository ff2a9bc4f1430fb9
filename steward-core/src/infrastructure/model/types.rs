//! Model types - requests, replies, turns and errors

use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{Message, ToolCall};
use crate::tooling::ToolDefinition;

/// Request handed to a single backend.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub messages: Vec<Message>,
    /// Empty when the backend runs in text mode.
    pub tools: Vec<ToolDefinition>,
    pub session_id: Option<String>,
}

/// Raw reply from a single backend.
#[derive(Debug, Clone, Default)]
pub struct BackendReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl BackendReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnAction {
    Final(String),
    ToolCalls {
        /// Assistant text accompanying the calls, possibly empty.
        content: String,
        calls: Vec<ToolCall>,
    },
}

/// Parsed model turn plus the identifier of the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTurn {
    pub model: String,
    pub action: TurnAction,
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub request_timeout: Duration,
    pub cancel: CancellationToken,
    pub session_id: Option<String>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS),
            cancel: CancellationToken::new(),
            session_id: None,
        }
    }
}

/// How the fallback chain reacts to a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    ServiceUnavailable,
    ContextTooLong,
    InvalidResponse,
    Fatal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ServiceUnavailable => "service_unavailable",
            FailureKind::ContextTooLong => "context_too_long",
            FailureKind::InvalidResponse => "invalid_response",
            FailureKind::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model '{model}' is rate limited")]
    RateLimited {
        model: String,
        retry_after: Option<Duration>,
    },
    #[error("model '{model}' is unavailable: {reason}")]
    Unavailable { model: String, reason: String },
    #[error("request to model '{model}' timed out after {after:?}")]
    Timeout { model: String, after: Duration },
    #[error("conversation exceeds the context window of model '{model}'")]
    ContextTooLong { model: String },
    #[error("model '{model}' returned an invalid response: {reason}")]
    InvalidResponse { model: String, reason: String },
    #[error("model '{model}' rejected the request: {reason}")]
    Fatal { model: String, reason: String },
    #[error("model '{model}' requires an API key")]
    MissingApiKey { model: String },
    #[cfg(feature = "http-providers")]
    #[error("network error calling model '{model}': {source}")]
    Network {
        model: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to model '{model}' was cancelled")]
    Cancelled { model: String },
}

impl ModelError {
    pub fn rate_limited(model: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            model: model.into(),
            retry_after,
        }
    }

    pub fn unavailable(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn context_too_long(model: impl Into<String>) -> Self {
        Self::ContextTooLong {
            model: model.into(),
        }
    }

    pub fn invalid_response(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn fatal(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fatal {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_api_key(model: impl Into<String>) -> Self {
        Self::MissingApiKey {
            model: model.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ModelError::RateLimited { .. } => FailureKind::RateLimited,
            ModelError::Unavailable { .. } | ModelError::Timeout { .. } => {
                FailureKind::ServiceUnavailable
            }
            #[cfg(feature = "http-providers")]
            ModelError::Network { .. } => FailureKind::ServiceUnavailable,
            ModelError::ContextTooLong { .. } => FailureKind::ContextTooLong,
            ModelError::InvalidResponse { .. } => FailureKind::InvalidResponse,
            ModelError::Fatal { .. } | ModelError::MissingApiKey { .. } | ModelError::Cancelled { .. } => {
                FailureKind::Fatal
            }
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ModelError::RateLimited { model, .. }
            | ModelError::Unavailable { model, .. }
            | ModelError::Timeout { model, .. }
            | ModelError::ContextTooLong { model }
            | ModelError::InvalidResponse { model, .. }
            | ModelError::Fatal { model, .. }
            | ModelError::MissingApiKey { model }
            | ModelError::Cancelled { model } => model,
            #[cfg(feature = "http-providers")]
            ModelError::Network { model, .. } => model,
        }
    }
}

/// The last failure recorded for one model in the chain.
#[derive(Debug)]
pub struct ModelAttempt {
    pub model: String,
    pub error: ModelError,
}

/// Failure of the whole fallback chain.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no models are configured")]
    NoModelsConfigured,
    #[error(
        "all models exhausted ({} failed, {} cooling down)",
        .attempts.len(),
        .skipped.len()
    )]
    AllModelsExhausted {
        attempts: Vec<ModelAttempt>,
        skipped: Vec<String>,
    },
    #[error("conversation exceeds the context window of every available model")]
    ContextTooLong { attempts: Vec<ModelAttempt> },
    #[error("model '{model}' failed: {source}")]
    Fatal {
        model: String,
        #[source]
        source: ModelError,
    },
    #[error("completion cancelled")]
    Cancelled,
}

impl CompletionError {
    pub fn attempts(&self) -> &[ModelAttempt] {
        match self {
            CompletionError::AllModelsExhausted { attempts, .. }
            | CompletionError::ContextTooLong { attempts } => attempts,
            _ => &[],
        }
    }
}
