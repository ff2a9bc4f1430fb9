use crate::model::CompletionError;
use crate::session::SessionError;
use crate::tooling::{RegistryError, SchemaValidationError, ToolFailure};
use std::time::Duration;
use thiserror::Error;

/// Failure that ends a request. Nothing from the request is persisted.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Completion(CompletionError),
    #[error("agent exceeded the limit of {limit} model calls per request")]
    IterationLimitExceeded { limit: usize },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("request cancelled")]
    Cancelled,
}

impl From<CompletionError> for AgentError {
    fn from(error: CompletionError) -> Self {
        match error {
            CompletionError::Cancelled => AgentError::Cancelled,
            other => AgentError::Completion(other),
        }
    }
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Completion(CompletionError::ContextTooLong { .. }) => {
                "This conversation has grown too long for the available models. Please start a new session."
                    .to_string()
            }
            AgentError::Completion(CompletionError::Fatal { .. }) => {
                "The model provider rejected the request. Please check the model configuration."
                    .to_string()
            }
            AgentError::Completion(_) => {
                "Sorry, no model is available right now. Please try again in a minute.".to_string()
            }
            AgentError::IterationLimitExceeded { .. } => {
                "Sorry, I could not finish this task within the allowed number of steps.".to_string()
            }
            AgentError::Session(_) => {
                "Conversation history is unavailable right now. Please try again.".to_string()
            }
            AgentError::Cancelled => "The request was cancelled.".to_string(),
        }
    }
}

/// Why a single tool call produced an error result instead of output.
/// Rendered into the conversation for the model to act on.
#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: SchemaValidationError,
    },
    #[error("tool '{0}' was not run: the operator denied the call")]
    Denied(String),
    #[error("tool '{0}' was not run: approval timed out")]
    ApprovalTimedOut(String),
    #[error("tool call '{0}' is already awaiting approval")]
    AlreadyPending(String),
    #[error("tool '{tool}' failed: {source}")]
    Failed {
        tool: String,
        #[source]
        source: ToolFailure,
    },
    #[error("tool '{tool}' timed out after {}s", .after.as_secs())]
    TimedOut { tool: String, after: Duration },
    #[error("tool '{0}' was cancelled")]
    Cancelled(String),
}

impl From<RegistryError> for ToolCallError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::NotFound { name }
            | RegistryError::DuplicateName { name }
            | RegistryError::InvalidName { name } => ToolCallError::UnknownTool(name),
        }
    }
}
