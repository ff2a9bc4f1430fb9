use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{name}' is already registered")]
    DuplicateName { name: String },
    #[error("tool '{name}' is not registered")]
    NotFound { name: String },
    #[error("tool names must be non-empty and free of whitespace, got '{name}'")]
    InvalidName { name: String },
}

/// Arguments rejected before the tool was ever invoked.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaValidationError {
    #[error("arguments must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
    #[error("unknown argument '{argument}'")]
    UnknownArgument { argument: String },
    #[error("missing required argument '{argument}'")]
    MissingArgument { argument: String },
    #[error("argument '{argument}' must be {expected}, got {found}")]
    TypeMismatch {
        argument: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("argument '{argument}' must be one of {allowed}")]
    NotInEnum { argument: String, allowed: String },
}

/// Failure reported by a tool implementation.
///
/// Never fatal to the agent: it is folded into an error tool result so the
/// model can react to it.
#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error("{0}")]
    Failed(String),
    #[error("invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("execution cancelled")]
    Cancelled,
}

impl ToolFailure {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}
