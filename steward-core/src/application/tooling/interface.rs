use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::ToolFailure;
use super::schema::ParameterSchema;
use crate::domain::ToolArguments;

/// Per-invocation context handed to a tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: String,
    pub tool_call_id: String,
    /// Cancelled when the surrounding request is abandoned. Long running
    /// tools should select on it.
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(
        session_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            tool_call_id: tool_call_id.into(),
            cancel,
        }
    }
}

/// A capability the agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> ParameterSchema;

    async fn execute(
        &self,
        arguments: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<String, ToolFailure>;
}
