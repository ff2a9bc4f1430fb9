use futures::future::join_all;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::ToolCallError;
use crate::approval::{ApprovalError, ApprovalGate, ApprovalState};
use crate::domain::{ToolCall, ToolResult, ToolUse};
use crate::tooling::{ToolContext, ToolRegistry};

pub(super) struct DispatchOutcome {
    pub result: ToolResult,
    pub tool_use: ToolUse,
}

/// Runs one model turn's tool calls.
pub(super) struct ToolDispatcher<'a> {
    pub registry: &'a ToolRegistry,
    pub approvals: Option<&'a ApprovalGate>,
    pub tool_timeout: Duration,
    pub session_id: &'a str,
    pub cancel: &'a CancellationToken,
    pub iteration: usize,
}

impl ToolDispatcher<'_> {
    /// Executes all calls concurrently. Outcomes keep the order of `calls`.
    pub(super) async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<DispatchOutcome> {
        join_all(calls.iter().map(|call| self.dispatch(call))).await
    }

    async fn dispatch(&self, call: &ToolCall) -> DispatchOutcome {
        let result = match self.run(call).await {
            Ok(output) => {
                info!(
                    session = self.session_id,
                    iteration = self.iteration,
                    tool = call.name.as_str(),
                    tool_call_id = call.id.as_str(),
                    "Tool call succeeded"
                );
                ToolResult::success(&call.id, output)
            }
            Err(error) => {
                warn!(
                    session = self.session_id,
                    iteration = self.iteration,
                    tool = call.name.as_str(),
                    tool_call_id = call.id.as_str(),
                    %error,
                    "Tool call failed"
                );
                ToolResult::error(&call.id, format!("Error: {error}"))
            }
        };

        DispatchOutcome {
            tool_use: ToolUse {
                name: call.name.clone(),
                arguments: if call.arguments.is_null() {
                    Value::Object(Default::default())
                } else {
                    call.arguments.clone()
                },
                result: result.content.clone(),
                is_error: result.is_error,
            },
            result,
        }
    }

    async fn run(&self, call: &ToolCall) -> Result<String, ToolCallError> {
        let tool = self.registry.get(&call.name)?;
        let arguments = tool
            .parameter_schema()
            .validate(&call.arguments)
            .map_err(|source| ToolCallError::InvalidArguments {
                tool: call.name.clone(),
                source,
            })?;

        if let Some(gate) = self.approvals.filter(|gate| gate.requires_approval(call)) {
            let outcome = gate
                .request(call, self.cancel)
                .await
                .map_err(|ApprovalError::AlreadyPending { tool_call_id }| {
                    ToolCallError::AlreadyPending(tool_call_id)
                })?;
            match outcome.state {
                ApprovalState::Approved => {}
                ApprovalState::TimedOut => return Err(ToolCallError::ApprovalTimedOut(call.name.clone())),
                ApprovalState::Denied | ApprovalState::Pending => {
                    return Err(ToolCallError::Denied(call.name.clone()));
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(ToolCallError::Cancelled(call.name.clone()));
        }

        debug!(
            session = self.session_id,
            tool = call.name.as_str(),
            tool_call_id = call.id.as_str(),
            "Executing tool"
        );

        let ctx = ToolContext::new(self.session_id, &call.id, self.cancel.child_token());
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ToolCallError::Cancelled(call.name.clone())),
            result = tokio::time::timeout(self.tool_timeout, tool.execute(&arguments, &ctx)) => {
                match result {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(source)) => Err(ToolCallError::Failed {
                        tool: call.name.clone(),
                        source,
                    }),
                    Err(_) => {
                        ctx.cancel.cancel();
                        Err(ToolCallError::TimedOut {
                            tool: call.name.clone(),
                            after: self.tool_timeout,
                        })
                    }
                }
            }
        }
    }
}
