use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatch::ToolDispatcher;
use super::errors::AgentError;
use super::models::AgentConfig;
use super::session_lock::SessionLocks;
use crate::approval::ApprovalGate;
use crate::domain::{AgentResponse, Message, MessageRole};
use crate::model::{CompletionOptions, ModelChain, TurnAction};
use crate::session::SessionStore;
use crate::tooling::ToolRegistry;

/// The agent loop.
///
/// One instance serves every session. Requests for distinct sessions run
/// concurrently; requests for the same session queue behind each other.
pub struct Agent {
    registry: Arc<ToolRegistry>,
    models: Arc<ModelChain>,
    sessions: Arc<dyn SessionStore>,
    approvals: Option<Arc<ApprovalGate>>,
    config: AgentConfig,
    locks: SessionLocks,
}

impl Agent {
    pub fn new(
        registry: Arc<ToolRegistry>,
        models: Arc<ModelChain>,
        sessions: Arc<dyn SessionStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            registry,
            models,
            sessions,
            approvals: None,
            config,
            locks: SessionLocks::default(),
        }
    }

    /// Routes dangerous tool calls through `gate`. Without a gate every call runs.
    pub fn with_approval_gate(mut self, gate: Arc<ApprovalGate>) -> Self {
        self.approvals = Some(gate);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn models(&self) -> &Arc<ModelChain> {
        &self.models
    }

    pub fn approvals(&self) -> Option<&Arc<ApprovalGate>> {
        self.approvals.as_ref()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn process_request(
        &self,
        session_id: &str,
        user_text: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.process_request_with_cancel(session_id, user_text, CancellationToken::new())
            .await
    }

    /// Runs one request to completion. Cancelling `cancel` aborts the
    /// in-flight model call and tool calls and denies pending approvals.
    pub async fn process_request_with_cancel(
        &self,
        session_id: &str,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<AgentResponse, AgentError> {
        let _session_guard = tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            guard = self.locks.acquire(session_id) => guard,
        };

        info!(session = session_id, "Agent request started");

        let history = self
            .sessions
            .load_history(session_id, self.config.history_limit)
            .await?;
        let history = from_turn_boundary(history);

        let mut conversation = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = self
            .config
            .system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
        {
            conversation.push(Message::system(prompt));
        }
        conversation.extend(history);
        let first_new = conversation.len();
        conversation.push(Message::user(user_text));

        let definitions = self.registry.list();
        let options = CompletionOptions {
            request_timeout: self.config.request_timeout,
            cancel: cancel.clone(),
            session_id: Some(session_id.to_string()),
        };

        let mut tools_used = Vec::new();
        let mut served_by = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;
            if iteration > self.config.max_iterations {
                warn!(
                    session = session_id,
                    limit = self.config.max_iterations,
                    "Agent exceeded iteration limit"
                );
                return Err(AgentError::IterationLimitExceeded {
                    limit: self.config.max_iterations,
                });
            }

            debug!(
                session = session_id,
                iteration,
                messages = conversation.len(),
                "Submitting agent turn to model chain"
            );
            let turn = self
                .models
                .complete(&conversation, definitions, &options)
                .await?;
            served_by.push(turn.model);

            match turn.action {
                TurnAction::Final(text) => {
                    conversation.push(Message::assistant(text.clone()));
                    self.sessions
                        .append_batch(session_id, conversation.split_off(first_new))
                        .await?;
                    info!(
                        session = session_id,
                        iteration,
                        tools = tools_used.len(),
                        "Agent returned final response"
                    );
                    return Ok(AgentResponse {
                        final_text: text,
                        tools_used,
                        iteration_count: iteration,
                        models: served_by,
                    });
                }
                TurnAction::ToolCalls { content, calls } => {
                    info!(
                        session = session_id,
                        iteration,
                        calls = calls.len(),
                        "Model requested tool calls"
                    );
                    let dispatcher = ToolDispatcher {
                        registry: &self.registry,
                        approvals: self.approvals.as_deref(),
                        tool_timeout: self.config.tool_timeout,
                        session_id,
                        cancel: &cancel,
                        iteration,
                    };
                    let outcomes = dispatcher.dispatch_all(&calls).await;
                    if cancel.is_cancelled() {
                        info!(session = session_id, iteration, "Agent request cancelled");
                        return Err(AgentError::Cancelled);
                    }

                    conversation.push(Message::assistant_with_calls(content, calls));
                    for outcome in outcomes {
                        conversation.push(Message::tool(&outcome.result));
                        tools_used.push(outcome.tool_use);
                    }
                }
            }
        }
    }
}

/// Drops leading messages until the first user message, so a history window
/// never starts with tool results whose calls were cut off.
fn from_turn_boundary(mut history: Vec<Message>) -> Vec<Message> {
    let start = history
        .iter()
        .position(|message| message.role == MessageRole::User)
        .unwrap_or(history.len());
    history.drain(..start);
    history
}
