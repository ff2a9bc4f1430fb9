//! Fallback chain across model backends

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::adapter::MessageAdapter;
use super::cooldown::{CooldownPolicy, CooldownTable};
use super::parser::{TextTurn, parse_text_turn};
use super::traits::ModelBackend;
use super::types::{
    BackendReply, BackendRequest, CompletionError, CompletionOptions, FailureKind, ModelAttempt,
    ModelError, ModelTurn, TurnAction,
};
use crate::domain::{Message, ToolCall};
use crate::tooling::ToolDefinition;

/// Entry of the fallback chain. Lower priority values are tried first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub identifier: String,
    pub priority: u32,
}

struct ChainEntry {
    spec: ModelSpec,
    backend: Arc<dyn ModelBackend>,
}

/// Model client that walks an ordered list of backends.
///
/// Owns the cooldown table: one instance is shared by every agent run, so a
/// model that is rate limited for one session is skipped for all of them.
pub struct ModelChain {
    entries: Vec<ChainEntry>,
    cooldowns: CooldownTable,
    policy: CooldownPolicy,
}

impl Default for ModelChain {
    fn default() -> Self {
        Self::new(CooldownPolicy::default())
    }
}

impl ModelChain {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            entries: Vec::new(),
            cooldowns: CooldownTable::default(),
            policy,
        }
    }

    /// Adds a backend. Entries with equal priority keep insertion order.
    pub fn with_backend(mut self, priority: u32, backend: Arc<dyn ModelBackend>) -> Self {
        self.push(priority, backend);
        self
    }

    pub fn push(&mut self, priority: u32, backend: Arc<dyn ModelBackend>) {
        let spec = ModelSpec {
            identifier: backend.id().to_string(),
            priority,
        };
        let position = self
            .entries
            .iter()
            .position(|entry| entry.spec.priority > priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, ChainEntry { spec, backend });
    }

    /// Builds the chain from model configuration using the HTTP backends.
    #[cfg(feature = "http-providers")]
    pub fn from_configs(
        configs: &[crate::config::ModelConfig],
        policy: CooldownPolicy,
    ) -> Result<Self, ModelError> {
        let mut chain = Self::new(policy);
        for config in configs {
            let backend = super::factory::ProviderFactory::create(config)?;
            chain.push(config.priority, backend);
        }
        Ok(chain)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelSpec> {
        self.entries.iter().map(|entry| &entry.spec)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    pub fn in_cooldown(&self, model: &str) -> bool {
        self.cooldowns.is_cooling(model)
    }

    pub fn cooldown_remaining(&self, model: &str) -> Option<Duration> {
        self.cooldowns.remaining(model)
    }

    /// Makes `model` eligible again immediately.
    pub fn reset_cooldown(&self, model: &str) {
        self.cooldowns.clear(model);
    }

    /// Requests a completion, falling back along the chain.
    pub async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<ModelTurn, CompletionError> {
        if self.entries.is_empty() {
            return Err(CompletionError::NoModelsConfigured);
        }

        let mut attempts = Vec::new();
        let mut skipped = Vec::new();

        for entry in &self.entries {
            if options.cancel.is_cancelled() {
                return Err(CompletionError::Cancelled);
            }

            let model = entry.spec.identifier.as_str();
            if self.cooldowns.is_cooling(model) {
                debug!(model, "Skipping model in cooldown");
                skipped.push(model.to_string());
                continue;
            }

            match self.attempt(entry, conversation, tools, options).await {
                Ok(turn) => {
                    info!(
                        model,
                        session = options.session_id.as_deref(),
                        failed_before = attempts.len(),
                        "Model served completion"
                    );
                    return Ok(turn);
                }
                Err(ModelError::Cancelled { .. }) => return Err(CompletionError::Cancelled),
                Err(error) => {
                    let kind = error.kind();
                    if kind == FailureKind::Fatal {
                        warn!(model, %error, "Fatal model error, aborting fallback chain");
                        return Err(CompletionError::Fatal {
                            model: model.to_string(),
                            source: error,
                        });
                    }
                    if let Some(duration) = self.policy.duration_for(&error) {
                        self.cooldowns.place(model, duration);
                        warn!(
                            model,
                            failure = kind.as_str(),
                            cooldown_secs = duration.as_secs(),
                            %error,
                            "Model failed, placed on cooldown and falling back"
                        );
                    } else {
                        warn!(model, failure = kind.as_str(), %error, "Model failed, falling back");
                    }
                    attempts.push(ModelAttempt {
                        model: model.to_string(),
                        error,
                    });
                }
            }
        }

        if !attempts.is_empty()
            && attempts
                .iter()
                .all(|attempt| attempt.error.kind() == FailureKind::ContextTooLong)
        {
            return Err(CompletionError::ContextTooLong { attempts });
        }

        warn!(
            failed = attempts.len(),
            cooling_down = skipped.len(),
            "All models exhausted"
        );
        Err(CompletionError::AllModelsExhausted { attempts, skipped })
    }

    /// One model, with a single same-model retry on malformed output.
    async fn attempt(
        &self,
        entry: &ChainEntry,
        conversation: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<ModelTurn, ModelError> {
        let mut retried = false;
        loop {
            match self.call_once(entry, conversation, tools, options).await {
                Err(error) if error.kind() == FailureKind::InvalidResponse && !retried => {
                    retried = true;
                    warn!(
                        model = entry.spec.identifier.as_str(),
                        %error,
                        "Invalid model response, retrying same model once"
                    );
                }
                other => return other,
            }
        }
    }

    async fn call_once(
        &self,
        entry: &ChainEntry,
        conversation: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<ModelTurn, ModelError> {
        let model = entry.spec.identifier.as_str();
        let structured = entry.backend.supports_tools();
        let request = if structured {
            BackendRequest {
                messages: conversation.to_vec(),
                tools: tools.to_vec(),
                session_id: options.session_id.clone(),
            }
        } else {
            BackendRequest {
                messages: MessageAdapter::to_text_mode(conversation, tools),
                tools: Vec::new(),
                session_id: options.session_id.clone(),
            }
        };

        debug!(
            model,
            structured,
            messages = request.messages.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let reply = tokio::select! {
            _ = options.cancel.cancelled() => {
                return Err(ModelError::Cancelled { model: model.to_string() });
            }
            result = tokio::time::timeout(options.request_timeout, entry.backend.complete(request)) => {
                match result {
                    Ok(reply) => reply?,
                    Err(_) => {
                        return Err(ModelError::Timeout {
                            model: model.to_string(),
                            after: options.request_timeout,
                        });
                    }
                }
            }
        };

        let action = if structured {
            structured_action(model, reply)?
        } else {
            text_action(model, &reply.content)?
        };

        Ok(ModelTurn {
            model: model.to_string(),
            action,
        })
    }
}

fn structured_action(model: &str, reply: BackendReply) -> Result<TurnAction, ModelError> {
    if reply.tool_calls.is_empty() {
        let text = reply.content.trim();
        if text.is_empty() {
            return Err(ModelError::invalid_response(
                model,
                "completion carried neither text nor tool calls",
            ));
        }
        return Ok(TurnAction::Final(text.to_string()));
    }

    let mut seen = HashSet::new();
    let mut calls = Vec::with_capacity(reply.tool_calls.len());
    for mut call in reply.tool_calls {
        if call.name.trim().is_empty() {
            return Err(ModelError::invalid_response(model, "tool call without a name"));
        }
        if call.id.trim().is_empty() {
            call.id = new_call_id();
        }
        if !seen.insert(call.id.clone()) {
            return Err(ModelError::invalid_response(
                model,
                format!("duplicate tool call id '{}'", call.id),
            ));
        }
        calls.push(call);
    }

    Ok(TurnAction::ToolCalls {
        content: reply.content,
        calls,
    })
}

fn text_action(model: &str, content: &str) -> Result<TurnAction, ModelError> {
    match parse_text_turn(content).map_err(|reason| ModelError::invalid_response(model, reason))? {
        TextTurn::Final(text) if text.is_empty() => Err(ModelError::invalid_response(
            model,
            "completion carried no text",
        )),
        TextTurn::Final(text) => Ok(TurnAction::Final(text)),
        TextTurn::Calls { content, calls } => Ok(TurnAction::ToolCalls {
            content,
            calls: calls
                .into_iter()
                .map(|call| ToolCall::new(new_call_id(), call.name, call.arguments))
                .collect(),
        }),
    }
}

fn new_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}
