//! Ollama client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ModelConfig;
use crate::domain::{MessageRole, ToolCall};
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::ModelBackend;
use crate::infrastructure::model::types::{BackendReply, BackendRequest, ModelError};

/// Ollama client for local LLM
#[derive(Clone)]
pub struct OllamaClient {
    base: HttpClientBase,
    model: String,
    supports_tools: bool,
}

impl OllamaClient {
    /// Creates client from model config.
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            base: HttpClientBase::new(config.id.clone(), config.endpoint.clone(), None),
            model: config.model.clone(),
            supports_tools: config.supports_tools,
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    fn supports_tools(&self) -> bool {
        self.supports_tools
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendReply, ModelError> {
        let url = self.base.build_url("/api/chat");

        // Ollama's native tool format mirrors OpenAI's, except arguments stay objects.
        let messages = if request.tools.is_empty() {
            MessageAdapter::to_plain_format(&request.messages)
        } else {
            let mut messages = MessageAdapter::to_openai_format(&request.messages);
            for (value, message) in messages.iter_mut().zip(&request.messages) {
                if message.role == MessageRole::Assistant && !message.tool_calls.is_empty() {
                    value["tool_calls"] = message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            serde_json::json!({
                                "function": {"name": call.name, "arguments": call.arguments}
                            })
                        })
                        .collect();
                }
            }
            messages
        };

        let payload = OllamaRequest {
            model: self.model.clone(),
            messages,
            tools: request.tools.iter().map(|d| d.to_function_json()).collect(),
            stream: false,
        };

        info!(
            provider = self.base.id.as_str(),
            model = self.model.as_str(),
            messages = request.messages.len(),
            "Sending request to Ollama"
        );

        let response: OllamaResponse = self.base.post_json(&url, &payload, false).await?;
        debug!("Received response from Ollama");

        let message = response
            .message
            .ok_or_else(|| ModelError::invalid_response(&self.base.id, "missing message"))?;

        let calls = message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall::new(String::new(), call.function.name, call.function.arguments))
            .collect();

        Ok(BackendReply::with_calls(message.content, calls))
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}
