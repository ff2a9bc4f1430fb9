//! OpenAI-compatible client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ModelConfig;
use crate::domain::ToolCall;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::factory::resolve_api_key;
use crate::infrastructure::model::traits::ModelBackend;
use crate::infrastructure::model::types::{BackendReply, BackendRequest, ModelError};

const DEFAULT_API_PATH: &str = "/v1/chat/completions";

/// OpenAI-compatible client (works with OpenAI, Mistral, Groq, vLLM, etc.)
#[derive(Clone)]
pub struct OpenAIClient {
    base: HttpClientBase,
    model: String,
    api_path: String,
    supports_tools: bool,
}

impl OpenAIClient {
    pub fn from_config(config: &ModelConfig) -> Self {
        let api_key = resolve_api_key(&config.id, config.api_key.as_deref());
        Self {
            base: HttpClientBase::new(config.id.clone(), config.endpoint.clone(), api_key),
            model: config.model.clone(),
            api_path: config
                .api_path
                .clone()
                .unwrap_or_else(|| DEFAULT_API_PATH.to_string()),
            supports_tools: config.supports_tools,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.base.api_key.is_some()
    }
}

#[async_trait]
impl ModelBackend for OpenAIClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    fn supports_tools(&self) -> bool {
        self.supports_tools
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendReply, ModelError> {
        let url = self.base.build_url(&self.api_path);

        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|definition| definition.to_function_json())
            .collect();

        let payload = OpenAIRequest {
            model: self.model.clone(),
            messages: MessageAdapter::to_openai_format(&request.messages),
            tools,
            stream: false,
        };

        info!(
            provider = self.base.id.as_str(),
            model = self.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to OpenAI-compatible provider"
        );

        let response: OpenAIResponse = self.base.post_json(&url, &payload, true).await?;
        debug!("Received response from OpenAI-compatible provider");

        let message = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .ok_or_else(|| ModelError::invalid_response(&self.base.id, "missing message"))?;

        let mut calls = Vec::with_capacity(message.tool_calls.len());
        for call in message.tool_calls {
            let arguments = decode_arguments(&call.function.arguments).ok_or_else(|| {
                ModelError::invalid_response(
                    &self.base.id,
                    format!("tool call '{}' has non-JSON arguments", call.function.name),
                )
            })?;
            calls.push(ToolCall::new(call.id, call.function.name, arguments));
        }

        Ok(BackendReply::with_calls(
            message.content.unwrap_or_default(),
            calls,
        ))
    }
}

fn decode_arguments(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return Some(Value::Null);
    }
    serde_json::from_str(raw).ok()
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAIToolCall>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    #[serde(default)]
    id: String,
    function: OpenAIFunction,
}

#[derive(Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
