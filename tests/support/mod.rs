// Shared stubs for integration tests: scripted model backends, small tools
// and a notifier that forwards approval prompts to a channel.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use steward_core::approval::{ApprovalNotifier, NotifyError, PendingApproval};
use steward_core::domain::{ToolArguments, ToolCall};
use steward_core::model::{BackendReply, BackendRequest, ModelBackend, ModelError};
use steward_core::tooling::{
    ParameterSchema, PropertySchema, Tool, ToolContext, ToolFailure, ToolRegistry,
};
use tokio::sync::{Mutex, mpsc};

pub struct ScriptedBackend {
    id: String,
    structured: bool,
    replies: Mutex<VecDeque<Result<BackendReply, ModelError>>>,
    pub requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn new(id: &str, replies: Vec<Result<BackendReply, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            structured: true,
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn text_mode(id: &str, replies: Vec<Result<BackendReply, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            structured: false,
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_tools(&self) -> bool {
        self.structured
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendReply, ModelError> {
        self.requests.lock().await.push(request);
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::unavailable(&self.id, "script exhausted")))
    }
}

pub fn reply_text(content: &str) -> Result<BackendReply, ModelError> {
    Ok(BackendReply::text(content))
}

pub fn reply_calls(calls: Vec<ToolCall>) -> Result<BackendReply, ModelError> {
    Ok(BackendReply::with_calls("", calls))
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the text argument"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new().required_property("text", PropertySchema::string("Text to echo"))
    }

    async fn execute(&self, arguments: &ToolArguments, _ctx: &ToolContext) -> Result<String, ToolFailure> {
        arguments
            .get_str("text")
            .map(str::to_string)
            .ok_or_else(|| ToolFailure::invalid_argument("text", "missing"))
    }
}

#[derive(Default)]
pub struct RmFileTool {
    pub runs: AtomicUsize,
}

impl RmFileTool {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for RmFileTool {
    fn name(&self) -> &str {
        "rm_file"
    }

    fn description(&self) -> &str {
        "Delete a file"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new().required_property("path", PropertySchema::string("File to delete"))
    }

    async fn execute(&self, arguments: &ToolArguments, _ctx: &ToolContext) -> Result<String, ToolFailure> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(format!("deleted {}", arguments.get_str("path").unwrap_or_default()))
    }
}

pub fn echo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool).expect("register echo");
    registry
}

pub struct ChannelNotifier(pub mpsc::UnboundedSender<PendingApproval>);

#[async_trait]
impl ApprovalNotifier for ChannelNotifier {
    async fn request_approval(&self, approval: &PendingApproval) -> Result<(), NotifyError> {
        self.0
            .send(approval.clone())
            .map_err(|err| NotifyError(err.to_string()))
    }
}
