use super::*;
use crate::approval::{
    ApprovalDecision, ApprovalGate, ApprovalNotifier, DangerClassifier, NotifyError, PendingApproval,
};
use crate::domain::{Message, MessageRole, ToolArguments, ToolCall};
use crate::model::{
    BackendReply, BackendRequest, CompletionError, ModelBackend, ModelChain, ModelError,
};
use crate::session::{InMemorySessionStore, SessionStore};
use crate::tooling::{ParameterSchema, PropertySchema, Tool, ToolContext, ToolFailure, ToolRegistry};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<BackendReply, ModelError>>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<Result<BackendReply, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendReply, ModelError> {
        self.requests.lock().await.push(request);
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::unavailable("scripted", "script exhausted")))
    }
}

struct Echo;

#[async_trait]
impl Tool for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text back"
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

/// Sleeps for `millis`, then returns them.
struct Sleep;

#[async_trait]
impl Tool for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "Wait"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new().required_property("millis", PropertySchema::integer("Delay"))
    }

    async fn execute(&self, arguments: &ToolArguments, ctx: &ToolContext) -> Result<String, ToolFailure> {
        let millis = arguments.get_i64("millis").unwrap_or(0);
        tokio::select! {
            _ = ctx.cancel.cancelled() => Err(ToolFailure::Cancelled),
            _ = tokio::time::sleep(Duration::from_millis(millis as u64)) => Ok(millis.to_string()),
        }
    }
}

struct Broken;

#[async_trait]
impl Tool for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn execute(&self, _arguments: &ToolArguments, _ctx: &ToolContext) -> Result<String, ToolFailure> {
        Err(ToolFailure::failed("disk on fire"))
    }
}

struct RmFile {
    ran: Mutex<usize>,
}

#[async_trait]
impl Tool for RmFile {
    fn name(&self) -> &str {
        "rm_file"
    }

    fn description(&self) -> &str {
        "Delete a file"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new().required_property("path", PropertySchema::string("Path"))
    }

    async fn execute(&self, _arguments: &ToolArguments, _ctx: &ToolContext) -> Result<String, ToolFailure> {
        *self.ran.lock().await += 1;
        Ok("removed".into())
    }
}

struct ChannelNotifier(mpsc::UnboundedSender<PendingApproval>);

#[async_trait]
impl ApprovalNotifier for ChannelNotifier {
    async fn request_approval(&self, approval: &PendingApproval) -> Result<(), NotifyError> {
        let _ = self.0.send(approval.clone());
        Ok(())
    }
}

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Echo).expect("echo");
    registry.register(Sleep).expect("sleep");
    registry.register(Broken).expect("broken");
    Arc::new(registry)
}

fn calls(calls: Vec<ToolCall>) -> Result<BackendReply, ModelError> {
    Ok(BackendReply::with_calls("", calls))
}

fn text(content: &str) -> Result<BackendReply, ModelError> {
    Ok(BackendReply::text(content))
}

fn agent_with(
    backend: Arc<ScriptedBackend>,
    store: Arc<InMemorySessionStore>,
    config: AgentConfig,
) -> Agent {
    let chain = ModelChain::default().with_backend(0, backend);
    Agent::new(registry(), Arc::new(chain), store, config)
}

#[tokio::test]
async fn echo_round_trip_reports_tools_and_iterations() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![ToolCall::new("c1", "echo", json!({"text": "hi"}))]),
        text("done"),
    ]);
    let store = Arc::new(InMemorySessionStore::new());
    let agent = agent_with(backend.clone(), store.clone(), AgentConfig::default());

    let response = agent.process_request("s1", "say hi").await.expect("completes");
    assert_eq!(response.final_text, "done");
    assert_eq!(response.iteration_count, 2);
    assert_eq!(response.models, vec!["scripted", "scripted"]);
    assert_eq!(response.tools_used.len(), 1);
    assert_eq!(response.tools_used[0].name, "echo");
    assert_eq!(response.tools_used[0].arguments, json!({"text": "hi"}));
    assert_eq!(response.tools_used[0].result, "hi");
    assert!(!response.tools_used[0].is_error);

    let requests = backend.requests.lock().await;
    assert_eq!(requests[0].tools.len(), 3);
    let second = &requests[1].messages;
    assert_eq!(second.last().map(|m| m.role), Some(MessageRole::Tool));
    assert_eq!(second.last().and_then(|m| m.tool_call_id.as_deref()), Some("c1"));

    let history = store.history("s1").await;
    let roles: Vec<_> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant
        ]
    );
}

#[tokio::test]
async fn iteration_cap_fails_without_persisting() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![ToolCall::new("c1", "echo", json!({"text": "a"}))]),
        calls(vec![ToolCall::new("c2", "echo", json!({"text": "b"}))]),
        text("never reached"),
    ]);
    let store = Arc::new(InMemorySessionStore::new());
    let config = AgentConfig {
        max_iterations: 2,
        ..AgentConfig::default()
    };
    let agent = agent_with(backend.clone(), store.clone(), config);

    let err = agent.process_request("s1", "loop").await.unwrap_err();
    assert!(matches!(err, AgentError::IterationLimitExceeded { limit: 2 }));
    assert_eq!(backend.requests.lock().await.len(), 2);
    assert!(store.history("s1").await.is_empty());
}

#[tokio::test]
async fn tool_problems_become_error_results() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![
            ToolCall::new("c1", "missing", json!({})),
            ToolCall::new("c2", "echo", json!({"text": 7})),
            ToolCall::new("c3", "broken", Value::Null),
        ]),
        text("sorry"),
    ]);
    let agent = agent_with(
        backend.clone(),
        Arc::new(InMemorySessionStore::new()),
        AgentConfig::default(),
    );

    let response = agent.process_request("s1", "try things").await.expect("recovers");
    assert_eq!(response.final_text, "sorry");
    assert!(response.tools_used.iter().all(|used| used.is_error));
    assert!(response.tools_used[0].result.contains("unknown tool 'missing'"));
    assert!(response.tools_used[1].result.contains("invalid arguments"));
    assert!(response.tools_used[2].result.contains("disk on fire"));

    let requests = backend.requests.lock().await;
    let tool_messages: Vec<&Message> = requests[1]
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .collect();
    assert_eq!(tool_messages.len(), 3);
    assert!(tool_messages[0].content.starts_with("Error:"));
}

#[tokio::test(start_paused = true)]
async fn tool_calls_run_concurrently_and_keep_order() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![
            ToolCall::new("slow", "sleep", json!({"millis": 300})),
            ToolCall::new("fast", "sleep", json!({"millis": 100})),
        ]),
        text("both done"),
    ]);
    let agent = agent_with(
        backend.clone(),
        Arc::new(InMemorySessionStore::new()),
        AgentConfig::default(),
    );

    let started = tokio::time::Instant::now();
    let response = agent.process_request("s1", "wait").await.expect("completes");
    assert!(started.elapsed() < Duration::from_millis(400));

    let results: Vec<_> = response.tools_used.iter().map(|u| u.result.as_str()).collect();
    assert_eq!(results, vec!["300", "100"]);

    let requests = backend.requests.lock().await;
    let ids: Vec<_> = requests[1]
        .messages
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["slow", "fast"]);
}

#[tokio::test(start_paused = true)]
async fn tool_timeout_is_reported_to_the_model() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![ToolCall::new("c1", "sleep", json!({"millis": 120_000}))]),
        text("gave up"),
    ]);
    let config = AgentConfig {
        tool_timeout: Duration::from_secs(1),
        ..AgentConfig::default()
    };
    let agent = agent_with(backend, Arc::new(InMemorySessionStore::new()), config);

    let response = agent.process_request("s1", "wait long").await.expect("completes");
    assert!(response.tools_used[0].is_error);
    assert!(response.tools_used[0].result.contains("timed out after 1s"));
}

#[tokio::test]
async fn exhausted_models_propagate_and_keep_history_clean() {
    let backend = ScriptedBackend::new(vec![Err(ModelError::rate_limited("scripted", None))]);
    let store = Arc::new(InMemorySessionStore::new());
    let agent = agent_with(backend, store.clone(), AgentConfig::default());

    let err = agent.process_request("s1", "hello").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::Completion(CompletionError::AllModelsExhausted { .. })
    ));
    assert!(err.user_message().contains("no model is available"));
    assert!(store.history("s1").await.is_empty());
}

#[tokio::test]
async fn history_seeds_next_request_after_system_prompt() {
    let backend = ScriptedBackend::new(vec![text("first answer"), text("second answer")]);
    let store = Arc::new(InMemorySessionStore::new());
    let config = AgentConfig {
        system_prompt: Some("Be brief.".into()),
        ..AgentConfig::default()
    };
    let agent = agent_with(backend.clone(), store, config);

    agent.process_request("s1", "one").await.expect("first");
    agent.process_request("s1", "two").await.expect("second");

    let requests = backend.requests.lock().await;
    let contents: Vec<_> = requests[1].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Be brief.", "one", "first answer", "two"]);
}

#[tokio::test]
async fn history_window_starts_at_a_user_turn() {
    let store = Arc::new(InMemorySessionStore::new());
    store
        .append_batch(
            "s1",
            vec![
                Message::user("old"),
                Message::assistant_with_calls("", vec![ToolCall::new("c0", "echo", json!({"text": "x"}))]),
                Message::tool(&crate::domain::ToolResult::success("c0", "x")),
                Message::assistant("old answer"),
                Message::user("recent"),
                Message::assistant("recent answer"),
            ],
        )
        .await
        .expect("seed");
    let backend = ScriptedBackend::new(vec![text("ok")]);
    let config = AgentConfig {
        history_limit: 4,
        ..AgentConfig::default()
    };
    let agent = agent_with(backend.clone(), store, config);
    agent.process_request("s1", "now").await.expect("completes");

    let requests = backend.requests.lock().await;
    let contents: Vec<_> = requests[0].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["recent", "recent answer", "now"]);
}

#[tokio::test]
async fn dangerous_call_waits_for_approval() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![ToolCall::new("c1", "rm_file", json!({"path": "/tmp/a"}))]),
        text("removed it"),
        calls(vec![ToolCall::new("c2", "rm_file", json!({"path": "/tmp/b"}))]),
        text("left it alone"),
    ]);
    let rm = Arc::new(RmFile { ran: Mutex::new(0) });
    let mut registry = ToolRegistry::new();
    registry.register_arc(rm.clone()).expect("rm_file");

    let (tx, mut prompts) = mpsc::unbounded_channel();
    let gate = Arc::new(ApprovalGate::new(
        DangerClassifier::tools(["rm_file"]),
        Arc::new(ChannelNotifier(tx)),
    ));
    let chain = ModelChain::default().with_backend(0, backend);
    let agent = Arc::new(
        Agent::new(
            Arc::new(registry),
            Arc::new(chain),
            Arc::new(InMemorySessionStore::new()),
            AgentConfig::default(),
        )
        .with_approval_gate(gate.clone()),
    );

    let approver = {
        let gate = gate.clone();
        tokio::spawn(async move {
            let first = prompts.recv().await.expect("first prompt");
            assert!(gate.resolve(&first.id, ApprovalDecision::Approved));
            let second = prompts.recv().await.expect("second prompt");
            assert!(gate.resolve(&second.id, ApprovalDecision::Denied));
        })
    };

    let approved = agent.process_request("s1", "remove a").await.expect("first");
    assert_eq!(approved.tools_used[0].result, "removed");

    let denied = agent.process_request("s1", "remove b").await.expect("second");
    assert!(denied.tools_used[0].is_error);
    assert!(denied.tools_used[0].result.contains("denied"));

    approver.await.expect("approver");
    assert_eq!(*rm.ran.lock().await, 1);
}

#[tokio::test]
async fn cancellation_stops_tools_and_persists_nothing() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![ToolCall::new("c1", "sleep", json!({"millis": 60_000}))]),
        text("unreachable"),
    ]);
    let store = Arc::new(InMemorySessionStore::new());
    let agent = Arc::new(agent_with(backend, store.clone(), AgentConfig::default()));
    let cancel = CancellationToken::new();

    let run = {
        let agent = agent.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { agent.process_request_with_cancel("s1", "wait", cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = run.await.expect("join").unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert!(store.history("s1").await.is_empty());
}

#[tokio::test]
async fn cancelling_during_approval_denies_and_skips_tool() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![ToolCall::new("c1", "rm_file", json!({"path": "/tmp/a"}))]),
        text("unreachable"),
    ]);
    let rm = Arc::new(RmFile { ran: Mutex::new(0) });
    let mut registry = ToolRegistry::new();
    registry.register_arc(rm.clone()).expect("rm_file");

    let (tx, mut prompts) = mpsc::unbounded_channel();
    let gate = Arc::new(ApprovalGate::new(
        DangerClassifier::tools(["rm_file"]),
        Arc::new(ChannelNotifier(tx)),
    ));
    let store = Arc::new(InMemorySessionStore::new());
    let chain = ModelChain::default().with_backend(0, backend);
    let agent = Arc::new(
        Agent::new(Arc::new(registry), Arc::new(chain), store.clone(), AgentConfig::default())
            .with_approval_gate(gate.clone()),
    );
    let cancel = CancellationToken::new();

    let run = {
        let agent = agent.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { agent.process_request_with_cancel("s1", "remove a", cancel).await })
    };
    let prompt = prompts.recv().await.expect("approval prompt");
    assert_eq!(gate.pending().len(), 1);
    cancel.cancel();

    let err = run.await.expect("join").unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert!(gate.pending().is_empty());
    assert!(!gate.resolve(&prompt.id, ApprovalDecision::Approved));
    assert_eq!(*rm.ran.lock().await, 0);
    assert!(store.history("s1").await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn same_session_requests_are_serialised() {
    let backend = ScriptedBackend::new(vec![
        calls(vec![ToolCall::new("c1", "sleep", json!({"millis": 50}))]),
        text("first"),
        text("second"),
    ]);
    let store = Arc::new(InMemorySessionStore::new());
    let agent = Arc::new(agent_with(backend.clone(), store.clone(), AgentConfig::default()));

    let first = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.process_request("shared", "one").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = agent.process_request("shared", "two").await.expect("second");
    let first = first.await.expect("join").expect("first");

    assert_eq!(first.final_text, "first");
    assert_eq!(second.final_text, "second");

    // The second request saw the first one's complete exchange.
    let requests = backend.requests.lock().await;
    let contents: Vec<_> = requests[2].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.first(), Some(&"one"));
    assert_eq!(contents.last(), Some(&"two"));
    assert_eq!(store.history("shared").await.len(), 6);
}

#[tokio::test]
async fn session_locks_are_pruned_when_idle() {
    let locks = super::session_lock::SessionLocks::default();
    {
        let _a = locks.acquire("a").await;
        let _b = locks.acquire("b").await;
        assert_eq!(locks.tracked(), 2);
    }
    let _c = locks.acquire("c").await;
    assert_eq!(locks.tracked(), 1);
}
