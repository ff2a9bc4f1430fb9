//! Interactive STDIO transport.
//!
//! Prompts are answered by background tasks so the input loop stays free
//! for `/approve` and `/deny` while a request is waiting on the operator.

use async_trait::async_trait;
use std::sync::Arc;
use steward_core::approval::{
    ApprovalDecision, ApprovalNotifier, NotifyError, PendingApproval,
};
use steward_core::{Agent, AgentError, AgentResponse};
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared stdout handle. Writes from concurrent tasks never interleave
/// within a line.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<io::Stdout>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            out: Arc::new(Mutex::new(io::stdout())),
        }
    }

    pub async fn write_line(&self, text: &str) -> std::io::Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(text.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await
    }
}

/// Prints approval prompts to stdout; answers arrive as `/approve` or `/deny` lines.
pub struct StdioNotifier {
    console: Console,
}

impl StdioNotifier {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

#[async_trait]
impl ApprovalNotifier for StdioNotifier {
    async fn request_approval(&self, approval: &PendingApproval) -> Result<(), NotifyError> {
        let text = format!(
            "[approval {id}] '{tool}' wants to run with {args}\n    reply /approve {id} or /deny {id}",
            id = approval.id,
            tool = approval.tool_call.name,
            args = approval.tool_call.arguments,
        );
        self.console
            .write_line(&text)
            .await
            .map_err(|err| NotifyError(err.to_string()))
    }

    async fn approval_settled(&self, approval: &PendingApproval) {
        let _ = self
            .console
            .write_line(&format!("[approval {}] {}", approval.id, approval.state.as_str()))
            .await;
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Approve(&'a str),
    Deny(&'a str),
    Pending,
    Cancel,
    Help,
    Exit,
    Unknown(&'a str),
}

fn parse_command(input: &str) -> Option<Command<'_>> {
    let command = input.strip_prefix('/')?;
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or("");
    let argument = parts.next();
    Some(match (name, argument) {
        ("approve" | "a", Some(id)) => Command::Approve(id),
        ("deny" | "d", Some(id)) => Command::Deny(id),
        ("pending" | "p", _) => Command::Pending,
        ("cancel", _) => Command::Cancel,
        ("help" | "h", _) => Command::Help,
        ("exit" | "quit" | "q", _) => Command::Exit,
        _ => Command::Unknown(name),
    })
}

async fn resolve(agent: &Agent, console: &Console, id: &str, decision: ApprovalDecision) -> std::io::Result<()> {
    let Some(gate) = agent.approvals() else {
        return console.write_line("Approvals are not enabled.").await;
    };
    if gate.resolve(id, decision) {
        debug!(approval_id = id, ?decision, "Approval resolved from stdin");
        Ok(())
    } else {
        console
            .write_line(&format!("No pending approval with id '{id}'."))
            .await
    }
}

async fn list_pending(agent: &Agent, console: &Console) -> std::io::Result<()> {
    let pending = agent
        .approvals()
        .map(|gate| gate.pending())
        .unwrap_or_default();
    if pending.is_empty() {
        return console.write_line("No pending approvals.").await;
    }
    for approval in pending {
        console
            .write_line(&format!(
                "  {} {} {} (since {})",
                approval.id,
                approval.tool_call.name,
                approval.tool_call.arguments,
                approval.requested_at.format("%H:%M:%S")
            ))
            .await?;
    }
    Ok(())
}

async fn render(console: &Console, result: Result<AgentResponse, AgentError>) -> std::io::Result<()> {
    match result {
        Ok(response) => {
            for used in &response.tools_used {
                let status = if used.is_error { "error" } else { "ok" };
                console
                    .write_line(&format!("  - {} {}: {status}", used.name, used.arguments))
                    .await?;
            }
            console.write_line(&response.final_text).await
        }
        Err(err) => {
            error!(%err, "Agent request failed");
            console.write_line(&err.user_message()).await
        }
    }
}

const HELP: &str = "Commands:
  /approve <id>   run a tool call waiting for approval
  /deny <id>      reject a tool call waiting for approval
  /pending        list approvals waiting for a decision
  /cancel         cancel requests in flight
  /exit           leave
Anything else is sent to the assistant.";

pub async fn run_interactive(agent: Arc<Agent>, session_id: String, console: Console) -> Result<(), StdioError> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut requests = JoinSet::new();
    let mut cancel = CancellationToken::new();

    console
        .write_line(&format!("steward, session '{session_id}'. /help for commands."))
        .await?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Some(Command::Approve(id)) => resolve(&agent, &console, id, ApprovalDecision::Approved).await?,
            Some(Command::Deny(id)) => resolve(&agent, &console, id, ApprovalDecision::Denied).await?,
            Some(Command::Pending) => list_pending(&agent, &console).await?,
            Some(Command::Cancel) => {
                cancel.cancel();
                cancel = CancellationToken::new();
                console.write_line("Cancelled requests in flight.").await?;
            }
            Some(Command::Help) => console.write_line(HELP).await?,
            Some(Command::Exit) => break,
            Some(Command::Unknown(name)) => {
                console
                    .write_line(&format!("Unknown command '/{name}'. /help lists commands."))
                    .await?;
            }
            None => {
                let agent = agent.clone();
                let console = console.clone();
                let session_id = session_id.clone();
                let prompt = input.to_string();
                let cancel = cancel.child_token();
                requests.spawn(async move {
                    let result = agent
                        .process_request_with_cancel(&session_id, &prompt, cancel)
                        .await;
                    render(&console, result).await
                });
            }
        }

        while let Some(finished) = requests.try_join_next() {
            if let Ok(Err(err)) = finished {
                return Err(err.into());
            }
        }
    }

    info!("Leaving interactive session");
    cancel.cancel();
    while let Some(finished) = requests.join_next().await {
        if let Ok(Err(err)) = finished {
            return Err(err.into());
        }
    }
    Ok(())
}

/// Answers a single prompt. Stdin stays open for approval commands and
/// Ctrl-C cancels the request. Returns whether the request succeeded.
pub async fn run_once(
    agent: Arc<Agent>,
    session_id: &str,
    prompt: &str,
    console: Console,
) -> Result<bool, StdioError> {
    let cancel = CancellationToken::new();

    let listener = {
        let agent = agent.clone();
        let console = console.clone();
        tokio::spawn(async move { approval_listener(agent, console).await })
    };
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = agent
        .process_request_with_cancel(session_id, prompt, cancel)
        .await;
    listener.abort();
    interrupt.abort();

    let succeeded = result.is_ok();
    render(&console, result).await?;
    Ok(succeeded)
}

async fn approval_listener(agent: Arc<Agent>, console: Console) -> std::io::Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(line.trim()) {
            Some(Command::Approve(id)) => resolve(&agent, &console, id, ApprovalDecision::Approved).await?,
            Some(Command::Deny(id)) => resolve(&agent, &console, id, ApprovalDecision::Denied).await?,
            Some(Command::Pending) => list_pending(&agent, &console).await?,
            _ => {
                console
                    .write_line("A request is running; only /approve, /deny and /pending are accepted.")
                    .await?
            }
        }
    }
    Ok(())
}
