use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::classifier::DangerClassifier;
use super::notifier::ApprovalNotifier;
use crate::constants::DEFAULT_APPROVAL_TIMEOUT_SECS;
use crate::domain::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Denied,
    TimedOut,
}

impl ApprovalState {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Denied => "denied",
            ApprovalState::TimedOut => "timed_out",
        }
    }
}

/// Decision a human can hand to [`ApprovalGate::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}

impl From<ApprovalDecision> for ApprovalState {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalState::Approved,
            ApprovalDecision::Denied => ApprovalState::Denied,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    pub id: String,
    pub tool_call: ToolCall,
    pub requested_at: DateTime<Utc>,
    pub state: ApprovalState,
}

/// Terminal result of [`ApprovalGate::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub approval_id: String,
    /// Never `Pending`.
    pub state: ApprovalState,
}

impl ApprovalOutcome {
    pub fn is_approved(&self) -> bool {
        self.state == ApprovalState::Approved
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("tool call '{tool_call_id}' already has a pending approval")]
    AlreadyPending { tool_call_id: String },
}

struct Entry {
    approval: PendingApproval,
    responder: Option<oneshot::Sender<ApprovalDecision>>,
}

/// Suspends dangerous tool calls until a human decides or the timeout hits.
///
/// The first terminal state wins: a late `resolve` after a timeout is a
/// no-op, and a timeout racing a `resolve` that already landed keeps the
/// human's decision.
pub struct ApprovalGate {
    classifier: DangerClassifier,
    notifier: Arc<dyn ApprovalNotifier>,
    timeout: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ApprovalGate {
    pub fn new(classifier: DangerClassifier, notifier: Arc<dyn ApprovalNotifier>) -> Self {
        Self {
            classifier,
            notifier,
            timeout: Duration::from_secs(DEFAULT_APPROVAL_TIMEOUT_SECS),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn requires_approval(&self, call: &ToolCall) -> bool {
        self.classifier.is_dangerous(call)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes an approval prompt and waits for its outcome.
    ///
    /// Cancellation and notifier failures settle as `Denied`. The timeout
    /// settles as `TimedOut` and also bounds a notifier that never returns.
    pub async fn request(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let (approval, receiver) = self.register(call)?;
        let _cleanup = EntryCleanup {
            gate: self,
            id: approval.id.clone(),
        };

        info!(
            approval_id = approval.id.as_str(),
            tool_call_id = call.id.as_str(),
            tool = call.name.as_str(),
            "Approval requested"
        );

        // One deadline covers publishing the prompt and waiting for the answer.
        let deadline = Instant::now() + self.timeout;
        let fallback = tokio::select! {
            biased;
            _ = cancel.cancelled() => ApprovalState::Denied,
            result = tokio::time::timeout_at(deadline, self.publish_and_wait(&approval, receiver)) => {
                result.unwrap_or(ApprovalState::TimedOut)
            }
        };
        let state = self.settle(&approval.id, fallback);

        info!(
            approval_id = approval.id.as_str(),
            tool = call.name.as_str(),
            outcome = state.as_str(),
            "Approval settled"
        );

        let settled = PendingApproval { state, ..approval };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            result = tokio::time::timeout(self.timeout, self.notifier.approval_settled(&settled)) => {
                if result.is_err() {
                    warn!(approval_id = settled.id.as_str(), "Approval outcome notice stalled");
                }
            }
        }

        Ok(ApprovalOutcome {
            approval_id: settled.id,
            state,
        })
    }

    async fn publish_and_wait(
        &self,
        approval: &PendingApproval,
        receiver: oneshot::Receiver<ApprovalDecision>,
    ) -> ApprovalState {
        if let Err(error) = self.notifier.request_approval(approval).await {
            warn!(approval_id = approval.id.as_str(), %error, "Approval prompt not delivered, denying");
            return ApprovalState::Denied;
        }
        match receiver.await {
            Ok(decision) => decision.into(),
            Err(_) => ApprovalState::Denied,
        }
    }

    /// Records a human decision. Returns `false` when `approval_id` is
    /// unknown or already settled.
    pub fn resolve(&self, approval_id: &str, decision: ApprovalDecision) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(approval_id) else {
            return false;
        };
        if entry.approval.state != ApprovalState::Pending {
            return false;
        }
        entry.approval.state = decision.into();
        if let Some(responder) = entry.responder.take() {
            let _ = responder.send(decision);
        }
        true
    }

    /// Snapshot of approvals still awaiting a decision, oldest first.
    pub fn pending(&self) -> Vec<PendingApproval> {
        let mut pending: Vec<_> = self
            .entries()
            .values()
            .filter(|entry| entry.approval.state == ApprovalState::Pending)
            .map(|entry| entry.approval.clone())
            .collect();
        pending.sort_by_key(|approval| approval.requested_at);
        pending
    }

    fn register(
        &self,
        call: &ToolCall,
    ) -> Result<(PendingApproval, oneshot::Receiver<ApprovalDecision>), ApprovalError> {
        let mut entries = self.entries();
        if entries.values().any(|entry| {
            entry.approval.tool_call.id == call.id && entry.approval.state == ApprovalState::Pending
        }) {
            return Err(ApprovalError::AlreadyPending {
                tool_call_id: call.id.clone(),
            });
        }

        let (sender, receiver) = oneshot::channel();
        let approval = PendingApproval {
            id: Uuid::new_v4().to_string(),
            tool_call: call.clone(),
            requested_at: Utc::now(),
            state: ApprovalState::Pending,
        };
        entries.insert(
            approval.id.clone(),
            Entry {
                approval: approval.clone(),
                responder: Some(sender),
            },
        );
        Ok((approval, receiver))
    }

    fn settle(&self, approval_id: &str, fallback: ApprovalState) -> ApprovalState {
        let mut entries = self.entries();
        match entries.get_mut(approval_id) {
            Some(entry) if entry.approval.state == ApprovalState::Pending => {
                entry.approval.state = fallback;
                entry.responder = None;
                fallback
            }
            Some(entry) => entry.approval.state,
            None => fallback,
        }
    }
}

/// Removes the entry however the waiting future ends, including when it is
/// dropped mid-wait.
struct EntryCleanup<'a> {
    gate: &'a ApprovalGate,
    id: String,
}

impl Drop for EntryCleanup<'_> {
    fn drop(&mut self) {
        self.gate.entries().remove(&self.id);
    }
}
