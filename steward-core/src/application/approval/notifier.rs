use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::gate::PendingApproval;

#[derive(Debug, Error)]
#[error("failed to publish approval prompt: {0}")]
pub struct NotifyError(pub String);

/// Transport hook that puts an approval prompt in front of a human.
///
/// The decision comes back out of band through
/// [`ApprovalGate::resolve`](super::ApprovalGate::resolve).
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    async fn request_approval(&self, approval: &PendingApproval) -> Result<(), NotifyError>;

    /// Called once the approval reaches a terminal state.
    async fn approval_settled(&self, _approval: &PendingApproval) {}
}

/// Notifier for hosts that poll [`ApprovalGate::pending`](super::ApprovalGate::pending).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl ApprovalNotifier for LogNotifier {
    async fn request_approval(&self, approval: &PendingApproval) -> Result<(), NotifyError> {
        info!(
            approval_id = approval.id.as_str(),
            tool = approval.tool_call.name.as_str(),
            "Tool call awaiting approval"
        );
        Ok(())
    }
}
