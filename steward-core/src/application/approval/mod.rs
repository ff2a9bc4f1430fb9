//! Human approval for dangerous tool calls.

mod classifier;
mod gate;
mod notifier;

pub use classifier::DangerClassifier;
pub use gate::{
    ApprovalDecision, ApprovalError, ApprovalGate, ApprovalOutcome, ApprovalState, PendingApproval,
};
pub use notifier::{ApprovalNotifier, LogNotifier, NotifyError};
