//! Model traits

use super::types::{BackendReply, BackendRequest, ModelError};
use async_trait::async_trait;

/// A single completion backend: one model on one provider.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Identifier used by the fallback chain and in cooldown bookkeeping.
    fn id(&self) -> &str;

    /// Whether the backend accepts tool definitions and returns structured
    /// tool calls. Backends returning `false` are driven in text mode.
    fn supports_tools(&self) -> bool {
        true
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendReply, ModelError>;
}
