//! Per-model cooldown bookkeeping

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::types::{FailureKind, ModelError};

/// Cooldown length per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    pub rate_limited: Duration,
    pub service_unavailable: Duration,
    pub context_too_long: Duration,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            rate_limited: Duration::from_secs(60),
            service_unavailable: Duration::from_secs(30),
            context_too_long: Duration::from_secs(15),
        }
    }
}

impl CooldownPolicy {
    /// Cooldown for `error`, or `None` when the failure does not cool the model down.
    ///
    /// A provider `Retry-After` hint longer than the configured window wins.
    pub fn duration_for(&self, error: &ModelError) -> Option<Duration> {
        match error.kind() {
            FailureKind::RateLimited => {
                let hint = match error {
                    ModelError::RateLimited { retry_after, .. } => *retry_after,
                    _ => None,
                };
                Some(hint.map_or(self.rate_limited, |hint| hint.max(self.rate_limited)))
            }
            FailureKind::ServiceUnavailable => Some(self.service_unavailable),
            FailureKind::ContextTooLong => Some(self.context_too_long),
            FailureKind::InvalidResponse | FailureKind::Fatal => None,
        }
    }
}

/// Expiry instants keyed by model identifier. Expired entries are dropped
/// the next time they are looked at.
#[derive(Debug, Default)]
pub(crate) struct CooldownTable {
    entries: Mutex<HashMap<String, Instant>>,
}

impl CooldownTable {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn remaining(&self, model: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut entries = self.entries();
        match entries.get(model) {
            Some(expires_at) if *expires_at > now => Some(*expires_at - now),
            Some(_) => {
                entries.remove(model);
                None
            }
            None => None,
        }
    }

    pub(crate) fn is_cooling(&self, model: &str) -> bool {
        self.remaining(model).is_some()
    }

    /// Places `model` on cooldown. An existing longer cooldown is kept.
    pub(crate) fn place(&self, model: &str, duration: Duration) -> Instant {
        let expires_at = Instant::now() + duration;
        let mut entries = self.entries();
        let entry = entries.entry(model.to_string()).or_insert(expires_at);
        if *entry < expires_at {
            *entry = expires_at;
        }
        *entry
    }

    pub(crate) fn clear(&self, model: &str) {
        self.entries().remove(model);
    }
}
