//! Model client: backends, fallback chain and cooldowns

mod adapter;
mod chain;
#[cfg(feature = "http-providers")]
pub mod clients;
mod cooldown;
#[cfg(feature = "http-providers")]
pub mod factory;
mod parser;
mod traits;
mod types;

pub use adapter::MessageAdapter;
pub use chain::{ModelChain, ModelSpec};
pub use cooldown::CooldownPolicy;
pub use traits::ModelBackend;
pub use types::{
    BackendReply, BackendRequest, CompletionError, CompletionOptions, FailureKind, ModelAttempt,
    ModelError, ModelTurn, TurnAction,
};
