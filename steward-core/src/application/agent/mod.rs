//! # Agent Module
//!
//! Drives a conversation to a final answer:
//! 1. Seed the conversation with the system prompt, session history and the user message
//! 2. Ask the model chain for a turn
//! 3. On tool calls, dispatch them concurrently (through the approval gate when
//!    the call is dangerous) and feed the results back
//! 4. On final text, persist the new messages and return
//!
//! Tool failures and denied approvals stay inside the conversation as error
//! results. Only failures that prevent a model response end the request.

mod dispatch;
mod errors;
mod models;
mod runner;
mod session_lock;

#[cfg(test)]
mod tests;

pub use errors::{AgentError, ToolCallError};
pub use models::AgentConfig;
pub use runner::Agent;
