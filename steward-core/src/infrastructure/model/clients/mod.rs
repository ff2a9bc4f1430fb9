//! HTTP model backends

mod base;
mod ollama;
mod openai;

pub use base::{HttpClientBase, classify_status, parse_retry_after};
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
