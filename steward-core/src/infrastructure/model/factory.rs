//! Provider factory - creates backends from config

use std::env;
use std::sync::Arc;
use tracing::warn;

use super::clients::{OllamaClient, OpenAIClient};
use super::traits::ModelBackend;
use super::types::ModelError;
use crate::config::{ModelConfig, ProviderKind};

/// Resolve API key from environment variable
pub fn resolve_api_key(model: &str, spec: Option<&str>) -> Option<String> {
    let raw = spec.map(str::trim)?;
    if raw.is_empty() {
        return None;
    }
    match env::var(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                model,
                env_var = raw,
                %err,
                "API key environment variable is not set"
            );
            None
        }
    }
}

/// Factory for creating model backends from model config.
pub struct ProviderFactory;

impl ProviderFactory {
    /// OpenAI-compatible providers fail with `MissingApiKey` when the key
    /// variable is unset.
    pub fn create(config: &ModelConfig) -> Result<Arc<dyn ModelBackend>, ModelError> {
        match config.provider {
            ProviderKind::OpenAi => {
                let client = OpenAIClient::from_config(config);
                if !client.has_api_key() {
                    return Err(ModelError::missing_api_key(&config.id));
                }
                Ok(Arc::new(client))
            }
            ProviderKind::Ollama => Ok(Arc::new(OllamaClient::from_config(config))),
        }
    }
}
