//! Model entries of the fallback chain.
//!
//! ```toml
//! [[models]]
//! id = "primary"
//! provider = "openai"
//! model = "gpt-4o-mini"
//! endpoint = "https://api.openai.com"
//! api_key = "OPENAI_API_KEY"
//! priority = 0
//! ```

use serde::Deserialize;

use super::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Any OpenAI-compatible chat-completions API.
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "openai-compatible" => Some(Self::OpenAi),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

/// One backend in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Identifier used for ordering, cooldowns and logs. Unique per config.
    pub id: String,
    pub provider: ProviderKind,
    /// Provider-side model name.
    pub model: String,
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key: Option<String>,
    /// Overrides the provider's default request path.
    pub api_path: Option<String>,
    /// Lower values are tried first.
    pub priority: u32,
    /// `false` drives the model in text mode.
    pub supports_tools: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct RawModelConfig {
    pub(super) id: String,
    #[serde(default)]
    pub(super) provider: Option<String>,
    pub(super) model: Option<String>,
    pub(super) endpoint: Option<String>,
    pub(super) api_key: Option<String>,
    #[serde(default)]
    pub(super) api_path: Option<String>,
    #[serde(default)]
    pub(super) priority: Option<u32>,
    #[serde(default)]
    pub(super) supports_tools: Option<bool>,
}

impl RawModelConfig {
    /// Builds the validated entry. `position` is the fallback priority when
    /// none is given, so unprioritised entries keep file order.
    pub(super) fn build(self, position: usize) -> Result<ModelConfig, ConfigError> {
        let provider_name = self.provider.unwrap_or_else(|| "openai".to_string());
        let provider =
            ProviderKind::parse(&provider_name).ok_or_else(|| ConfigError::UnknownProvider {
                model: self.id.clone(),
                provider: provider_name.clone(),
            })?;

        let endpoint = self
            .endpoint
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEndpoint {
                model: self.id.clone(),
            })?;

        let model = self
            .model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingModelName {
                model: self.id.clone(),
            })?;

        Ok(ModelConfig {
            id: self.id,
            provider,
            model,
            endpoint,
            api_key: self.api_key,
            api_path: self.api_path,
            priority: self
                .priority
                .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX)),
            // Ollama models default to text mode.
            supports_tools: self
                .supports_tools
                .unwrap_or(provider == ProviderKind::OpenAi),
        })
    }
}
