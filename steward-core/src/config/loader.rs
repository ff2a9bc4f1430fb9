use super::app::{AppConfig, CooldownConfig};
use super::approval::{ApprovalConfig, RawApprovalConfig};
use super::error::ConfigError;
use super::model::RawModelConfig;
use crate::constants::{
    CONFIG_PATH, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_ITERATIONS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TOOL_TIMEOUT_SECS, ENV_PATH,
};
use dotenvy::from_filename;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tracing::{debug, info};

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    system_prompt: Option<String>,
    max_iterations: Option<usize>,
    history_limit: Option<usize>,
    tool_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    models: Vec<RawModelConfig>,
    #[serde(default)]
    cooldown: RawCooldownConfig,
    #[serde(default)]
    approval: RawApprovalConfig,
}

#[derive(Debug, Deserialize, Default)]
struct RawCooldownConfig {
    rate_limited_secs: Option<u64>,
    service_unavailable_secs: Option<u64>,
    context_too_long_secs: Option<u64>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Expands `~` and `$VAR` in a user-supplied config path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = match path {
        Some(path) => expand_path(&path.to_string_lossy()),
        None => PathBuf::from(CONFIG_PATH),
    };
    read_config(&config_path)
}

/// Parses and validates configuration text. `origin` only labels errors.
pub fn parse_config(content: &str, origin: &Path) -> Result<AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    validate_and_build(parsed)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading steward configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let config = parse_config(&content, path)?;
    info!(
        path = %path.display(),
        models = config.models.len(),
        rules = config.approval.rules.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn validate_and_build(parsed: RawConfig) -> Result<AppConfig, ConfigError> {
    if parsed.models.is_empty() {
        return Err(ConfigError::NoModelsConfigured);
    }

    let max_iterations = parsed.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
    if max_iterations == 0 {
        return Err(ConfigError::ZeroIterations);
    }

    let mut seen = HashSet::new();
    let mut models = Vec::with_capacity(parsed.models.len());
    for (position, raw_model) in parsed.models.into_iter().enumerate() {
        if !seen.insert(raw_model.id.clone()) {
            return Err(ConfigError::DuplicateModel { id: raw_model.id });
        }
        models.push(raw_model.build(position)?);
    }
    models.sort_by_key(|model| model.priority);

    let approval = ApprovalConfig::from(parsed.approval);
    for rule in &approval.rules {
        if let Some(pattern) = &rule.pattern {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidRulePattern {
                tool: rule.tool.clone(),
                source,
            })?;
        }
    }

    let defaults = CooldownConfig::default();
    let cooldown = CooldownConfig {
        rate_limited: secs_or(parsed.cooldown.rate_limited_secs, defaults.rate_limited),
        service_unavailable: secs_or(
            parsed.cooldown.service_unavailable_secs,
            defaults.service_unavailable,
        ),
        context_too_long: secs_or(parsed.cooldown.context_too_long_secs, defaults.context_too_long),
    };

    Ok(AppConfig {
        system_prompt: parsed.system_prompt,
        max_iterations,
        history_limit: parsed.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        tool_timeout: Duration::from_secs(
            parsed.tool_timeout_secs.unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
        ),
        request_timeout: Duration::from_secs(
            parsed
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        ),
        models,
        cooldown,
        approval,
    })
}

fn secs_or(value: Option<u64>, default: Duration) -> Duration {
    value.map(Duration::from_secs).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApprovalRuleConfig, ProviderKind};
    use std::io::Write;

    const MINIMAL: &str = r#"
[[models]]
id = "primary"
model = "gpt-4o-mini"
endpoint = "https://api.openai.com"
api_key = "OPENAI_API_KEY"
"#;

    fn parse(content: &str) -> Result<AppConfig, ConfigError> {
        parse_config(content, Path::new("test.toml"))
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse(MINIMAL).expect("valid");
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.tool_timeout, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.cooldown, CooldownConfig::default());
        assert_eq!(config.approval.rules, vec![ApprovalRuleConfig::tool("shell")]);

        let model = &config.models[0];
        assert_eq!(model.provider, ProviderKind::OpenAi);
        assert!(model.supports_tools);
        assert_eq!(model.priority, 0);
    }

    #[test]
    fn models_sorted_by_priority_then_file_order() {
        let config = parse(
            r#"
[[models]]
id = "backup"
provider = "ollama"
model = "llama3"
endpoint = "http://localhost:11434"
priority = 5

[[models]]
id = "primary"
model = "gpt-4o"
endpoint = "https://api.openai.com"
priority = 1

[[models]]
id = "backup-2"
provider = "ollama"
model = "qwen"
endpoint = "http://localhost:11434"
priority = 5
"#,
        )
        .expect("valid");
        let ids: Vec<_> = config.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["primary", "backup", "backup-2"]);
        assert!(!config.models[1].supports_tools);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(&format!(
            r#"
system_prompt = "Be terse."
max_iterations = 3
tool_timeout_secs = 5

[cooldown]
rate_limited_secs = 90

[approval]
timeout_secs = 10

[[approval.rules]]
tool = "write_file"
argument = "path"
pattern = "^/etc/"
{MINIMAL}"#
        ))
        .expect("valid");
        assert_eq!(config.system_prompt.as_deref(), Some("Be terse."));
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
        assert_eq!(config.cooldown.rate_limited, Duration::from_secs(90));
        assert_eq!(config.cooldown.service_unavailable, Duration::from_secs(30));
        assert_eq!(config.approval.timeout, Duration::from_secs(10));
        assert_eq!(config.approval.rules.len(), 1);
        assert_eq!(config.approval.rules[0].argument.as_deref(), Some("path"));
    }

    #[test]
    fn rejects_invalid_configs() {
        assert!(matches!(parse(""), Err(ConfigError::NoModelsConfigured)));
        assert!(matches!(
            parse(&format!("max_iterations = 0\n{MINIMAL}")),
            Err(ConfigError::ZeroIterations)
        ));
        assert!(matches!(
            parse(&format!("{MINIMAL}{MINIMAL}")),
            Err(ConfigError::DuplicateModel { id }) if id == "primary"
        ));
        assert!(matches!(
            parse("[[models]]\nid = \"x\"\nprovider = \"gemini\"\nmodel = \"m\"\nendpoint = \"e\"\n"),
            Err(ConfigError::UnknownProvider { provider, .. }) if provider == "gemini"
        ));
        assert!(matches!(
            parse("[[models]]\nid = \"x\"\nmodel = \"m\"\n"),
            Err(ConfigError::MissingEndpoint { model }) if model == "x"
        ));
        assert!(matches!(
            parse(&format!("[[approval.rules]]\ntool = \"*\"\npattern = \"(unclosed\"\n{MINIMAL}")),
            Err(ConfigError::InvalidRulePattern { .. })
        ));
        assert!(matches!(parse("models = 3"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn loads_from_file_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(MINIMAL.as_bytes()).expect("write");
        let config = load_config(Some(file.path())).expect("loads");
        assert_eq!(config.models[0].id, "primary");

        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            load_config(Some(&missing)),
            Err(ConfigError::NotFound { path }) if path == missing
        ));
    }
}
