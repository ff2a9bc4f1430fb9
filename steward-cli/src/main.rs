mod cli;
mod stdio;
mod tools;

use clap::Parser;
use cli::Cli;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use steward_core::approval::{ApprovalGate, DangerClassifier};
use steward_core::model::ModelChain;
use steward_core::session::InMemorySessionStore;
use steward_core::{Agent, AgentConfig, AppConfig};
use stdio::{Console, StdioNotifier};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("Starting steward");
    debug!(
        config = ?cli.config,
        session = cli.session.as_str(),
        system = ?cli.system,
        workdir = ?cli.workdir,
        "CLI arguments parsed"
    );

    let config = AppConfig::load(cli.config.as_deref().map(Path::new))?;
    let console = Console::new();
    let agent = Arc::new(build_agent(&cli, &config, console.clone())?);

    match cli.prompt_text() {
        Some(prompt) => {
            let succeeded = stdio::run_once(agent, &cli.session, &prompt, console).await?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        None => {
            stdio::run_interactive(agent, cli.session.clone(), console).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_agent(cli: &Cli, config: &AppConfig, console: Console) -> Result<Agent, Box<dyn Error>> {
    let registry = tools::builtin_registry(cli.workdir.as_deref())?;
    let chain = ModelChain::from_configs(&config.models, config.cooldown_policy())?;
    info!(
        models = ?chain.models().map(|spec| spec.identifier.as_str()).collect::<Vec<_>>(),
        tools = registry.len(),
        "Model chain ready"
    );

    let classifier = DangerClassifier::from_rules(&config.approval.rules)?;
    let gate = ApprovalGate::new(classifier, Arc::new(StdioNotifier::new(console)))
        .with_timeout(config.approval.timeout);

    let mut agent_config = AgentConfig::from(config);
    if let Some(system) = cli.system.clone() {
        agent_config.system_prompt = Some(system);
    }

    Ok(Agent::new(
        Arc::new(registry),
        Arc::new(chain),
        Arc::new(InMemorySessionStore::new()),
        agent_config,
    )
    .with_approval_gate(Arc::new(gate)))
}

fn init_tracing(verbose: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let default = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
