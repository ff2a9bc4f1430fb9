use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "steward",
    version,
    about = "Tool-using assistant with model fallback and operator approval"
)]
pub struct Cli {
    /// Path to steward.toml (`~` and `$VAR` are expanded)
    #[arg(long)]
    pub config: Option<String>,
    /// Session whose history the conversation continues
    #[arg(long, default_value = "default")]
    pub session: String,
    /// Overrides the configured system prompt
    #[arg(long)]
    pub system: Option<String>,
    /// Directory the shell tool runs commands in (defaults to the current one)
    #[arg(long)]
    pub workdir: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short)]
    pub verbose: bool,
    /// One-shot prompt. Starts an interactive session when omitted.
    pub prompt: Vec<String>,
}

impl Cli {
    pub fn prompt_text(&self) -> Option<String> {
        let text = self.prompt.join(" ");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
