use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use steward_core::domain::ToolArguments;
use steward_core::tooling::{ParameterSchema, PropertySchema, Tool, ToolContext, ToolFailure};
use tokio::process::Command;

const MAX_OUTPUT_CHARS: usize = 16_000;

/// Runs a command through `sh -c`. Flagged dangerous by the default approval rules.
#[derive(Debug, Default)]
pub struct ShellTool {
    workdir: Option<PathBuf>,
}

impl ShellTool {
    pub fn in_dir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(workdir.into()),
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required_property("command", PropertySchema::string("The shell command to execute"))
            .property("workdir", PropertySchema::string("Working directory for the command"))
    }

    async fn execute(&self, arguments: &ToolArguments, ctx: &ToolContext) -> Result<String, ToolFailure> {
        let command = arguments
            .get_str("command")
            .filter(|command| !command.trim().is_empty())
            .ok_or_else(|| ToolFailure::invalid_argument("command", "must not be empty"))?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = arguments.get_str("workdir").map(PathBuf::from).or_else(|| self.workdir.clone()) {
            cmd.current_dir(dir);
        }

        let output = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(ToolFailure::Cancelled),
            output = cmd.output() => output?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = String::new();
        result.push_str(&stdout);
        if !stderr.is_empty() {
            if !result.is_empty() {
                result.push_str("\n--- stderr ---\n");
            }
            result.push_str(&stderr);
        }

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(ToolFailure::failed(format!(
                "exit code {exit_code}: {}",
                truncate(&result)
            )));
        }
        Ok(truncate(&result))
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((idx, _)) => format!("{}\n[output truncated]", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;

    async fn run(tool: &ShellTool, args: Value) -> Result<String, ToolFailure> {
        let args = tool.parameter_schema().validate(&args).expect("valid arguments");
        tool.execute(&args, &ToolContext::new("s", "c", CancellationToken::new()))
            .await
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let output = run(&ShellTool::default(), json!({"command": "echo out; echo err >&2"}))
            .await
            .expect("succeeds");
        assert!(output.starts_with("out"));
        assert!(output.contains("--- stderr ---\nerr"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let err = run(&ShellTool::default(), json!({"command": "exit 3"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exit code 3"));
    }

    #[tokio::test]
    async fn runs_in_configured_directory() {
        let dir = std::env::temp_dir();
        let output = run(&ShellTool::in_dir(&dir), json!({"command": "pwd"}))
            .await
            .expect("succeeds");
        let expected = dir.canonicalize().expect("temp dir");
        let actual = PathBuf::from(output.trim());
        assert_eq!(actual.canonicalize().unwrap_or(actual), expected);
    }
}
