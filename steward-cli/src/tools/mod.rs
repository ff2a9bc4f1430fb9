//! Built-in tools shipped with the CLI.

mod clock;
mod echo;
mod shell;

pub use clock::CurrentTimeTool;
pub use echo::EchoTool;
pub use shell::ShellTool;

use std::path::Path;
use steward_core::tooling::{RegistryError, ToolRegistry};

/// `shell_workdir` is where shell commands run unless a call names its own directory.
pub fn builtin_registry(shell_workdir: Option<&Path>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool)?;
    registry.register(CurrentTimeTool)?;
    match shell_workdir {
        Some(dir) => registry.register(ShellTool::in_dir(dir))?,
        None => registry.register(ShellTool::default())?,
    }
    Ok(registry)
}
