pub mod types;
pub mod value;

pub use types::{AgentResponse, Message, MessageRole, ToolCall, ToolResult, ToolUse};
pub use value::{ArgValue, ToolArguments};
