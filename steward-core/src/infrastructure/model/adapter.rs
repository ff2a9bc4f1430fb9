//! Message adapters - convert conversations into backend formats

use serde_json::{Value, json};

use super::parser::{CALL_CLOSE, CALL_OPEN};
use crate::domain::{Message, MessageRole};
use crate::tooling::ToolDefinition;

pub struct MessageAdapter;

impl MessageAdapter {
    /// OpenAI chat-completions message list, including tool calls and
    /// tool results.
    pub fn to_openai_format(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::Assistant if !msg.tool_calls.is_empty() => {
                    let calls: Vec<Value> = msg
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    let content = if msg.content.is_empty() {
                        Value::Null
                    } else {
                        Value::String(msg.content.clone())
                    };
                    json!({
                        "role": "assistant",
                        "content": content,
                        "tool_calls": calls,
                    })
                }
                MessageRole::Tool => json!({
                    "role": "tool",
                    "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
                    "content": msg.content,
                }),
                role => json!({
                    "role": role.as_str(),
                    "content": msg.content,
                }),
            })
            .collect()
    }

    /// Plain `{role, content}` pairs, for backends that only speak text.
    pub fn to_plain_format(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                })
            })
            .collect()
    }

    /// Rewrites a conversation for a text-mode backend.
    ///
    /// The tool protocol is appended to the leading system message (or
    /// inserted as one), earlier tool calls are rendered back into the
    /// delimited form and tool results become user messages.
    pub fn to_text_mode(messages: &[Message], tools: &[ToolDefinition]) -> Vec<Message> {
        let protocol = Self::text_protocol_instruction(tools);
        let mut converted = Vec::with_capacity(messages.len() + 1);
        let mut protocol_placed = false;

        for msg in messages {
            match msg.role {
                MessageRole::System if !protocol_placed => {
                    converted.push(Message::system(format!("{}\n\n{protocol}", msg.content)));
                    protocol_placed = true;
                }
                MessageRole::Assistant if !msg.tool_calls.is_empty() => {
                    let mut content = msg.content.clone();
                    for call in &msg.tool_calls {
                        if !content.is_empty() {
                            content.push('\n');
                        }
                        let block = json!({"name": call.name, "arguments": call.arguments});
                        content.push_str(&format!("{CALL_OPEN}{block}{CALL_CLOSE}"));
                    }
                    converted.push(Message::assistant(content));
                }
                MessageRole::Tool => {
                    let id = msg.tool_call_id.as_deref().unwrap_or("unknown");
                    converted.push(Message::user(format!(
                        "Tool result for call {id}:\n{}",
                        msg.content
                    )));
                }
                _ => converted.push(Message::new(msg.role, msg.content.clone())),
            }
        }

        if !protocol_placed {
            converted.insert(0, Message::system(protocol));
        }
        converted
    }

    pub fn text_protocol_instruction(tools: &[ToolDefinition]) -> String {
        let mut lines = vec![
            "You can call tools to solve the user's request.".to_string(),
            format!(
                "To call a tool, write {CALL_OPEN}{{\"name\":\"tool_name\",\"arguments\":{{...}}}}{CALL_CLOSE} on its own line. You may emit several blocks in one reply."
            ),
            "Tool results are returned to you in the next user message.".to_string(),
            "When you have the final answer, reply with plain text and no tool blocks.".to_string(),
        ];

        if tools.is_empty() {
            lines.push("No tools are currently available.".to_string());
        } else {
            lines.push("Available tools:".to_string());
            for tool in tools {
                let schema = serde_json::to_string(&tool.parameter_schema.to_json()).unwrap_or_default();
                lines.push(format!(
                    "- {}: {}. Arguments schema: {}",
                    tool.name, tool.description, schema
                ));
            }
        }

        lines.join("\n")
    }
}
