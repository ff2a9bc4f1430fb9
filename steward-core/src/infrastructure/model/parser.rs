//! Tool-call extraction for backends without structured tool calls.
//!
//! Text-mode models are asked to wrap each call in a delimited block:
//!
//! ```text
//! <tool_call>{"name": "echo", "arguments": {"text": "hi"}}</tool_call>
//! ```
//!
//! Replies that contain no block are also checked for a single JSON action
//! object (`{"action":"call_tool","tool":..,"input":..}` or
//! `{"action":"final","response":..}`), bare or inside a code fence.
//! Anything else is the final answer. This is best effort: nothing stops a
//! model from naming a tool that does not exist.

use serde_json::{Map, Value};

pub(crate) const CALL_OPEN: &str = "<tool_call>";
pub(crate) const CALL_CLOSE: &str = "</tool_call>";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TextTurn {
    Final(String),
    Calls {
        content: String,
        calls: Vec<ParsedCall>,
    },
}

/// Parses a text-mode reply. `Err` carries the reason the reply is malformed.
pub(crate) fn parse_text_turn(content: &str) -> Result<TextTurn, String> {
    if content.contains(CALL_OPEN) {
        return parse_delimited(content);
    }

    if let Some(Value::Object(map)) = extract_json(content) {
        if map.contains_key("action") {
            return parse_action_object(&map);
        }
    }

    Ok(TextTurn::Final(content.trim().to_string()))
}

fn parse_delimited(content: &str) -> Result<TextTurn, String> {
    let mut remaining = content;
    let mut prose = Vec::new();
    let mut calls = Vec::new();

    while let Some(start) = remaining.find(CALL_OPEN) {
        prose.push(&remaining[..start]);
        let after_open = &remaining[start + CALL_OPEN.len()..];
        let Some(end) = after_open.find(CALL_CLOSE) else {
            return Err("unterminated <tool_call> block".into());
        };
        let block = after_open[..end].trim();
        let value = extract_json(block)
            .ok_or_else(|| format!("tool call block is not valid JSON: {block}"))?;
        calls.push(call_from_value(&value)?);
        remaining = &after_open[end + CALL_CLOSE.len()..];
    }
    prose.push(remaining);

    let content = prose
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if calls.is_empty() {
        return Ok(TextTurn::Final(content));
    }
    Ok(TextTurn::Calls { content, calls })
}

fn call_from_value(value: &Value) -> Result<ParsedCall, String> {
    let Value::Object(map) = value else {
        return Err("tool call block must be a JSON object".into());
    };
    let name = map
        .get("name")
        .or_else(|| map.get("tool"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| "tool call block missing name".to_string())?;
    let arguments = map
        .get("arguments")
        .or_else(|| map.get("input"))
        .cloned()
        .unwrap_or(Value::Null);
    let arguments = match arguments {
        // Some models double-encode arguments as a JSON string.
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    };
    Ok(ParsedCall {
        name: name.to_string(),
        arguments,
    })
}

fn parse_action_object(map: &Map<String, Value>) -> Result<TextTurn, String> {
    match map.get("action").and_then(Value::as_str) {
        Some("call_tool") => {
            let call = call_from_value(&Value::Object(map.clone()))?;
            Ok(TextTurn::Calls {
                content: String::new(),
                calls: vec![call],
            })
        }
        Some("final") => {
            let response = map
                .get("response")
                .or_else(|| map.get("content"))
                .and_then(Value::as_str)
                .ok_or_else(|| "final action missing response field".to_string())?;
            Ok(TextTurn::Final(response.to_string()))
        }
        Some(other) => Err(format!("unknown action value: {other}")),
        None => Err("action field must be a string".into()),
    }
}

fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if trimmed.starts_with("```") {
        let stripped = trimmed.trim_start_matches("```json");
        let stripped = stripped.trim_start_matches("```JSON");
        let stripped = stripped.trim_start_matches("```");
        if let Some(end) = stripped.rfind("```") {
            if let Ok(value) = serde_json::from_str::<Value>(stripped[..end].trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
    }

    None
}
