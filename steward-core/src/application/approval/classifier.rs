//! Decides which tool calls need a human in the loop.

use regex::Regex;
use serde_json::Value;

use crate::config::ApprovalRuleConfig;
use crate::domain::ToolCall;

#[derive(Debug, Clone)]
struct DangerRule {
    tool: String,
    argument: Option<String>,
    pattern: Option<Regex>,
}

impl DangerRule {
    fn matches(&self, call: &ToolCall) -> bool {
        if self.tool != "*" && self.tool != call.name {
            return false;
        }
        let Some(pattern) = &self.pattern else {
            return match &self.argument {
                Some(argument) => call.arguments.get(argument).is_some(),
                None => true,
            };
        };
        let subject = match &self.argument {
            Some(argument) => match call.arguments.get(argument) {
                Some(value) => value_text(value),
                None => return false,
            },
            None => call.arguments.to_string(),
        };
        pattern.is_match(&subject)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Rule set marking tool calls as dangerous. Any matching rule is enough.
#[derive(Debug, Clone, Default)]
pub struct DangerClassifier {
    rules: Vec<DangerRule>,
}

impl DangerClassifier {
    /// Classifier that flags nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: &[ApprovalRuleConfig]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(DangerRule {
                    tool: rule.tool.clone(),
                    argument: rule.argument.clone(),
                    pattern: rule.pattern.as_deref().map(Regex::new).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Flags every call to the named tools.
    pub fn tools<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: names
                .into_iter()
                .map(|name| DangerRule {
                    tool: name.into(),
                    argument: None,
                    pattern: None,
                })
                .collect(),
        }
    }

    pub fn is_dangerous(&self, call: &ToolCall) -> bool {
        self.rules.iter().any(|rule| rule.matches(call))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
