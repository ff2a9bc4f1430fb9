use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, Utc};
use steward_core::domain::ToolArguments;
use steward_core::tooling::{ParameterSchema, PropertySchema, Tool, ToolContext, ToolFailure};

const DEFAULT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Current date and time, local by default"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .property(
                "format",
                PropertySchema::string("strftime format string, RFC 3339 when omitted"),
            )
            .property("utc", PropertySchema::boolean("Report UTC instead of local time"))
    }

    async fn execute(&self, arguments: &ToolArguments, _ctx: &ToolContext) -> Result<String, ToolFailure> {
        let format = arguments.get_str("format").unwrap_or(DEFAULT_FORMAT);
        let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(ToolFailure::invalid_argument("format", "not a valid strftime format"));
        }

        let rendered = if arguments.get_bool("utc").unwrap_or(false) {
            Utc::now().format_with_items(items.into_iter()).to_string()
        } else {
            Local::now().format_with_items(items.into_iter()).to_string()
        };
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> ToolContext {
        ToolContext::new("s", "c", CancellationToken::new())
    }

    #[tokio::test]
    async fn formats_utc_year() {
        let args = CurrentTimeTool
            .parameter_schema()
            .validate(&json!({"format": "%Y", "utc": true}))
            .expect("valid");
        let year = CurrentTimeTool.execute(&args, &ctx()).await.expect("formats");
        assert_eq!(year.len(), 4);
        assert!(year.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn rejects_broken_format() {
        let args = CurrentTimeTool
            .parameter_schema()
            .validate(&json!({"format": "%Q"}))
            .expect("valid");
        assert!(CurrentTimeTool.execute(&args, &ctx()).await.is_err());
    }
}
