use async_trait::async_trait;
use steward_core::domain::ToolArguments;
use steward_core::tooling::{ParameterSchema, PropertySchema, Tool, ToolContext, ToolFailure};

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the given text unchanged"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new().required_property("text", PropertySchema::string("Text to return"))
    }

    async fn execute(&self, arguments: &ToolArguments, _ctx: &ToolContext) -> Result<String, ToolFailure> {
        arguments
            .get_str("text")
            .map(str::to_string)
            .ok_or_else(|| ToolFailure::invalid_argument("text", "expected a string"))
    }
}
