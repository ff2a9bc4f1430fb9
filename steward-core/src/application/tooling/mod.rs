//! Tool capability registry.
//!
//! Tools implement [`Tool`] and are registered once into a [`ToolRegistry`],
//! which is then shared read-only by every agent run.

mod error;
mod interface;
mod registry;
mod schema;

pub use error::{RegistryError, SchemaValidationError, ToolFailure};
pub use interface::{Tool, ToolContext};
pub use registry::{ToolDefinition, ToolRegistry};
pub use schema::{ParameterSchema, PropertySchema, SchemaType};
