//! Tool definitions, the local registry, search scoring, and providers.

pub mod arguments;
pub mod provider;
pub mod registry;
pub mod response;
pub mod scoring;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use provider::{ProvidedTool, ToolProvider};
pub use registry::{RegisteredTool, ToolRegistry};
pub use response::{Content, ToolResponse};
pub use tool::{handler_fn, ToolDefinition, ToolDescriptor, ToolHandler, Visibility};
pub use types::ToolParameters;
pub use validation::validate_arguments;
