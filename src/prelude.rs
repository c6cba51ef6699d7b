//! Convenience re-exports for common use.

pub use crate::config::{BindingConfig, MeshConfig};
pub use crate::context::CallContext;
pub use crate::discovery::ListingMode;
pub use crate::error::{MeshError, Result};
pub use crate::federation::{FederationBinding, FederationClient, RemoteToolSource};
pub use crate::server::{SearchHit, ToolServer};
pub use crate::tools::{
    handler_fn, ToolArguments, ToolDefinition, ToolHandler, ToolParameters, ToolProvider,
    ToolResponse, Visibility,
};
