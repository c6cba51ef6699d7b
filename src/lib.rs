//! toolmesh: schema-typed MCP tool registry with discovery and federation.
//!
//! A [`ToolServer`](server::ToolServer) resolves `tools/list` and `tools/call`
//! across three sources: tools registered locally, tools federated from remote
//! MCP endpoints under a namespace, and tools supplied per call by
//! [`ToolProvider`](tools::ToolProvider)s attached to the [`CallContext`].
//! Tools marked `Discoverable` stay out of the default listing and are reached
//! through the `tool_search` and `execute_tool` meta-tools.
//!
//! # Quick Start
//!
//! ```no_run
//! use toolmesh::prelude::*;
//!
//! # async fn example() -> toolmesh::error::Result<()> {
//! let server = ToolServer::new(MeshConfig::default())?;
//! server.register_tool(
//!     ToolDefinition::new("echo", "Echo the input", ToolParameters::object()
//!         .string("text", "text to echo", true)
//!         .build()),
//!     handler_fn(|args, _ctx| async move {
//!         Ok(ToolResponse::text(args.get_str("text")?))
//!     }),
//! );
//!
//! let ctx = CallContext::default();
//! let response = server
//!     .call_tool("echo", ToolArguments::new(serde_json::json!({ "text": "hi" })), &ctx)
//!     .await?;
//! assert_eq!(response.text_content().as_deref(), Some("hi"));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod discovery;
pub mod encoding;
pub mod error;
pub mod federation;
pub mod prelude;
pub mod server;
pub mod session;
pub mod tools;
pub mod util;

pub use context::CallContext;
pub use error::{MeshError, Result};
pub use server::ToolServer;
