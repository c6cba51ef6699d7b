//! Federation: re-exposing tools from remote endpoints under namespaces.

pub mod binding;
pub mod client;
pub mod manager;
pub mod schema;
pub mod stream;

pub use binding::{
    allow_deny_filter, qualify, FederationBinding, RemoteToolSource, ToolFilter,
    DEFAULT_SEPARATOR,
};
pub use client::{FederationClient, RemoteServerInfo};
pub use manager::{BindingStatus, FederationManager, RefreshReport};
pub use schema::RemoteTool;
