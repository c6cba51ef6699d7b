//! Federation bindings: a remote source re-exposed under a namespace.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::schema::RemoteTool;
use crate::error::MeshError;
use crate::tools::{ToolDefinition, ToolParameters, ToolResponse, Visibility};

/// Default separator between namespace and remote tool name.
pub const DEFAULT_SEPARATOR: &str = ".";

/// The remote operations a binding needs.
///
/// [`FederationClient`](super::FederationClient) is the HTTP implementation.
#[async_trait]
pub trait RemoteToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<RemoteTool>, MeshError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResponse, MeshError>;

    /// Label used in logs.
    fn describe(&self) -> String {
        "remote".to_string()
    }
}

/// Predicate over unqualified remote tool names.
pub type ToolFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Build a filter from allow and deny lists.
///
/// Deny wins over allow; an empty allow list admits every name.
pub fn allow_deny_filter(allow: &[String], deny: &[String]) -> ToolFilter {
    let allow: HashSet<String> = allow.iter().cloned().collect();
    let deny: HashSet<String> = deny.iter().cloned().collect();
    Arc::new(move |name: &str| !deny.contains(name) && (allow.is_empty() || allow.contains(name)))
}

/// `namespace + separator + name`, or just `name` for an empty namespace.
pub fn qualify(namespace: &str, separator: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}{separator}{name}")
    }
}

/// One listing fetch, split by the binding's filter.
#[derive(Debug, Default)]
pub(crate) struct Fetched {
    /// `(remote name, qualified definition)` pairs the filter admitted.
    pub tools: Vec<(String, Arc<ToolDefinition>)>,
    /// Qualified names the remote advertised but the filter rejected.
    pub rejected: Vec<String>,
}

/// A configured connection to one remote endpoint.
#[derive(Clone)]
pub struct FederationBinding {
    namespace: String,
    visibility: Visibility,
    filter: Option<ToolFilter>,
    source: Arc<dyn RemoteToolSource>,
}

impl std::fmt::Debug for FederationBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationBinding")
            .field("namespace", &self.namespace)
            .field("visibility", &self.visibility)
            .field("filtered", &self.filter.is_some())
            .field("source", &self.source.describe())
            .finish()
    }
}

impl FederationBinding {
    pub fn new(namespace: impl Into<String>, source: Arc<dyn RemoteToolSource>) -> Self {
        Self {
            namespace: namespace.into(),
            visibility: Visibility::Native,
            filter: None,
            source,
        }
    }

    /// Visibility applied to every tool this binding exposes.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_tool_filter(mut self, filter: ToolFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn source(&self) -> &Arc<dyn RemoteToolSource> {
        &self.source
    }

    /// Whether the filter admits an unqualified remote name.
    pub fn allows(&self, remote_name: &str) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(remote_name))
    }

    /// Fetch, filter and qualify this binding's tools.
    pub(crate) async fn fetch(&self, separator: &str) -> Result<Fetched, MeshError> {
        let remote = self.source.list_tools().await?;
        let mut fetched = Fetched::default();
        for tool in remote {
            let qualified = qualify(&self.namespace, separator, &tool.name);
            if !self.allows(&tool.name) {
                fetched.rejected.push(qualified);
                continue;
            }
            let definition = ToolDefinition {
                name: qualified,
                description: tool.description.unwrap_or_default(),
                input_schema: ToolParameters::from_schema(tool.input_schema),
                output_schema: tool.output_schema,
                keywords: tool.keywords,
                visibility: self.visibility,
            };
            fetched.tools.push((tool.name, Arc::new(definition)));
        }
        Ok(fetched)
    }
}
