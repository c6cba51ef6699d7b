//! Call-scoped tool providers.
//!
//! Providers ride along on a [`CallContext`] and are never stored in the
//! registry. They are consulted in attachment order; for any name, the
//! earliest provider offering it wins.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use super::arguments::ToolArguments;
use super::response::ToolResponse;
use super::tool::ToolDefinition;
use crate::context::CallContext;
use crate::error::MeshError;

/// A collaborator that can list and execute tools for the duration of one call.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Tools this provider offers, each carrying its own visibility.
    async fn list_tools(&self, ctx: &CallContext) -> Result<Vec<ToolDefinition>, MeshError>;

    /// Execute a tool by name.
    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError>;
}

/// A provider-supplied definition together with the provider that owns it.
#[derive(Clone)]
pub struct ProvidedTool {
    pub definition: ToolDefinition,
    pub provider: Arc<dyn ToolProvider>,
}

impl std::fmt::Debug for ProvidedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidedTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// List every provider attached to `ctx`, de-duplicated by name.
///
/// Providers are listed concurrently; attachment order still decides name
/// collisions. A provider whose listing fails contributes nothing.
pub async fn collect_provider_tools(ctx: &CallContext) -> Vec<ProvidedTool> {
    let mut seen = HashSet::new();
    let mut tools = Vec::new();

    let listings = join_all(ctx.providers().iter().map(|provider| provider.list_tools(ctx))).await;

    for (index, (provider, listed)) in ctx.providers().iter().zip(listings).enumerate() {
        let listed = match listed {
            Ok(listed) => listed,
            Err(error) => {
                tracing::warn!(provider = index, %error, "provider tool listing failed");
                continue;
            }
        };
        for definition in listed {
            if seen.insert(definition.name.clone()) {
                tools.push(ProvidedTool {
                    definition,
                    provider: Arc::clone(provider),
                });
            } else {
                tracing::trace!(provider = index, tool = %definition.name, "shadowed provider tool");
            }
        }
    }

    tools
}

/// Find the earliest attached provider offering `name`.
pub async fn resolve_provider_tool(name: &str, ctx: &CallContext) -> Option<ProvidedTool> {
    for (index, provider) in ctx.providers().iter().enumerate() {
        match provider.list_tools(ctx).await {
            Ok(listed) => {
                if let Some(definition) = listed.into_iter().find(|def| def.name == name) {
                    return Some(ProvidedTool {
                        definition,
                        provider: Arc::clone(provider),
                    });
                }
            }
            Err(error) => {
                tracing::warn!(provider = index, %error, "provider tool listing failed");
            }
        }
    }
    None
}
