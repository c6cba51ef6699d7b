//! Listing composition across the registry, federation and providers.
//!
//! A name belongs to the first source that offers it, in the order
//! registry, federation, providers, regardless of visibility. Shadowed
//! definitions are neither listed nor searched. Federation and providers
//! cannot claim the meta-tool names; the registry can.

use std::collections::HashSet;
use std::sync::Arc;

use super::meta::{execute_tool_definition, is_meta_tool, tool_search_definition};
use super::ListingMode;
use crate::tools::{ProvidedTool, ToolDefinition, ToolRegistry};

/// Everything a listing or search draws from for one call.
#[derive(Clone, Copy)]
pub struct ListingSources<'a> {
    pub registry: &'a ToolRegistry,
    pub federation: &'a [Arc<ToolDefinition>],
    pub providers: &'a [ProvidedTool],
}

impl<'a> ListingSources<'a> {
    /// Federation and provider definitions that survive shadowing.
    fn external(&self) -> Vec<Arc<ToolDefinition>> {
        let mut seen = HashSet::new();
        let provided = self
            .providers
            .iter()
            .map(|tool| Arc::new(tool.definition.clone()));

        self.federation
            .iter()
            .cloned()
            .chain(provided)
            .filter(|def| {
                !is_meta_tool(&def.name)
                    && !self.registry.contains(&def.name)
                    && seen.insert(def.name.clone())
            })
            .collect()
    }
}

/// Tools visible under `mode`, name-ascending.
///
/// In `Default` mode the two meta-tools are added when any Discoverable tool
/// exists in any source; a registered tool of the same name takes precedence
/// even when it is itself hidden.
pub fn compose_listing(mode: ListingMode, sources: ListingSources<'_>) -> Vec<Arc<ToolDefinition>> {
    let mut listed = match mode {
        ListingMode::Default => sources.registry.list(),
        ListingMode::ShowAll => sources.registry.all(),
    };
    let external = sources.external();
    let any_discoverable =
        sources.registry.has_discoverable() || external.iter().any(|def| !def.is_native());

    listed.extend(external.into_iter().filter(|def| mode.lists(def.visibility)));

    if mode == ListingMode::Default && any_discoverable {
        for meta in [tool_search_definition(), execute_tool_definition()] {
            if !sources.registry.contains(&meta.name) {
                listed.push(meta);
            }
        }
    }

    listed.sort_by(|left, right| left.name.cmp(&right.name));
    listed
}

/// Discoverable candidates for search: registry first, then federation, then providers.
pub fn search_pool(sources: ListingSources<'_>) -> Vec<Arc<ToolDefinition>> {
    let mut pool = sources.registry.discoverable();
    pool.extend(sources.external().into_iter().filter(|def| !def.is_native()));
    pool
}
