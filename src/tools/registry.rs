//! Local tool registry with a name-sorted native listing cache.
//!
//! The name → entry map is authoritative. The native listing is a derived
//! projection kept sorted at all times: single registrations patch it with a
//! binary-search insert/replace/remove, batch registrations rebuild it once.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::arguments::ToolArguments;
use super::response::ToolResponse;
use super::tool::{ToolDefinition, ToolHandler};
use super::validation::validate_arguments;
use crate::context::CallContext;
use crate::error::MeshError;

/// A registered tool: its definition and bound handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: Arc<ToolDefinition>,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, RegisteredTool>,
    native_listing: Vec<Arc<ToolDefinition>>,
}

impl RegistryState {
    fn locate(&self, name: &str) -> Result<usize, usize> {
        self.native_listing
            .binary_search_by(|def| def.name.as_str().cmp(name))
    }

    fn patch_listing(&mut self, definition: &Arc<ToolDefinition>) {
        match (self.locate(&definition.name), definition.is_native()) {
            (Ok(index), true) => self.native_listing[index] = Arc::clone(definition),
            (Ok(index), false) => {
                self.native_listing.remove(index);
            }
            (Err(index), true) => self.native_listing.insert(index, Arc::clone(definition)),
            (Err(_), false) => {}
        }
    }

    fn rebuild_listing(&mut self) {
        let mut listing: Vec<_> = self
            .entries
            .values()
            .filter(|entry| entry.definition.is_native())
            .map(|entry| Arc::clone(&entry.definition))
            .collect();
        listing.sort_unstable_by(|left, right| left.name.cmp(&right.name));
        self.native_listing = listing;
    }
}

/// Thread-safe registry of locally defined tools.
#[derive(Default)]
pub struct ToolRegistry {
    state: RwLock<RegistryState>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or fully replace the tool named `definition.name`.
    pub fn register(&self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        let definition = Arc::new(definition);
        let name = definition.name.clone();
        let visibility = definition.visibility;

        let replaced = {
            let mut state = self.write();
            state.patch_listing(&definition);
            state
                .entries
                .insert(name.clone(), RegisteredTool { definition, handler })
                .is_some()
        };

        tracing::debug!(tool = %name, %visibility, replaced, "registered tool");
    }

    /// Register many tools, rebuilding the native listing once at the end.
    pub fn register_batch<I>(&self, tools: I)
    where
        I: IntoIterator<Item = (ToolDefinition, Arc<dyn ToolHandler>)>,
    {
        let tools: Vec<_> = tools
            .into_iter()
            .map(|(definition, handler)| RegisteredTool {
                definition: Arc::new(definition),
                handler,
            })
            .collect();
        let count = tools.len();

        {
            let mut state = self.write();
            for tool in tools {
                state.entries.insert(tool.definition.name.clone(), tool);
            }
            state.rebuild_listing();
        }

        tracing::debug!(count, "registered tool batch");
    }

    /// Remove a tool. Returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut state = self.write();
        let Some(removed) = state.entries.remove(name) else {
            return false;
        };
        if removed.definition.is_native() {
            if let Ok(index) = state.locate(name) {
                state.native_listing.remove(index);
            }
        }
        tracing::debug!(tool = %name, "unregistered tool");
        true
    }

    /// Snapshot of the native listing, name-ascending.
    pub fn list(&self) -> Vec<Arc<ToolDefinition>> {
        self.read().native_listing.clone()
    }

    /// Snapshot of every Discoverable definition, name-ascending.
    pub fn discoverable(&self) -> Vec<Arc<ToolDefinition>> {
        let mut tools: Vec<_> = self
            .read()
            .entries
            .values()
            .filter(|entry| !entry.definition.is_native())
            .map(|entry| Arc::clone(&entry.definition))
            .collect();
        tools.sort_unstable_by(|left, right| left.name.cmp(&right.name));
        tools
    }

    /// Snapshot of every definition regardless of visibility, name-ascending.
    pub fn all(&self) -> Vec<Arc<ToolDefinition>> {
        let mut tools: Vec<_> = self
            .read()
            .entries
            .values()
            .map(|entry| Arc::clone(&entry.definition))
            .collect();
        tools.sort_unstable_by(|left, right| left.name.cmp(&right.name));
        tools
    }

    pub fn has_discoverable(&self) -> bool {
        let state = self.read();
        state.entries.len() > state.native_listing.len()
    }

    pub fn lookup(&self, name: &str) -> Option<RegisteredTool> {
        self.read().entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Validate and invoke a locally registered tool.
    ///
    /// The lock is released before the handler runs.
    pub async fn call(
        &self,
        name: &str,
        args: ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        let tool = self
            .lookup(name)
            .ok_or_else(|| MeshError::UnknownTool(name.to_owned()))?;
        invoke(&tool, args, ctx).await
    }
}

/// Run required-field validation, then the handler.
pub(crate) async fn invoke(
    tool: &RegisteredTool,
    args: ToolArguments,
    ctx: &CallContext,
) -> Result<ToolResponse, MeshError> {
    validate_arguments(args.raw(), &tool.definition.input_schema.schema)?;
    tool.handler.call(&args, ctx).await
}
