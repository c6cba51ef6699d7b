//! Multi-binding federation with copy-and-swap refresh.
//!
//! The manager keeps, per binding, the last successfully fetched tool set and
//! a derived snapshot (sorted listing + routing table) built from all of
//! them. Snapshots are immutable; a refresh builds a new one with no lock held
//! and publishes it with a single pointer swap under the write lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::binding::{Fetched, FederationBinding, DEFAULT_SEPARATOR};
use crate::context::CallContext;
use crate::error::MeshError;
use crate::tools::{ToolArguments, ToolDefinition, ToolResponse, Visibility};

type FetchedTools = Arc<Fetched>;

#[derive(Clone)]
struct BindingEntry {
    binding: Arc<FederationBinding>,
    /// Admitted and rejected tools from the last good fetch.
    tools: FetchedTools,
}

/// Where a qualified name is routed.
#[derive(Clone)]
struct Route {
    binding: Arc<FederationBinding>,
    remote_name: String,
    definition: Arc<ToolDefinition>,
}

#[derive(Default)]
struct Snapshot {
    tools: Vec<Arc<ToolDefinition>>,
    routes: HashMap<String, Route>,
    /// Advertised qualified names withheld by a binding's filter.
    filtered: HashSet<String>,
}

impl Snapshot {
    /// Later entries overwrite earlier ones on qualified-name collisions.
    fn build(entries: &[BindingEntry]) -> Self {
        let mut routes = HashMap::new();
        let mut filtered = HashSet::new();
        for entry in entries {
            filtered.extend(entry.tools.rejected.iter().cloned());
            for (remote_name, definition) in entry.tools.tools.iter() {
                routes.insert(
                    definition.name.clone(),
                    Route {
                        binding: Arc::clone(&entry.binding),
                        remote_name: remote_name.clone(),
                        definition: Arc::clone(definition),
                    },
                );
            }
        }
        let mut tools: Vec<_> = routes
            .values()
            .map(|route| Arc::clone(&route.definition))
            .collect();
        tools.sort_unstable_by(|left, right| left.name.cmp(&right.name));
        filtered.retain(|name| !routes.contains_key(name));
        Self {
            tools,
            routes,
            filtered,
        }
    }
}

#[derive(Default)]
struct ManagerState {
    entries: Vec<BindingEntry>,
    snapshot: Arc<Snapshot>,
    generation: u64,
}

impl ManagerState {
    fn publish(&mut self, entries: Vec<BindingEntry>, snapshot: Arc<Snapshot>) {
        self.entries = entries;
        self.snapshot = snapshot;
        self.generation += 1;
    }
}

/// Outcome of a refresh in which no cancellation occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Namespaces whose tools were re-fetched.
    pub refreshed: Vec<String>,
    /// Namespaces whose fetch failed; they keep their previous tools.
    pub failed: Vec<String>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary of one registered binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingStatus {
    pub namespace: String,
    pub visibility: Visibility,
    pub tool_count: usize,
}

/// Holds every federation binding and the merged routing snapshot.
pub struct FederationManager {
    separator: String,
    state: RwLock<ManagerState>,
}

impl Default for FederationManager {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl FederationManager {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            state: RwLock::new(ManagerState::default()),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    fn read(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.read().snapshot)
    }

    /// Add a binding, replacing any existing binding with the same namespace.
    ///
    /// The initial fetch happens before the lock is taken. If it fails the
    /// binding is still registered, contributing nothing until a later refresh.
    pub async fn register(&self, binding: FederationBinding) {
        let binding = Arc::new(binding);
        let namespace = binding.namespace().to_string();

        let tools = match binding.fetch(&self.separator).await {
            Ok(tools) => tools,
            Err(error) => {
                tracing::warn!(%namespace, %error, "initial federation fetch failed; registering empty");
                Fetched::default()
            }
        };
        let count = tools.tools.len();
        let entry = BindingEntry {
            binding,
            tools: Arc::new(tools),
        };

        let replaced = {
            let mut state = self.write();
            let mut entries = state.entries.clone();
            let before = entries.len();
            entries.retain(|existing| existing.binding.namespace() != namespace);
            let replaced = entries.len() != before;
            entries.push(entry);
            let snapshot = Arc::new(Snapshot::build(&entries));
            state.publish(entries, snapshot);
            replaced
        };

        tracing::info!(%namespace, tools = count, replaced, "registered federation binding");
    }

    /// Remove the binding for `namespace`. Returns whether one existed.
    pub fn unregister(&self, namespace: &str) -> bool {
        let mut state = self.write();
        let mut entries = state.entries.clone();
        let before = entries.len();
        entries.retain(|entry| entry.binding.namespace() != namespace);
        if entries.len() == before {
            return false;
        }
        let snapshot = Arc::new(Snapshot::build(&entries));
        state.publish(entries, snapshot);
        tracing::info!(%namespace, "unregistered federation binding");
        true
    }

    /// Re-fetch every binding and publish a new snapshot.
    ///
    /// Failing bindings are skipped and keep their previous tools. Cancellation
    /// is checked before each remote call; once observed, nothing is committed
    /// and [`MeshError::Cancelled`] is returned.
    pub async fn refresh(&self, ctx: &CallContext) -> Result<RefreshReport, MeshError> {
        let (entries, generation) = {
            let state = self.read();
            (state.entries.clone(), state.generation)
        };
        tracing::debug!(bindings = entries.len(), "refreshing federation");

        let mut report = RefreshReport::default();
        let mut fetched: Vec<(Arc<FederationBinding>, FetchedTools)> = Vec::new();

        for entry in &entries {
            let namespace = entry.binding.namespace();
            if ctx.is_cancelled() {
                tracing::info!(%namespace, "federation refresh cancelled; discarding");
                return Err(MeshError::Cancelled);
            }
            let result = tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => {
                    tracing::info!(%namespace, "federation refresh cancelled; discarding");
                    return Err(MeshError::Cancelled);
                }
                result = entry.binding.fetch(&self.separator) => result,
            };
            match result {
                Ok(tools) => {
                    tracing::debug!(
                        %namespace,
                        tools = tools.tools.len(),
                        filtered = tools.rejected.len(),
                        "refreshed federation binding"
                    );
                    report.refreshed.push(namespace.to_string());
                    fetched.push((Arc::clone(&entry.binding), Arc::new(tools)));
                }
                Err(error) => {
                    tracing::warn!(%namespace, %error, "federation binding refresh failed; keeping previous tools");
                    report.failed.push(namespace.to_string());
                }
            }
        }

        if ctx.is_cancelled() {
            tracing::info!("federation refresh cancelled; discarding");
            return Err(MeshError::Cancelled);
        }

        let entries = apply_fetched(entries, &fetched);
        let snapshot = Arc::new(Snapshot::build(&entries));

        {
            let mut state = self.write();
            if state.generation == generation {
                state.publish(entries, snapshot);
            } else {
                // Bindings changed while fetching; merge into the current set.
                let merged = apply_fetched(state.entries.clone(), &fetched);
                let snapshot = Arc::new(Snapshot::build(&merged));
                state.publish(merged, snapshot);
            }
        }

        tracing::info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            "federation refresh complete"
        );
        Ok(report)
    }

    /// Every federated tool in the current snapshot, name-ascending.
    pub fn tools(&self) -> Vec<Arc<ToolDefinition>> {
        self.snapshot().tools.clone()
    }

    pub fn lookup(&self, qualified: &str) -> Option<Arc<ToolDefinition>> {
        self.snapshot()
            .routes
            .get(qualified)
            .map(|route| Arc::clone(&route.definition))
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.snapshot().routes.contains_key(qualified)
    }

    pub fn has_discoverable(&self) -> bool {
        self.snapshot().tools.iter().any(|def| !def.is_native())
    }

    pub fn bindings(&self) -> Vec<BindingStatus> {
        self.read()
            .entries
            .iter()
            .map(|entry| BindingStatus {
                namespace: entry.binding.namespace().to_string(),
                visibility: entry.binding.visibility(),
                tool_count: entry.tools.tools.len(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Whether `qualified` is routed, or was advertised by a binding whose
    /// filter rejects it.
    ///
    /// Used by dispatch to decide whether federation owns a name.
    pub fn resolves(&self, qualified: &str) -> bool {
        !matches!(self.resolve(qualified), Err(MeshError::UnknownTool(_)))
    }

    fn resolve(&self, qualified: &str) -> Result<Route, MeshError> {
        let snapshot = self.snapshot();
        if let Some(route) = snapshot.routes.get(qualified) {
            return Ok(route.clone());
        }
        if snapshot.filtered.contains(qualified) {
            Err(MeshError::Filtered(qualified.to_string()))
        } else {
            Err(MeshError::UnknownTool(qualified.to_string()))
        }
    }

    /// Route a call to the owning binding with the namespace stripped.
    pub async fn call_tool(
        &self,
        qualified: &str,
        args: ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        let route = self.resolve(qualified)?;
        tracing::debug!(
            tool = %qualified,
            namespace = %route.binding.namespace(),
            remote = %route.remote_name,
            "routing federated call"
        );

        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(MeshError::Cancelled),
            result = route.binding.source().call_tool(&route.remote_name, args.into_raw()) => result,
        }
    }
}

fn apply_fetched(
    mut entries: Vec<BindingEntry>,
    fetched: &[(Arc<FederationBinding>, FetchedTools)],
) -> Vec<BindingEntry> {
    for entry in &mut entries {
        if let Some((_, tools)) = fetched
            .iter()
            .find(|(binding, _)| Arc::ptr_eq(binding, &entry.binding))
        {
            entry.tools = Arc::clone(tools);
        }
    }
    entries
}
