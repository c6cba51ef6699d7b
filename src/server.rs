//! Dispatch core: resolves list, search and call requests across the local
//! registry, federated bindings and call-scoped providers.
//!
//! Call resolution order: registry, meta-tools, federation, providers. The
//! framing layer hands in `(method, params, context)` and serializes whatever
//! comes back; nothing here touches HTTP or JSON-RPC envelopes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{MeshConfig, SUPPORTED_PROTOCOL_VERSIONS};
use crate::context::CallContext;
use crate::discovery::meta::{execute_tool_definition, tool_search_definition};
use crate::discovery::{
    compose_listing, search_pool, ExecuteRequest, ListingMode, ListingSources, SearchRequest,
    EXECUTE_TOOL, TOOL_SEARCH,
};
use crate::encoding::{JsonEncoder, ResponseEncoder};
use crate::error::MeshError;
use crate::federation::{FederationBinding, FederationManager, RefreshReport};
use crate::session::{SessionStore, SignedSessionStore};
use crate::tools::provider::{collect_provider_tools, resolve_provider_tool};
use crate::tools::registry::invoke;
use crate::tools::scoring::{clamp_max_results, rank_order, score, ScoreCandidate};
use crate::tools::{
    validate_arguments, Content, ProvidedTool, ToolArguments, ToolDefinition, ToolDescriptor, ToolHandler,
    ToolRegistry, ToolResponse,
};

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub name: String,
    pub description: String,
    pub score: f64,
    pub input_schema: serde_json::Value,
}

/// Outcome of session establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandshake {
    /// Negotiated protocol version.
    pub protocol_version: String,
    /// Signed token, when a session store is configured.
    pub token: Option<String>,
    pub mode: ListingMode,
}

/// The tool server core.
pub struct ToolServer {
    config: MeshConfig,
    registry: Arc<ToolRegistry>,
    federation: Arc<FederationManager>,
    sessions: Option<Arc<dyn SessionStore>>,
    encoder: Arc<dyn ResponseEncoder>,
}

impl std::fmt::Debug for ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer")
            .field("server_name", &self.config.server_name)
            .field("tools", &self.registry.len())
            .field("bindings", &self.federation.bindings().len())
            .field("sessions", &self.sessions.is_some())
            .field("encoder", &self.encoder.name())
            .finish()
    }
}

impl ToolServer {
    /// Build a server from validated configuration.
    ///
    /// Configured federation bindings are not contacted until
    /// [`connect_federation`](Self::connect_federation) is awaited.
    pub fn new(config: MeshConfig) -> Result<Self, MeshError> {
        config.validate()?;
        let sessions = match &config.session {
            Some(session) => Some(Arc::new(SignedSessionStore::new(
                session.secret.as_bytes(),
                session.ttl_secs,
            )?) as Arc<dyn SessionStore>),
            None => None,
        };
        Ok(Self {
            federation: Arc::new(FederationManager::new(config.namespace_separator.clone())),
            registry: Arc::new(ToolRegistry::new()),
            sessions,
            encoder: Arc::new(JsonEncoder::default()),
            config,
        })
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ResponseEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn federation(&self) -> &Arc<FederationManager> {
        &self.federation
    }

    pub fn register_tool(&self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        self.registry.register(definition, handler);
    }

    pub fn register_tools<I>(&self, tools: I)
    where
        I: IntoIterator<Item = (ToolDefinition, Arc<dyn ToolHandler>)>,
    {
        self.registry.register_batch(tools);
    }

    pub async fn register_binding(&self, binding: FederationBinding) {
        self.federation.register(binding).await;
    }

    /// Register every binding listed in the configuration.
    pub async fn connect_federation(&self) {
        for entry in &self.config.federation {
            let binding = entry.build_binding(&self.config);
            self.federation.register(binding).await;
        }
    }

    pub async fn refresh_federation(&self, ctx: &CallContext) -> Result<RefreshReport, MeshError> {
        self.federation.refresh(ctx).await
    }

    /// Tools visible under the context's mode, name-ascending.
    pub async fn list_tools(&self, ctx: &CallContext) -> Vec<ToolDescriptor> {
        let providers = self.provider_tools(ctx).await;
        let federation = self.federation.tools();
        let listing = compose_listing(
            ctx.mode(),
            ListingSources {
                registry: &self.registry,
                federation: &federation,
                providers: &providers,
            },
        );
        listing.iter().map(|def| def.descriptor()).collect()
    }

    /// Rank Discoverable tools against `query`.
    ///
    /// `max_results` is clamped into `[1, 100]`; missing or non-positive
    /// values use the configured default.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<i64>,
        ctx: &CallContext,
    ) -> Vec<SearchHit> {
        let providers = self.provider_tools(ctx).await;
        let federation = self.federation.tools();
        let pool = search_pool(ListingSources {
            registry: &self.registry,
            federation: &federation,
            providers: &providers,
        });
        let limit = clamp_max_results(max_results, self.config.search_limit());

        let mut scored: Vec<(f64, &Arc<ToolDefinition>)> = pool
            .iter()
            .map(|def| {
                let candidate = ScoreCandidate {
                    name: &def.name,
                    description: &def.description,
                    keywords: &def.keywords,
                };
                (score(query, &candidate), def)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|left, right| {
            rank_order((left.0, left.1.name.as_str()), (right.0, right.1.name.as_str()))
        });
        scored.truncate(limit);

        tracing::debug!(%query, candidates = pool.len(), hits = scored.len(), "tool search");
        scored
            .into_iter()
            .map(|(score, def)| SearchHit {
                name: def.name.clone(),
                description: def.description.clone(),
                score,
                input_schema: def.input_schema.schema.clone(),
            })
            .collect()
    }

    /// Resolve and invoke `name`.
    pub async fn call_tool(
        &self,
        name: &str,
        args: ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        if let Some(tool) = self.registry.lookup(name) {
            tracing::debug!(tool = %name, "dispatching to registry");
            return invoke(&tool, args, ctx).await;
        }
        match name {
            TOOL_SEARCH => self.call_tool_search(args, ctx).await,
            EXECUTE_TOOL => self.call_execute_tool(args, ctx).await,
            _ => self.call_resolved(name, args, ctx).await,
        }
    }

    /// Federation, then providers. Registry lookup has already failed.
    async fn call_resolved(
        &self,
        name: &str,
        args: ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        if self.federation.resolves(name) {
            tracing::debug!(tool = %name, "dispatching to federation");
            return self.federation.call_tool(name, args, ctx).await;
        }
        if let Some(provided) = resolve_provider_tool(name, ctx).await {
            tracing::debug!(tool = %name, "dispatching to provider");
            validate_arguments(args.raw(), &provided.definition.input_schema.schema)?;
            return provided.provider.execute_tool(name, &args, ctx).await;
        }
        Err(MeshError::UnknownTool(name.to_string()))
    }

    async fn call_tool_search(
        &self,
        args: ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        validate_arguments(args.raw(), &tool_search_definition().input_schema.schema)?;
        let request = SearchRequest::from_arguments(&args)?;
        let hits = self.search(request.query(), request.max_results, ctx).await;

        let structured = serde_json::json!({ "tools": hits });
        let text = self.encoder.encode(&structured)?;
        Ok(ToolResponse {
            content: vec![Content::text(text)],
            structured_content: Some(structured),
            is_error: false,
        })
    }

    async fn call_execute_tool(
        &self,
        args: ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        validate_arguments(args.raw(), &execute_tool_definition().input_schema.schema)?;
        let request = ExecuteRequest::from_arguments(&args)?;
        let target = request.name.clone();
        tracing::debug!(tool = %target, "execute_tool");

        if let Some(tool) = self.registry.lookup(&target) {
            return invoke(&tool, request.into_arguments(), ctx).await;
        }
        self.call_resolved(&target, request.into_arguments(), ctx).await
    }

    async fn provider_tools(&self, ctx: &CallContext) -> Vec<ProvidedTool> {
        if ctx.providers().is_empty() {
            Vec::new()
        } else {
            collect_provider_tools(ctx).await
        }
    }

    /// Start a session: negotiate the protocol version and, when a session
    /// store is configured, issue a token embedding the mode.
    pub fn establish_session(
        &self,
        requested_version: &str,
        mode: ListingMode,
    ) -> Result<SessionHandshake, MeshError> {
        let protocol_version = self.negotiate_version(requested_version);
        let token = match &self.sessions {
            Some(store) => Some(store.issue(&protocol_version, mode)?),
            None => None,
        };
        tracing::debug!(%protocol_version, %mode, session = token.is_some(), "session established");
        Ok(SessionHandshake {
            protocol_version,
            token,
            mode,
        })
    }

    fn negotiate_version(&self, requested: &str) -> String {
        if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
            requested.to_string()
        } else {
            self.config.protocol_version.clone()
        }
    }

    /// Build the call context for an inbound request.
    ///
    /// An explicit show-all flag wins; otherwise a valid session token's mode
    /// applies; otherwise `Default`.
    pub fn context_for_request(
        &self,
        show_all_flag: Option<&str>,
        session_token: Option<&str>,
    ) -> CallContext {
        let session = match (&self.sessions, session_token) {
            (Some(store), Some(token)) => Some(store.validate(token)).filter(|v| v.valid),
            _ => None,
        };

        let mode = match (show_all_flag, &session) {
            (Some(flag), _) => ListingMode::from_flag(flag),
            (None, Some(session)) => session.mode,
            (None, None) => ListingMode::Default,
        };

        let ctx = CallContext::new(mode);
        match session.and_then(|session| session.version) {
            Some(version) => ctx.with_protocol_version(version),
            None => ctx,
        }
    }
}
