//! Tool definitions, visibility, and the handler trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::arguments::ToolArguments;
use super::response::ToolResponse;
use super::types::ToolParameters;
use crate::context::CallContext;
use crate::error::MeshError;

/// Whether a tool shows up in the canonical listing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Visibility {
    /// Listed and directly callable.
    #[default]
    Native,
    /// Hidden from the default listing; reachable via search or by exact name.
    Discoverable,
}

/// A named, schema-typed tool.
///
/// Immutable once stored; re-registering the same name replaces it wholesale.
///
/// ```
/// use toolmesh::tools::{ToolDefinition, ToolParameters, Visibility};
///
/// let def = ToolDefinition::builder()
///     .name("add")
///     .description("Add two numbers")
///     .input_schema(
///         ToolParameters::object()
///             .number("a", "left operand", true)
///             .number("b", "right operand", true)
///             .build(),
///     )
///     .keywords(vec!["math".into(), "sum".into()])
///     .visibility(Visibility::Discoverable)
///     .build();
/// assert_eq!(def.name, "add");
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[builder(into)]
    pub name: String,
    #[builder(into, default)]
    pub description: String,
    #[builder(default)]
    pub input_schema: ToolParameters,
    pub output_schema: Option<serde_json::Value>,
    #[builder(default)]
    pub keywords: Vec<String>,
    #[builder(default)]
    pub visibility: Visibility,
}

impl ToolDefinition {
    /// Shorthand for a native tool without keywords.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: ToolParameters,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            output_schema: None,
            keywords: Vec::new(),
            visibility: Visibility::Native,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn discoverable(self) -> Self {
        self.with_visibility(Visibility::Discoverable)
    }

    pub fn is_native(&self) -> bool {
        self.visibility == Visibility::Native
    }

    /// Wire shape used in listings.
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.schema.clone(),
            output_schema: self.output_schema.clone(),
        }
    }
}

/// Tool as it appears in a `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
}

/// Callable bound to a single tool definition at registration time.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError>;
}

type BoxedHandlerFn = dyn Fn(
        ToolArguments,
        CallContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolResponse, MeshError>> + Send>>
    + Send
    + Sync;

/// Closure-based handler.
pub struct FnHandler {
    handler: Arc<BoxedHandlerFn>,
}

#[async_trait]
impl ToolHandler for FnHandler {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Box an async closure as a [`ToolHandler`].
pub fn handler_fn<F, Fut>(handler: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ToolArguments, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResponse, MeshError>> + Send + 'static,
{
    Arc::new(FnHandler {
        handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
    })
}
