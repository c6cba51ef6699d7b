//! Per-call execution context: listing mode, attached providers, cancellation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::discovery::ListingMode;
use crate::tools::ToolProvider;

/// Request-scoped parameters threaded through every list, search and call path.
///
/// Cheap to clone: providers are shared and the cancellation token is a handle.
#[derive(Clone, Default)]
pub struct CallContext {
    mode: ListingMode,
    providers: Vec<Arc<dyn ToolProvider>>,
    cancel: CancellationToken,
    protocol_version: Option<String>,
    /// Free-form metadata for handlers.
    pub metadata: serde_json::Value,
}

impl CallContext {
    pub fn new(mode: ListingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: ListingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Attach a provider. Attachment order is lookup order.
    pub fn with_provider(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn mode(&self) -> ListingMode {
        self.mode
    }

    pub fn providers(&self) -> &[Arc<dyn ToolProvider>] {
        &self.providers
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("mode", &self.mode)
            .field("providers", &self.providers.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}
