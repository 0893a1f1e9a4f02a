//! Router builder for toolgate HTTP endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use toolgate_core::SecurityGate;
use tower_http::trace::TraceLayer;

use crate::error::BuildError;
use crate::handler::{call_tool, health};
use crate::state::AppState;

/// Default prefix for tool endpoints.
pub const DEFAULT_TOOLS_PREFIX: &str = "/tools";

/// Builder for configuring toolgate HTTP endpoints.
///
/// Serves `GET /health` and `POST {prefix}/:name`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use toolgate_server::GateRouter;
/// use toolgate_core::SecurityGate;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let gate: SecurityGate = todo!();
/// let app = GateRouter::new(gate)
///     .request_timeout(Duration::from_secs(30))
///     .build()?;
///
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub struct GateRouter {
    gate: Arc<SecurityGate>,
    tools_prefix: String,
    request_timeout: Option<Duration>,
}

impl GateRouter {
    /// Create a new router builder with the given gate.
    pub fn new(gate: SecurityGate) -> Self {
        Self::from_arc(Arc::new(gate))
    }

    /// Create a new router builder from an existing `Arc<SecurityGate>`.
    pub fn from_arc(gate: Arc<SecurityGate>) -> Self {
        Self {
            gate,
            tools_prefix: DEFAULT_TOOLS_PREFIX.to_string(),
            request_timeout: None,
        }
    }

    /// Serve tool calls under a different prefix.
    pub fn tools_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tools_prefix = prefix.into();
        self
    }

    /// Deadline applied to every executor call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the router.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidPrefix`] if the tools prefix does not
    /// start with `/`, and [`BuildError::ZeroTimeout`] for a zero timeout.
    pub fn build(self) -> Result<Router, BuildError> {
        if !self.tools_prefix.starts_with('/') {
            return Err(BuildError::InvalidPrefix(self.tools_prefix));
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(BuildError::ZeroTimeout);
        }

        let prefix = self.tools_prefix.trim_end_matches('/');
        let state = AppState::new(self.gate, self.request_timeout);

        Ok(Router::new()
            .route("/health", get(health))
            .route(&format!("{}/:name", prefix), post(call_tool))
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }

    /// Build the router and nest it under a prefix path.
    pub fn build_nested(self, prefix: impl Into<String>) -> Result<Router, BuildError> {
        Ok(Router::new().nest(&prefix.into(), self.build()?))
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
