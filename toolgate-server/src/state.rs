//! Application state for the toolgate server.

use std::sync::Arc;
use std::time::Duration;

use toolgate_core::SecurityGate;

/// Shared application state.
///
/// Cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    /// The gate every tool call runs through.
    pub gate: Arc<SecurityGate>,

    /// Deadline applied to each executor call.
    pub request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(gate: Arc<SecurityGate>, request_timeout: Option<Duration>) -> Self {
        Self {
            gate,
            request_timeout,
        }
    }
}
