//! The downstream action executor and the context it receives.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::identity::Identity;

/// Everything an executor knows about the caller and the request.
///
/// The identity is passed explicitly; executors never look it up from
/// ambient state.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// The authenticated caller.
    pub identity: Identity,

    /// Identifier of this request; recorded as `request_id` in the metadata
    /// of each of its audit events.
    pub request_id: String,

    /// Cancelled when the caller goes away.
    pub cancellation: CancellationToken,

    /// When the caller stops waiting, if it set a timeout.
    pub deadline: Option<Instant>,
}

impl CallContext {
    pub fn new(identity: Identity, request_id: impl Into<String>) -> Self {
        Self {
            identity,
            request_id: request_id.into(),
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Time left before the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// What an executor returns on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl ExecutionOutcome {
    /// A successful outcome.
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Errors from executing an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The executor reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The caller cancelled the request.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed.
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),
}

impl ExecutionError {
    /// Create a failure from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Runs an authorized action.
///
/// Implementations receive the caller's identity in the context and may
/// watch `ctx.cancellation` for early exit. The gate also enforces the
/// cancellation and deadline from outside.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: &CallContext,
        tool: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ExecutionOutcome, ExecutionError>;
}
