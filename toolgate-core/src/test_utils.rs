//! Test utilities for toolgate-core.
//!
//! Enable with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! toolgate-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use toolgate_core::test_utils::MockExecutor;
//! use toolgate_core::SecurityGate;
//!
//! let executor = MockExecutor::new();
//! let gate = SecurityGate::builder(Arc::new(executor.clone())).build();
//! assert!(executor.calls().is_empty());
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use crate::audit::{AuditEvent, AuditSink, AuditWriteError};
use crate::executor::{CallContext, ExecutionError, ExecutionOutcome, ToolExecutor};

pub use crate::audit::MemoryAuditSink;

/// One invocation seen by [`MockExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub subject: String,
    pub request_id: String,
    pub tool: String,
    pub arguments: Map<String, Value>,
}

/// An executor that records calls and returns a canned result.
///
/// Clones share the same call log.
#[derive(Clone, Default)]
pub struct MockExecutor {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MockExecutor {
    /// Succeeds with `{"tool": <name>}` as data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every call with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ToolExecutor for MockExecutor {
    async fn execute(
        &self,
        ctx: &CallContext,
        tool: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        self.calls.lock().push(RecordedCall {
            subject: ctx.identity.subject.clone(),
            request_id: ctx.request_id.clone(),
            tool: tool.to_string(),
            arguments: arguments.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(message) => Err(ExecutionError::failed(message.clone())),
            None => Ok(ExecutionOutcome::success(
                format!("{} completed", tool),
                json!({ "tool": tool }),
            )),
        }
    }
}

/// A sink whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn write(&self, _event: &AuditEvent) -> Result<(), AuditWriteError> {
        Err(AuditWriteError::Io(std::io::Error::other("disk full")))
    }
}
