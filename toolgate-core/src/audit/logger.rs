//! The audit logger that every request stage reports through.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::event::{AuditEvent, AuditResult, EventType};
use super::sink::AuditSink;

/// Records audit events to a sink.
///
/// Recording never fails the caller. A write error is logged and the event
/// is dropped.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    request_id: Option<Arc<str>>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            request_id: None,
        }
    }

    /// A logger on the same sink that tags every event with `request_id`
    /// in its metadata.
    pub fn for_request(&self, request_id: &str) -> Self {
        Self {
            sink: self.sink.clone(),
            request_id: Some(Arc::from(request_id)),
        }
    }

    /// The request this logger is scoped to, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Fill in the timestamp and event id if missing, then write.
    pub fn record(&self, mut event: AuditEvent) {
        if let Some(id) = &self.request_id {
            event
                .metadata
                .entry("request_id")
                .or_insert_with(|| id.as_ref().into());
        }
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }
        if event.event_id.as_deref().map_or(true, str::is_empty) {
            event.event_id = Some(Uuid::new_v4().to_string());
        }

        if let Err(e) = self.sink.write(&event) {
            log::error!(
                "failed to write {:?} audit event for {}: {}",
                event.event_type,
                event.subject,
                e
            );
        }
    }

    /// Record an authentication attempt. `error` carries the detailed reason
    /// on failure.
    pub fn log_authentication(&self, subject: &str, scheme: &str, error: Option<&str>) {
        let result = match error {
            None => AuditResult::Success,
            Some(_) => AuditResult::Failure,
        };
        let mut event = AuditEvent::new(EventType::Authentication, subject, "authenticate", result)
            .with_metadata("auth_type", scheme);
        if let Some(message) = error {
            event = event.with_error(message);
        }
        self.record(event);
    }

    /// Record an authorization decision.
    pub fn log_authorization(
        &self,
        subject: &str,
        action: &str,
        resource: &str,
        namespace: &str,
        permission: &str,
        granted: bool,
    ) {
        let result = if granted {
            AuditResult::Granted
        } else {
            AuditResult::Denied
        };
        let event = AuditEvent::new(EventType::Authorization, subject, action, result)
            .with_resource(resource)
            .with_namespace(namespace)
            .with_metadata("permission_check", true)
            .with_metadata("permission", permission);
        self.record(event);
    }

    /// Record a completed operation.
    #[allow(clippy::too_many_arguments)]
    pub fn log_operation(
        &self,
        subject: &str,
        tool: &str,
        action: &str,
        resource: &str,
        namespace: &str,
        duration: Duration,
        error: Option<&str>,
    ) {
        let result = match error {
            None => AuditResult::Success,
            Some(_) => AuditResult::Failure,
        };
        let mut event = AuditEvent::new(EventType::Operation, subject, action, result)
            .with_resource(resource)
            .with_namespace(namespace)
            .with_duration(duration)
            .with_metadata("tool", tool);
        if let Some(message) = error {
            event = event.with_error(message);
        }
        self.record(event);
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
