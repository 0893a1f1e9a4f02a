//! Audit event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stage of the request an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A credential was checked.
    Authentication,
    /// A permission was checked.
    Authorization,
    /// An action was executed.
    Operation,
}

/// Outcome recorded on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure,
    Granted,
    Denied,
}

/// One structured audit record.
///
/// `timestamp` and `event_id` are filled in by [`AuditLogger::record`] when
/// left empty. Empty namespace, error and metadata are omitted from the
/// serialized line.
///
/// [`AuditLogger::record`]: super::AuditLogger::record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    pub event_type: EventType,

    /// Who acted. `unknown` when no identity could be established.
    #[serde(rename = "user")]
    pub subject: String,

    pub action: String,

    #[serde(default)]
    pub resource: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    pub result: AuditResult,

    /// Detailed failure reason. Never sent to callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    #[serde(default)]
    pub duration_ms: u64,
}

impl AuditEvent {
    /// Create an event with the required fields.
    pub fn new(
        event_type: EventType,
        subject: impl Into<String>,
        action: impl Into<String>,
        result: AuditResult,
    ) -> Self {
        Self {
            timestamp: None,
            event_id: None,
            event_type,
            subject: subject.into(),
            action: action.into(),
            resource: String::new(),
            namespace: None,
            result,
            error_message: None,
            metadata: Map::new(),
            duration_ms: 0,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Set the namespace. An empty string leaves it unset.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Serialized form of an event: the event fields plus `"audit": true`.
#[derive(Serialize)]
pub(crate) struct AuditLine<'a> {
    audit: bool,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

impl<'a> AuditLine<'a> {
    pub(crate) fn new(event: &'a AuditEvent) -> Self {
        Self { audit: true, event }
    }
}
