//! The normalized result of a successful authentication.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An authenticated caller.
///
/// Built fresh by an [`Authenticator`](crate::auth::Authenticator) on every
/// successful call and dropped when the request finishes. `attributes` are
/// informational (key id, expiry, user id) and never feed authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Scheme that produced this identity (`"key"` or `"token"`).
    pub scheme: String,

    /// Human-readable identity label: key display name or token username.
    pub subject: String,

    /// Permission strings and role references, in the order they were granted.
    pub permissions: Vec<String>,

    /// Scheme-specific metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Identity {
    /// Create an identity with no attributes.
    pub fn new(
        scheme: impl Into<String>,
        subject: impl Into<String>,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            subject: subject.into(),
            permissions,
            attributes: Map::new(),
        }
    }

    /// Attach a metadata attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up a metadata attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
