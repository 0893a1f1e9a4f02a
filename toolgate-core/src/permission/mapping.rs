//! Mapping from (action, resource) pairs to required permissions.

use std::collections::HashMap;

/// Domain used by the default table.
pub const DEFAULT_DOMAIN: &str = "k8s";

const DEFAULT_TABLE: &[(&str, &str, &str)] = &[
    ("list", "pods", "k8s:pods:list"),
    ("get_logs", "pods", "k8s:pods:logs"),
    ("logs", "pods", "k8s:pods:logs"),
    ("scale", "deployments", "k8s:deployments:scale"),
    ("restart", "pods", "k8s:pods:restart"),
    ("list", "services", "k8s:services:list"),
    ("list", "deployments", "k8s:deployments:list"),
];

/// Fixed table of required permissions.
///
/// Pairs without an entry fall back to `<domain>:<resource>:<action>`.
#[derive(Debug, Clone)]
pub struct PermissionMap {
    domain: String,
    table: HashMap<(String, String), String>,
}

impl PermissionMap {
    /// Create an empty map for a domain.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            table: HashMap::new(),
        }
    }

    /// Add or replace an entry.
    pub fn with_mapping(
        mut self,
        action: impl Into<String>,
        resource: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        self.table
            .insert((action.into(), resource.into()), permission.into());
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The permission required to perform `action` on `resource`.
    pub fn required_permission(&self, action: &str, resource: &str) -> String {
        self.table
            .get(&(action.to_string(), resource.to_string()))
            .cloned()
            .unwrap_or_else(|| format!("{}:{}:{}", self.domain, resource, action))
    }
}

impl Default for PermissionMap {
    fn default() -> Self {
        DEFAULT_TABLE
            .iter()
            .fold(Self::new(DEFAULT_DOMAIN), |map, (action, resource, perm)| {
                map.with_mapping(*action, *resource, *perm)
            })
    }
}
