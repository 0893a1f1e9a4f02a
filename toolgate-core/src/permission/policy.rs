//! Role definitions and the policy document they are loaded from.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Namespace entry that admits every namespace.
pub const ANY_NAMESPACE: &str = "*";

/// Errors that can occur while loading a policy document.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The document could not be read.
    #[error("failed to read policy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error.
    #[error("invalid TOML policy: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error.
    #[error("invalid JSON policy: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error.
    #[error("invalid YAML policy: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file extension is not `.toml`, `.json`, `.yaml` or `.yml`.
    #[error("unsupported policy format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Two roles share a name.
    #[error("duplicate role: {0}")]
    DuplicateRole(String),

    /// A role has an empty name.
    #[error("role name must not be empty")]
    EmptyRoleName,
}

/// A named bundle of permissions, optionally limited to some namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Name used by role references.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Permission patterns granted by the role.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Namespaces the role applies in. Empty means all.
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl Role {
    /// Create a role that applies in every namespace.
    pub fn new(name: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            permissions,
            namespaces: Vec::new(),
        }
    }

    /// Restrict the role to the given namespaces.
    pub fn with_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check whether the role applies in `namespace`.
    pub fn allows_namespace(&self, namespace: &str) -> bool {
        self.namespaces.is_empty()
            || self
                .namespaces
                .iter()
                .any(|ns| ns == namespace || ns == ANY_NAMESPACE)
    }
}

/// A validated set of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    roles: Vec<Role>,
}

impl Policy {
    /// Build a policy from roles, rejecting empty or duplicate names.
    pub fn new(roles: Vec<Role>) -> Result<Self, PolicyError> {
        let mut seen = HashSet::new();
        for role in &roles {
            if role.name.trim().is_empty() {
                return Err(PolicyError::EmptyRoleName);
            }
            if !seen.insert(role.name.as_str()) {
                return Err(PolicyError::DuplicateRole(role.name.clone()));
            }
        }
        Ok(Self { roles })
    }

    /// Parse a TOML document with `[[roles]]` tables.
    pub fn from_toml_str(source: &str) -> Result<Self, PolicyError> {
        let raw: Policy = toml::from_str(source)?;
        Self::new(raw.roles)
    }

    /// Parse a JSON document of the form `{"roles": [...]}`.
    pub fn from_json_str(source: &str) -> Result<Self, PolicyError> {
        let raw: Policy = serde_json::from_str(source)?;
        Self::new(raw.roles)
    }

    /// Parse a YAML document with a top-level `roles:` list.
    pub fn from_yaml_str(source: &str) -> Result<Self, PolicyError> {
        let raw: Policy = serde_yaml::from_str(source)?;
        Self::new(raw.roles)
    }

    /// Load a policy file, choosing the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let parse: fn(&str) -> Result<Self, PolicyError> = match extension.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("json") => Self::from_json_str,
            Some("yaml" | "yml") => Self::from_yaml_str,
            _ => return Err(PolicyError::UnsupportedFormat(path.to_path_buf())),
        };

        let source = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let policy = parse(&source)?;
        log::info!(
            "loaded {} roles from {}",
            policy.roles.len(),
            path.display()
        );
        Ok(policy)
    }

    /// Look up a role by exact name.
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// All roles in document order.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

/// Shared, swappable policy.
///
/// Readers take a cheap snapshot; a replacement is visible to every check
/// that starts after it. Checks already running keep their snapshot.
#[derive(Debug, Default)]
pub struct PolicyHandle {
    current: RwLock<Arc<Policy>>,
}

impl PolicyHandle {
    pub fn new(policy: Policy) -> Self {
        Self {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// The policy in effect right now.
    pub fn snapshot(&self) -> Arc<Policy> {
        self.current.read().clone()
    }

    /// Swap in a new policy.
    pub fn replace(&self, policy: Policy) {
        *self.current.write() = Arc::new(policy);
    }

    /// Re-read the policy file and swap it in.
    ///
    /// On error the previous policy stays in effect.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<(), PolicyError> {
        let policy = Policy::load(path)?;
        self.replace(policy);
        Ok(())
    }
}
