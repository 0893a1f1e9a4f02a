//! Held grant parsing and permission pattern matching.
//!
//! An identity's permission list mixes two kinds of entries: permission
//! patterns (`k8s:pods:list`, `k8s:pods:*`) and role references
//! (`role:developer`, or the bare `developer`). [`Grant::parse`] makes that
//! distinction once, so the engine never guesses from string shape.

use serde::{Deserialize, Serialize};

/// Suffix that turns a permission into a prefix wildcard.
pub const WILDCARD_SUFFIX: &str = ":*";

/// Explicit marker for role references.
pub const ROLE_PREFIX: &str = "role:";

/// One held permission entry, classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Grant {
    /// A permission pattern, possibly wildcard-suffixed.
    Permission(String),

    /// A reference to a role in the loaded policy.
    Role(String),
}

impl Grant {
    /// Classify a held entry.
    ///
    /// - `role:<name>` is always a role reference.
    /// - Any other entry containing `:` is a permission pattern.
    /// - A colon-free token is a role reference only when `bare_roles` is
    ///   true. Otherwise it is treated as a permission pattern, which in
    ///   practice matches only an identical required permission.
    ///
    /// Returns `None` for empty entries and for `role:` with no name.
    pub fn parse(entry: &str, bare_roles: bool) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }

        if let Some(name) = entry.strip_prefix(ROLE_PREFIX) {
            let name = name.trim();
            return (!name.is_empty()).then(|| Self::Role(name.to_string()));
        }

        if !entry.contains(':') && bare_roles {
            return Some(Self::Role(entry.to_string()));
        }

        Some(Self::Permission(entry.to_string()))
    }

    /// Returns true if this is a role reference.
    pub fn is_role(&self) -> bool {
        matches!(self, Self::Role(_))
    }

    /// The underlying permission pattern or role name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Permission(p) | Self::Role(p) => p,
        }
    }
}

impl std::fmt::Display for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permission(p) => write!(f, "{}", p),
            Self::Role(r) => write!(f, "{}{}", ROLE_PREFIX, r),
        }
    }
}

/// Returns true if `pattern` ends with the wildcard marker.
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.ends_with(WILDCARD_SUFFIX)
}

/// Check whether a wildcard pattern covers `required`.
///
/// `k8s:pods:*` covers every permission that starts with `k8s:pods:`, and
/// `k8s:*` covers the whole `k8s` domain. Non-wildcard patterns never match
/// here; exact equality is a separate step.
pub fn wildcard_matches(pattern: &str, required: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) if is_wildcard(pattern) => {
            required.len() > prefix.len() && required.starts_with(prefix)
        }
        _ => false,
    }
}
