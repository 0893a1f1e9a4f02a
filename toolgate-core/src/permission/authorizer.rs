//! Permission checks against held grants and the role policy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::grant::{wildcard_matches, Grant};
use super::policy::{Policy, PolicyHandle};

/// Default reserved permission that matches everything.
pub const SUPERUSER_PERMISSION: &str = "*";

/// How a granted check was satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum GrantSource {
    /// A held permission equals the required one.
    Direct { permission: String },

    /// A held wildcard pattern covers the required permission.
    Wildcard { pattern: String },

    /// The superuser permission is held.
    Superuser,

    /// A role's permission matched and the role applies in the namespace.
    Role { role: String, permission: String },
}

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The permission is held.
    Granted {
        /// What satisfied the check.
        source: GrantSource,
    },

    /// Nothing held covers the permission in this namespace.
    Denied {
        /// The permission that was required.
        permission: String,
        /// The namespace the request targeted.
        namespace: String,
    },
}

impl Decision {
    /// Check if the permission was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted { .. })
    }

    /// Check if the permission was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Denied { .. })
    }

    /// Denial reason, or `None` when granted.
    pub fn reason(&self) -> Option<String> {
        match self {
            Decision::Granted { .. } => None,
            Decision::Denied {
                permission,
                namespace,
            } => Some(format!(
                "permission denied: {} in namespace {}",
                permission, namespace
            )),
        }
    }
}

/// Evaluates whether a set of held grants covers a required permission.
///
/// The order is: exact match over every held permission, then wildcard
/// match, then the superuser permission, then role resolution. Direct
/// permissions are not namespace-scoped; role permissions apply only in the
/// role's namespaces.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use toolgate_core::permission::{Authorizer, Policy, PolicyHandle, Role};
///
/// let policy = Policy::new(vec![
///     Role::new("developer", vec!["k8s:pods:list".into()])
///         .with_namespaces(vec!["staging".into()]),
/// ])
/// .unwrap();
/// let authorizer = Authorizer::new(Arc::new(PolicyHandle::new(policy)));
///
/// let held = vec!["role:developer".to_string()];
/// assert!(authorizer.check(&held, "k8s:pods:list", "staging").is_granted());
/// assert!(authorizer.check(&held, "k8s:pods:list", "default").is_denied());
/// ```
#[derive(Debug, Clone)]
pub struct Authorizer {
    policy: Arc<PolicyHandle>,
    superuser: String,
    strict_role_references: bool,
}

impl Authorizer {
    /// Create an authorizer over a shared policy.
    pub fn new(policy: Arc<PolicyHandle>) -> Self {
        Self {
            policy,
            superuser: SUPERUSER_PERMISSION.to_string(),
            strict_role_references: false,
        }
    }

    /// Use a different reserved superuser permission.
    pub fn with_superuser(mut self, permission: impl Into<String>) -> Self {
        self.superuser = permission.into();
        self
    }

    /// Only accept `role:<name>` as a role reference.
    ///
    /// When enabled, bare colon-free entries are treated as permission
    /// strings and never resolve to roles.
    pub fn strict_role_references(mut self, strict: bool) -> Self {
        self.strict_role_references = strict;
        self
    }

    /// The policy handle this authorizer reads.
    pub fn policy(&self) -> &Arc<PolicyHandle> {
        &self.policy
    }

    /// Check whether `held` covers `required` in `namespace`.
    ///
    /// The check is pure: repeated calls with the same arguments and the
    /// same policy return the same decision.
    pub fn check(&self, held: &[String], required: &str, namespace: &str) -> Decision {
        let grants: Vec<Grant> = held.iter().filter_map(|entry| self.classify(entry)).collect();

        let policy = self.policy.snapshot();
        let decision = match self.evaluate(&grants, &policy, required, namespace) {
            Some(source) => Decision::Granted { source },
            None => Decision::Denied {
                permission: required.to_string(),
                namespace: namespace.to_string(),
            },
        };

        match &decision {
            Decision::Granted { source } => {
                log::debug!(
                    "granted {} in namespace {} via {:?}",
                    required,
                    namespace,
                    source
                );
            }
            Decision::Denied { .. } => {
                log::warn!(
                    "denied {} in namespace {} ({} grants held)",
                    required,
                    namespace,
                    grants.len()
                );
            }
        }
        decision
    }

    /// The superuser entry is always a permission, even when colon-free
    /// entries are otherwise read as role references.
    fn classify(&self, entry: &str) -> Option<Grant> {
        if entry.trim() == self.superuser {
            return Some(Grant::Permission(self.superuser.clone()));
        }
        Grant::parse(entry, !self.strict_role_references)
    }

    fn evaluate(
        &self,
        grants: &[Grant],
        policy: &Policy,
        required: &str,
        namespace: &str,
    ) -> Option<GrantSource> {
        let direct: Vec<&str> = grants
            .iter()
            .filter_map(|g| match g {
                Grant::Permission(p) => Some(p.as_str()),
                Grant::Role(_) => None,
            })
            .collect();

        if let Some(source) = self.match_permissions(&direct, required) {
            return Some(source);
        }

        for grant in grants {
            let Grant::Role(name) = grant else {
                continue;
            };
            // Unknown roles grant nothing
            let Some(role) = policy.role(name) else {
                continue;
            };
            let permissions: Vec<&str> = role.permissions.iter().map(String::as_str).collect();
            let Some(matched) = self.match_permissions(&permissions, required) else {
                continue;
            };
            if !role.allows_namespace(namespace) {
                continue;
            }

            let permission = match matched {
                GrantSource::Direct { permission } => permission,
                GrantSource::Wildcard { pattern } => pattern,
                GrantSource::Superuser => self.superuser.clone(),
                GrantSource::Role { permission, .. } => permission,
            };
            return Some(GrantSource::Role {
                role: role.name.clone(),
                permission,
            });
        }

        None
    }

    /// Exact, then wildcard, then superuser, each over the whole list.
    fn match_permissions(&self, held: &[&str], required: &str) -> Option<GrantSource> {
        if let Some(p) = held.iter().find(|p| **p == required) {
            return Some(GrantSource::Direct {
                permission: p.to_string(),
            });
        }
        if let Some(p) = held.iter().find(|p| wildcard_matches(p, required)) {
            return Some(GrantSource::Wildcard {
                pattern: p.to_string(),
            });
        }
        if held.iter().any(|p| *p == self.superuser) {
            return Some(GrantSource::Superuser);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Role;

    fn authorizer_with(roles: Vec<Role>) -> Authorizer {
        let policy = Policy::new(roles).unwrap();
        Authorizer::new(Arc::new(PolicyHandle::new(policy)))
    }

    fn held(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    fn developer() -> Role {
        Role::new("developer", vec!["k8s:pods:list".into()])
            .with_namespaces(vec!["staging".into()])
    }

    // ===== Direct Permission Tests =====

    #[test]
    fn test_exact_match() {
        let auth = authorizer_with(vec![]);
        let decision = auth.check(&held(&["k8s:pods:list"]), "k8s:pods:list", "default");
        assert_eq!(
            decision,
            Decision::Granted {
                source: GrantSource::Direct {
                    permission: "k8s:pods:list".into()
                }
            }
        );
    }

    #[test]
    fn test_exact_match_beats_wildcard() {
        let auth = authorizer_with(vec![]);
        let decision = auth.check(
            &held(&["k8s:*", "k8s:pods:list"]),
            "k8s:pods:list",
            "default",
        );
        assert!(matches!(
            decision,
            Decision::Granted {
                source: GrantSource::Direct { .. }
            }
        ));
    }

    #[test]
    fn test_wildcard_prefix() {
        let auth = authorizer_with(vec![]);
        for p in ["k8s", "k8s:pods", "app:deploy"] {
            let pattern = format!("{}:*", p);
            let granted = auth.check(&held(&[pattern.as_str()]), &format!("{}:x", p), "default");
            assert!(granted.is_granted(), "{} should cover {}:x", pattern, p);

            let denied = auth.check(&held(&[pattern.as_str()]), "other:x", "default");
            assert!(denied.is_denied(), "{} must not cover other:x", pattern);
        }
    }

    #[test]
    fn test_superuser() {
        let auth = authorizer_with(vec![]);
        let decision = auth.check(&held(&["*"]), "anything:at:all", "kube-system");
        assert_eq!(
            decision,
            Decision::Granted {
                source: GrantSource::Superuser
            }
        );

        let custom = authorizer_with(vec![]).with_superuser("admin:all");
        assert!(custom.check(&held(&["admin:all"]), "x:y", "ns").is_granted());
        assert!(custom.check(&held(&["*"]), "x:y", "ns").is_denied());
    }

    #[test]
    fn test_superuser_is_never_a_bare_role() {
        // A role with the superuser's name must not shadow the grant
        let auth = authorizer_with(vec![Role::new("*", vec![]), Role::new("root", vec![])]);
        assert!(auth.check(&held(&["*"]), "k8s:pods:list", "default").is_granted());
        assert!(auth
            .clone()
            .strict_role_references(true)
            .check(&held(&["*"]), "k8s:pods:list", "default")
            .is_granted());

        let custom = auth.with_superuser("root");
        assert_eq!(
            custom.check(&held(&[" root "]), "k8s:secrets:manage", "prod"),
            Decision::Granted {
                source: GrantSource::Superuser
            }
        );
        // Other bare tokens still resolve as roles
        assert!(custom.check(&held(&["*"]), "k8s:pods:list", "default").is_denied());
    }

    #[test]
    fn test_empty_held_always_denied() {
        let auth = authorizer_with(vec![developer()]);
        let decision = auth.check(&[], "k8s:pods:list", "staging");
        assert_eq!(
            decision.reason().unwrap(),
            "permission denied: k8s:pods:list in namespace staging"
        );
    }

    #[test]
    fn test_direct_permissions_ignore_namespace() {
        let auth = authorizer_with(vec![]);
        assert!(auth
            .check(&held(&["k8s:pods:list"]), "k8s:pods:list", "kube-system")
            .is_granted());
    }

    // ===== Role Tests =====

    #[test]
    fn test_role_grants_in_namespace() {
        let auth = authorizer_with(vec![developer()]);
        let decision = auth.check(&held(&["role:developer"]), "k8s:pods:list", "staging");
        assert_eq!(
            decision,
            Decision::Granted {
                source: GrantSource::Role {
                    role: "developer".into(),
                    permission: "k8s:pods:list".into()
                }
            }
        );
    }

    #[test]
    fn test_namespace_gate_denies_outside_list() {
        let auth = authorizer_with(vec![developer()]);
        let decision = auth.check(&held(&["developer"]), "k8s:pods:list", "default");
        assert_eq!(
            decision,
            Decision::Denied {
                permission: "k8s:pods:list".into(),
                namespace: "default".into()
            }
        );
    }

    #[test]
    fn test_namespace_gate_continues_to_next_role() {
        let auth = authorizer_with(vec![
            developer(),
            Role::new("reader", vec!["k8s:pods:*".into()]),
        ]);
        let decision = auth.check(
            &held(&["role:developer", "role:reader"]),
            "k8s:pods:list",
            "default",
        );
        assert!(matches!(
            decision,
            Decision::Granted {
                source: GrantSource::Role { ref role, ref permission }
            } if role == "reader" && permission == "k8s:pods:*"
        ));
    }

    #[test]
    fn test_role_wildcard_namespace() {
        let auth = authorizer_with(vec![Role::new("ops", vec!["k8s:*".into()])
            .with_namespaces(vec!["*".into()])]);
        assert!(auth
            .check(&held(&["role:ops"]), "k8s:deployments:scale", "prod")
            .is_granted());
    }

    #[test]
    fn test_unknown_role_skipped() {
        let auth = authorizer_with(vec![developer()]);
        let decision = auth.check(
            &held(&["role:ghost", "role:developer"]),
            "k8s:pods:list",
            "staging",
        );
        assert!(decision.is_granted());
        assert!(auth
            .check(&held(&["role:ghost"]), "k8s:pods:list", "staging")
            .is_denied());
    }

    #[test]
    fn test_strict_role_references() {
        let auth = authorizer_with(vec![developer()]).strict_role_references(true);
        assert!(auth
            .check(&held(&["developer"]), "k8s:pods:list", "staging")
            .is_denied());
        assert!(auth
            .check(&held(&["role:developer"]), "k8s:pods:list", "staging")
            .is_granted());
    }

    #[test]
    fn test_check_is_idempotent() {
        let auth = authorizer_with(vec![developer()]);
        let entries = held(&["developer", "k8s:services:*"]);
        for (required, ns) in [
            ("k8s:pods:list", "staging"),
            ("k8s:pods:list", "default"),
            ("k8s:services:list", "default"),
        ] {
            let first = auth.check(&entries, required, ns);
            let second = auth.check(&entries, required, ns);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_policy_replace_visible_to_next_check() {
        let auth = authorizer_with(vec![]);
        let entries = held(&["role:developer"]);
        assert!(auth.check(&entries, "k8s:pods:list", "staging").is_denied());

        auth.policy()
            .replace(Policy::new(vec![developer()]).unwrap());
        assert!(auth.check(&entries, "k8s:pods:list", "staging").is_granted());
    }
}
