//! Permission policy and the authorization engine.
//!
//! # Overview
//!
//! - **[`Grant`]**: A held entry, classified as a permission pattern or a role reference
//! - **[`Role`]** / **[`Policy`]**: Named permission bundles, optionally namespace-scoped
//! - **[`PolicyHandle`]**: Shared policy that can be swapped at runtime
//! - **[`Authorizer`]**: Decides whether held grants cover a required permission
//! - **[`PermissionMap`]**: Maps (action, resource) to the required permission
//!
//! # Permission strings
//!
//! | Held | Covers |
//! |------|--------|
//! | `k8s:pods:list` | Exactly `k8s:pods:list` |
//! | `k8s:pods:*` | Every `k8s:pods:` permission |
//! | `k8s:*` | The whole `k8s` domain |
//! | `*` | Everything (superuser) |
//! | `role:developer` | Whatever `developer` grants, in its namespaces |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use toolgate_core::permission::{Authorizer, PermissionMap, PolicyHandle};
//!
//! let authorizer = Authorizer::new(Arc::new(PolicyHandle::default()));
//! let required = PermissionMap::default().required_permission("list", "pods");
//!
//! let held = vec!["k8s:*".to_string()];
//! assert!(authorizer.check(&held, &required, "default").is_granted());
//! ```

mod authorizer;
mod grant;
mod mapping;
mod policy;

pub use authorizer::{Authorizer, Decision, GrantSource, SUPERUSER_PERMISSION};
pub use grant::{is_wildcard, wildcard_matches, Grant, ROLE_PREFIX, WILDCARD_SUFFIX};
pub use mapping::{PermissionMap, DEFAULT_DOMAIN};
pub use policy::{Policy, PolicyError, PolicyHandle, Role, ANY_NAMESPACE};
