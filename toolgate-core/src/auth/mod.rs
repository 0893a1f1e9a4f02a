//! Credential validation.
//!
//! This module turns raw credentials into an [`Identity`](crate::Identity).
//! Each credential scheme has its own [`Authenticator`], and the
//! [`AuthDispatcher`] routes a credential to the right one by scheme name.
//!
//! # Overview
//!
//! - **[`Authenticator`]**: Common interface for every scheme
//! - **[`AuthDispatcher`]**: Scheme name → authenticator routing
//! - **[`ApiKeyAuthenticator`]**: Opaque keys backed by a [`CredentialStore`]
//! - **[`TokenAuthenticator`]**: HMAC-signed self-contained tokens
//! - **[`MemoryCredentialStore`]**: In-process key store with constant-time lookup
//!
//! # Failure reporting
//!
//! Every failure is an [`AuthError`] that carries the precise reason (unknown
//! key, expired, bad signature, ...). That reason belongs in the audit trail
//! only. Callers that answer an unauthenticated client must use
//! [`AuthError::public_message`], which never says which check failed.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use toolgate_core::auth::{
//!     ApiKeyAuthenticator, AuthDispatcher, CredentialRecord, MemoryCredentialStore, SCHEME_KEY,
//! };
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryCredentialStore::new());
//! store
//!     .add("demo-admin-key", CredentialRecord::new("admin-key", "Admin Key", vec!["k8s:*".into()]))
//!     .unwrap();
//!
//! let dispatcher = AuthDispatcher::new()
//!     .with_authenticator(SCHEME_KEY, ApiKeyAuthenticator::new(store));
//!
//! let identity = dispatcher.authenticate(SCHEME_KEY, "demo-admin-key").await.unwrap();
//! assert_eq!(identity.subject, "Admin Key");
//! # });
//! ```

mod apikey;
mod authenticator;
mod store;
mod token;

pub use apikey::ApiKeyAuthenticator;
pub use authenticator::{AuthDispatcher, AuthError, Authenticator, SCHEME_KEY, SCHEME_TOKEN};
pub use store::{mask_key, CredentialRecord, CredentialStore, MemoryCredentialStore, StoreError};
pub use token::{SigningAlgorithm, TokenAuthenticator, TokenClaims, DEFAULT_ISSUER};
