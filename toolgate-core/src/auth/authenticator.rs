//! The authenticator interface and scheme dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::identity::Identity;

/// Scheme name for opaque API keys.
pub const SCHEME_KEY: &str = "key";

/// Scheme name for signed tokens.
pub const SCHEME_TOKEN: &str = "token";

/// Message returned to callers for every authentication failure.
const PUBLIC_MESSAGE: &str = "authentication failed";

/// Why an authentication attempt failed.
///
/// The `Display` output is the detailed reason and is meant for the audit
/// trail. Use [`AuthError::public_message`] for anything sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential header was supplied.
    #[error("missing authorization header")]
    MissingHeader,

    /// The header was not `<scheme> <credential>`.
    #[error("malformed header")]
    MalformedHeader,

    /// No authenticator is registered for the scheme.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The credential matched nothing in the store.
    #[error("unknown credential")]
    UnknownCredential,

    /// The credential was recognized but has expired.
    #[error("expired")]
    Expired,

    /// The token's not-before time is in the future.
    #[error("not yet valid")]
    NotYetValid,

    /// The token could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token signature did not verify.
    #[error("invalid signature")]
    BadSignature,

    /// The token header names an algorithm outside the HMAC family.
    #[error("unexpected signing algorithm: {0}")]
    AlgorithmMismatch(String),

    /// Internal failure while checking the credential.
    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The caller-facing message. Identical for every variant.
    pub fn public_message(&self) -> &'static str {
        PUBLIC_MESSAGE
    }

    /// Returns true if the credential was recognized but is past its expiry.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Turns a raw credential into an [`Identity`].
///
/// One implementation exists per credential scheme. Implementations must
/// fail closed: any doubt about the credential is an error.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Validate the credential and build the caller's identity.
    async fn authenticate(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Routes a credential to the authenticator registered for its scheme.
///
/// The dispatcher holds no logic beyond lookup-and-delegate. An unknown
/// scheme is reported as [`AuthError::UnsupportedScheme`] rather than being
/// folded into a generic denial.
#[derive(Clone, Default)]
pub struct AuthDispatcher {
    authenticators: HashMap<String, Arc<dyn Authenticator>>,
}

impl AuthDispatcher {
    /// Create a dispatcher with no schemes registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticator for a scheme name (builder style).
    pub fn with_authenticator(
        mut self,
        scheme: impl Into<String>,
        authenticator: impl Authenticator + 'static,
    ) -> Self {
        self.register(scheme, Arc::new(authenticator));
        self
    }

    /// Register a shared authenticator for a scheme name.
    ///
    /// Replaces any authenticator previously registered under the same name.
    pub fn register(&mut self, scheme: impl Into<String>, authenticator: Arc<dyn Authenticator>) {
        self.authenticators.insert(scheme.into(), authenticator);
    }

    /// Authenticate a credential using the named scheme.
    pub async fn authenticate(&self, scheme: &str, credential: &str) -> Result<Identity, AuthError> {
        let authenticator = self
            .authenticators
            .get(scheme)
            .ok_or_else(|| AuthError::UnsupportedScheme(scheme.to_string()))?;

        authenticator.authenticate(credential).await
    }

    /// Returns true if a scheme is registered.
    pub fn supports(&self, scheme: &str) -> bool {
        self.authenticators.contains_key(scheme)
    }

    /// Registered scheme names, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.authenticators.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl std::fmt::Debug for AuthDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthDispatcher")
            .field("schemes", &self.schemes())
            .finish()
    }
}
