//! Top-level error types for toolgate
//!
//! This module flattens the per-module errors into the categories callers
//! act on.

use thiserror::Error;

use crate::audit::AuditWriteError;
use crate::auth::{AuthError, StoreError};
use crate::executor::ExecutionError;
use crate::gate::GateError;
use crate::permission::PolicyError;

/// Top-level error type for toolgate operations
///
/// - [`Error::Auth`] - Credential missing, malformed or rejected
/// - [`Error::Denied`] - Authenticated but not permitted
/// - [`Error::Policy`] - Policy document could not be loaded
/// - [`Error::Execution`] - The downstream action failed
/// - [`Error::Store`] - Credential administration failed
/// - [`Error::Audit`] - Audit output failed
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication failed. Carries the detailed reason.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Authorization denied
    #[error("access denied: {0}")]
    Denied(String),

    /// Policy loading error
    #[error("policy error: {0}")]
    Policy(String),

    /// Action execution failed
    #[error("execution error: {0}")]
    Execution(String),

    /// Credential store error
    #[error("credential store error: {0}")]
    Store(String),

    /// Audit write error
    #[error("audit error: {0}")]
    Audit(String),
}

impl Error {
    /// Returns true if this is an authentication error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Returns true if authorization denied the request
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    /// Returns true if this is a policy error
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::Policy(_))
    }

    /// Returns true if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a credential store error
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is an audit error
    pub fn is_audit(&self) -> bool {
        matches!(self, Self::Audit(_))
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        Self::Auth(err.to_string())
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<PolicyError> for Error {
    fn from(err: PolicyError) -> Self {
        Self::Policy(err.to_string())
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        Self::Execution(err.to_string())
    }
}

impl From<AuditWriteError> for Error {
    fn from(err: AuditWriteError) -> Self {
        Self::Audit(err.to_string())
    }
}

impl From<GateError> for Error {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated(e) => e.into(),
            GateError::Denied {
                permission,
                namespace,
            } => Self::Denied(format!("{} in namespace {}", permission, namespace)),
            GateError::Execution(e) => e.into(),
        }
    }
}

/// Result type for toolgate operations
pub type Result<T> = std::result::Result<T, Error>;
