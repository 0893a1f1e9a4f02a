//! # Toolgate
//!
//! An authentication, authorization and audit gate for servers that run
//! tool calls on behalf of remote callers.
//!
//! Every call passes through the same pipeline, and stops at the first
//! failure:
//!
//! ```text
//! Authorization header ─▶ authenticate ─▶ authorize ─▶ execute ─▶ audit
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use toolgate_core::auth::{ApiKeyAuthenticator, AuthDispatcher, MemoryCredentialStore, SCHEME_KEY};
//! use toolgate_core::permission::{Authorizer, Policy, PolicyHandle};
//! use toolgate_core::{SecurityGate, ToolCall, ToolRequest};
//!
//! let store = Arc::new(MemoryCredentialStore::new());
//! let policy = Arc::new(PolicyHandle::new(Policy::load("policy.toml")?));
//!
//! let gate = SecurityGate::builder(Arc::new(MyExecutor))
//!     .dispatcher(AuthDispatcher::new().with_authenticator(SCHEME_KEY, ApiKeyAuthenticator::new(store)))
//!     .authorizer(Authorizer::new(policy))
//!     .build();
//!
//! let call = ToolCall::parse("k8s_list_pods", arguments);
//! let outcome = gate.handle(ToolRequest::new(Some(header), call)).await?;
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - Credential stores, opaque keys, signed tokens, scheme dispatch
//! - [`permission`] - Roles, policy documents and the authorization engine
//! - [`audit`] - Structured audit events and sinks
//! - [`gate`] - The orchestrator tying the stages together
//!
//! ## Feature Flags
//!
//! - `test-utils` - Mock executor and audit sinks for downstream tests

pub mod audit;
pub mod auth;
pub mod error;
pub mod executor;
pub mod gate;
pub mod identity;
pub mod permission;
pub mod tool_call;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use audit::{AuditEvent, AuditLogger, AuditResult, AuditSink, EventType};
pub use auth::{AuthDispatcher, AuthError, Authenticator};
pub use error::{Error, Result};
pub use executor::{CallContext, ExecutionError, ExecutionOutcome, ToolExecutor};
pub use gate::{GateError, SecurityGate, SecurityGateBuilder, ToolRequest};
pub use identity::Identity;
pub use permission::{Authorizer, Decision, PermissionMap, Policy, PolicyHandle, Role};
pub use tool_call::ToolCall;
