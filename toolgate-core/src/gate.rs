//! The security gate: authenticate, authorize, execute, audit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audit::{AuditLogger, LogAuditSink};
use crate::auth::{AuthDispatcher, AuthError, SCHEME_KEY, SCHEME_TOKEN};
use crate::executor::{CallContext, ExecutionError, ExecutionOutcome, ToolExecutor};
use crate::identity::Identity;
use crate::permission::{Authorizer, Decision, PermissionMap, PolicyHandle};
use crate::tool_call::ToolCall;

/// Subject recorded when no identity could be established.
pub const UNKNOWN_SUBJECT: &str = "unknown";

/// Why a request did not produce an outcome.
///
/// `Display` is the caller-facing text. Authentication detail is kept in
/// the wrapped [`AuthError`] and in the audit trail only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The credential was missing or rejected.
    #[error("authentication failed")]
    Unauthenticated(#[source] AuthError),

    /// The caller lacks the required permission.
    #[error("access denied: {permission} in namespace {namespace}")]
    Denied {
        permission: String,
        namespace: String,
    },

    /// The executor failed, was cancelled, or timed out.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl GateError {
    /// Returns true if authentication failed.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }

    /// Returns true if authorization denied the call.
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

/// One tool invocation as it arrives at the gate.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    pub call: ToolCall,
    pub cancellation: CancellationToken,
    pub timeout: Option<Duration>,
}

impl ToolRequest {
    pub fn new(authorization: Option<String>, call: ToolCall) -> Self {
        Self {
            authorization,
            call,
            cancellation: CancellationToken::new(),
            timeout: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Map a header scheme token to a registered scheme name.
///
/// Matching is case-insensitive.
pub fn scheme_for_header(token: &str) -> Option<&'static str> {
    if token.eq_ignore_ascii_case("bearer") {
        Some(SCHEME_TOKEN)
    } else if token.eq_ignore_ascii_case("apikey") {
        Some(SCHEME_KEY)
    } else {
        None
    }
}

/// Runs every tool call through authentication, authorization, execution
/// and audit, stopping at the first failure.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use serde_json::{json, Map, Value};
/// use toolgate_core::auth::{ApiKeyAuthenticator, AuthDispatcher, CredentialRecord, MemoryCredentialStore};
/// use toolgate_core::{CallContext, ExecutionError, ExecutionOutcome, SecurityGate, ToolCall, ToolExecutor, ToolRequest};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ToolExecutor for Echo {
///     async fn execute(&self, _ctx: &CallContext, tool: &str, _args: &Map<String, Value>)
///         -> Result<ExecutionOutcome, ExecutionError> {
///         Ok(ExecutionOutcome::success(tool, json!(null)))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let store = MemoryCredentialStore::new();
/// store.add("demo-admin-key", CredentialRecord::new("admin", "Admin", vec!["k8s:*".into()])).unwrap();
///
/// let gate = SecurityGate::builder(Arc::new(Echo))
///     .dispatcher(AuthDispatcher::new().with_authenticator("key", ApiKeyAuthenticator::new(Arc::new(store))))
///     .build();
///
/// let call = ToolCall::parse("k8s_list_pods", Map::new());
/// let request = ToolRequest::new(Some("ApiKey demo-admin-key".into()), call);
/// assert!(gate.handle(request).await.unwrap().success);
/// # });
/// ```
pub struct SecurityGate {
    dispatcher: AuthDispatcher,
    authorizer: Authorizer,
    permissions: PermissionMap,
    audit: AuditLogger,
    executor: Arc<dyn ToolExecutor>,
}

impl SecurityGate {
    /// Start building a gate around an executor.
    pub fn builder(executor: Arc<dyn ToolExecutor>) -> SecurityGateBuilder {
        SecurityGateBuilder::new(executor)
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Extract the credential from a header value and authenticate it.
    ///
    /// Every outcome is audited. Failures are recorded under subject
    /// `unknown` with the detailed reason.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        self.authenticate_with(&self.audit, header).await
    }

    async fn authenticate_with(
        &self,
        audit: &AuditLogger,
        header: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let (scheme, credential) = match parse_header(header) {
            Ok(parts) => parts,
            Err(err) => {
                audit.log_authentication(UNKNOWN_SUBJECT, "none", Some(&err.to_string()));
                return Err(err);
            }
        };

        let Some(scheme_name) = scheme_for_header(scheme) else {
            let err = AuthError::UnsupportedScheme(scheme.to_string());
            audit.log_authentication(UNKNOWN_SUBJECT, scheme, Some(&err.to_string()));
            return Err(err);
        };

        match self.dispatcher.authenticate(scheme_name, credential).await {
            Ok(identity) => {
                audit.log_authentication(&identity.subject, scheme_name, None);
                Ok(identity)
            }
            Err(err) => {
                audit.log_authentication(UNKNOWN_SUBJECT, scheme_name, Some(&err.to_string()));
                Err(err)
            }
        }
    }

    /// Check that `identity` may perform the call. Every outcome is audited.
    ///
    /// Returns the permission that was required.
    pub fn authorize(&self, identity: &Identity, call: &ToolCall) -> Result<String, GateError> {
        self.authorize_with(&self.audit, identity, call)
    }

    fn authorize_with(
        &self,
        audit: &AuditLogger,
        identity: &Identity,
        call: &ToolCall,
    ) -> Result<String, GateError> {
        let required = self
            .permissions
            .required_permission(&call.action, &call.resource);
        let decision = self
            .authorizer
            .check(&identity.permissions, &required, &call.namespace);

        audit.log_authorization(
            &identity.subject,
            &call.action,
            &call.resource,
            &call.namespace,
            &required,
            decision.is_granted(),
        );

        match decision {
            Decision::Granted { .. } => Ok(required),
            Decision::Denied {
                permission,
                namespace,
            } => Err(GateError::Denied {
                permission,
                namespace,
            }),
        }
    }

    /// Run a request through the whole pipeline.
    ///
    /// Every audit event of the request carries the same `request_id` in
    /// its metadata, which is also the executor's [`CallContext::request_id`].
    pub async fn handle(&self, request: ToolRequest) -> Result<ExecutionOutcome, GateError> {
        let ToolRequest {
            authorization,
            call,
            cancellation,
            timeout,
        } = request;

        let request_id = Uuid::new_v4().to_string();
        let audit = self.audit.for_request(&request_id);

        let identity = self
            .authenticate_with(&audit, authorization.as_deref())
            .await
            .map_err(GateError::Unauthenticated)?;
        self.authorize_with(&audit, &identity, &call)?;

        let mut ctx = CallContext::new(identity, request_id).with_cancellation(cancellation);
        if let Some(limit) = timeout {
            ctx = ctx.with_deadline(Instant::now() + limit);
        }

        let started = Instant::now();
        let result = self.execute(&ctx, &call, timeout).await;
        let error = match &result {
            Ok(outcome) if !outcome.success => Some(outcome.message.clone()),
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };

        audit.log_operation(
            &ctx.identity.subject,
            &call.tool,
            &call.action,
            &call.resource,
            &call.namespace,
            started.elapsed(),
            error.as_deref(),
        );

        result.map_err(GateError::from)
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        call: &ToolCall,
        timeout: Option<Duration>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let run = async {
            tokio::select! {
                biased;
                _ = ctx.cancellation.cancelled() => Err(ExecutionError::Cancelled),
                result = self.executor.execute(ctx, &call.tool, &call.arguments) => result,
            }
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .unwrap_or(Err(ExecutionError::TimedOut(limit))),
            None => run.await,
        }
    }
}

impl std::fmt::Debug for SecurityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityGate")
            .field("dispatcher", &self.dispatcher)
            .field("authorizer", &self.authorizer)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

/// Split `<scheme> <credential>` into its two parts.
fn parse_header(header: Option<&str>) -> Result<(&str, &str), AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(credential), None) => Ok((scheme, credential)),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Builder for [`SecurityGate`].
///
/// Defaults fail closed: no authenticators, an empty policy, the default
/// permission table and audit through the `log` facade.
pub struct SecurityGateBuilder {
    dispatcher: AuthDispatcher,
    authorizer: Option<Authorizer>,
    permissions: PermissionMap,
    audit: Option<AuditLogger>,
    executor: Arc<dyn ToolExecutor>,
}

impl SecurityGateBuilder {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            dispatcher: AuthDispatcher::new(),
            authorizer: None,
            permissions: PermissionMap::default(),
            audit: None,
            executor,
        }
    }

    pub fn dispatcher(mut self, dispatcher: AuthDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn authorizer(mut self, authorizer: Authorizer) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn permissions(mut self, permissions: PermissionMap) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn build(self) -> SecurityGate {
        SecurityGate {
            dispatcher: self.dispatcher,
            authorizer: self
                .authorizer
                .unwrap_or_else(|| Authorizer::new(Arc::new(PolicyHandle::default()))),
            permissions: self.permissions,
            audit: self
                .audit
                .unwrap_or_else(|| AuditLogger::new(Arc::new(LogAuditSink))),
            executor: self.executor,
        }
    }
}
