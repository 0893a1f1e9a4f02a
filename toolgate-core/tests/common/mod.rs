//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use toolgate_core::audit::{AuditLogger, MemoryAuditSink};
use toolgate_core::auth::{
    ApiKeyAuthenticator, AuthDispatcher, CredentialRecord, MemoryCredentialStore,
    TokenAuthenticator, SCHEME_KEY, SCHEME_TOKEN,
};
use toolgate_core::permission::{Authorizer, Policy, PolicyHandle, Role};
use toolgate_core::{
    CallContext, ExecutionError, ExecutionOutcome, SecurityGate, ToolCall, ToolExecutor,
};

pub const TOKEN_SECRET: &str = "integration-test-secret-0123456789abcdef";

// ===== Counting Executor =====

/// An executor that counts invocations and echoes the caller.
#[derive(Default)]
pub struct CountingExecutor {
    calls: AtomicUsize,
}

impl CountingExecutor {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolExecutor for CountingExecutor {
    async fn execute(
        &self,
        ctx: &CallContext,
        tool: &str,
        _arguments: &Map<String, Value>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionOutcome::success(
            format!("{} ok", tool),
            json!({ "caller": ctx.identity.subject }),
        ))
    }
}

// ===== Gate Fixture =====

pub struct Harness {
    pub gate: SecurityGate,
    pub store: Arc<MemoryCredentialStore>,
    pub tokens: TokenAuthenticator,
    pub executor: Arc<CountingExecutor>,
    pub sink: Arc<MemoryAuditSink>,
}

/// The demo roles: an unrestricted admin and a staging-only developer.
pub fn demo_policy() -> Policy {
    Policy::new(vec![
        Role::new("admin", vec!["k8s:*".into()]),
        Role::new("developer", vec!["k8s:pods:list".into()])
            .with_namespaces(vec!["staging".into()]),
    ])
    .unwrap()
}

/// A gate with both schemes registered and the demo keys loaded.
pub fn harness() -> Harness {
    let store = Arc::new(MemoryCredentialStore::new());
    store
        .add(
            "demo-admin-key",
            CredentialRecord::new("admin-key", "Admin Key", vec!["k8s:*".into()]),
        )
        .unwrap();
    store
        .add(
            "demo-dev-key",
            CredentialRecord::new("dev-key", "Developer Key", vec!["developer".into()]),
        )
        .unwrap();

    let tokens = TokenAuthenticator::new(TOKEN_SECRET);
    let dispatcher = AuthDispatcher::new()
        .with_authenticator(SCHEME_KEY, ApiKeyAuthenticator::new(store.clone()))
        .with_authenticator(SCHEME_TOKEN, tokens.clone());

    let executor = Arc::new(CountingExecutor::default());
    let sink = Arc::new(MemoryAuditSink::new());
    let gate = SecurityGate::builder(executor.clone())
        .dispatcher(dispatcher)
        .authorizer(Authorizer::new(Arc::new(PolicyHandle::new(demo_policy()))))
        .audit(AuditLogger::new(sink.clone()))
        .build();

    Harness {
        gate,
        store,
        tokens,
        executor,
        sink,
    }
}

/// A `k8s_list_pods` call in `namespace`.
pub fn list_pods_in(namespace: &str) -> ToolCall {
    let mut arguments = Map::new();
    arguments.insert("namespace".into(), json!(namespace));
    ToolCall::parse("k8s_list_pods", arguments)
}
