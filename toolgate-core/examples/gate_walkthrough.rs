//! Walk a few requests through a fully assembled gate.
//!
//! Run with: cargo run -p toolgate-core --example gate_walkthrough

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use toolgate_core::audit::{AuditLogger, WriterAuditSink};
use toolgate_core::auth::{
    ApiKeyAuthenticator, AuthDispatcher, CredentialRecord, MemoryCredentialStore,
    TokenAuthenticator, SCHEME_KEY, SCHEME_TOKEN,
};
use toolgate_core::permission::{Authorizer, Policy, PolicyHandle, Role};
use toolgate_core::{
    CallContext, ExecutionError, ExecutionOutcome, SecurityGate, ToolCall, ToolExecutor,
    ToolRequest,
};

struct EchoExecutor;

#[async_trait]
impl ToolExecutor for EchoExecutor {
    async fn execute(
        &self,
        ctx: &CallContext,
        tool: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        Ok(ExecutionOutcome::success(
            format!("{} ran for {}", tool, ctx.identity.subject),
            Value::Object(arguments.clone()),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryCredentialStore::new());
    store.add(
        "demo-admin-key-67890",
        CredentialRecord::new("admin-key", "Admin Key", vec!["k8s:*".into()]),
    )?;
    store.add(
        "demo-user-key-12345",
        CredentialRecord::new("user-key", "Developer Key", vec!["role:developer".into()]),
    )?;

    let policy = Policy::new(vec![Role::new(
        "developer",
        vec!["k8s:pods:list".into(), "k8s:pods:logs".into()],
    )
    .with_namespaces(vec!["staging".into()])])?;

    let tokens = TokenAuthenticator::new("walkthrough-secret-walkthrough-secret");
    let gate = SecurityGate::builder(Arc::new(EchoExecutor))
        .dispatcher(
            AuthDispatcher::new()
                .with_authenticator(SCHEME_KEY, ApiKeyAuthenticator::new(store))
                .with_authenticator(SCHEME_TOKEN, tokens.clone()),
        )
        .authorizer(Authorizer::new(Arc::new(PolicyHandle::new(policy))))
        .audit(AuditLogger::new(Arc::new(WriterAuditSink::stdout())))
        .build();

    let token = tokens.issue(
        "u-42",
        "alice",
        vec!["k8s:pods:*".into()],
        chrono::Duration::minutes(10),
    )?;

    let requests = [
        ("ApiKey demo-admin-key-67890".to_string(), "k8s_scale_deployment", "production"),
        ("ApiKey demo-user-key-12345".to_string(), "k8s_list_pods", "staging"),
        ("ApiKey demo-user-key-12345".to_string(), "k8s_list_pods", "production"),
        (format!("Bearer {}", token), "k8s_get_pod_logs", "default"),
        ("ApiKey wrong-key".to_string(), "k8s_list_pods", "default"),
    ];

    for (header, tool, namespace) in requests {
        let mut arguments = Map::new();
        arguments.insert("namespace".into(), json!(namespace));
        let call = ToolCall::parse(tool, arguments);
        let request = ToolRequest::new(Some(header), call);

        match gate.handle(request).await {
            Ok(outcome) => println!("-> ok: {}", outcome.message),
            Err(err) => println!("-> rejected: {}", err),
        }
    }

    Ok(())
}
