//! Integration tests for toolgate-server.
//!
//! These tests drive the full request → gate → executor → audit flow
//! through the axum router.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use toolgate_core::audit::{AuditLogger, AuditResult, EventType, MemoryAuditSink};
use toolgate_core::auth::{
    ApiKeyAuthenticator, AuthDispatcher, CredentialRecord, MemoryCredentialStore,
    TokenAuthenticator, SCHEME_KEY, SCHEME_TOKEN,
};
use toolgate_core::permission::{Authorizer, Policy, PolicyHandle, Role};
use toolgate_core::test_utils::MockExecutor;
use toolgate_core::SecurityGate;
use toolgate_server::GateRouter;
use tower::ServiceExt;

const SECRET: &str = "server-integration-secret-0123456789";

struct TestApp {
    app: Router,
    executor: MockExecutor,
    sink: Arc<MemoryAuditSink>,
    tokens: TokenAuthenticator,
}

fn build_app(executor: MockExecutor, timeout: Option<Duration>) -> TestApp {
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
            CredentialRecord::new("dev-key", "Developer Key", vec!["role:developer".into()]),
        )
        .unwrap();

    let policy = Policy::new(vec![Role::new("developer", vec!["k8s:pods:list".into()])
        .with_namespaces(vec!["staging".into()])])
    .unwrap();

    let tokens = TokenAuthenticator::new(SECRET);
    let sink = Arc::new(MemoryAuditSink::new());
    let gate = SecurityGate::builder(Arc::new(executor.clone()))
        .dispatcher(
            AuthDispatcher::new()
                .with_authenticator(SCHEME_KEY, ApiKeyAuthenticator::new(store))
                .with_authenticator(SCHEME_TOKEN, tokens.clone()),
        )
        .authorizer(Authorizer::new(Arc::new(PolicyHandle::new(policy))))
        .audit(AuditLogger::new(sink.clone()))
        .build();

    let mut router = GateRouter::new(gate);
    if let Some(timeout) = timeout {
        router = router.request_timeout(timeout);
    }

    TestApp {
        app: router.build().unwrap(),
        executor,
        sink,
        tokens,
    }
}

fn tool_request(tool: &str, authorization: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/tools/{}", tool))
        .header("Content-Type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_admin_key_executes_tool() {
    let t = build_app(MockExecutor::new(), None);

    let response = t
        .app
        .oneshot(tool_request(
            "k8s_list_pods",
            Some("ApiKey demo-admin-key"),
            r#"{"namespace": "default"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["tool"], "k8s_list_pods");

    let calls = t.executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].subject, "Admin Key");
    assert_eq!(calls[0].arguments["namespace"], "default");
}

#[tokio::test]
async fn test_bearer_token_executes_tool() {
    let t = build_app(MockExecutor::new(), None);
    let token = t
        .tokens
        .issue(
            "u-1",
            "alice",
            vec!["k8s:pods:*".into()],
            chrono::Duration::minutes(5),
        )
        .unwrap();

    let response = t
        .app
        .oneshot(tool_request(
            "k8s_list_pods",
            Some(&format!("Bearer {}", token)),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(t.executor.calls()[0].subject, "alice");
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_missing_header_is_401() {
    let t = build_app(MockExecutor::new(), None);

    let response = t
        .app
        .oneshot(tool_request("k8s_list_pods", None, "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "authentication failed");
    assert_eq!(t.executor.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_key_and_expired_token_look_identical() {
    let t = build_app(MockExecutor::new(), None);
    let now = chrono::Utc::now().timestamp();
    let expired = t
        .tokens
        .encode(&toolgate_core::auth::TokenClaims {
            sub: "u-1".into(),
            username: "alice".into(),
            permissions: vec!["k8s:*".into()],
            iat: Some(now - 120),
            exp: now - 60,
            nbf: None,
            iss: None,
        })
        .unwrap();

    let mut bodies = Vec::new();
    for header in ["ApiKey not-a-key".to_string(), format!("Bearer {}", expired)] {
        let response = t
            .app
            .clone()
            .oneshot(tool_request("k8s_list_pods", Some(&header), "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(json_body(response).await);
    }
    assert_eq!(bodies[0], bodies[1]);

    let reasons: Vec<Option<String>> = t
        .sink
        .of_type(EventType::Authentication)
        .into_iter()
        .map(|e| e.error_message)
        .collect();
    assert_eq!(
        reasons,
        vec![Some("unknown credential".into()), Some("expired".into())]
    );
}

#[tokio::test]
async fn test_developer_denied_in_default_namespace() {
    let t = build_app(MockExecutor::new(), None);

    let response = t
        .app
        .oneshot(tool_request(
            "k8s_list_pods",
            Some("apikey demo-dev-key"),
            r#"{"namespace": "default"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await["error"],
        "access denied: k8s:pods:list in namespace default"
    );
    assert_eq!(t.executor.call_count(), 0);

    let denied = t.sink.of_type(EventType::Authorization);
    assert_eq!(denied[0].result, AuditResult::Denied);
}

#[tokio::test]
async fn test_invalid_body_is_400() {
    let t = build_app(MockExecutor::new(), None);

    let response = t
        .app
        .oneshot(tool_request(
            "k8s_list_pods",
            Some("apikey demo-admin-key"),
            "[1, 2, 3]",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(t.sink.is_empty());
}

// ============================================================================
// Executor Failures
// ============================================================================

#[tokio::test]
async fn test_executor_failure_is_502() {
    let t = build_app(MockExecutor::failing("cluster unreachable"), None);

    let response = t
        .app
        .oneshot(tool_request("k8s_list_pods", Some("apikey demo-admin-key"), "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "cluster unreachable");

    let ops = t.sink.of_type(EventType::Operation);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].result, AuditResult::Failure);
}

#[tokio::test]
async fn test_request_timeout_is_504() {
    let t = build_app(
        MockExecutor::new().with_delay(Duration::from_secs(5)),
        Some(Duration::from_millis(50)),
    );

    let response = t
        .app
        .oneshot(tool_request("k8s_list_pods", Some("apikey demo-admin-key"), "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(t.sink.of_type(EventType::Operation).len(), 1);
}

#[tokio::test]
async fn test_health() {
    let t = build_app(MockExecutor::new(), None);

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
