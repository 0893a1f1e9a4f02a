//! A stand-in executor with canned cluster data.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use toolgate_core::tool_call::DEFAULT_NAMESPACE;
use toolgate_core::{CallContext, ExecutionError, ExecutionOutcome, ToolExecutor};

/// Answers the `k8s_*` demo tools with static data.
///
/// Lets the server run end to end without a cluster. Unknown tools fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoExecutor;

#[async_trait]
impl ToolExecutor for DemoExecutor {
    async fn execute(
        &self,
        ctx: &CallContext,
        tool: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let namespace = arguments
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NAMESPACE);
        log::debug!(
            "demo executor running {} for {} (request {})",
            tool,
            ctx.identity.subject,
            ctx.request_id
        );

        let data = match tool {
            "k8s_list_pods" => json!({
                "namespace": namespace,
                "pods": [
                    {"name": "web-7d9f8", "status": "Running"},
                    {"name": "worker-5c4b2", "status": "Running"},
                ],
            }),
            "k8s_list_deployments" => json!({
                "namespace": namespace,
                "deployments": [{"name": "web", "replicas": 2}],
            }),
            "k8s_list_services" => json!({
                "namespace": namespace,
                "services": [{"name": "web", "type": "ClusterIP"}],
            }),
            "k8s_get_logs_pod" | "k8s_logs_pod" => {
                let pod = required_str(arguments, "pod")?;
                json!({"pod": pod, "lines": ["started", "ready"]})
            }
            "k8s_scale_deployment" => {
                let name = required_str(arguments, "deployment")?;
                let replicas = arguments
                    .get("replicas")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| ExecutionError::failed("missing argument: replicas"))?;
                json!({"deployment": name, "replicas": replicas})
            }
            "k8s_restart_pod" => {
                let pod = required_str(arguments, "pod")?;
                json!({"pod": pod, "restarted": true})
            }
            other => return Err(ExecutionError::failed(format!("unknown tool: {}", other))),
        };

        Ok(ExecutionOutcome::success(format!("{} completed", tool), data))
    }
}

fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str, ExecutionError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ExecutionError::failed(format!("missing argument: {}", key)))
}
