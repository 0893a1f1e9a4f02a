//! Deriving the (action, resource, namespace) triple from a tool call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::permission::DEFAULT_DOMAIN;

/// Namespace used when the call does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Placeholder for an action or resource that could not be derived.
pub const UNKNOWN: &str = "unknown";

const ACTION_KEYWORDS: &[&str] = &["list", "get", "scale", "logs", "restart", "delete", "create"];

const RESOURCE_KEYWORDS: &[(&str, &str)] = &[
    ("pod", "pods"),
    ("deployment", "deployments"),
    ("service", "services"),
    ("secret", "secrets"),
    ("configmap", "configmaps"),
];

/// A tool invocation with its authorization triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as invoked.
    pub tool: String,
    pub action: String,
    pub resource: String,
    pub namespace: String,
    /// Arguments forwarded to the executor.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Build a call with an explicit triple.
    pub fn new(
        tool: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        namespace: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            tool: tool.into(),
            action: action.into(),
            resource: resource.into(),
            namespace: namespace.into(),
            arguments,
        }
    }

    /// Derive the triple from a `k8s_<action>_<resource>` style name.
    pub fn parse(tool: &str, arguments: Map<String, Value>) -> Self {
        Self::parse_in_domain(DEFAULT_DOMAIN, tool, arguments)
    }

    /// Like [`ToolCall::parse`], for tools named `<domain>_<action>_<resource>`.
    ///
    /// Names outside the pattern fall back to keyword matching. The
    /// namespace comes from a string `namespace` argument.
    pub fn parse_in_domain(domain: &str, tool: &str, arguments: Map<String, Value>) -> Self {
        let namespace = arguments
            .get("namespace")
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string();

        Self {
            tool: tool.to_string(),
            action: parse_action(domain, tool),
            resource: parse_resource(tool),
            namespace,
            arguments,
        }
    }
}

fn parse_action(domain: &str, tool: &str) -> String {
    let parts: Vec<&str> = tool.split('_').collect();
    if parts.len() >= 3 && parts[0] == domain {
        // k8s_get_logs_pod maps to get_logs, which the permission table knows
        if parts[1] == "get" && parts[2] == "logs" {
            return "get_logs".to_string();
        }
        return parts[1].to_string();
    }

    if tool.contains("get") && tool.contains("logs") {
        return "logs".to_string();
    }
    ACTION_KEYWORDS
        .iter()
        .find(|keyword| tool.contains(*keyword))
        .unwrap_or(&UNKNOWN)
        .to_string()
}

fn parse_resource(tool: &str) -> String {
    RESOURCE_KEYWORDS
        .iter()
        .find(|(keyword, _)| tool.contains(keyword))
        .map_or(UNKNOWN, |(_, resource)| *resource)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_parse_structured_name() {
        let call = ToolCall::parse("k8s_list_pods", args(json!({"namespace": "staging"})));
        assert_eq!(call.action, "list");
        assert_eq!(call.resource, "pods");
        assert_eq!(call.namespace, "staging");

        let call = ToolCall::parse("k8s_scale_deployment", Map::new());
        assert_eq!(call.action, "scale");
        assert_eq!(call.resource, "deployments");
        assert_eq!(call.namespace, "default");

        let call = ToolCall::parse("k8s_get_logs_pod", Map::new());
        assert_eq!(call.action, "get_logs");
        assert_eq!(call.resource, "pods");
    }

    #[test]
    fn test_parse_keyword_fallback() {
        assert_eq!(ToolCall::parse("getpodlogs", Map::new()).action, "logs");
        assert_eq!(ToolCall::parse("restartPod", Map::new()).action, "restart");
        assert_eq!(ToolCall::parse("listservices", Map::new()).resource, "services");

        let call = ToolCall::parse("ping", Map::new());
        assert_eq!(call.action, "unknown");
        assert_eq!(call.resource, "unknown");
    }

    #[test]
    fn test_non_string_namespace_ignored() {
        let call = ToolCall::parse("k8s_list_pods", args(json!({"namespace": 7})));
        assert_eq!(call.namespace, "default");

        let call = ToolCall::parse("k8s_list_pods", args(json!({"namespace": ""})));
        assert_eq!(call.namespace, "default");
    }

    #[test]
    fn test_custom_domain() {
        let call = ToolCall::parse_in_domain("ops", "ops_delete_secret", Map::new());
        assert_eq!(call.action, "delete");
        assert_eq!(call.resource, "secrets");
    }
}
