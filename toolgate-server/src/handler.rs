//! HTTP handlers for the gate endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use toolgate_core::{ExecutionOutcome, ToolCall, ToolRequest};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `POST /tools/{name}`
///
/// The body is a JSON object of tool arguments; an empty body means no
/// arguments. If the client disconnects, the handler future is dropped and
/// the request's cancellation token fires.
pub async fn call_tool(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<ExecutionOutcome>> {
    let authorization = match headers.get(AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ServerError::InvalidRequest("authorization header is not ASCII".into()))?
                .to_string(),
        ),
        None => None,
    };
    let arguments = parse_arguments(&body)?;

    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();

    let mut request = ToolRequest::new(authorization, ToolCall::parse(&tool, arguments))
        .with_cancellation(token);
    if let Some(timeout) = state.request_timeout {
        request = request.with_timeout(timeout);
    }

    let result = state.gate.handle(request).await;
    guard.disarm();

    Ok(Json(result?))
}

fn parse_arguments(body: &[u8]) -> ServerResult<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ServerError::InvalidRequest(
            "arguments must be a JSON object".into(),
        )),
        Err(e) => Err(ServerError::InvalidRequest(format!("invalid JSON: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments(b"").unwrap().is_empty());
        assert!(parse_arguments(b"  \n").unwrap().is_empty());

        let args = parse_arguments(br#"{"namespace": "staging"}"#).unwrap();
        assert_eq!(args["namespace"], "staging");

        assert!(matches!(
            parse_arguments(b"[1, 2]"),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_arguments(b"{oops"),
            Err(ServerError::InvalidRequest(_))
        ));
    }
}
