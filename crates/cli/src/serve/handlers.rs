//! Route handlers: health, tool catalog, tool calls.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{Map, Value};
use stockwise_reports::{dispatch, find_tool, strip_target, unknown_tool, TOOLS};

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "erp_host": state.client.config().host,
    });
    (StatusCode::OK, Json(response))
}

/// GET /tools
pub(crate) async fn handle_list_tools() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "tools": TOOLS })))
}

/// Parse a request body into a parameter map. An empty body means no
/// parameters.
fn parse_params(body: &[u8]) -> Result<Map<String, Value>, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("request body must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON body: {}", e)),
    }
}

/// POST /tools/{name}
///
/// Reports always come back with 200 and a `status` field, including
/// `status: error`; 404 and 400 are reserved for unknown tools and
/// malformed bodies.
pub(crate) async fn handle_call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    if find_tool(&name).is_none() {
        return (StatusCode::NOT_FOUND, Json(unknown_tool(strip_target(&name)))).into_response();
    }
    let params = match parse_params(&body) {
        Ok(params) => params,
        Err(msg) => return json_error(StatusCode::BAD_REQUEST, &msg).into_response(),
    };

    let client = state.client.clone();
    let result =
        tokio::task::spawn_blocking(move || dispatch(&client, &name, &params)).await;
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "tool task failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "tool execution failed").into_response()
        }
    }
}
