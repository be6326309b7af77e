//! `stockwise serve` -- HTTP JSON API over the report tools.
//!
//! Endpoints:
//! - GET  /health        - Server status and configured ERP host
//! - GET  /tools         - Tool catalog with parameter descriptions
//! - POST /tools/{name}  - Run a tool; the body is a flat JSON parameter map
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use stockwise_odata::ErpClient;
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{handle_call_tool, handle_health, handle_list_tools, handle_not_found};
use self::state::AppState;

/// Maximum request body size: 64 KB of parameters.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({"status": "error", "message": message})),
    )
}

pub(crate) fn router(client: Arc<ErpClient>) -> Router {
    let state = Arc::new(AppState { client });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/tools", get(handle_list_tools))
        .route("/tools/{name}", post(handle_call_tool))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Serve the tool API on `0.0.0.0:{port}` until Ctrl+C.
pub async fn start_server(
    port: u16,
    client: Arc<ErpClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = client.config().host.clone();
    let app = router(client);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, erp_host = %host, "stockwise tool server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
