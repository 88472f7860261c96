//! Axum HTTP handlers for the web server
//!
//! Provides the Model Context Protocol endpoint, the health probe and the
//! call-context hooks invoked by the voice platform when a call starts or ends.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::directory::DirectoryStats;
use crate::domain::session::{register_call_context, DEFAULT_CALL_ID};
use crate::mcp::server::handle_json_rpc_body;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub backend_url: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub counts: Option<DirectoryStats>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallContextRequest {
    #[serde(default)]
    pub to_number: Option<String>,
    #[serde(default)]
    pub call_id: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Response {
    let counts = match state.directory.stats().await {
        Ok(stats) => Some(stats),
        Err(err) if err.is_unavailable() => {
            warn!(code = err.code(), error = %err, "user directory unavailable for health check");
            None
        }
        Err(err) => {
            error!(code = err.code(), error = %err, "health check failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "unhealthy",
                    "error": err.to_string()
                })),
            )
                .into_response();
        }
    };

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        backend_url: state.backend_url.to_string(),
        counts,
    })
    .into_response()
}

pub async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let reply = handle_json_rpc_body(&state, &body).await;
    (reply.status, Json(reply.body)).into_response()
}

pub async fn store_call_context(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let request = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) if payload.is_object() => serde_json::from_value::<CallContextRequest>(payload),
        Ok(_) => {
            warn!("call context body is not an object");
            return Json(json!({"status": "error"}));
        }
        Err(err) => Err(err),
    };

    let request = match request {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "failed to read call context");
            return Json(json!({"status": "error"}));
        }
    };

    let call_id = request
        .call_id
        .clone()
        .unwrap_or_else(|| DEFAULT_CALL_ID.to_string());
    let stored = register_call_context(
        &state.sessions,
        state.directory.as_ref(),
        request.to_number.as_deref(),
        Some(&call_id),
    )
    .await;
    if stored.is_none() {
        info!(call_id = %call_id, "call context registered without a resolved caller");
    }

    Json(json!({
        "status": "success",
        "call_id": call_id
    }))
}

pub async fn clear_call_context(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Json<Value> {
    let removed = state.sessions.remove(&call_id).is_some();
    info!(call_id = %call_id, removed, "call context cleared");

    Json(json!({
        "status": "success",
        "call_id": call_id,
        "removed": removed
    }))
}
