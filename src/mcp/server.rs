//! The central Model Context Protocol engine
//!
//! Decodes one JSON-RPC message per HTTP body, routes it by method and wraps
//! every outcome in a JSON-RPC 2.0 envelope together with the HTTP status the
//! transport should use.

use axum::http::StatusCode;
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ListToolsResult, ProtocolVersion, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::tools::dispatch_tool_call;
use crate::mcp::rpc::{
    is_json_rpc_error, json_rpc_error, json_rpc_result, JsonRpcRequest, INTERNAL_ERROR,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::AppState;

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, PartialEq)]
pub struct RpcReply {
    pub status: StatusCode,
    pub body: Value,
}

impl RpcReply {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn parse_error() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json_rpc_error(Value::Null, PARSE_ERROR, "Parse error"),
        }
    }

    fn internal_error(id: Value, detail: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json_rpc_error(id, INTERNAL_ERROR, &format!("Internal error: {detail}")),
        }
    }
}

pub async fn handle_json_rpc_body(state: &AppState, body: &[u8]) -> RpcReply {
    if body.is_empty() {
        return RpcReply::parse_error();
    }

    let payload: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return RpcReply::parse_error(),
    };
    debug!(request = %payload, "mcp request received");

    let Some(request) = JsonRpcRequest::from_payload(payload) else {
        return RpcReply::internal_error(Value::Null, "request must be a JSON object");
    };

    let reply = handle_json_rpc_request(state, request).await;
    debug!(response = %reply.body, "mcp response ready");
    reply
}

pub async fn handle_json_rpc_request(state: &AppState, request: JsonRpcRequest) -> RpcReply {
    let audit_params = redact_audit_params(&request.params);
    let method = request.method_label();
    let id = request.id.clone();

    let reply = match request.method_name() {
        Some("initialize") => serialized_result(id, &initialize_result()),
        Some("tools/list") => serialized_result(
            id,
            &ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: state.tools.tools(),
            },
        ),
        Some("tools/call") => {
            match dispatch_tool_call(&state.tools, &state.sessions, &request.params).await {
                Ok(outcome) => serialized_result(id, &outcome.into_call_tool_result()),
                Err(fault) => RpcReply::internal_error(id, &fault.to_string()),
            }
        }
        Some("notifications/initialized") => RpcReply::ok(json_rpc_result(id, json!({}))),
        _ => RpcReply::ok(json_rpc_error(
            id,
            METHOD_NOT_FOUND,
            &format!("Method not found: {method}"),
        )),
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if is_json_rpc_error(&reply.body) { "failure" } else { "success" },
        "mcp action audited"
    );

    reply
}

pub fn initialize_result() -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            ..Default::default()
        },
        protocol_version: ProtocolVersion::V2024_11_05.into(),
        instructions: None,
        meta: None,
    }
}

fn serialized_result<T: Serialize>(id: Value, result: &T) -> RpcReply {
    match serde_json::to_value(result) {
        Ok(value) => RpcReply::ok(json_rpc_result(id, value)),
        Err(err) => RpcReply::internal_error(id, &err.to_string()),
    }
}

pub fn redact_audit_params(params: &Value) -> Value {
    match params {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_params(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_params).collect()),
        _ => params.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
