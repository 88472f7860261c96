//! JSON-RPC protocol representations and formatting utilities
//!
//! The request `id` is carried as an opaque JSON value and echoed verbatim,
//! `null` included.

use serde::Deserialize;
use serde_json::{json, Value};

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub method: Value,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Reads a request out of a decoded body; only JSON objects qualify.
    pub fn from_payload(payload: Value) -> Option<Self> {
        if !payload.is_object() {
            return None;
        }
        serde_json::from_value(payload).ok()
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method.as_str()
    }

    /// Method as shown in error messages; absent methods read as `null`.
    pub fn method_label(&self) -> String {
        match &self.method {
            Value::String(method) => method.clone(),
            other => other.to_string(),
        }
    }
}

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

pub fn json_rpc_result(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}
