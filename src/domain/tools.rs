//! Interactive tools exposed via Model Context Protocol
//!
//! The registry pairs each advertised tool descriptor with the handler that
//! serves it, so `tools/list` and `tools/call` cannot drift apart. Handlers
//! report business failures as ordinary text outcomes; only malformed
//! invocations surface as a [`TransportFault`].

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent, Tool};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::backend_client::IncidentBackend;
use crate::domain::{
    scripts::ResolutionScriptHandler,
    search::{IncidentSearchHandler, SopDocumentHandler},
    session::{CallSession, SessionStore, DEFAULT_CALL_ID},
    status::IncidentStatusHandler,
};

pub const UNKNOWN_TOOL_TEXT: &str = "Unknown tool";

/// Operator-facing text produced by a tool, whatever the underlying outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub text: String,
}

impl ToolOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn into_call_tool_result(self) -> CallToolResult {
        CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(self.text, None, None))],
            is_error: None,
            meta: None,
            structured_content: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFault {
    #[error("tools/call params must be an object")]
    InvalidParams,
    #[error("tool arguments must be an object")]
    InvalidArguments,
    #[error("argument '{name}' must be a string")]
    InvalidArgument { name: String },
}

#[derive(Debug, Clone, Default)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn new(arguments: Map<String, Value>) -> Self {
        Self(arguments)
    }

    /// Trimmed string argument; absent and `null` read as empty.
    pub fn text(&self, name: &str) -> Result<String, TransportFault> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(value)) => Ok(value.trim().to_string()),
            Some(_) => Err(TransportFault::InvalidArgument {
                name: name.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub call_id: String,
    pub caller: Option<CallSession>,
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn tool(&self) -> Tool;

    async fn call(
        &self,
        context: &ToolContext,
        arguments: &ToolArguments,
    ) -> Result<ToolOutcome, TransportFault>;
}

struct RegisteredTool {
    tool: Tool,
    handler: Arc<dyn ToolHandler>,
}

pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new(backend: Arc<dyn IncidentBackend>) -> Self {
        let handlers: Vec<Arc<dyn ToolHandler>> = vec![
            Arc::new(IncidentStatusHandler::new(backend.clone())),
            Arc::new(IncidentSearchHandler::new(backend.clone())),
            Arc::new(SopDocumentHandler::new(backend.clone())),
            Arc::new(ResolutionScriptHandler::new(backend)),
        ];
        Self::from_handlers(handlers)
    }

    pub fn from_handlers(handlers: Vec<Arc<dyn ToolHandler>>) -> Self {
        let entries = handlers
            .into_iter()
            .map(|handler| RegisteredTool {
                tool: handler.tool(),
                handler,
            })
            .collect();
        Self { entries }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.entries.iter().map(|entry| entry.tool.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.tool.name.as_str())
            .collect()
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.entries
            .iter()
            .find(|entry| entry.tool.name == name)
            .map(|entry| &entry.handler)
    }
}

/// Routes a `tools/call` params object to its handler.
pub async fn dispatch_tool_call(
    registry: &ToolRegistry,
    sessions: &SessionStore,
    params: &Value,
) -> Result<ToolOutcome, TransportFault> {
    let params = match params {
        Value::Null => return Ok(ToolOutcome::text(UNKNOWN_TOOL_TEXT)),
        Value::Object(map) => map,
        _ => return Err(TransportFault::InvalidParams),
    };

    let tool_name = params.get("name").and_then(Value::as_str);
    let Some((name, handler)) =
        tool_name.and_then(|name| registry.handler(name).map(|handler| (name, handler)))
    else {
        info!(tool = ?tool_name, "unknown tool requested");
        return Ok(ToolOutcome::text(UNKNOWN_TOOL_TEXT));
    };

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => ToolArguments::default(),
        Some(Value::Object(map)) => ToolArguments::new(map.clone()),
        Some(_) => return Err(TransportFault::InvalidArguments),
    };

    let call_id = arguments
        .text("call_id")
        .ok()
        .filter(|call_id| !call_id.is_empty())
        .unwrap_or_else(|| DEFAULT_CALL_ID.to_string());
    let caller = sessions.get(&call_id);
    info!(
        tool = %name,
        call_id = %call_id,
        caller = caller.as_ref().map(|session| session.user.full_name.as_str()).unwrap_or("unknown"),
        "tool called"
    );

    let context = ToolContext { call_id, caller };
    handler.call(&context, &arguments).await
}
