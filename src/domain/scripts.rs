//! `execute_resolution_script`: runs an automated remediation through the backend.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::{macros, schema::Tool};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend_client::{BackendError, IncidentBackend, ScriptExecutionRequest, ScriptRun};
use crate::domain::{
    tools::{ToolArguments, ToolContext, ToolHandler, ToolOutcome, TransportFault},
    utils::{generate_ticket_reference, truncate_chars},
};

pub const OUTPUT_EXCERPT_CHARS: usize = 150;
pub const SCRIPT_ASSIGNMENT_GROUP: &str = "Critical Response Team";
pub const SCRIPT_PRIORITY: &str = "critical";

pub const MISSING_SCRIPT_NAME_TEXT: &str =
    "Please specify which critical resolution script to execute for emergency response.";
pub const SCRIPT_STATUS_TEXT: &str = "🚨 **CRITICAL SYSTEM ISSUE:** Cannot execute emergency scripts. Escalate to infrastructure team immediately.";
pub const SCRIPT_FAILURE_TEXT: &str = "🚨 **CRITICAL SYSTEM FAILURE:** Script execution system unavailable. Manual resolution procedures required immediately.";
pub const VERIFY_TEXT: &str =
    "🔄 **NEXT ACTION:** Verify system functionality and confirm resolution with end users.";
pub const ESCALATE_TEXT: &str = "🚨 **IMMEDIATE ESCALATION REQUIRED:** Script failed - escalate to senior technical team immediately.";
pub const NO_RESULTS_TEXT: &str = "⚠️ **SCRIPT STATUS:** Execution completed but no results returned. Manual verification required.";

#[macros::mcp_tool(
    name = "execute_resolution_script",
    description = "Execute automated resolution script for critical incident resolution"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ExecuteResolutionScriptTool {
    /// Name of the critical resolution script
    pub script_name: String,
    /// Critical incident ticket ID
    pub ticket_id: Option<String>,
}

pub fn build_execution_request(script_name: &str, ticket_id: Option<String>) -> ScriptExecutionRequest {
    ScriptExecutionRequest {
        ticket_id: ticket_id.unwrap_or_else(generate_ticket_reference),
        scripts: vec![script_name.to_string()],
        description: format!("CRITICAL: Emergency script execution - {script_name}"),
        assignment_group: SCRIPT_ASSIGNMENT_GROUP.to_string(),
        priority: SCRIPT_PRIORITY.to_string(),
    }
}

/// Cuts `output` to the excerpt length, marking the cut with an ellipsis.
pub fn output_excerpt(output: &str) -> String {
    let excerpt = truncate_chars(output, OUTPUT_EXCERPT_CHARS);
    if excerpt.len() < output.len() {
        format!("{excerpt}...")
    } else {
        excerpt.to_string()
    }
}

pub fn render_script_run(script_name: &str, ticket_id: &str, run: &ScriptRun) -> String {
    let mut text = format!(
        "🚨 **CRITICAL SCRIPT EXECUTION - {}**\n\n",
        script_name.to_uppercase()
    );
    text.push_str(&format!(
        "📋 **CRITICAL INCIDENT:** {}\n",
        run.ticket_id.as_deref().unwrap_or(ticket_id)
    ));
    text.push_str(&format!("⚡ **EMERGENCY SCRIPT:** {script_name}\n\n"));

    if run.resolution_results.is_empty() {
        text.push_str(NO_RESULTS_TEXT);
        return text;
    }

    for result in &run.resolution_results {
        if result.status == "success" {
            text.push_str(&format!(
                "✅ **EMERGENCY RESOLUTION SUCCESS:**\n{}\n\n",
                result.resolution
            ));
        } else {
            text.push_str(&format!("🚨 **CRITICAL FAILURE:**\n{}\n\n", result.resolution));
        }

        if let Some(output) = result.output.as_deref().filter(|output| !output.is_empty()) {
            text.push_str(&format!(
                "📊 **SYSTEM OUTPUT:** {}\n\n",
                output_excerpt(output)
            ));
        }
    }

    let any_succeeded = run
        .resolution_results
        .iter()
        .any(|result| result.status == "success");
    text.push_str(if any_succeeded { VERIFY_TEXT } else { ESCALATE_TEXT });
    text
}

pub fn backend_refusal_text(error: Option<&str>) -> String {
    format!(
        "🚨 **CRITICAL SCRIPT FAILURE:** {} - Immediate manual intervention required.",
        error.unwrap_or("Unknown error")
    )
}

pub struct ResolutionScriptHandler {
    backend: Arc<dyn IncidentBackend>,
}

impl ResolutionScriptHandler {
    pub fn new(backend: Arc<dyn IncidentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for ResolutionScriptHandler {
    fn tool(&self) -> Tool {
        ExecuteResolutionScriptTool::tool()
    }

    async fn call(
        &self,
        context: &ToolContext,
        arguments: &ToolArguments,
    ) -> Result<ToolOutcome, TransportFault> {
        let script_name = arguments.text("script_name")?;
        let ticket_id = arguments.text("ticket_id")?;
        if script_name.is_empty() {
            return Ok(ToolOutcome::text(MISSING_SCRIPT_NAME_TEXT));
        }

        let request =
            build_execution_request(&script_name, Some(ticket_id).filter(|id| !id.is_empty()));
        info!(
            script = %script_name,
            ticket_id = %request.ticket_id,
            call_id = %context.call_id,
            requested_by = context
                .caller
                .as_ref()
                .map(|session| session.user.full_name.as_str())
                .unwrap_or("unknown"),
            "executing resolution script"
        );

        let text = match self.backend.execute_scripts(&request).await {
            Ok(execution) if execution.success => match execution.result.as_ref() {
                Some(run) => render_script_run(&script_name, &request.ticket_id, run),
                None => {
                    warn!(script = %script_name, "script execution succeeded without a result");
                    SCRIPT_FAILURE_TEXT.to_string()
                }
            },
            Ok(execution) => backend_refusal_text(execution.error.as_deref()),
            Err(BackendError::Status(status)) => {
                warn!(status, script = %script_name, "script execution rejected by backend");
                SCRIPT_STATUS_TEXT.to_string()
            }
            Err(err) => {
                warn!(error = %err, script = %script_name, "script execution failed");
                SCRIPT_FAILURE_TEXT.to_string()
            }
        };

        Ok(ToolOutcome::text(text))
    }
}
