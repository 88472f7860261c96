//! Similarity-search backed tools: `search_incidents` and `get_sop_document`.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::{macros, schema::Tool};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend_client::{
    BackendError, IncidentBackend, SimilaritySearch, SimilaritySearchRequest,
};
use crate::domain::{
    tools::{ToolArguments, ToolContext, ToolHandler, ToolOutcome, TransportFault},
    utils::{display_value, title_case, truncate_chars},
};

pub const MAX_SIMILAR_INCIDENTS: usize = 2;
pub const RESOLUTION_EXCERPT_CHARS: usize = 150;
pub const SOP_SCAN_LINES: usize = 8;
pub const MAX_SOP_STEPS: usize = 4;
pub const SOP_PARAGRAPH_CHARS: usize = 250;
const STEP_PREFIXES: [&str; 5] = ["1.", "2.", "3.", "4.", "5."];

pub const MISSING_DESCRIPTION_TEXT: &str =
    "Please provide the critical incident description to search for similar cases.";
pub const NO_MATCHES_TEXT: &str = "🚨 **CRITICAL ESCALATION:** No similar incidents found in database. This appears to be a unique critical issue requiring immediate investigation by the assigned team.";
pub const SEARCH_STATUS_TEXT: &str = "🚨 **CRITICAL ESCALATION:** Unable to access incident database. Recommend immediate manual investigation.";
pub const SEARCH_FAILURE_TEXT: &str = "🚨 **CRITICAL ESCALATION:** Technical difficulties accessing incident data. Escalate to senior support immediately.";
pub const SOP_OFFER_TEXT: &str = "📋 **IMMEDIATE ACTIONS AVAILABLE:**\nI have the step-by-step resolution procedure ready. Shall I provide the emergency resolution steps now?";

pub const MISSING_ISSUE_TYPE_TEXT: &str =
    "Please specify the critical issue type for emergency resolution procedures.";
pub const SOP_STATUS_TEXT: &str = "🚨 **CRITICAL:** Cannot access SOP database. Escalate to senior support for manual resolution procedures.";
pub const SOP_FAILURE_TEXT: &str = "🚨 **CRITICAL SYSTEM ISSUE:** SOP system unavailable. Immediate escalation to infrastructure team required.";

#[macros::mcp_tool(
    name = "search_incidents",
    description = "Search for similar critical incidents and resolution procedures"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchIncidentsTool {
    /// Critical incident description to find similar cases
    pub description: String,
    /// Assignment group (optional)
    pub assignment_group: Option<String>,
}

#[macros::mcp_tool(
    name = "get_sop_document",
    description = "Retrieve step-by-step resolution procedures for critical issues"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetSopDocumentTool {
    /// Type of critical issue requiring immediate resolution
    pub issue_type: String,
}

fn non_empty_sop(sop: &Option<String>) -> Option<&str> {
    sop.as_deref().filter(|sop| !sop.is_empty())
}

pub fn render_similar_incidents(search: &SimilaritySearch) -> String {
    if !search.success || search.similar_incidents.is_empty() {
        return NO_MATCHES_TEXT.to_string();
    }

    let mut text = format!(
        "🚨 **CRITICAL ESCALATION:** Found {} similar high-priority incidents:\n\n",
        search.similar_incidents.len()
    );
    for incident in search.similar_incidents.iter().take(MAX_SIMILAR_INCIDENTS) {
        let resolution = incident
            .resolution
            .as_deref()
            .unwrap_or("Check SOP procedures");
        text.push_str(&format!(
            "**{}** - {} match\n",
            incident.number,
            display_value(&incident.similarity)
        ));
        text.push_str(&format!(
            "Resolution: {}...\n",
            truncate_chars(resolution, RESOLUTION_EXCERPT_CHARS)
        ));
        text.push_str(&format!("Team: {}\n\n", incident.assignment_group));
    }

    if non_empty_sop(&search.generated_sop).is_some() {
        text.push_str(SOP_OFFER_TEXT);
    }
    text
}

/// Lines among the first eight that look like procedure steps, trimmed.
pub fn extract_critical_steps(sop: &str) -> Vec<String> {
    sop.split('\n')
        .take(SOP_SCAN_LINES)
        .filter(|line| {
            !line.trim().is_empty()
                && (line.to_lowercase().contains("step")
                    || STEP_PREFIXES.iter().any(|prefix| line.starts_with(prefix)))
        })
        .map(|line| line.trim().to_string())
        .collect()
}

pub fn render_sop(issue_type: &str, sop: &str) -> String {
    let mut text = format!("🚨 **EMERGENCY SOP - {}:**\n\n", title_case(issue_type));
    text.push_str("⚡ **IMMEDIATE ACTIONS REQUIRED:**\n\n");

    let steps = extract_critical_steps(sop);
    if steps.is_empty() {
        let first_paragraph = sop.split("\n\n").next().unwrap_or_default();
        text.push_str(&format!(
            "**CRITICAL PROCEDURE:**\n{}...\n\n",
            truncate_chars(first_paragraph, SOP_PARAGRAPH_CHARS)
        ));
        text.push_str("🔄 **ACTION:** Begin this procedure immediately and monitor progress.");
    } else {
        for (index, step) in steps.iter().take(MAX_SOP_STEPS).enumerate() {
            text.push_str(&format!("**{}.** {}\n", index + 1, step));
        }
        text.push_str("\n🔄 **NEXT:** Execute these steps immediately and report status.\n");
        text.push_str("📞 **ESCALATION:** If any step fails, escalate to senior support immediately.");
    }

    text.push_str("\n\nDo you need clarification on any of these critical steps?");
    text
}

pub fn no_sop_text(issue_type: &str) -> String {
    format!(
        "🚨 **CRITICAL:** No SOP available for '{issue_type}'. This requires immediate manual intervention by senior technical team."
    )
}

pub struct IncidentSearchHandler {
    backend: Arc<dyn IncidentBackend>,
}

impl IncidentSearchHandler {
    pub fn new(backend: Arc<dyn IncidentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for IncidentSearchHandler {
    fn tool(&self) -> Tool {
        SearchIncidentsTool::tool()
    }

    async fn call(
        &self,
        _context: &ToolContext,
        arguments: &ToolArguments,
    ) -> Result<ToolOutcome, TransportFault> {
        let description = arguments.text("description")?;
        let assignment_group = arguments.text("assignment_group")?;
        if description.is_empty() {
            return Ok(ToolOutcome::text(MISSING_DESCRIPTION_TEXT));
        }

        let request = SimilaritySearchRequest {
            description,
            assignment_group: Some(assignment_group),
        };
        let text = match self.backend.search_similar(&request).await {
            Ok(search) => render_similar_incidents(&search),
            Err(BackendError::Status(status)) => {
                warn!(status, "similar incident search rejected by backend");
                SEARCH_STATUS_TEXT.to_string()
            }
            Err(err) => {
                warn!(error = %err, "similar incident search failed");
                SEARCH_FAILURE_TEXT.to_string()
            }
        };

        Ok(ToolOutcome::text(text))
    }
}

pub struct SopDocumentHandler {
    backend: Arc<dyn IncidentBackend>,
}

impl SopDocumentHandler {
    pub fn new(backend: Arc<dyn IncidentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for SopDocumentHandler {
    fn tool(&self) -> Tool {
        GetSopDocumentTool::tool()
    }

    async fn call(
        &self,
        _context: &ToolContext,
        arguments: &ToolArguments,
    ) -> Result<ToolOutcome, TransportFault> {
        let issue_type = arguments.text("issue_type")?;
        if issue_type.is_empty() {
            return Ok(ToolOutcome::text(MISSING_ISSUE_TYPE_TEXT));
        }

        let request = SimilaritySearchRequest {
            description: issue_type.clone(),
            assignment_group: None,
        };
        let text = match self.backend.fetch_sop(&request).await {
            Ok(found) => match non_empty_sop(&found.generated_sop) {
                Some(sop) => render_sop(&issue_type, sop),
                None => no_sop_text(&issue_type),
            },
            Err(BackendError::Status(status)) => {
                warn!(status, issue_type = %issue_type, "sop search rejected by backend");
                SOP_STATUS_TEXT.to_string()
            }
            Err(err) => {
                warn!(error = %err, issue_type = %issue_type, "sop search failed");
                SOP_FAILURE_TEXT.to_string()
            }
        };

        Ok(ToolOutcome::text(text))
    }
}
