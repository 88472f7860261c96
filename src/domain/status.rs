//! `get_incident_status`: escalation summary for a single incident.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::{macros, schema::Tool};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend_client::{BackendError, Incident, IncidentBackend, IncidentLookupRequest};
use crate::domain::{
    tools::{ToolArguments, ToolContext, ToolHandler, ToolOutcome, TransportFault},
    utils::display_value,
};

pub const MISSING_INCIDENT_NUMBER_TEXT: &str =
    "Please provide the critical incident number for escalation details.";
pub const BACKEND_STATUS_TEXT: &str = "🚨 **CRITICAL SYSTEM ISSUE:** Cannot access incident database. Escalate to infrastructure team immediately.";
pub const BACKEND_FAILURE_TEXT: &str = "🚨 **CRITICAL SYSTEM FAILURE:** Database connectivity issues. Immediate escalation to infrastructure required.";
pub const CRITICAL_SLA_BANNER: &str = "🚨 **CRITICAL SLA:** 4 hours maximum resolution time";
pub const HIGH_SLA_BANNER: &str = "⚠️ **HIGH PRIORITY SLA:** 8 hours resolution target";

#[macros::mcp_tool(
    name = "get_incident_status",
    description = "Get detailed status and information for a specific critical incident"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetIncidentStatusTool {
    /// Incident number (e.g., INC0010001)
    pub incident_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaTier {
    Critical,
    High,
}

impl SlaTier {
    pub fn banner(self) -> &'static str {
        match self {
            Self::Critical => CRITICAL_SLA_BANNER,
            Self::High => HIGH_SLA_BANNER,
        }
    }
}

/// Substring match on the lowercased priority; "critical" or "1" outranks "high" or "2".
pub fn classify_sla(priority: &str) -> Option<SlaTier> {
    let priority = priority.to_lowercase();
    if priority.contains("critical") || priority.contains('1') {
        Some(SlaTier::Critical)
    } else if priority.contains("high") || priority.contains('2') {
        Some(SlaTier::High)
    } else {
        None
    }
}

pub fn is_resolved_state(state: &str) -> bool {
    matches!(state.to_lowercase().as_str(), "resolved" | "closed")
}

pub fn render_incident_status(incident: &Incident) -> String {
    let mut text = format!("🚨 **CRITICAL ESCALATION - {}**\n\n", incident.number);
    text.push_str(&format!(
        "⚡ **PRIORITY:** {} - IMMEDIATE ATTENTION REQUIRED\n",
        incident.priority
    ));
    text.push_str(&format!("📋 **ISSUE:** {}\n", incident.short_description));
    text.push_str(&format!("🎯 **CURRENT STATUS:** {}\n", incident.state));
    text.push_str(&format!("👥 **ASSIGNED TEAM:** {}\n", incident.assignment_group));
    text.push_str(&format!(
        "📅 **CREATED:** {}\n\n",
        display_value(&incident.created_on)
    ));

    if let Some(tier) = classify_sla(&incident.priority) {
        text.push_str(tier.banner());
        text.push('\n');
    }

    if is_resolved_state(&incident.state) {
        text.push_str("\n✅ **STATUS UPDATE:** This incident has been resolved. Confirming resolution with user.");
    } else {
        text.push_str(&format!(
            "\n🔄 **URGENT ACTION REQUIRED:** Incident is {} - Team needs immediate response.",
            incident.state
        ));
    }

    text.push_str("\n\nDo you need the resolution procedures or SOP guidance for this critical incident?");
    text
}

pub fn incident_not_found_text(incident_number: &str) -> String {
    format!(
        "🚨 **CRITICAL:** Could not locate incident {incident_number} in system. Verify incident number or escalate to senior support."
    )
}

pub struct IncidentStatusHandler {
    backend: Arc<dyn IncidentBackend>,
}

impl IncidentStatusHandler {
    pub fn new(backend: Arc<dyn IncidentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for IncidentStatusHandler {
    fn tool(&self) -> Tool {
        GetIncidentStatusTool::tool()
    }

    async fn call(
        &self,
        _context: &ToolContext,
        arguments: &ToolArguments,
    ) -> Result<ToolOutcome, TransportFault> {
        let incident_number = arguments.text("incident_number")?;
        if incident_number.is_empty() {
            return Ok(ToolOutcome::text(MISSING_INCIDENT_NUMBER_TEXT));
        }

        let request = IncidentLookupRequest {
            incident_number: incident_number.clone(),
        };
        let text = match self.backend.lookup_incident(&request).await {
            Ok(lookup) => match lookup.incidents.first() {
                Some(incident) => render_incident_status(incident),
                None => incident_not_found_text(&incident_number),
            },
            Err(BackendError::Status(status)) => {
                warn!(status, incident = %incident_number, "incident lookup rejected by backend");
                BACKEND_STATUS_TEXT.to_string()
            }
            Err(err) => {
                warn!(error = %err, incident = %incident_number, "incident lookup failed");
                BACKEND_FAILURE_TEXT.to_string()
            }
        };

        Ok(ToolOutcome::text(text))
    }
}
