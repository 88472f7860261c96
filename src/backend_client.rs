//! Client for the external incident-management backend.
//!
//! Every call carries its own timeout and is attempted exactly once; the tool
//! handlers decide how a failure is worded for the operator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const EXECUTE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend responded with status {0}")]
    Status(u16),
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

/// Reads an explicit `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentLookupRequest {
    pub incident_number: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct IncidentLookup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub incidents: Vec<Incident>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Incident {
    pub number: String,
    pub priority: String,
    pub short_description: String,
    pub state: String,
    pub assignment_group: String,
    pub created_on: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilaritySearchRequest {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SimilaritySearch {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub similar_incidents: Vec<SimilarIncident>,
    #[serde(default)]
    pub generated_sop: Option<String>,
}

/// The slice of a similarity search the SOP lookup cares about.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SopSearch {
    #[serde(default)]
    pub generated_sop: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimilarIncident {
    pub number: String,
    pub similarity: Value,
    #[serde(default)]
    pub resolution: Option<String>,
    pub assignment_group: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptExecutionRequest {
    pub ticket_id: String,
    pub scripts: Vec<String>,
    pub description: String,
    pub assignment_group: String,
    pub priority: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ScriptExecution {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<ScriptRun>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ScriptRun {
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resolution_results: Vec<ResolutionResult>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResolutionResult {
    pub status: String,
    pub resolution: String,
    #[serde(default)]
    pub output: Option<String>,
}

#[async_trait]
pub trait IncidentBackend: Send + Sync {
    async fn lookup_incident(
        &self,
        request: &IncidentLookupRequest,
    ) -> Result<IncidentLookup, BackendError>;

    async fn search_similar(
        &self,
        request: &SimilaritySearchRequest,
    ) -> Result<SimilaritySearch, BackendError>;

    /// Same endpoint as [`IncidentBackend::search_similar`], decoding only the procedure.
    async fn fetch_sop(
        &self,
        request: &SimilaritySearchRequest,
    ) -> Result<SopSearch, BackendError>;

    async fn execute_scripts(
        &self,
        request: &ScriptExecutionRequest,
    ) -> Result<ScriptExecution, BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpIncidentBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIncidentBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().build().map_err(|err| {
            BackendError::Transport(format!("failed to create HTTP client: {err}"))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(BackendError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| BackendError::Decode(err.to_string()))
    }
}

#[async_trait]
impl IncidentBackend for HttpIncidentBackend {
    async fn lookup_incident(
        &self,
        request: &IncidentLookupRequest,
    ) -> Result<IncidentLookup, BackendError> {
        self.post_json("search_servicenow", request, LOOKUP_TIMEOUT)
            .await
    }

    async fn search_similar(
        &self,
        request: &SimilaritySearchRequest,
    ) -> Result<SimilaritySearch, BackendError> {
        self.post_json("search_incidents", request, SEARCH_TIMEOUT)
            .await
    }

    async fn fetch_sop(
        &self,
        request: &SimilaritySearchRequest,
    ) -> Result<SopSearch, BackendError> {
        self.post_json("search_incidents", request, SEARCH_TIMEOUT)
            .await
    }

    async fn execute_scripts(
        &self,
        request: &ScriptExecutionRequest,
    ) -> Result<ScriptExecution, BackendError> {
        self.post_json("execute_scripts", request, EXECUTE_TIMEOUT)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_endpoints_under_api_prefix() {
        let backend = HttpIncidentBackend::new("http://localhost:5000/").expect("client builds");
        assert_eq!(
            backend.endpoint("search_servicenow"),
            "http://localhost:5000/api/search_servicenow"
        );
    }

    #[test]
    fn sop_search_omits_assignment_group() {
        let request = SimilaritySearchRequest {
            description: "disk full".to_string(),
            assignment_group: None,
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serializes"),
            json!({"description": "disk full"})
        );
    }

    #[test]
    fn decodes_search_payload_with_missing_optionals() {
        let parsed: SimilaritySearch = serde_json::from_value(json!({
            "success": true,
            "similar_incidents": [
                {"number": "INC001", "similarity": "92%", "assignment_group": "Network"}
            ]
        }))
        .expect("decodes");

        assert!(parsed.success);
        assert_eq!(parsed.similar_incidents[0].resolution, None);
        assert_eq!(parsed.generated_sop, None);
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let lookup: IncidentLookup =
            serde_json::from_value(json!({"incidents": null})).expect("decodes");
        let search: SimilaritySearch =
            serde_json::from_value(json!({"success": true, "similar_incidents": null}))
                .expect("decodes");
        let execution: ScriptExecution = serde_json::from_value(json!({
            "success": true,
            "result": {"ticket_id": "INC0010001", "resolution_results": null}
        }))
        .expect("decodes");

        assert!(lookup.incidents.is_empty());
        assert!(search.similar_incidents.is_empty());
        assert_eq!(
            execution.result.map(|run| run.resolution_results),
            Some(Vec::new())
        );
    }

    #[test]
    fn sop_decode_ignores_incomplete_matches() {
        let payload = json!({
            "success": true,
            "similar_incidents": [{"number": "INC1"}],
            "generated_sop": "Step 1: restart"
        });
        assert!(serde_json::from_value::<SimilaritySearch>(payload.clone()).is_err());

        let sop: SopSearch = serde_json::from_value(payload).expect("decodes");
        assert_eq!(sop.generated_sop.as_deref(), Some("Step 1: restart"));
    }

    #[test]
    fn incident_without_state_fails_to_decode() {
        let parsed = serde_json::from_value::<IncidentLookup>(json!({
            "incidents": [{"number": "INC001", "priority": "1 - Critical"}]
        }));
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let backend = HttpIncidentBackend::new("http://127.0.0.1:9").expect("client builds");
        let error = backend
            .lookup_incident(&IncidentLookupRequest {
                incident_number: "INC0010001".to_string(),
            })
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(error, BackendError::Transport(_)));
    }
}
