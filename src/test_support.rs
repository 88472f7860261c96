use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::backend_client::{
    BackendError, Incident, IncidentBackend, IncidentLookup, IncidentLookupRequest,
    ScriptExecution, ScriptExecutionRequest, SimilaritySearch, SimilaritySearchRequest, SopSearch,
};

/// Canned backend that records every request it receives.
pub struct MockBackend {
    pub lookup: Result<IncidentLookup, BackendError>,
    pub search: Result<SimilaritySearch, BackendError>,
    pub sop: Result<SopSearch, BackendError>,
    pub execution: Result<ScriptExecution, BackendError>,
    requests: Mutex<Vec<(&'static str, Value)>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            lookup: Err(BackendError::Status(503)),
            search: Err(BackendError::Status(503)),
            sop: Err(BackendError::Status(503)),
            execution: Err(BackendError::Status(503)),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn with_lookup(mut self, lookup: Result<IncidentLookup, BackendError>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_search(mut self, search: Result<SimilaritySearch, BackendError>) -> Self {
        self.search = search;
        self
    }

    pub fn with_sop(mut self, sop: Result<SopSearch, BackendError>) -> Self {
        self.sop = sop;
        self
    }

    pub fn with_execution(mut self, execution: Result<ScriptExecution, BackendError>) -> Self {
        self.execution = execution;
        self
    }

    pub fn requests(&self) -> Vec<(&'static str, Value)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, endpoint: &'static str, request: &impl Serialize) {
        let body = serde_json::to_value(request).unwrap_or(Value::Null);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((endpoint, body));
    }
}

#[async_trait]
impl IncidentBackend for MockBackend {
    async fn lookup_incident(
        &self,
        request: &IncidentLookupRequest,
    ) -> Result<IncidentLookup, BackendError> {
        self.record("search_servicenow", request);
        self.lookup.clone()
    }

    async fn search_similar(
        &self,
        request: &SimilaritySearchRequest,
    ) -> Result<SimilaritySearch, BackendError> {
        self.record("search_incidents", request);
        self.search.clone()
    }

    async fn fetch_sop(
        &self,
        request: &SimilaritySearchRequest,
    ) -> Result<SopSearch, BackendError> {
        self.record("search_incidents", request);
        self.sop.clone()
    }

    async fn execute_scripts(
        &self,
        request: &ScriptExecutionRequest,
    ) -> Result<ScriptExecution, BackendError> {
        self.record("execute_scripts", request);
        self.execution.clone()
    }
}

pub fn incident(priority: &str, state: &str) -> Incident {
    Incident {
        number: "INC0010001".to_string(),
        priority: priority.to_string(),
        short_description: "Payment gateway returning 502".to_string(),
        state: state.to_string(),
        assignment_group: "Payments SRE".to_string(),
        created_on: json!("2026-10-01 08:15:00"),
    }
}
