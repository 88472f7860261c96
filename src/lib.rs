use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub mod backend_client;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

#[cfg(test)]
pub(crate) mod test_support;

use backend_client::IncidentBackend;
use directory::UserDirectory;
use domain::{session::SessionStore, tools::ToolRegistry};

#[derive(Clone)]
pub struct AppState {
    pub backend_url: Arc<str>,
    pub tools: Arc<ToolRegistry>,
    pub sessions: Arc<SessionStore>,
    pub directory: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(
        backend_url: String,
        backend: Arc<dyn IncidentBackend>,
        directory: Arc<dyn UserDirectory>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            backend_url: Arc::<str>::from(backend_url),
            tools: Arc::new(ToolRegistry::new(backend)),
            sessions: Arc::new(sessions),
            directory,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", post(http::handlers::mcp_endpoint))
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .route("/health", get(http::handlers::health))
        .route("/call-context", post(http::handlers::store_call_context))
        .route(
            "/call-context/{call_id}",
            delete(http::handlers::clear_call_context),
        )
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
