use std::sync::Arc;

use incident_escalation_mcp::{
    backend_client::HttpIncidentBackend,
    build_app,
    config::Config,
    directory::{InMemoryDirectory, JsonFileDirectory, UserDirectory},
    domain::session::SessionStore,
    logging, AppState,
};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let backend = Arc::new(HttpIncidentBackend::new(config.backend_url.clone())?);
    let directory: Arc<dyn UserDirectory> = match &config.user_directory_path {
        Some(path) => Arc::new(JsonFileDirectory::new(path.clone())),
        None => {
            warn!("USER_DIRECTORY_PATH is not set; callers will not be resolved");
            Arc::new(InMemoryDirectory::default())
        }
    };
    let sessions = SessionStore::new(config.session_ttl, config.session_max_entries);

    let state = AppState::new(config.backend_url.clone(), backend, directory, sessions);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        backend_url = %config.backend_url,
        "server starting"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
