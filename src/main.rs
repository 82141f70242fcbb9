//! Service entry point: configuration, logging, wiring, and the listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use graphchat::adapters::audit::FileAuditLog;
use graphchat::adapters::auth::HttpAuthVerifier;
use graphchat::adapters::engine::HttpAnswerEngine;
use graphchat::adapters::http::{app_router, AppState};
use graphchat::adapters::store::FileSessionStore;
use graphchat::application::SessionSettings;
use graphchat::config::AppConfig;
use graphchat::domain::access::AccessPolicy;
use graphchat::domain::session::RetrievalPattern;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config)?;

    let settings = SessionSettings {
        turn_timeout: Duration::from_secs(config.engine.turn_timeout_secs),
        default_retrieval_pattern: RetrievalPattern::new(
            config.engine.default_retrieval_pattern.clone(),
        ),
    };
    let state = AppState {
        store: Arc::new(FileSessionStore::new(&config.storage.store_path)),
        policy: Arc::new(AccessPolicy::from_names(config.access.roles_list())),
        engine: Arc::new(HttpAnswerEngine::new(config.engine.base_url.clone())?),
        auth: Arc::new(HttpAuthVerifier::new(config.auth.verify_url.clone())?),
        audit: Arc::new(FileAuditLog::new(&config.storage.audit_log_path)),
        settings,
    };

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "conversational session service listening");
    axum::serve(listener, app_router(state)).await?;
    Ok(())
}

/// Stderr logging always; an additional JSON file layer when an operational
/// log path is configured.
fn init_tracing(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &config.storage.operational_log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
        }
    }
    Ok(())
}
