//! HTTP surface: routes, middleware stack and graceful shutdown.

mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::map_response_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::PharmaError;
use crate::state::AppState;

/// Builds the router. Every drug route is mounted under its `/api/...` name
/// and a short alias.
pub fn build_router(state: Arc<AppState>, config: &AppConfig) -> Router {
    let cors = if config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/drug-lookup", post(routes::drug_lookup))
        .route("/lookup", post(routes::drug_lookup))
        .route("/api/drug-search", post(routes::drug_search))
        .route("/search", post(routes::drug_search))
        .route("/api/drug-interactions", post(routes::drug_interactions))
        .route("/interactions", post(routes::drug_interactions))
        .route("/api/drug-chat", post(routes::drug_chat))
        .route("/chat", post(routes::drug_chat))
        .route("/api/similar-drugs", post(routes::similar_drugs))
        .route("/similar", post(routes::similar_drugs))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(map_response_with_state(
            config.request_timeout_secs,
            timeout_error_body,
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Gives the bare 408 from the timeout layer the usual error envelope.
async fn timeout_error_body(State(secs): State<u64>, response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    warn!(secs, "Request exceeded the server timeout");
    let mut response = PharmaError::Timeout {
        api: "request".into(),
        secs,
    }
    .into_response();
    *response.status_mut() = StatusCode::REQUEST_TIMEOUT;
    response
}

/// Binds and serves until Ctrl+C or SIGTERM.
pub async fn start_server(config: AppConfig) -> Result<(), PharmaError> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_router(state.clone(), &config);
    let addr = config.socket_addr()?;

    info!(
        %addr,
        providers = ?state.ai.provider_names(),
        timeout_secs = config.request_timeout_secs,
        cors = config.enable_cors,
        "Starting pharmaref server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
