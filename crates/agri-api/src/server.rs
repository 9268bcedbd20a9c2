//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use axum::Router;
use http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use agri_core::{ChatSession, Config};

use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub chat: ChatSession,
}

/// CORS policy: any origin unless `api.allowed_origins` lists some
fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origins) = config.api.allowed_origins.as_ref().filter(|o| !o.is_empty()) else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the application router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP API server
pub async fn start_server(config: Config, chat: ChatSession) -> anyhow::Result<()> {
    let port = config.api.port;
    let app = build_router(AppState { config, chat });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
