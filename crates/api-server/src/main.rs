//! API Server for Voyage
//!
//! REST API for the multi-tenant travel booking backend. Listens on `PORT`
//! (8081 by default) and stores data under `VOYAGE_DATA_DIR`.

mod auth;
mod config;
mod extract;
mod rate_limit;
mod response;
mod routes;
mod state;
mod tenant_scope;

use std::net::SocketAddr;

use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Full application: routes plus rate limiting, CORS and request tracing.
fn build_app(state: AppState) -> Router {
    routes::api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

async fn bootstrap_super_admin(state: &AppState) {
    let config = state.config();
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return;
    };
    match state.db().ensure_super_admin(email, password).await {
        Ok(user) => tracing::info!("Super admin available: {}", user.email),
        Err(err) => tracing::error!("Failed to bootstrap super admin {}: {}", email, err),
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Using data directory: {:?}", config.data_dir);
    let port = config.port;

    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("Failed to initialize application state: {}", err);
            std::process::exit(1);
        }
    };
    bootstrap_super_admin(&state).await;

    let app = build_app(state);

    // Bind to 0.0.0.0 for localhost/127.0.0.1 compatibility
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {}: {}", addr, err);
            std::process::exit(1);
        }
    };
    tracing::info!("REST API listening on {}", addr);

    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", err);
        std::process::exit(1);
    }
}
