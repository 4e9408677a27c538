//! Health check endpoint

use axum::{extract::State, routing::get, Router};
use serde::Serialize;

use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    status: String,
    version: String,
    rate_limit_per_minute: u32,
}

async fn health_check(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    Ok(ApiResponse::ok(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rate_limit_per_minute: state.config().rate_limit_per_minute,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
