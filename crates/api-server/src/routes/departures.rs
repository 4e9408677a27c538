//! Cruise departure routes.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use voyage_core::catalog::{Departure, DeparturePatch, NewDeparture, PricedDeparture};
use voyage_core::user::UserRole;

use crate::auth::{optional_session, require_role};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{map_core_error, ApiResponse, ApiResult, RouteError};
use crate::state::AppState;
use crate::tenant_scope::read_scope;

#[derive(Debug, Default, Deserialize)]
struct DepartureListQuery {
    /// Only departures leaving today or later.
    #[serde(default)]
    upcoming: Option<bool>,
}

/// GET /api/cruises/:id/departures
async fn list_departures(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(cruise_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DepartureListQuery>,
) -> ApiResult<Vec<PricedDeparture>> {
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    let from = query
        .upcoming
        .unwrap_or(false)
        .then(|| Utc::now().date_naive());
    let departures = state
        .db()
        .list_departures(cruise_id, scope, from)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(departures))
}

/// GET /api/departures/:id
async fn get_departure(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Departure> {
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    let departure = state
        .db()
        .get_departure(id, scope)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(departure))
}

/// POST /api/departures
async fn create_departure(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(new): ApiJson<NewDeparture>,
) -> Result<(StatusCode, Json<ApiResponse<Departure>>), RouteError> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let departure = state
        .db()
        .create_departure(new, session.admin_scope())
        .await
        .map_err(map_core_error)?;
    Ok((StatusCode::CREATED, ApiResponse::ok(departure)))
}

/// PUT /api/departures/:id
async fn update_departure(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<DeparturePatch>,
) -> ApiResult<Departure> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let departure = state
        .db()
        .update_departure(id, patch, session.admin_scope())
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(departure))
}

/// DELETE /api/departures/:id
async fn delete_departure(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    state
        .db()
        .delete_departure(id, session.admin_scope())
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::message("Departure deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cruises/{id}/departures", get(list_departures))
        .route("/api/departures", axum::routing::post(create_departure))
        .route(
            "/api/departures/{id}",
            get(get_departure)
                .put(update_departure)
                .delete(delete_departure),
        )
}
