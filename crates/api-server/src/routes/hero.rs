//! Hero banner routes.
//!
//! Reads are public and tenant scoped; writes need ADMIN.

use axum::{extract::State, http::HeaderMap, routing::get, Router};
use voyage_core::hero::{HeroContent, HeroInput};
use voyage_core::user::UserRole;

use crate::auth::require_role;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{map_core_error, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::tenant_scope::{read_scope, request_scope};

/// GET /api/hero
async fn list_hero(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<HeroContent>> {
    let scope = read_scope(&state, &headers, None).await?;
    Ok(ApiResponse::ok(state.db().list_hero(scope).await))
}

/// GET /api/hero/:page
async fn get_hero(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(page): ApiPath<String>,
) -> ApiResult<HeroContent> {
    let scope = read_scope(&state, &headers, None).await?;
    let hero = state
        .db()
        .get_hero(&page, scope)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(hero))
}

/// PUT /api/hero/:page - super admins without a tenant scope edit the shared banner
async fn put_hero(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(page): ApiPath<String>,
    ApiJson(input): ApiJson<HeroInput>,
) -> ApiResult<HeroContent> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let tenant_id = match session.tenant_id() {
        Some(tenant_id) => Some(tenant_id),
        None => request_scope(&state, &headers).await?,
    };
    let hero = state
        .db()
        .upsert_hero(tenant_id, &page, input)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok_with_message(hero, "Hero content saved"))
}

/// DELETE /api/hero/:page
async fn delete_hero(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(page): ApiPath<String>,
) -> ApiResult<()> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let tenant_id = match session.tenant_id() {
        Some(tenant_id) => Some(tenant_id),
        None => request_scope(&state, &headers).await?,
    };
    state
        .db()
        .delete_hero(tenant_id, &page)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::message("Hero content deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/hero", get(list_hero))
        .route(
            "/api/hero/{page}",
            get(get_hero).put(put_hero).delete(delete_hero),
        )
}
