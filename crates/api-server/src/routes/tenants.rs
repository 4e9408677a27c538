//! Tenant administration routes.
//!
//! Everything here is restricted to super admins except the public domain
//! lookup used by storefronts to bootstrap themselves.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use voyage_core::tenant::{NewTenant, PublicTenant, Tenant, TenantPatch, TenantQuery, TenantStats};
use voyage_core::user::UserRole;

use crate::auth::require_role;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{bad_request, map_core_error, paged, ApiResponse, ApiResult, RouteError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuspendRequest {
    #[serde(default)]
    reason: Option<String>,
}

/// GET /api/tenants
async fn list_tenants(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<TenantQuery>,
) -> ApiResult<Value> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    let page = state.db().list_tenants(&query).await;
    Ok(ApiResponse::ok(paged("tenants", page)?))
}

/// POST /api/tenants
async fn create_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<NewTenant>,
) -> Result<(StatusCode, Json<ApiResponse<Tenant>>), RouteError> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    let tenant = state.db().create_tenant(req).await.map_err(map_core_error)?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(tenant, "Tenant created"),
    ))
}

/// GET /api/tenants/domain/:domain - public
async fn get_tenant_by_domain(
    State(state): State<AppState>,
    ApiPath(domain): ApiPath<String>,
) -> ApiResult<PublicTenant> {
    let tenant = state
        .db()
        .resolve_tenant(&domain)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(tenant))
}

/// GET /api/tenants/:id
async fn get_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Tenant> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    let tenant = state.db().get_tenant(id).await.map_err(map_core_error)?;
    Ok(ApiResponse::ok(tenant))
}

/// PUT /api/tenants/:id
async fn update_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<TenantPatch>,
) -> ApiResult<Tenant> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    let tenant = state
        .db()
        .update_tenant(id, patch)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok_with_message(tenant, "Tenant updated"))
}

/// DELETE /api/tenants/:id
async fn delete_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    state.db().delete_tenant(id).await.map_err(map_core_error)?;
    Ok(ApiResponse::message("Tenant deleted"))
}

/// GET /api/tenants/:id/stats
async fn tenant_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<TenantStats> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    let stats = state.db().tenant_stats(id).await.map_err(map_core_error)?;
    Ok(ApiResponse::ok(stats))
}

/// POST /api/tenants/:id/suspend - body `{reason?}` is optional
async fn suspend_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    body: Bytes,
) -> ApiResult<Tenant> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    let req: SuspendRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SuspendRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| bad_request(format!("Invalid body: {}", err)))?
    };
    let tenant = state
        .db()
        .suspend_tenant(id, req.reason)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok_with_message(tenant, "Tenant suspended"))
}

/// POST /api/tenants/:id/activate
async fn activate_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Tenant> {
    require_role(&state, &headers, UserRole::SuperAdmin).await?;
    let tenant = state.db().activate_tenant(id).await.map_err(map_core_error)?;
    Ok(ApiResponse::ok_with_message(tenant, "Tenant activated"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tenants", get(list_tenants).post(create_tenant))
        .route("/api/tenants/domain/{domain}", get(get_tenant_by_domain))
        .route(
            "/api/tenants/{id}",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        .route("/api/tenants/{id}/stats", get(tenant_stats))
        .route("/api/tenants/{id}/suspend", post(suspend_tenant))
        .route("/api/tenants/{id}/activate", post(activate_tenant))
}
