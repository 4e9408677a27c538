//! Cruise, hotel and package routes
//!
//! One generic router per [`CatalogItem`] type, mounted at
//! `/api/<collection>`. Reads are public and tenant scoped; writes need ADMIN.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use uuid::Uuid;
use voyage_core::catalog::{CatalogItem, CatalogQuery};
use voyage_core::user::UserRole;
use voyage_core::{Error, Record};

use crate::auth::{optional_session, require_role, AuthSession};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{map_core_error, paged, ApiResponse, ApiResult, RouteError};
use crate::state::AppState;
use crate::tenant_scope::{read_scope, write_tenant};

fn is_staff(session: Option<&AuthSession>) -> bool {
    session.is_some_and(|session| session.role().is_staff())
}

/// Hide inactive items from non-staff callers as if they did not exist.
fn visible<T: CatalogItem>(item: T, session: Option<&AuthSession>) -> Result<T, RouteError> {
    if item.is_active() || is_staff(session) {
        Ok(item)
    } else {
        Err(map_core_error(Error::not_found(T::KIND, item.id())))
    }
}

/// GET /api/<collection>
async fn list_items<T: CatalogItem>(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResult<Value> {
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    let include_inactive = query.include_inactive.unwrap_or(false) && is_staff(session.as_ref());
    let page = state
        .db()
        .list_catalog::<T>(scope, &query, include_inactive)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(paged(T::COLLECTION, page)?))
}

/// GET /api/<collection>/:id
async fn get_item<T: CatalogItem>(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<T> {
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    let item = state
        .db()
        .get_catalog::<T>(id, scope)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(visible(item, session.as_ref())?))
}

/// GET /api/<collection>/slug/:slug
async fn get_item_by_slug<T: CatalogItem>(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<T> {
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    let item = state
        .db()
        .get_catalog_by_slug::<T>(&slug, scope)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(visible(item, session.as_ref())?))
}

/// POST /api/<collection>
async fn create_item<T: CatalogItem>(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(new): ApiJson<T::New>,
) -> Result<(StatusCode, Json<ApiResponse<T>>), RouteError> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let tenant_id = write_tenant(&state, &headers, &session).await?;
    let item = state
        .db()
        .create_catalog::<T>(tenant_id, new)
        .await
        .map_err(map_core_error)?;
    Ok((StatusCode::CREATED, ApiResponse::ok(item)))
}

/// PUT /api/<collection>/:id
async fn update_item<T: CatalogItem>(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<T::Patch>,
) -> ApiResult<T> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let item = state
        .db()
        .update_catalog::<T>(id, patch, session.admin_scope())
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(item))
}

/// DELETE /api/<collection>/:id
async fn delete_item<T: CatalogItem>(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    state
        .db()
        .delete_catalog::<T>(id, session.admin_scope())
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::message(format!("{} deleted", T::KIND)))
}

pub fn router<T: CatalogItem>() -> Router<AppState> {
    let base = format!("/api/{}", T::COLLECTION);
    Router::new()
        .route(&base, get(list_items::<T>).post(create_item::<T>))
        .route(&format!("{}/slug/{{slug}}", base), get(get_item_by_slug::<T>))
        .route(
            &format!("{}/{{id}}", base),
            get(get_item::<T>)
                .put(update_item::<T>)
                .delete(delete_item::<T>),
        )
}
