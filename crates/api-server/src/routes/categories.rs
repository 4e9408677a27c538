use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use voyage_core::catalog::{
    CatalogItem, CatalogQuery, Category, CategoryKind, CategoryPatch, Cruise, Hotel, NewCategory,
    Package,
};
use voyage_core::user::UserRole;

use crate::auth::{optional_session, require_role};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{map_core_error, paged, ApiResponse, ApiResult, RouteError};
use crate::state::AppState;
use crate::tenant_scope::{read_scope, request_scope};

#[derive(Debug, Default, Deserialize)]
struct CategoryListQuery {
    #[serde(default)]
    kind: Option<String>,
}

fn parse_kind(raw: &str) -> Result<CategoryKind, RouteError> {
    raw.parse().map_err(map_core_error)
}

/// GET /api/categories?kind=
async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> ApiResult<Vec<Category>> {
    let kind = query.kind.as_deref().map(parse_kind).transpose()?;
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    Ok(ApiResponse::ok(state.db().list_categories(scope, kind).await))
}

/// GET /api/categories/:kind/:slug
async fn get_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((kind, slug)): ApiPath<(String, String)>,
) -> ApiResult<Category> {
    let kind = parse_kind(&kind)?;
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    let category = state
        .db()
        .get_category_by_slug(kind, &slug, scope)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(category))
}

async fn items_page<T: CatalogItem>(
    state: &AppState,
    scope: Option<Uuid>,
    query: &CatalogQuery,
) -> Result<Value, RouteError> {
    let page = state
        .db()
        .list_catalog::<T>(scope, query, false)
        .await
        .map_err(map_core_error)?;
    paged("items", page)
}

/// GET /api/categories/:kind/:slug/items - active items filed under the category
async fn category_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((kind, slug)): ApiPath<(String, String)>,
    ApiQuery(mut query): ApiQuery<CatalogQuery>,
) -> ApiResult<Value> {
    let kind = parse_kind(&kind)?;
    let session = optional_session(&state, &headers).await?;
    let scope = read_scope(&state, &headers, session.as_ref()).await?;
    let category = state
        .db()
        .get_category_by_slug(kind, &slug, scope)
        .await
        .map_err(map_core_error)?;
    query.category = Some(category.slug);

    let data = match kind {
        CategoryKind::Cruise | CategoryKind::Ship => {
            items_page::<Cruise>(&state, scope, &query).await?
        }
        CategoryKind::Hotel => items_page::<Hotel>(&state, scope, &query).await?,
        CategoryKind::Package => items_page::<Package>(&state, scope, &query).await?,
    };
    Ok(ApiResponse::ok(data))
}

/// POST /api/categories - super admins without a tenant scope create shared categories
async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(new): ApiJson<NewCategory>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), RouteError> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let tenant_id = match session.tenant_id() {
        Some(tenant_id) => Some(tenant_id),
        None => request_scope(&state, &headers).await?,
    };
    let category = state
        .db()
        .create_category(tenant_id, new)
        .await
        .map_err(map_core_error)?;
    Ok((StatusCode::CREATED, ApiResponse::ok(category)))
}

/// PUT /api/categories/:id
async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<CategoryPatch>,
) -> ApiResult<Category> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let category = state
        .db()
        .update_category(id, patch, session.admin_scope())
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(category))
}

/// DELETE /api/categories/:id
async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    state
        .db()
        .delete_category(id, session.admin_scope())
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::message("Category deleted"))
}

// The first segment is a category id for writes and a kind for lookups;
// both routes share the parameter name so they can coexist.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{key}",
            axum::routing::put(update_category).delete(delete_category),
        )
        .route("/api/categories/{key}/{slug}", get(get_category))
        .route("/api/categories/{key}/{slug}/items", get(category_items))
}
