//! Per-request tenant scope.
//!
//! `X-Tenant-Domain` wins when present and must name an active tenant.
//! Otherwise the `Host` header scopes the request if it belongs to an active
//! tenant; anything else is unscoped.

use axum::http::{header::HOST, HeaderMap};
use uuid::Uuid;

use crate::auth::AuthSession;
use crate::response::{bad_request, not_found, RouteError};
use crate::state::AppState;

pub const TENANT_DOMAIN_HEADER: &str = "x-tenant-domain";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub async fn request_scope(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Uuid>, RouteError> {
    if let Some(domain) = header_value(headers, TENANT_DOMAIN_HEADER) {
        let tenant = state
            .db()
            .resolve_tenant(domain)
            .await
            .map_err(|_| not_found(format!("Tenant not found for domain '{}'", domain)))?;
        return Ok(Some(tenant.id));
    }

    if let Some(host) = header_value(headers, HOST.as_str()) {
        if let Ok(tenant) = state.db().resolve_tenant(host).await {
            return Ok(Some(tenant.id));
        }
    }
    Ok(None)
}

/// Scope for reads: a signed-in tenant user always sees their own tenant.
pub async fn read_scope(
    state: &AppState,
    headers: &HeaderMap,
    session: Option<&AuthSession>,
) -> Result<Option<Uuid>, RouteError> {
    if let Some(tenant_id) = session.and_then(AuthSession::tenant_id) {
        return Ok(Some(tenant_id));
    }
    request_scope(state, headers).await
}

/// Tenant that newly created records belong to.
pub async fn write_tenant(
    state: &AppState,
    headers: &HeaderMap,
    session: &AuthSession,
) -> Result<Uuid, RouteError> {
    if let Some(tenant_id) = session.tenant_id() {
        return Ok(tenant_id);
    }
    request_scope(state, headers)
        .await?
        .ok_or_else(|| bad_request("Tenant scope required; set the X-Tenant-Domain header"))
}
