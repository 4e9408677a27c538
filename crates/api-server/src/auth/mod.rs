//! Bearer-token sessions and role gating.

mod jwt;

use jwt::{issue_user_jwt, verify_user_jwt};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;
use uuid::Uuid;
use voyage_core::user::{User, UserRole};

use crate::response::{forbidden, internal_error, unauthorized, RouteError};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,
    #[error("Authorization must be Bearer token")]
    MalformedHeader,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// The authenticated caller, re-read from the store on every request.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
}

impl AuthSession {
    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.user.tenant_id
    }

    pub fn is_super_admin(&self) -> bool {
        self.user.role == UserRole::SuperAdmin
    }

    pub fn require(&self, role: UserRole) -> Result<(), RouteError> {
        if !self.user.role.satisfies(role) {
            return Err(forbidden(format!("{} role required", role.as_str())));
        }
        Ok(())
    }

    /// Tenant restriction for administrative reads and writes: own tenant
    /// for tenant users, unrestricted for super admins.
    pub fn admin_scope(&self) -> Option<Uuid> {
        self.user.tenant_id
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim()))
        .ok_or(AuthError::MalformedHeader)
}

/// Resolve the session if an Authorization header is present.
///
/// A present but invalid token is an error, never treated as anonymous.
pub async fn optional_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthSession>, RouteError> {
    let Some(token) = bearer_token(headers).map_err(|err| unauthorized(err.to_string()))? else {
        return Ok(None);
    };
    let claims = verify_user_jwt(&state.config().jwt_secret, token)
        .map_err(|err| unauthorized(err.to_string()))?;
    let user = state
        .db()
        .users
        .get(claims.sub)
        .await
        .ok_or_else(|| unauthorized("User not found"))?;

    if let Some(tenant_id) = user.tenant_id {
        let tenant = state
            .db()
            .tenants
            .get(tenant_id)
            .await
            .ok_or_else(|| unauthorized("Tenant not found"))?;
        if !tenant.is_active() {
            return Err(forbidden("Tenant is suspended"));
        }
    }
    Ok(Some(AuthSession { user }))
}

pub async fn auth_session_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthSession, RouteError> {
    optional_session(state, headers)
        .await?
        .ok_or_else(|| unauthorized(AuthError::MissingToken.to_string()))
}

pub async fn require_role(
    state: &AppState,
    headers: &HeaderMap,
    role: UserRole,
) -> Result<AuthSession, RouteError> {
    let session = auth_session_from_headers(state, headers).await?;
    session.require(role)?;
    Ok(session)
}

pub fn issue_token(state: &AppState, user: &User) -> Result<(String, usize), RouteError> {
    issue_user_jwt(
        &state.config().jwt_secret,
        user,
        state.config().token_ttl_seconds,
    )
    .map_err(internal_error)
}
