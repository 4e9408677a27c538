//! Tenant user administration.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use voyage_core::user::{NewUser, UserQuery, UserRole, UserSummary};

use crate::auth::require_role;
use crate::extract::{ApiJson, ApiQuery};
use crate::response::{forbidden, map_core_error, paged, ApiResponse, ApiResult, RouteError};
use crate::state::AppState;
use crate::tenant_scope::request_scope;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    email: String,
    name: String,
    password: String,
    #[serde(default)]
    role: Option<UserRole>,
    /// Honoured for super admins only.
    #[serde(default)]
    tenant_id: Option<Uuid>,
}

/// GET /api/users
async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(mut query): ApiQuery<UserQuery>,
) -> ApiResult<Value> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    if !session.is_super_admin() {
        query.tenant_id = session.tenant_id();
    }
    let page = state.db().list_users(&query).await.map(|user| user.summary());
    Ok(ApiResponse::ok(paged("users", page)?))
}

/// POST /api/users - admins create users in their own tenant, up to their own role
async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserSummary>>), RouteError> {
    let session = require_role(&state, &headers, UserRole::Admin).await?;
    let role = req.role.unwrap_or(UserRole::Customer);
    if !session.role().satisfies(role) {
        return Err(forbidden(format!("Cannot create {} users", role.as_str())));
    }

    let tenant_id = if session.is_super_admin() {
        match req.tenant_id {
            Some(tenant_id) => Some(tenant_id),
            None if role == UserRole::SuperAdmin => None,
            None => request_scope(&state, &headers).await?,
        }
    } else {
        session.tenant_id()
    };

    let user = state
        .db()
        .create_user(NewUser {
            tenant_id,
            email: req.email,
            name: req.name,
            password: req.password,
            role,
        })
        .await
        .map_err(map_core_error)?;
    tracing::info!("User {} created by {}", user.id, session.user.id);
    Ok((StatusCode::CREATED, ApiResponse::ok(user.summary())))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/users", get(list_users).post(create_user))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;
    use voyage_core::user::UserRole;

    use crate::routes::test_support::{build_state, read_json, request, seed_tenant, seed_user};

    #[tokio::test]
    async fn admins_manage_users_of_their_tenant() {
        let (state, _tmp) = build_state().await;
        let azure = seed_tenant(&state, "Azure", "azure.example.com").await;
        let coral = seed_tenant(&state, "Coral", "coral.example.com").await;
        let (_, admin) =
            seed_user(&state, Some(azure.id), "admin@azure.com", UserRole::Admin).await;
        seed_user(&state, Some(coral.id), "admin@coral.com", UserRole::Admin).await;
        let app = super::router().with_state(state);

        let created = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/users",
                Some(&admin),
                Some(json!({
                    "email": "agent@azure.com",
                    "name": "Agent",
                    "password": "agent-pass-1",
                    "role": "AGENT"
                })),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let payload = read_json(created).await;
        assert_eq!(payload["data"]["tenantId"], azure.id.to_string());
        assert!(payload["data"].get("passwordHash").is_none());

        let escalation = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/users",
                Some(&admin),
                Some(json!({
                    "email": "root2@azure.com",
                    "name": "Root",
                    "password": "root-pass-12",
                    "role": "SUPER_ADMIN"
                })),
            ))
            .await
            .unwrap();
        assert_eq!(escalation.status(), StatusCode::FORBIDDEN);

        let listed = read_json(
            app.oneshot(request("GET", "/api/users?role=AGENT", Some(&admin), None))
                .await
                .unwrap(),
        )
        .await;
        let users = listed["data"]["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["email"], "agent@azure.com");
    }
}
