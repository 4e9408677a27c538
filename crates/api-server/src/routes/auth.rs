//! Registration, login and the current session.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voyage_core::tenant::PublicTenant;
use voyage_core::user::{NewUser, User, UserSummary};

use crate::auth::{auth_session_from_headers, issue_token};
use crate::extract::ApiJson;
use crate::response::{bad_request, forbidden, map_core_error, ApiResponse, ApiResult, RouteError};
use crate::state::AppState;
use crate::tenant_scope::request_scope;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    expires_at: String,
    user: UserSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user: UserSummary,
    tenant: Option<PublicTenant>,
}

fn format_expiry(exp: usize) -> String {
    DateTime::<Utc>::from_timestamp(exp as i64, 0)
        .map(|value| value.to_rfc3339())
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse, RouteError> {
    let (token, exp) = issue_token(state, user)?;
    Ok(AuthResponse {
        token,
        expires_at: format_expiry(exp),
        user: user.summary(),
    })
}

/// POST /api/auth/register - Create a customer in the request's tenant
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), RouteError> {
    let tenant_id = request_scope(&state, &headers)
        .await?
        .ok_or_else(|| bad_request("Registration requires a tenant domain"))?;

    let user = state
        .db()
        .create_user(NewUser::customer(tenant_id, req.email, req.name, req.password))
        .await
        .map_err(map_core_error)?;
    tracing::info!("Registered customer {} in tenant {}", user.id, tenant_id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(auth_response(&state, &user)?),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let user = state
        .db()
        .authenticate(&req.email, &req.password)
        .await
        .map_err(map_core_error)?;

    if let Some(tenant_id) = user.tenant_id {
        let tenant = state.db().get_tenant(tenant_id).await.map_err(map_core_error)?;
        if !tenant.is_active() {
            return Err(forbidden("Tenant is suspended"));
        }
    }

    Ok(ApiResponse::ok(auth_response(&state, &user)?))
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<MeResponse> {
    let session = auth_session_from_headers(&state, &headers).await?;
    let tenant = match session.tenant_id() {
        Some(tenant_id) => Some(
            state
                .db()
                .get_tenant(tenant_id)
                .await
                .map_err(map_core_error)?
                .public_view(),
        ),
        None => None,
    };

    Ok(ApiResponse::ok(MeResponse {
        user: session.user.summary(),
        tenant,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use voyage_core::tenant::NewTenant;

    use crate::routes::test_support::build_state;

    #[tokio::test]
    async fn register_login_and_me() {
        let (state, _tmp) = build_state().await;
        state
            .db()
            .create_tenant(NewTenant {
                name: "Azure".to_string(),
                domain: Some("azure.example.com".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let app = super::router().with_state(state);

        let register_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/register")
                    .header("Content-Type", "application/json")
                    .header("X-Tenant-Domain", "azure.example.com")
                    .body(Body::from(
                        json!({
                            "email": "Guest@Example.com",
                            "password": "guest-pass-123",
                            "name": "Guest"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(register_response.status(), StatusCode::CREATED);

        let login_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        json!({
                            "email": "guest@example.com",
                            "password": "guest-pass-123"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(login_response.status(), StatusCode::OK);
        let body = to_bytes(login_response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["success"], true);
        assert_eq!(payload["data"]["user"]["role"], "CUSTOMER");
        let token = payload["data"]["token"].as_str().unwrap();

        let me_response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(me_response.status(), StatusCode::OK);
        let body = to_bytes(me_response.into_body(), usize::MAX).await.unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["data"]["tenant"]["domain"], "azure.example.com");
    }

    #[tokio::test]
    async fn register_without_tenant_is_rejected() {
        let (state, _tmp) = build_state().await;
        let app = super::router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/register")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        json!({"email": "a@b.c", "password": "long-enough", "name": "A"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let (state, _tmp) = build_state().await;
        let app = super::router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        json!({"email": "nobody@example.com", "password": "whatever"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
