//! Route handlers

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod categories;
pub mod departures;
pub mod health;
pub mod hero;
pub mod tenants;
pub mod users;

use axum::Router;
use voyage_core::catalog::{Cruise, Hotel, Package};

use crate::state::AppState;

/// Every API route, without middleware.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(tenants::router())
        .merge(hero::router())
        .merge(catalog::router::<Cruise>())
        .merge(catalog::router::<Hotel>())
        .merge(catalog::router::<Package>())
        .merge(categories::router())
        .merge(departures::router())
        .merge(bookings::router())
        .merge(users::router())
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        response::Response,
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use uuid::Uuid;
    use voyage_core::tenant::{NewTenant, Tenant};
    use voyage_core::user::{NewUser, User, UserRole};

    use crate::auth::issue_token;
    use crate::config::ServerConfig;
    use crate::state::AppState;

    pub async fn build_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            jwt_secret: "test-secret".to_string(),
            rate_limit_per_minute: 0,
            ..Default::default()
        };
        let state = AppState::new(config).await.unwrap();
        (state, temp_dir)
    }

    pub async fn seed_tenant(state: &AppState, name: &str, domain: &str) -> Tenant {
        state
            .db()
            .create_tenant(NewTenant {
                name: name.to_string(),
                domain: Some(domain.to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    /// Create a user and return it with a bearer token.
    pub async fn seed_user(
        state: &AppState,
        tenant_id: Option<Uuid>,
        email: &str,
        role: UserRole,
    ) -> (User, String) {
        let user = state
            .db()
            .create_user(NewUser {
                tenant_id,
                email: email.to_string(),
                name: email.to_string(),
                password: "password-123".to_string(),
                role,
            })
            .await
            .unwrap();
        let (token, _) = issue_token(state, &user).unwrap();
        (user, token)
    }

    pub async fn super_admin(state: &AppState) -> String {
        seed_user(state, None, "root@example.com", UserRole::SuperAdmin)
            .await
            .1
    }

    pub fn request(
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn read_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
