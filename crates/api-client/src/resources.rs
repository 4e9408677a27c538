//! Typed helpers for each API resource.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use voyage_core::booking::{Booking, BookingQuery, BookingStatusUpdate, NewBooking};
use voyage_core::catalog::{
    CatalogItem, CatalogQuery, Category, CategoryKind, CategoryPatch, Cruise, Departure,
    DeparturePatch, Hotel, NewCategory, NewDeparture, Package, PricedDeparture,
};
use voyage_core::hero::{HeroContent, HeroInput};
use voyage_core::tenant::{NewTenant, PublicTenant, Tenant, TenantPatch, TenantQuery, TenantStats};
use voyage_core::user::UserSummary;
use voyage_core::Page;

use crate::client::{encode_path, ApiClient};
use crate::error::Result;

/// Token issued by register or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub expires_at: String,
    pub user: UserSummary,
}

/// Signed-in user and the tenant they belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: UserSummary,
    pub tenant: Option<PublicTenant>,
}

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn tenants(&self) -> TenantsApi<'_> {
        TenantsApi { client: self }
    }

    pub fn cruises(&self) -> CatalogApi<'_, Cruise> {
        CatalogApi::new(self)
    }

    pub fn hotels(&self) -> CatalogApi<'_, Hotel> {
        CatalogApi::new(self)
    }

    pub fn packages(&self) -> CatalogApi<'_, Package> {
        CatalogApi::new(self)
    }

    pub fn categories(&self) -> CategoriesApi<'_> {
        CategoriesApi { client: self }
    }

    pub fn departures(&self) -> DeparturesApi<'_> {
        DeparturesApi { client: self }
    }

    pub fn bookings(&self) -> BookingsApi<'_> {
        BookingsApi { client: self }
    }

    pub fn hero(&self) -> HeroApi<'_> {
        HeroApi { client: self }
    }
}

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl AuthApi<'_> {
    /// Register a customer in the storefront's tenant and keep the token.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthSession> {
        let session: AuthSession = self
            .client
            .post(
                "/api/auth/register",
                &json!({"email": email, "password": password, "name": name}),
            )
            .await?;
        self.client.set_token(Some(session.token.clone())).await;
        Ok(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session: AuthSession = self
            .client
            .post(
                "/api/auth/login",
                &json!({"email": email, "password": password}),
            )
            .await?;
        self.client.set_token(Some(session.token.clone())).await;
        Ok(session)
    }

    pub async fn me(&self) -> Result<Profile> {
        self.client.get("/api/auth/me").await
    }

    pub async fn logout(&self) {
        self.client.set_token(None).await;
    }
}

pub struct TenantsApi<'a> {
    client: &'a ApiClient,
}

impl TenantsApi<'_> {
    pub async fn list(&self, query: &TenantQuery) -> Result<Page<Tenant>> {
        self.client.get_page("/api/tenants", query, "tenants").await
    }

    pub async fn get(&self, id: Uuid) -> Result<Tenant> {
        self.client.get(&format!("/api/tenants/{}", id)).await
    }

    /// Public lookup used by storefronts to load their runtime settings.
    pub async fn by_domain(&self, domain: &str) -> Result<PublicTenant> {
        self.client
            .get(&encode_path(&["api", "tenants", "domain", domain])?)
            .await
    }

    pub async fn create(&self, new: &NewTenant) -> Result<Tenant> {
        self.client.post("/api/tenants", new).await
    }

    pub async fn update(&self, id: Uuid, patch: &TenantPatch) -> Result<Tenant> {
        self.client.put(&format!("/api/tenants/{}", id), patch).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.client.delete(&format!("/api/tenants/{}", id)).await
    }

    pub async fn stats(&self, id: Uuid) -> Result<TenantStats> {
        self.client.get(&format!("/api/tenants/{}/stats", id)).await
    }

    pub async fn suspend(&self, id: Uuid, reason: Option<&str>) -> Result<Tenant> {
        self.client
            .post(
                &format!("/api/tenants/{}/suspend", id),
                &json!({ "reason": reason }),
            )
            .await
    }

    pub async fn activate(&self, id: Uuid) -> Result<Tenant> {
        self.client
            .post(&format!("/api/tenants/{}/activate", id), &json!({}))
            .await
    }
}

/// Cruises, hotels and packages share one set of endpoints.
pub struct CatalogApi<'a, T> {
    client: &'a ApiClient,
    item: PhantomData<T>,
}

impl<'a, T: CatalogItem> CatalogApi<'a, T> {
    fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            item: PhantomData,
        }
    }

    fn path(suffix: &str) -> String {
        format!("/api/{}{}", T::COLLECTION, suffix)
    }

    pub async fn list(&self, query: &CatalogQuery) -> Result<Page<T>> {
        self.client
            .get_page(&Self::path(""), query, T::COLLECTION)
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<T> {
        self.client.get(&Self::path(&format!("/{}", id))).await
    }

    pub async fn by_slug(&self, slug: &str) -> Result<T> {
        self.client
            .get(&encode_path(&["api", T::COLLECTION, "slug", slug])?)
            .await
    }

    pub async fn create(&self, new: &T::New) -> Result<T> {
        self.client.post(&Self::path(""), new).await
    }

    pub async fn update(&self, id: Uuid, patch: &T::Patch) -> Result<T> {
        self.client
            .put(&Self::path(&format!("/{}", id)), patch)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.client.delete(&Self::path(&format!("/{}", id))).await
    }
}

fn kind_segment(kind: CategoryKind) -> String {
    kind.as_str().to_ascii_lowercase()
}

pub struct CategoriesApi<'a> {
    client: &'a ApiClient,
}

#[derive(Serialize)]
struct KindFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl CategoriesApi<'_> {
    pub async fn list(&self, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
        let filter = KindFilter {
            kind: kind.map(kind_segment),
        };
        self.client.get_with_query("/api/categories", &filter).await
    }

    /// Category list cached for the life of the client; an empty list on failure.
    pub async fn cached_list(&self, kind: Option<CategoryKind>) -> Vec<Category> {
        let key = format!(
            "categories:{}",
            kind.map(kind_segment).unwrap_or_else(|| "all".to_string())
        );
        self.client
            .cache()
            .cached_or(&key, || self.list(kind), Vec::new())
            .await
    }

    pub async fn get(&self, kind: CategoryKind, slug: &str) -> Result<Category> {
        self.client
            .get(&encode_path(&["api", "categories", kind_segment(kind).as_str(), slug])?)
            .await
    }

    /// Active items filed under a category; `T` must match the category kind.
    pub async fn items<T: CatalogItem>(
        &self,
        kind: CategoryKind,
        slug: &str,
        query: &CatalogQuery,
    ) -> Result<Page<T>> {
        self.client
            .get_page(
                &encode_path(&["api", "categories", kind_segment(kind).as_str(), slug, "items"])?,
                query,
                "items",
            )
            .await
    }

    pub async fn create(&self, new: &NewCategory) -> Result<Category> {
        self.client.post("/api/categories", new).await
    }

    pub async fn update(&self, id: Uuid, patch: &CategoryPatch) -> Result<Category> {
        self.client
            .put(&format!("/api/categories/{}", id), patch)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.client
            .delete(&format!("/api/categories/{}", id))
            .await
    }
}

pub struct DeparturesApi<'a> {
    client: &'a ApiClient,
}

#[derive(Serialize)]
struct UpcomingFilter {
    upcoming: bool,
}

impl DeparturesApi<'_> {
    pub async fn for_cruise(
        &self,
        cruise_id: Uuid,
        upcoming: bool,
    ) -> Result<Vec<PricedDeparture>> {
        self.client
            .get_with_query(
                &format!("/api/cruises/{}/departures", cruise_id),
                &UpcomingFilter { upcoming },
            )
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Departure> {
        self.client.get(&format!("/api/departures/{}", id)).await
    }

    pub async fn create(&self, new: &NewDeparture) -> Result<Departure> {
        self.client.post("/api/departures", new).await
    }

    pub async fn update(&self, id: Uuid, patch: &DeparturePatch) -> Result<Departure> {
        self.client
            .put(&format!("/api/departures/{}", id), patch)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.client
            .delete(&format!("/api/departures/{}", id))
            .await
    }
}

pub struct BookingsApi<'a> {
    client: &'a ApiClient,
}

impl BookingsApi<'_> {
    pub async fn create(&self, new: &NewBooking) -> Result<Booking> {
        self.client.post("/api/bookings", new).await
    }

    pub async fn list(&self, query: &BookingQuery) -> Result<Page<Booking>> {
        self.client.get_page("/api/bookings", query, "bookings").await
    }

    pub async fn get(&self, id: Uuid) -> Result<Booking> {
        self.client.get(&format!("/api/bookings/{}", id)).await
    }

    pub async fn update_status(&self, id: Uuid, update: &BookingStatusUpdate) -> Result<Booking> {
        self.client
            .patch(&format!("/api/bookings/{}/status", id), update)
            .await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Booking> {
        self.client
            .post(&format!("/api/bookings/{}/cancel", id), &json!({}))
            .await
    }
}

pub struct HeroApi<'a> {
    client: &'a ApiClient,
}

impl HeroApi<'_> {
    pub async fn list(&self) -> Result<Vec<HeroContent>> {
        self.client.get("/api/hero").await
    }

    pub async fn get(&self, page: &str) -> Result<HeroContent> {
        self.client.get(&encode_path(&["api", "hero", page])?).await
    }

    /// Banner for `page`, fetched once per client; `None` when unavailable.
    pub async fn cached(&self, page: &str) -> Option<HeroContent> {
        self.client
            .cache()
            .cached_or(
                &format!("hero:{}", page),
                || async { self.get(page).await.map(Some) },
                None,
            )
            .await
    }

    pub async fn put(&self, page: &str, input: &HeroInput) -> Result<HeroContent> {
        self.client
            .put(&encode_path(&["api", "hero", page])?, input)
            .await
    }

    pub async fn delete(&self, page: &str) -> Result<()> {
        self.client.delete(&encode_path(&["api", "hero", page])?).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::Utc;
    use serde_json::{json, Value};

    use super::*;
    use crate::config::ClientConfig;

    fn summary() -> Value {
        json!({
            "id": Uuid::new_v4(),
            "tenantId": Uuid::new_v4(),
            "email": "guest@azure.com",
            "name": "Guest",
            "role": "CUSTOMER",
            "createdAt": Utc::now(),
        })
    }

    async fn login() -> Json<Value> {
        Json(json!({
            "success": true,
            "data": {"token": "signed", "expiresAt": Utc::now().to_rfc3339(), "user": summary()}
        }))
    }

    async fn me(headers: HeaderMap) -> axum::response::Response {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer signed") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "message": "Missing Authorization header"})),
            )
                .into_response();
        }
        Json(json!({"success": true, "data": {"user": summary(), "tenant": null}})).into_response()
    }

    async fn hero_page(
        State(hits): State<Arc<AtomicUsize>>,
        Path(page): Path<String>,
    ) -> Json<Value> {
        hits.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        Json(json!({
            "success": true,
            "data": {
                "id": Uuid::new_v4(),
                "tenantId": null,
                "page": page,
                "title": "Sail the Aegean",
                "subtitle": null,
                "description": null,
                "backgroundImage": null,
                "ctaText": null,
                "ctaLink": null,
                "createdAt": now,
                "updatedAt": now,
            }
        }))
    }

    async fn categories(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
        hits.fetch_add(1, Ordering::SeqCst);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": "Internal server error"})),
        )
    }

    async fn tenants() -> Json<Value> {
        Json(json!({
            "success": true,
            "data": {
                "tenants": [],
                "pagination": {"page": 2, "limit": 20, "total": 45, "pages": 3}
            }
        }))
    }

    async fn client_with_mock(hits: Arc<AtomicUsize>) -> ApiClient {
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .route("/api/hero/{page}", get(hero_page))
            .route("/api/categories", get(categories))
            .route("/api/tenants", get(tenants))
            .with_state(hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ApiClient::new(ClientConfig::new(base_url))
    }

    #[tokio::test]
    async fn login_keeps_the_token_for_later_calls() {
        let client = client_with_mock(Arc::default()).await;

        let err = client.auth().me().await.unwrap_err();
        assert_eq!(err.status, 401);

        let session = client.auth().login("guest@azure.com", "password-123").await.unwrap();
        assert_eq!(session.token, "signed");
        let profile = client.auth().me().await.unwrap();
        assert_eq!(profile.user.email, "guest@azure.com");
        assert!(profile.tenant.is_none());

        client.auth().logout().await;
        assert!(client.token().await.is_none());
    }

    #[tokio::test]
    async fn hero_banners_are_cached_per_page() {
        let hits = Arc::new(AtomicUsize::new(0));
        let client = client_with_mock(hits.clone()).await;

        let first = client.hero().cached("home").await.unwrap();
        let second = client.hero().cached("home").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.title, "Sail the Aegean");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        client.hero().cached("cruises").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_category_lists_fall_back_to_empty() {
        let hits = Arc::new(AtomicUsize::new(0));
        let client = client_with_mock(hits.clone()).await;

        assert!(client.categories().cached_list(Some(CategoryKind::Cruise)).await.is_empty());
        assert!(client.categories().cached_list(Some(CategoryKind::Cruise)).await.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn tenant_listing_returns_pagination() {
        let client = client_with_mock(Arc::default()).await;
        let page = client
            .tenants()
            .list(&TenantQuery {
                page: Some(2),
                limit: Some(20),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total, 45);
        assert_eq!(page.pagination.pages, 3);
    }

    #[tokio::test]
    async fn path_values_are_percent_encoded() {
        let client = client_with_mock(Arc::default()).await;
        let banner = client.hero().get("deals/summer?sale#top").await.unwrap();
        assert_eq!(banner.page, "deals/summer?sale#top");
        assert_eq!(
            encode_path(&["api", "tenants", "domain", "a b/c"]).unwrap(),
            "/api/tenants/domain/a%20b%2Fc"
        );
    }

    #[test]
    fn category_kinds_use_lowercase_segments() {
        assert_eq!(kind_segment(CategoryKind::Ship), "ship");
        assert_eq!(kind_segment(CategoryKind::Package), "package");
        assert_eq!(kind_segment(CategoryKind::Cruise), "cruise");
    }
}
