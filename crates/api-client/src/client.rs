use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use voyage_core::{Page, Pagination};

use crate::cache::SessionCache;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::retry::parse_retry_after;

pub const TENANT_DOMAIN_HEADER: &str = "x-tenant-domain";

/// Absolute path from `segments`, each percent-encoded so that `/`, `?` and
/// `#` stay inside their segment.
pub(crate) fn encode_path(segments: &[&str]) -> Result<String> {
    let mut url = Url::parse("http://localhost/").map_err(ApiError::transport)?;
    url.path_segments_mut()
        .map_err(|()| ApiError::decode("URL cannot hold a path"))?
        .clear()
        .extend(segments);
    Ok(url.path().to_string())
}

type SharedResponse = Shared<BoxFuture<'static, Result<Value>>>;

struct ClientInner {
    http: Client,
    config: ClientConfig,
    token: RwLock<Option<String>>,
    /// GET requests still awaiting a response, keyed by `METHOD url`.
    in_flight: Mutex<HashMap<String, SharedResponse>>,
    cache: SessionCache,
}

/// Handle to the API; clones share the connection pool, token and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                token: RwLock::new(None),
                in_flight: Mutex::new(HashMap::new()),
                cache: SessionCache::new(),
            }),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &SessionCache {
        &self.inner.cache
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.inner.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.token.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.config.base_url, path)
    }

    /// Absolute URL for `path` with `query` serialized into the query string.
    /// Unset optional fields are left out.
    fn url_with_query<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<String> {
        let mut url = Url::parse(&self.url(path)).map_err(ApiError::transport)?;
        let query = serde_json::to_value(query).map_err(ApiError::decode)?;
        let pairs: Vec<(String, String)> = match query {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(key, value)| match value {
                    Value::Null => None,
                    Value::String(text) => Some((key, text)),
                    other => Some((key, other.to_string())),
                })
                .collect(),
            _ => Vec::new(),
        };
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url.to_string())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let data = self.get_shared(self.url(path)).await?;
        decode(data)
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let data = self.get_shared(self.url_with_query(path, query)?).await?;
        decode(data)
    }

    /// GET a listing whose items sit under `key` next to `pagination`.
    pub async fn get_page<T, Q>(&self, path: &str, query: &Q, key: &str) -> Result<Page<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let data = self.get_shared(self.url_with_query(path, query)?).await?;
        into_page(data, key)
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Some(encode(body)?)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, Some(encode(body)?)).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, path, Some(encode(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send::<Value>(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let data = self.execute(method, &self.url(path), body.as_ref()).await?;
        decode(data)
    }

    /// Join an identical GET that is already in flight, or start one.
    async fn get_shared(&self, url: String) -> Result<Value> {
        let key = format!("GET {}", url);
        let shared = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!("Joining in-flight request: {}", key);
                    existing.clone()
                }
                None => {
                    let client = self.clone();
                    let entry_key = key.clone();
                    let request = async move {
                        let result = client.execute(Method::GET, &url, None).await;
                        client.inner.in_flight.lock().await.remove(&entry_key);
                        result
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, request.clone());
                    request
                }
            }
        };
        shared.await
    }

    /// Send one request, retrying while the server answers 429.
    async fn execute(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let retry = self.inner.config.retry;
        let mut attempt = 0;
        loop {
            let mut request = self.inner.http.request(method.clone(), url);
            if let Some(domain) = &self.inner.config.tenant_domain {
                request = request.header(TENANT_DOMAIN_HEADER, domain);
            }
            if let Some(token) = self.token().await {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(ApiError::transport)?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS && attempt < retry.max_retries {
                let delay = retry.delay_for(attempt, parse_retry_after(response.headers()));
                attempt += 1;
                warn!(
                    "Rate limited on {} {}; retry {}/{} in {:?}",
                    method, url, attempt, retry.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            return read_envelope(response).await;
        }
    }
}

/// Unwrap `{success, data, message}`, turning failures into [`ApiError`].
async fn read_envelope(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(ApiError::transport)?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    let failed = !status.is_success()
        || body
            .as_ref()
            .and_then(|body| body.get("success"))
            .and_then(Value::as_bool)
            == Some(false);
    if failed {
        let message = body
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        return Err(ApiError::new(status.as_u16(), message, body));
    }

    match body {
        Some(mut body) => Ok(body
            .as_object_mut()
            .and_then(|object| object.remove("data"))
            .unwrap_or(Value::Null)),
        None => Err(ApiError::new(
            status.as_u16(),
            "Response body is not JSON",
            None,
        )),
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(ApiError::decode)
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(ApiError::decode)
}

fn into_page<T: DeserializeOwned>(data: Value, key: &str) -> Result<Page<T>> {
    let Value::Object(mut object) = data else {
        return Err(ApiError::decode("listing is not an object"));
    };
    let items = object
        .remove(key)
        .ok_or_else(|| ApiError::decode(format!("listing has no '{}'", key)))?;
    let pagination: Pagination = object
        .remove("pagination")
        .ok_or_else(|| ApiError::decode("listing has no pagination"))
        .and_then(decode)?;
    Ok(Page {
        items: decode(items)?,
        pagination,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::{header::RETRY_AFTER, HeaderMap};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::retry::RetryPolicy;

    type Hits = Arc<AtomicUsize>;

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
        }
    }

    async fn always_limited(State(hits): State<Hits>) -> impl IntoResponse {
        hits.fetch_add(1, Ordering::SeqCst);
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, "0")],
            Json(json!({"success": false, "message": "Too many requests"})),
        )
    }

    async fn limited_once(State(hits): State<Hits>) -> axum::response::Response {
        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
            return always_limited(State(Arc::new(AtomicUsize::new(0))))
                .await
                .into_response();
        }
        Json(json!({"success": true, "data": {"name": "Azure"}})).into_response()
    }

    async fn slow(State(hits): State<Hits>) -> Json<Value> {
        hits.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(150)).await;
        Json(json!({"success": true, "data": [1, 2, 3]}))
    }

    async fn echo_headers(headers: HeaderMap) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "success": true,
            "data": {
                "authorization": header("authorization"),
                "tenantDomain": header(TENANT_DOMAIN_HEADER),
            }
        }))
    }

    async fn missing() -> impl IntoResponse {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "Tenant not found"})),
        )
    }

    fn mock_app(hits: Hits) -> Router {
        Router::new()
            .route("/limited", get(always_limited))
            .route("/limited-once", get(limited_once))
            .route("/slow", get(slow))
            .route("/echo", get(echo_headers))
            .route("/missing", get(missing))
            .with_state(hits)
    }

    async fn client_for(hits: &Hits) -> ApiClient {
        let base_url = spawn_server(mock_app(hits.clone())).await;
        ApiClient::new(ClientConfig::new(base_url).with_retry(fast_retry()))
    }

    #[tokio::test]
    async fn gives_up_after_three_retries() {
        let hits = Hits::default();
        let client = client_for(&hits).await;

        let err = client.get::<Value>("/limited").await.unwrap_err();
        assert_eq!(err.status, 429);
        assert_eq!(err.message, "Too many requests");
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn retries_until_the_server_accepts() {
        let hits = Hits::default();
        let client = client_for(&hits).await;

        let data: Value = client.get("/limited-once").await.unwrap();
        assert_eq!(data["name"], "Azure");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_identical_gets_share_one_request() {
        let hits = Hits::default();
        let client = client_for(&hits).await;

        let results =
            futures::future::join_all((0..5).map(|_| client.get::<Vec<u32>>("/slow"))).await;
        for result in results {
            assert_eq!(result.unwrap(), vec![1, 2, 3]);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Completed requests leave the in-flight map.
        client.get::<Vec<u32>>("/slow").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sends_token_and_tenant_domain() {
        let hits = Hits::default();
        let base_url = spawn_server(mock_app(hits)).await;
        let client =
            ApiClient::new(ClientConfig::new(base_url).with_tenant_domain("azure.example.com"));
        client.set_token(Some("abc".to_string())).await;

        let data: Value = client.get("/echo").await.unwrap();
        assert_eq!(data["authorization"], "Bearer abc");
        assert_eq!(data["tenantDomain"], "azure.example.com");
    }

    #[tokio::test]
    async fn error_envelopes_and_transport_failures_are_typed() {
        let hits = Hits::default();
        let client = client_for(&hits).await;

        let err = client.get::<Value>("/missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message, "Tenant not found");
        assert_eq!(err.body.unwrap()["success"], false);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let offline = ApiClient::new(ClientConfig::new(closed));
        let err = offline.get::<Value>("/health").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn query_strings_skip_unset_fields() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:8081"));
        let query = voyage_core::tenant::TenantQuery {
            page: Some(2),
            limit: Some(20),
            search: Some("blue sea".to_string()),
            ..Default::default()
        };
        let url = client.url_with_query("/api/tenants", &query).unwrap();
        assert!(url.starts_with("http://localhost:8081/api/tenants?"));
        assert!(url.contains("page=2"));
        assert!(url.contains("limit=20"));
        assert!(url.contains("search=blue+sea"));
        assert!(!url.contains("status"));

        let bare = client
            .url_with_query("/api/tenants", &voyage_core::tenant::TenantQuery::default())
            .unwrap();
        assert_eq!(bare, "http://localhost:8081/api/tenants");
    }

    #[test]
    fn listings_decode_into_pages() {
        let page: Page<String> = into_page(
            json!({
                "tenants": ["a", "b"],
                "pagination": {"page": 1, "limit": 2, "total": 3, "pages": 2}
            }),
            "tenants",
        )
        .unwrap();
        assert_eq!(page.items, vec!["a", "b"]);
        assert_eq!(page.pagination.pages, 2);
        assert!(into_page::<String>(json!({"items": []}), "tenants").is_err());
    }
}
