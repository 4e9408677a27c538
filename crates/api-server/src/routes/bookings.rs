//! Booking routes.
//!
//! Customers see and cancel their own bookings. Agents and admins see every
//! booking of their tenant and move bookings through their status flow.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::Value;
use uuid::Uuid;
use voyage_core::booking::{Booking, BookingQuery, BookingStatusUpdate, NewBooking};
use voyage_core::user::UserRole;
use voyage_core::{Error, Record};

use crate::auth::{auth_session_from_headers, AuthSession};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{map_core_error, paged, ApiResponse, ApiResult, RouteError};
use crate::state::AppState;

fn can_view(session: &AuthSession, booking: &Booking) -> bool {
    if session.is_super_admin() {
        return true;
    }
    if session.role().is_staff() {
        return session.tenant_id() == Some(booking.tenant_id);
    }
    booking.user_id == session.user.id
}

/// Load a booking the caller may see; anything else is reported missing.
async fn visible_booking(
    state: &AppState,
    session: &AuthSession,
    id: Uuid,
) -> Result<Booking, RouteError> {
    let booking = state.db().get_booking(id).await.map_err(map_core_error)?;
    if !can_view(session, &booking) {
        return Err(map_core_error(Error::not_found(Booking::KIND, id)));
    }
    Ok(booking)
}

/// POST /api/bookings
async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(new): ApiJson<NewBooking>,
) -> Result<(StatusCode, Json<ApiResponse<Booking>>), RouteError> {
    let session = auth_session_from_headers(&state, &headers).await?;
    let booking = state
        .db()
        .create_booking(&session.user, new)
        .await
        .map_err(map_core_error)?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(booking, "Booking created"),
    ))
}

/// GET /api/bookings
async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(mut query): ApiQuery<BookingQuery>,
) -> ApiResult<Value> {
    let session = auth_session_from_headers(&state, &headers).await?;
    if !session.is_super_admin() {
        query.tenant_id = session.tenant_id();
        if !session.role().is_staff() {
            query.user_id = Some(session.user.id);
        }
    }
    let page = state.db().list_bookings(&query).await;
    Ok(ApiResponse::ok(paged("bookings", page)?))
}

/// GET /api/bookings/:id
async fn get_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Booking> {
    let session = auth_session_from_headers(&state, &headers).await?;
    Ok(ApiResponse::ok(visible_booking(&state, &session, id).await?))
}

/// PATCH /api/bookings/:id/status
async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<BookingStatusUpdate>,
) -> ApiResult<Booking> {
    let session = auth_session_from_headers(&state, &headers).await?;
    session.require(UserRole::Agent)?;
    visible_booking(&state, &session, id).await?;
    let booking = state
        .db()
        .update_booking_status(id, update)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok(booking))
}

/// POST /api/bookings/:id/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Booking> {
    let session = auth_session_from_headers(&state, &headers).await?;
    visible_booking(&state, &session, id).await?;
    let booking = state
        .db()
        .cancel_booking(id)
        .await
        .map_err(map_core_error)?;
    Ok(ApiResponse::ok_with_message(booking, "Booking cancelled"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/{id}", get(get_booking))
        .route("/api/bookings/{id}/status", patch(update_status))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;
    use voyage_core::catalog::{NewPackage, Package};
    use voyage_core::user::UserRole;

    use crate::routes::test_support::{build_state, read_json, request, seed_tenant, seed_user};

    #[tokio::test]
    async fn booking_flow_is_priced_and_guarded() {
        let (state, _tmp) = build_state().await;
        let tenant = seed_tenant(&state, "Azure", "azure.example.com").await;
        let (_, guest) =
            seed_user(&state, Some(tenant.id), "guest@azure.com", UserRole::Customer).await;
        let (_, other) =
            seed_user(&state, Some(tenant.id), "other@azure.com", UserRole::Customer).await;
        let (_, agent) =
            seed_user(&state, Some(tenant.id), "agent@azure.com", UserRole::Agent).await;
        let package = state
            .db()
            .create_catalog::<Package>(
                tenant.id,
                NewPackage {
                    name: "Lisbon Long Weekend".to_string(),
                    destination: "Lisbon".to_string(),
                    duration: 4,
                    price: 650.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let app = super::router().with_state(state);

        let created = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/bookings",
                Some(&guest),
                Some(json!({
                    "itemKind": "PACKAGE",
                    "itemId": package.id,
                    "guests": 2,
                    "totalAmount": 1.0
                })),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let payload = read_json(created).await;
        assert_eq!(payload["data"]["totalAmount"], 1300.0);
        assert_eq!(payload["data"]["status"], "PENDING");
        let id = payload["data"]["id"].as_str().unwrap().to_string();

        let hidden = app
            .clone()
            .oneshot(request("GET", &format!("/api/bookings/{}", id), Some(&other), None))
            .await
            .unwrap();
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

        let by_customer = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/api/bookings/{}/status", id),
                Some(&guest),
                Some(json!({"status": "CONFIRMED"})),
            ))
            .await
            .unwrap();
        assert_eq!(by_customer.status(), StatusCode::FORBIDDEN);

        let cancelled = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/bookings/{}/cancel", id),
                Some(&guest),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(cancelled.status(), StatusCode::OK);

        let confirm = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/api/bookings/{}/status", id),
                Some(&agent),
                Some(json!({"status": "CONFIRMED"})),
            ))
            .await
            .unwrap();
        assert_eq!(confirm.status(), StatusCode::BAD_REQUEST);

        let own = read_json(
            app.clone()
                .oneshot(request("GET", "/api/bookings", Some(&other), None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(own["data"]["pagination"]["total"], 0);

        let tenant_wide = read_json(
            app.oneshot(request("GET", "/api/bookings?status=CANCELLED", Some(&agent), None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(tenant_wide["data"]["bookings"].as_array().unwrap().len(), 1);
    }
}
