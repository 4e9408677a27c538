//! Response envelope and route error mapping
//!
//! Every endpoint answers `{success, data?, message?}`. Handlers return
//! `Result<_, RouteError>` and core errors are mapped here in one place.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{Map, Value};
use voyage_core::{Error, Page};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.into()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, RouteError>;

pub fn route_error(status: StatusCode, message: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> RouteError {
    route_error(StatusCode::BAD_REQUEST, message)
}

pub fn unauthorized(message: impl Into<String>) -> RouteError {
    route_error(StatusCode::UNAUTHORIZED, message)
}

pub fn forbidden(message: impl Into<String>) -> RouteError {
    route_error(StatusCode::FORBIDDEN, message)
}

pub fn not_found(message: impl Into<String>) -> RouteError {
    route_error(StatusCode::NOT_FOUND, message)
}

pub fn internal_error(error: impl std::fmt::Display) -> RouteError {
    tracing::error!("Internal error: {}", error);
    route_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub fn map_core_error(err: Error) -> RouteError {
    match err {
        Error::NotFound { .. } => not_found(err.to_string()),
        Error::Duplicate(message) | Error::HasDependents(message) => bad_request(message),
        Error::InvalidInput(message) => bad_request(message),
        Error::Unauthorized(message) => unauthorized(message),
        Error::Forbidden(message) => forbidden(message),
        Error::Io(_) | Error::Serialization(_) | Error::Storage(_) => internal_error(err),
    }
}

/// Listing payload `{<key>: [...], pagination}`.
pub fn paged<T: Serialize>(key: &str, page: Page<T>) -> Result<Value, RouteError> {
    let mut data = Map::new();
    data.insert(
        key.to_string(),
        serde_json::to_value(page.items).map_err(internal_error)?,
    );
    data.insert(
        "pagination".to_string(),
        serde_json::to_value(page.pagination).map_err(internal_error)?,
    );
    Ok(Value::Object(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::PageRequest;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (Error::not_found("Tenant", "x"), StatusCode::NOT_FOUND),
            (Error::Duplicate("slug taken".into()), StatusCode::BAD_REQUEST),
            (Error::HasDependents("has users".into()), StatusCode::BAD_REQUEST),
            (Error::invalid("bad"), StatusCode::BAD_REQUEST),
            (Error::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (Error::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(map_core_error(err).0, status);
        }
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let (_, Json(body)) = map_core_error(Error::Storage("/secret/path".into()));
        assert_eq!(body.message, "Internal server error");
        assert!(!body.success);
    }

    #[test]
    fn paged_uses_collection_key() {
        let page = PageRequest::new(2, 2).apply(vec![1, 2, 3]);
        let value = paged("cruises", page).unwrap();
        assert_eq!(value["cruises"], serde_json::json!([3]));
        assert_eq!(value["pagination"]["pages"], 2);
        assert_eq!(value["pagination"]["total"], 3);
    }
}
