//! Server error types with HTTP status code mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geoprox_api::ApiError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error type that wraps engine errors and provides HTTP status
/// mapping
#[derive(Error, Debug)]
pub enum ServerError {
    /// Engine-layer error
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Required lat/lng query parameters are absent
    #[error("missing required query parameters: lat, lng")]
    MissingCoordinates,

    /// Generic bad request error
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ServerError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServerError::BadRequest(msg.into())
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 - Bad Request (client errors)
            ServerError::Api(ApiError::InvalidCoordinate { .. }) => StatusCode::BAD_REQUEST,
            ServerError::Api(ApiError::InvalidPagination(_)) => StatusCode::BAD_REQUEST,
            ServerError::MissingCoordinates => StatusCode::BAD_REQUEST,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,

            // 404 - Not Found
            ServerError::Api(ApiError::NotFound(_)) => StatusCode::NOT_FOUND,

            // 429 - Too Many Requests
            ServerError::Api(ApiError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,

            // 503 - upstream deadline exceeded
            ServerError::Api(ApiError::StoreTimeout(_)) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 - Internal Server Error (server-side errors and catch-all)
            ServerError::Api(ApiError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Api(ApiError::Cache(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Api(ApiError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// HTTP status code
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ServerError::Api(ApiError::InvalidCoordinate { lat: 91.0, lng: 0.0 }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::Api(ApiError::InvalidPagination("limit".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ServerError::MissingCoordinates, StatusCode::BAD_REQUEST),
            (
                ServerError::Api(ApiError::NotFound("property x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::Api(ApiError::RateLimited),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ServerError::Api(ApiError::StoreTimeout(Duration::from_secs(5))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServerError::Api(ApiError::Internal("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "wrong status for {err}");
        }
    }
}
