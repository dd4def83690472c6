//! API error types with HTTP response mapping.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cad_client::CadError;
use domain::{AssemblyError, DomainError, ErrorKind};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Caller identity missing or malformed.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
    /// CAD service failure.
    Cad(CadError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Cad(err) => cad_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        metrics::counter!("api_errors_total", "status" => status.as_str().to_string()).increment(1);
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Infrastructure => {
            tracing::error!(error = %err, "domain infrastructure failure");
            match err {
                DomainError::Assembly(AssemblyError::MalformedSplitResponse(_)) => {
                    StatusCode::BAD_GATEWAY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    };
    (status, err.to_string())
}

fn cad_error_to_response(err: CadError) -> (StatusCode, String) {
    tracing::error!(error = %err, "CAD split failed");
    let status = match err {
        CadError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        CadError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CadError::Transport(_) | CadError::Status { .. } | CadError::InvalidResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AssemblyError> for ApiError {
    fn from(err: AssemblyError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<CadError> for ApiError {
    fn from(err: CadError) -> Self {
        ApiError::Cad(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
