use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::auth::errors::AuthError;

pub mod admin_tokens;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod register;

/// Error response carried to the client.
///
/// Mirrors the error contract: an HTTP status, the stable numeric error
/// code, a message, optional per-field validation failures, the request
/// path, and a timestamp. Infrastructure failures are reported with a
/// generic message; the detail stays in the logs.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    code: u16,
    message: String,
    field_errors: Option<BTreeMap<String, String>>,
    path: String,
}

#[derive(Debug, Clone, Serialize)]
struct ApiErrorBody {
    status: u16,
    code: u16,
    message: String,
    #[serde(rename = "fieldErrors", skip_serializing_if = "Option::is_none")]
    field_errors: Option<BTreeMap<String, String>>,
    path: String,
    timestamp: DateTime<Utc>,
}

impl ApiError {
    pub fn from_auth(err: AuthError, path: &str) -> Self {
        let status = match &err {
            AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::TokenRevoked
            | AuthError::UnauthorizedAccess => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions | AuthError::UserInactive => StatusCode::FORBIDDEN,
            AuthError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::UserAlreadyExists(_) => StatusCode::CONFLICT,
            AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let code = err.code();
        let (message, field_errors) = match err {
            AuthError::Validation { field_errors } => {
                ("Validation error".to_string(), Some(field_errors))
            }
            AuthError::Database(detail) => {
                tracing::error!(path, "Database error: {}", detail);
                ("Internal server error".to_string(), None)
            }
            AuthError::Timeout(detail) => {
                tracing::error!(path, "Store timeout: {}", detail);
                ("Service temporarily unavailable".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        Self {
            status,
            code,
            message,
            field_errors,
            path: path.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>, path: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: 1001,
            message: message.into(),
            field_errors: None,
            path: path.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            status: self.status.as_u16(),
            code: self.code,
            message: self.message,
            field_errors: self.field_errors,
            path: self.path,
            timestamp: Utc::now(),
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthError::TokenRevoked, StatusCode::UNAUTHORIZED),
            (
                AuthError::InsufficientPermissions,
                StatusCode::FORBIDDEN,
            ),
            (AuthError::UserInactive, StatusCode::FORBIDDEN),
            (
                AuthError::UserNotFound("x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                AuthError::UserAlreadyExists("x".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                AuthError::Database("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AuthError::Timeout("slow".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from_auth(err, "/api/v1/auth/login").status, expected);
        }
    }

    #[test]
    fn test_infrastructure_detail_not_leaked() {
        let err = ApiError::from_auth(
            AuthError::Database("password authentication failed for user".to_string()),
            "/api/v1/auth/login",
        );
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_validation_carries_field_errors() {
        let mut field_errors = BTreeMap::new();
        field_errors.insert("username".to_string(), "too short".to_string());
        let err = ApiError::from_auth(
            AuthError::Validation { field_errors },
            "/api/v1/auth/register",
        );

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, 1001);
        assert!(err.field_errors.is_some());
    }
}
