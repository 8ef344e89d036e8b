use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::errors::RepositoryError;

/// Top-level error for authentication and authorization operations.
///
/// Each variant carries a stable numeric code so transport layers map errors
/// through a lookup rather than type dispatch. Authentication sub-reasons
/// exist for internal logging; the caller-visible contract stays uniform
/// (a login failure never reveals whether the identifier or the password
/// was wrong).
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // Authentication failures
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication token has expired")]
    TokenExpired,

    #[error("Invalid authentication token")]
    TokenInvalid,

    #[error("Authentication token has been revoked")]
    TokenRevoked,

    #[error("Unauthorized access")]
    UnauthorizedAccess,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("User account is inactive")]
    UserInactive,

    // User lifecycle failures
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    // Accumulated field-level validation failures
    #[error("Validation error")]
    Validation {
        field_errors: BTreeMap<String, String>,
    },

    // Infrastructure failures, bubbled untouched
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store operation timed out: {0}")]
    Timeout(String),
}

impl AuthError {
    /// Stable numeric error code.
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation { .. } => 1001,
            AuthError::UserNotFound(_) => 2100,
            AuthError::UserAlreadyExists(_) => 2101,
            AuthError::UserInactive => 2105,
            AuthError::InvalidCredentials => 2200,
            AuthError::TokenExpired => 2201,
            AuthError::TokenInvalid => 2202,
            AuthError::TokenRevoked => 2203,
            AuthError::UnauthorizedAccess => 2204,
            AuthError::InsufficientPermissions => 2205,
            AuthError::Database(_) => 3000,
            AuthError::Timeout(_) => 3001,
        }
    }

    /// Whether this is a definitive denial rather than an infrastructure
    /// failure.
    pub fn is_denial(&self) -> bool {
        !matches!(self, AuthError::Database(_) | AuthError::Timeout(_))
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(msg) => AuthError::Database(msg),
            RepositoryError::Timeout(msg) => AuthError::Timeout(msg),
            // Constraint races on users degrade to the same conflict the
            // pre-checks report
            RepositoryError::UniqueViolation(constraint) => {
                AuthError::UserAlreadyExists(constraint)
            }
        }
    }
}

impl From<auth::JwtError> for AuthError {
    fn from(err: auth::JwtError) -> Self {
        match err {
            auth::JwtError::TokenExpired => AuthError::TokenExpired,
            auth::JwtError::InvalidToken(_) => AuthError::TokenInvalid,
            auth::JwtError::EncodingFailed(msg) => {
                AuthError::Database(format!("Token encoding failed: {}", msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AuthError::InvalidCredentials.code(), 2200);
        assert_eq!(AuthError::TokenExpired.code(), 2201);
        assert_eq!(AuthError::TokenInvalid.code(), 2202);
        assert_eq!(AuthError::TokenRevoked.code(), 2203);
        assert_eq!(AuthError::UnauthorizedAccess.code(), 2204);
        assert_eq!(AuthError::InsufficientPermissions.code(), 2205);
        assert_eq!(AuthError::UserAlreadyExists("alice".into()).code(), 2101);
        assert_eq!(AuthError::Database("down".into()).code(), 3000);
    }

    #[test]
    fn test_denial_classification() {
        assert!(AuthError::InvalidCredentials.is_denial());
        assert!(AuthError::InsufficientPermissions.is_denial());
        assert!(!AuthError::Database("down".into()).is_denial());
        assert!(!AuthError::Timeout("slow".into()).is_denial());
    }
}
