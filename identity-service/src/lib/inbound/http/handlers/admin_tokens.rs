use axum::extract::OriginalUri;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use crate::domain::auth::models::AuthToken;
use crate::domain::auth::models::SecurityContext;
use crate::domain::auth::ports::AuthenticationServicePort;
use crate::domain::auth::ports::AuthorizationServicePort;
use crate::inbound::http::router::AppState;
use crate::user::models::permissions;
use crate::user::models::UserId;

/// Token history for a user. Token values themselves are never returned.
pub async fn list_user_tokens(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(context): Extension<SecurityContext>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<Vec<TokenData>>), ApiError> {
    state
        .authorization
        .require_permission(&context, permissions::ADMIN_ACCESS)
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    let user_id = UserId::from_string(&user_id)
        .map_err(|e| ApiError::bad_request(e.to_string(), uri.path()))?;

    let tokens = state
        .auth_service
        .tokens_for_user(&user_id)
        .await
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    Ok((
        StatusCode::OK,
        Json(tokens.iter().map(TokenData::from).collect()),
    ))
}

/// Revoke every active session for a user.
pub async fn revoke_user_tokens(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(context): Extension<SecurityContext>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<RevokedData>), ApiError> {
    state
        .authorization
        .require_permission(&context, permissions::ADMIN_ACCESS)
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    let user_id = UserId::from_string(&user_id)
        .map_err(|e| ApiError::bad_request(e.to_string(), uri.path()))?;

    let revoked = state
        .auth_service
        .revoke_all_sessions(&user_id)
        .await
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    Ok((StatusCode::OK, Json(RevokedData { revoked })))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub id: String,
    #[serde(rename = "tokenType")]
    pub token_type: String,
    #[serde(rename = "issuedAt")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "usedAt", skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(rename = "revokedAt", skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(rename = "ipAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl From<&AuthToken> for TokenData {
    fn from(token: &AuthToken) -> Self {
        Self {
            id: token.id.to_string(),
            token_type: token.token_type.to_string(),
            issued_at: token.issued_at,
            expires_at: token.expires_at,
            used_at: token.used_at,
            revoked_at: token.revoked_at,
            ip_address: token.ip_address.clone(),
            user_agent: token.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevokedData {
    pub revoked: u64,
}
