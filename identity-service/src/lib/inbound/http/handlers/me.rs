use axum::extract::OriginalUri;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Serialize;

use super::ApiError;
use crate::domain::auth::models::SecurityContext;
use crate::domain::auth::ports::AuthorizationServicePort;
use crate::inbound::http::router::AppState;

/// Identity of the caller as resolved from their access token.
pub async fn me(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(context): Extension<SecurityContext>,
) -> Result<(StatusCode, Json<MeResponseData>), ApiError> {
    state
        .authorization
        .require_authentication(&context)
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    Ok((StatusCode::OK, Json((&context).into())))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeResponseData {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub permissions: Vec<String>,
}

impl From<&SecurityContext> for MeResponseData {
    fn from(context: &SecurityContext) -> Self {
        Self {
            user_id: context
                .user_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            username: context.username.clone().unwrap_or_default(),
            permissions: context.permissions.iter().cloned().collect(),
        }
    }
}
