use axum::extract::OriginalUri;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use crate::domain::auth::models::LogoutCommand;
use crate::domain::auth::models::SecurityContext;
use crate::domain::auth::ports::AuthenticationServicePort;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(context): Extension<SecurityContext>,
    body: Option<Json<LogoutRequest>>,
) -> Result<(StatusCode, Json<LogoutResponseData>), ApiError> {
    let refresh_token = body.and_then(|Json(body)| body.refresh_token);

    state
        .auth_service
        .logout(LogoutCommand {
            refresh_token,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
        })
        .await
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    Ok((
        StatusCode::OK,
        Json(LogoutResponseData {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct LogoutRequest {
    #[serde(rename = "refreshToken", default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    pub message: String,
}
