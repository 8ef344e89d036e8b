use axum::extract::OriginalUri;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::login::TokenPairResponseData;
use super::ApiError;
use crate::domain::auth::models::RefreshTokenCommand;
use crate::domain::auth::models::SecurityContext;
use crate::domain::auth::ports::AuthenticationServicePort;
use crate::inbound::http::router::AppState;

pub async fn refresh(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(context): Extension<SecurityContext>,
    Json(body): Json<RefreshRequest>,
) -> Result<(StatusCode, Json<TokenPairResponseData>), ApiError> {
    let outcome = state
        .auth_service
        .refresh_tokens(RefreshTokenCommand {
            refresh_token: body.refresh_token,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
        })
        .await
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    Ok((
        StatusCode::OK,
        Json(TokenPairResponseData::new(
            &outcome,
            "Token refreshed successfully",
        )),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}
