use axum::extract::OriginalUri;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use crate::domain::auth::models::AuthenticateUserCommand;
use crate::domain::auth::models::AuthenticationOutcome;
use crate::domain::auth::models::SecurityContext;
use crate::domain::auth::ports::AuthenticationServicePort;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(context): Extension<SecurityContext>,
    Json(body): Json<LoginRequest>,
) -> Result<(StatusCode, Json<TokenPairResponseData>), ApiError> {
    let outcome = state
        .auth_service
        .authenticate(AuthenticateUserCommand {
            login_identifier: body.login_identifier,
            password: body.password,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
            remember_me: body.remember_me,
        })
        .await
        .map_err(|e| ApiError::from_auth(e, uri.path()))?;

    Ok((
        StatusCode::OK,
        Json(TokenPairResponseData::new(
            &outcome,
            "Authentication successful",
        )),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "loginIdentifier")]
    login_identifier: String,
    password: String,
    #[serde(rename = "rememberMe", default)]
    remember_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPairResponseData {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "tokenType")]
    pub token_type: String,
    #[serde(rename = "accessTokenExpiresIn")]
    pub access_token_expires_in: i64,
    #[serde(rename = "refreshTokenExpiresIn")]
    pub refresh_token_expires_in: i64,
    pub message: String,
}

impl TokenPairResponseData {
    pub fn new(outcome: &AuthenticationOutcome, message: &str) -> Self {
        Self {
            user_id: outcome.user_id.clone(),
            username: outcome.username.clone(),
            email: outcome.email.clone(),
            first_name: outcome.first_name.clone(),
            last_name: outcome.last_name.clone(),
            access_token: outcome.access_token.clone(),
            refresh_token: outcome.refresh_token.clone(),
            token_type: "Bearer".to_string(),
            access_token_expires_in: outcome.access_token_expires_in,
            refresh_token_expires_in: outcome.refresh_token_expires_in,
            message: message.to_string(),
        }
    }
}
