use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::domain::auth::ports::AuthorizationServicePort;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Middleware that attaches a [`SecurityContext`] to every request.
///
/// A missing or bad credential produces the anonymous context; requests are
/// never rejected here. Route handlers apply the actual guards.
///
/// [`SecurityContext`]: crate::domain::auth::models::SecurityContext
pub async fn attach_security_context(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let ip_address = client_ip(req.headers());
    let user_agent = user_agent(req.headers());

    let context = state
        .authorization
        .security_context(token.as_deref(), ip_address, user_agent)
        .await
        .map_err(|e| ApiError::from_auth(e, req.uri().path()).into_response())?;

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// Extract the token from a `Bearer` Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Client address as reported by proxy headers.
///
/// X-Forwarded-For may carry a comma-separated chain; the first entry is the
/// original client. X-Real-IP is the fallback.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let first = forwarded.split(',').next().map(str::trim);
        if let Some(ip) = first.filter(|ip| !ip.is_empty()) {
            return Some(ip.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
