use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::admin_tokens::list_user_tokens;
use super::handlers::admin_tokens::revoke_user_tokens;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::me::me;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::middleware::attach_security_context;
use crate::domain::auth::authorization::AuthorizationService;
use crate::domain::auth::service::AuthenticationService;
use crate::outbound::events::InProcessEventPublisher;
use crate::outbound::repositories::PostgresRoleRepository;
use crate::outbound::repositories::PostgresTokenLedger;
use crate::outbound::repositories::PostgresUserRepository;

pub type Authentication = AuthenticationService<
    PostgresUserRepository,
    PostgresRoleRepository,
    PostgresTokenLedger,
    InProcessEventPublisher,
>;

pub type Authorization =
    AuthorizationService<PostgresUserRepository, PostgresRoleRepository, PostgresTokenLedger>;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<Authentication>,
    pub authorization: Arc<Authorization>,
}

pub fn create_router(
    auth_service: Arc<Authentication>,
    authorization: Arc<Authorization>,
) -> Router {
    let state = AppState {
        auth_service,
        authorization,
    };

    let routes = Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/users/me", get(me))
        .route(
            "/api/v1/admin/users/:user_id/tokens",
            get(list_user_tokens).delete(revoke_user_tokens),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            attach_security_context,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
