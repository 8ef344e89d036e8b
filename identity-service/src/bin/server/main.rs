use std::sync::Arc;
use std::time::Duration;

use auth::Environment;
use auth::TokenSigner;
use identity_service::config::run_mode;
use identity_service::config::Config;
use identity_service::domain::auth::authorization::AuthorizationService;
use identity_service::domain::auth::service::AuthenticationService;
use identity_service::inbound::http::router::create_router;
use identity_service::maintenance::TokenCleanupTask;
use identity_service::outbound::events::AuditLogSubscriber;
use identity_service::outbound::events::InProcessEventPublisher;
use identity_service::outbound::repositories::PostgresRoleRepository;
use identity_service::outbound::repositories::PostgresTokenLedger;
use identity_service::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    let environment = Environment::from_run_mode(&run_mode());

    tracing::info!(
        http_port = config.server.http_port,
        run_mode = %run_mode(),
        "Configuration loaded"
    );

    // A missing or weak secret must stop startup outside development
    let secret = auth::resolve_signing_secret(
        config.jwt.secret.as_deref(),
        config.jwt.secret_file.as_deref(),
        environment,
    )?;
    let signer = Arc::new(TokenSigner::new(
        secret.as_bytes(),
        config.jwt.issuer.clone(),
    ));

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let role_repository = Arc::new(PostgresRoleRepository::new(pg_pool.clone()));
    let token_ledger = Arc::new(PostgresTokenLedger::new(pg_pool));

    let event_publisher = Arc::new(InProcessEventPublisher::new());
    event_publisher.subscribe(Arc::new(AuditLogSubscriber));

    let auth_service = Arc::new(AuthenticationService::new(
        Arc::clone(&user_repository),
        Arc::clone(&role_repository),
        Arc::clone(&token_ledger),
        event_publisher,
        Arc::clone(&signer),
        config.tokens.policy(),
    ));
    let authorization = Arc::new(AuthorizationService::new(
        user_repository,
        role_repository,
        Arc::clone(&token_ledger),
        signer,
    ));

    let cleanup = TokenCleanupTask::new(
        token_ledger,
        Duration::from_secs(config.cleanup.interval_seconds),
        chrono::Duration::days(config.cleanup.used_retention_days),
    )
    .spawn();

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let application = create_router(auth_service, authorization);
    axum::serve(http_listener, application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.shutdown().await;
    tracing::info!("Service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
