//! Tribune SSO bridge service.
//!
//! Hosts the Connect SSO endpoints that let the external forum delegate
//! authentication to the identity-owning application.

mod config;
mod logging;
mod openapi;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;

use config::Config;
use openapi::ApiDoc;
use session::SessionLayer;
use state::AppState;
use tribune_connect::{
    connect_router, AuditService, ConnectHandshake, ConnectState, ForumSyncClient, PayloadSigner,
    PgUserDirectory, SharedSecret, UserDirectory,
};

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        env = %config.app_env,
        "Starting tribune-api"
    );

    // Refuse to start in production with insecure secrets.
    match config.validate_security() {
        Ok(warnings) => {
            for warning in &warnings {
                tracing::warn!(target: "security", "{}", warning);
            }
        }
        Err(errors) => {
            for error in &errors {
                tracing::error!(target: "security", "{}", error);
            }
            eprintln!(
                "FATAL: {} insecure secret(s) detected in production mode.",
                errors.len()
            );
            std::process::exit(1);
        }
    }

    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {e}");
        std::process::exit(1);
    }

    let directory: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool.clone()));
    let handshake = Arc::new(ConnectHandshake::new(
        PayloadSigner::new(SharedSecret::from(config.connect_secret.as_str())),
        config.login_url.clone(),
    ));
    let session_layer = SessionLayer::new(
        PayloadSigner::new(SharedSecret::from(config.session_secret.as_str())),
        directory.clone(),
        config.app_env.is_production(),
    );

    let mut connect_state = ConnectState::new(handshake, directory.clone())
        .with_sessions(Arc::new(session_layer.clone()))
        .with_audit(Arc::new(AuditService::new(pool.clone())));

    if config.sync_enabled {
        match ForumSyncClient::new(
            &config.forum_base_url,
            config.forum_api_key.clone(),
            config.forum_api_username.clone(),
            SharedSecret::from(config.connect_secret.as_str()),
            Duration::from_secs(config.sync_timeout_secs),
        ) {
            Ok(client) => {
                connect_state = connect_state.with_sync(Arc::new(client));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build forum sync client");
                std::process::exit(1);
            }
        }
    } else {
        info!("Forum sync disabled by configuration");
    }

    let app_state = AppState::new(pool);

    let app = connect_router(connect_state)
        .layer(axum::middleware::from_fn_with_state(
            session_layer,
            session::current_user_middleware,
        ))
        .merge(
            Router::new()
                .route("/healthz", get(healthz_handler))
                .route("/api-docs/openapi.json", get(openapi_handler))
                .with_state(app_state),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid listen address: {e}");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "tribune-api listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Service health: process liveness plus a database round-trip.
async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "health check database ping failed");
            "error"
        }
    };

    Json(serde_json::json!({
        "status": if database == "connected" { "healthy" } else { "degraded" },
        "version": state.version,
        "uptime_seconds": state.startup_time.elapsed().as_secs(),
        "database": database,
    }))
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Graceful shutdown on Ctrl+C or SIGTERM. In-flight forum syncs may be
/// abandoned; the sync endpoint is an idempotent upsert.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
