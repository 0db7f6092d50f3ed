//! Application state shared across request handlers.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the service-level endpoints (health, docs).
///
/// Cloned per request; inner resources are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,

    /// Service startup time for uptime reporting.
    pub startup_time: Arc<Instant>,

    /// Application version from Cargo.toml.
    pub version: &'static str,
}

impl AppState {
    #[must_use]
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            startup_time: Arc::new(Instant::now()),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
