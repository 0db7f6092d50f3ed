//! SSO event audit log.
//!
//! Keeps a historical record of logins, sync pushes and rejections for
//! troubleshooting misconfigured secrets or probing attempts. Rows carry
//! the event kind and a short detail string; raw payloads and signatures
//! are never persisted.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Kind of SSO event being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsoEventKind {
    Login,
    Sync,
    Error,
}

impl SsoEventKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SsoEventKind::Login => "login",
            SsoEventKind::Sync => "sync",
            SsoEventKind::Error => "error",
        }
    }
}

/// Writes SSO events to the `sso_event_log` table.
///
/// Auditing is strictly best-effort: a failed insert is logged at WARN and
/// swallowed so it can never fail a handshake.
#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, user_id: Option<Uuid>, kind: SsoEventKind, detail: &str) {
        let result = sqlx::query(
            "INSERT INTO sso_event_log (id, user_id, event_kind, detail, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind.as_str())
        .bind(detail)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                kind = kind.as_str(),
                error = %e,
                "failed to record SSO audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_strings() {
        assert_eq!(SsoEventKind::Login.as_str(), "login");
        assert_eq!(SsoEventKind::Sync.as_str(), "sync");
        assert_eq!(SsoEventKind::Error.as_str(), "error");
    }
}
