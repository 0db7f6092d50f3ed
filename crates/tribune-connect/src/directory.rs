//! User directory boundary.
//!
//! The identity-owning application stores the users; the handshake only
//! needs to resolve them and to mirror forum-facing attributes after a
//! successful sync. Both an in-memory store (tests) and a PostgreSQL store
//! are provided.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ConnectResult;

/// A user of the identity-owning application.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LocalUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Administrator accounts are never pushed to the forum.
    pub is_admin: bool,
}

/// Identity fields asserted to the forum for an authenticated user.
///
/// Always derived from the locally authenticated subject, never from
/// inbound payload fields on the provider leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumIdentity {
    pub external_id: String,
    pub username: String,
    pub email: String,
    pub name: String,
}

impl From<&LocalUser> for ForumIdentity {
    fn from(user: &LocalUser) -> Self {
        Self {
            external_id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            name: user
                .display_name
                .clone()
                .unwrap_or_else(|| user.username.clone()),
        }
    }
}

/// Lookup and mirror operations the handshake needs from user storage.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user by primary id.
    async fn find_by_id(&self, id: Uuid) -> ConnectResult<Option<LocalUser>>;

    /// Resolve a user by the external id asserted in a signed payload.
    async fn find_by_external_id(&self, external_id: &str) -> ConnectResult<Option<LocalUser>>;

    /// Record a successful forum sync for the user (profile mirror,
    /// last-write-wins).
    async fn record_sync(&self, user_id: Uuid, identity: &ForumIdentity) -> ConnectResult<()>;
}

/// Issues a local session for a user authenticated via the login-callback
/// leg. Implemented by the application; the protocol crate only carries the
/// resulting `Set-Cookie` value.
pub trait SessionIssuer: Send + Sync {
    fn issue(&self, user: &LocalUser) -> Option<String>;
}

/// In-memory directory for tests.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, LocalUser>>>,
    synced: Arc<RwLock<HashMap<Uuid, ForumIdentity>>>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: LocalUser) {
        self.users.write().await.insert(user.id, user);
    }

    /// The identity recorded by the last sync for a user, if any.
    pub async fn last_synced(&self, user_id: Uuid) -> Option<ForumIdentity> {
        self.synced.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> ConnectResult<Option<LocalUser>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> ConnectResult<Option<LocalUser>> {
        let Ok(id) = Uuid::parse_str(external_id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn record_sync(&self, user_id: Uuid, identity: &ForumIdentity) -> ConnectResult<()> {
        self.synced.write().await.insert(user_id, identity.clone());
        Ok(())
    }
}

/// PostgreSQL-backed directory.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> ConnectResult<Option<LocalUser>> {
        let user = sqlx::query_as::<_, LocalUser>(
            "SELECT id, username, email, display_name, is_admin FROM local_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_external_id(&self, external_id: &str) -> ConnectResult<Option<LocalUser>> {
        // External ids minted by this system are user UUIDs; anything else
        // cannot resolve.
        let Ok(id) = Uuid::parse_str(external_id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn record_sync(&self, user_id: Uuid, identity: &ForumIdentity) -> ConnectResult<()> {
        sqlx::query(
            "INSERT INTO forum_profiles (user_id, external_id, username, email, last_sync)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id) DO UPDATE
             SET external_id = EXCLUDED.external_id,
                 username = EXCLUDED.username,
                 email = EXCLUDED.email,
                 last_sync = EXCLUDED.last_sync",
        )
        .bind(user_id)
        .bind(&identity.external_id)
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> LocalUser {
        LocalUser {
            id: Uuid::new_v4(),
            username: "sso_user".to_string(),
            email: "sso@example.com".to_string(),
            display_name: Some("Sso User".to_string()),
            is_admin: false,
        }
    }

    #[test]
    fn test_forum_identity_uses_display_name() {
        let u = user();
        let identity = ForumIdentity::from(&u);
        assert_eq!(identity.external_id, u.id.to_string());
        assert_eq!(identity.name, "Sso User");
    }

    #[test]
    fn test_forum_identity_falls_back_to_username() {
        let mut u = user();
        u.display_name = None;
        assert_eq!(ForumIdentity::from(&u).name, "sso_user");
    }

    #[tokio::test]
    async fn test_in_memory_lookup_by_external_id() {
        let dir = InMemoryUserDirectory::new();
        let u = user();
        dir.insert(u.clone()).await;

        let found = dir
            .find_by_external_id(&u.id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.username, "sso_user");
    }

    #[tokio::test]
    async fn test_in_memory_unknown_external_id() {
        let dir = InMemoryUserDirectory::new();
        assert!(dir
            .find_by_external_id("not-a-uuid")
            .await
            .unwrap()
            .is_none());
        assert!(dir
            .find_by_external_id(&Uuid::new_v4().to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_in_memory_record_sync_last_write_wins() {
        let dir = InMemoryUserDirectory::new();
        let u = user();
        dir.insert(u.clone()).await;

        let mut identity = ForumIdentity::from(&u);
        dir.record_sync(u.id, &identity).await.unwrap();
        identity.email = "new@example.com".to_string();
        dir.record_sync(u.id, &identity).await.unwrap();

        assert_eq!(
            dir.last_synced(u.id).await.unwrap().email,
            "new@example.com"
        );
    }
}
