//! Outbound user synchronization with the forum.
//!
//! Pushes a signed identity payload to the forum's admin sync endpoint so
//! forum-side profiles track local accounts. Sync is best-effort relative
//! to the login itself: it runs on its own task with a bounded timeout, and
//! a failure is logged and audited but never surfaced as a handshake
//! failure.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use uuid::Uuid;

use crate::audit::{AuditService, SsoEventKind};
use crate::crypto::{PayloadSigner, SharedSecret};
use crate::directory::{ForumIdentity, LocalUser, UserDirectory};
use crate::error::{ConnectError, ConnectResult};
use crate::payload::{
    SsoPayload, FIELD_EMAIL, FIELD_EXTERNAL_ID, FIELD_NAME, FIELD_NONCE, FIELD_USERNAME,
};

/// Forum admin endpoint that upserts a user from a signed payload.
const SYNC_PATH: &str = "/admin/users/sync_sso";

/// Default bound on a single sync push.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the forum's authenticated user-sync endpoint.
#[derive(Clone)]
pub struct ForumSyncClient {
    http: Client,
    sync_url: String,
    api_key: String,
    api_username: String,
    signer: PayloadSigner,
}

impl ForumSyncClient {
    /// Build a client for `{forum_base_url}/admin/users/sync_sso`.
    pub fn new(
        forum_base_url: &str,
        api_key: impl Into<String>,
        api_username: impl Into<String>,
        secret: SharedSecret,
        timeout: Duration,
    ) -> ConnectResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("tribune-connect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConnectError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            sync_url: format!("{}{SYNC_PATH}", forum_base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            api_username: api_username.into(),
            signer: PayloadSigner::new(secret),
        })
    }

    /// Push one user to the forum.
    ///
    /// Administrator accounts are skipped (returns `Ok(None)`); they must
    /// not be mirrored into the forum. On success the pushed identity is
    /// returned so the caller can update the profile mirror.
    pub async fn sync_user(&self, user: &LocalUser) -> ConnectResult<Option<ForumIdentity>> {
        if user.is_admin {
            tracing::debug!(user_id = %user.id, "skipping forum sync for admin account");
            return Ok(None);
        }

        let identity = ForumIdentity::from(user);
        let mut payload = SsoPayload::new();
        // The sync endpoint ignores the nonce but the payload shape is the
        // same as a login response; a fresh value keeps payloads unique.
        payload.set(FIELD_NONCE, Uuid::new_v4().to_string());
        payload.set(FIELD_EMAIL, identity.email.as_str());
        payload.set(FIELD_EXTERNAL_ID, identity.external_id.as_str());
        payload.set(FIELD_USERNAME, identity.username.as_str());
        payload.set(FIELD_NAME, identity.name.as_str());

        let blob = payload.encode();
        let sig = self.signer.sign(&blob);

        let response = self
            .http
            .post(&self.sync_url)
            .header("Api-Key", &self.api_key)
            .header("Api-Username", &self.api_username)
            .json(&serde_json::json!({ "sso": blob, "sig": sig }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectError::SyncFailed {
                status: status.as_u16(),
            });
        }

        tracing::info!(user_id = %user.id, username = %identity.username, "user synced to forum");
        Ok(Some(identity))
    }
}

/// Fire-and-forget sync push.
///
/// Runs on its own task so a slow or unreachable forum never delays the
/// redirect response. Outcome handling happens entirely inside the task:
/// the profile mirror is updated on success, and failures are logged and
/// audited. In-flight pushes may be abandoned at shutdown; the endpoint is
/// an idempotent upsert.
pub fn spawn_sync(
    client: Arc<ForumSyncClient>,
    directory: Arc<dyn UserDirectory>,
    audit: Option<Arc<AuditService>>,
    user: LocalUser,
) {
    tokio::spawn(async move {
        match client.sync_user(&user).await {
            Ok(Some(identity)) => {
                if let Err(e) = directory.record_sync(user.id, &identity).await {
                    tracing::warn!(user_id = %user.id, error = %e, "failed to record forum sync");
                }
                if let Some(audit) = &audit {
                    audit
                        .record(Some(user.id), SsoEventKind::Sync, "forum sync push succeeded")
                        .await;
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "forum sync failed");
                if let Some(audit) = &audit {
                    audit
                        .record(
                            Some(user.id),
                            SsoEventKind::Error,
                            &format!("forum sync failed: {}", e.error_code()),
                        )
                        .await;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ForumSyncClient {
        ForumSyncClient::new(
            "https://forum.example.com/",
            "api-key",
            "system",
            SharedSecret::from("secret"),
            DEFAULT_SYNC_TIMEOUT,
        )
        .unwrap()
    }

    #[test]
    fn test_sync_url_strips_trailing_slash() {
        assert_eq!(
            client().sync_url,
            "https://forum.example.com/admin/users/sync_sso"
        );
    }

    #[tokio::test]
    async fn test_admin_users_are_skipped_without_network() {
        // No server behind the URL: an admin must short-circuit before any
        // request is attempted.
        let admin = LocalUser {
            id: Uuid::new_v4(),
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            display_name: None,
            is_admin: true,
        };
        let result = client().sync_user(&admin).await.unwrap();
        assert!(result.is_none());
    }
}
