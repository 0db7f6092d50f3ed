//! Connect SSO route definitions and shared handler state.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::audit::AuditService;
use crate::directory::{SessionIssuer, UserDirectory};
use crate::handlers::{sso_login, sso_provider_get, sso_provider_post};
use crate::handshake::ConnectHandshake;
use crate::sync::ForumSyncClient;

/// State shared by the SSO handlers.
///
/// The sync client, session issuer and audit service are optional
/// collaborators: absent in tests and in deployments that do not use them,
/// the handshake itself is unaffected.
#[derive(Clone)]
pub struct ConnectState {
    pub handshake: Arc<ConnectHandshake>,
    pub directory: Arc<dyn UserDirectory>,
    pub sessions: Option<Arc<dyn SessionIssuer>>,
    pub sync: Option<Arc<ForumSyncClient>>,
    pub audit: Option<Arc<AuditService>>,
}

impl ConnectState {
    #[must_use]
    pub fn new(handshake: Arc<ConnectHandshake>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            handshake,
            directory,
            sessions: None,
            sync: None,
            audit: None,
        }
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionIssuer>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: Arc<ForumSyncClient>) -> Self {
        self.sync = Some(sync);
        self
    }

    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditService>) -> Self {
        self.audit = Some(audit);
        self
    }
}

/// Create the SSO router.
///
/// The caller is responsible for layering an authentication middleware that
/// provides `Extension<Option<LocalUser>>` to the provider endpoints.
pub fn connect_router(state: ConnectState) -> Router {
    Router::new()
        .route(
            "/session/sso_provider",
            get(sso_provider_get).post(sso_provider_post),
        )
        .route("/session/sso_login", post(sso_login))
        .with_state(state)
}
