//! Signed session cookie layer.
//!
//! The service keeps no server-side session table: the cookie value is
//! `{user_id}.{hmac}` where the HMAC covers the user id under the
//! session secret. Extraction verifies the signature before the id is
//! trusted; the middleware then resolves the user through the directory
//! and exposes it as `Extension<Option<LocalUser>>` for the SSO handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use tribune_connect::{LocalUser, PayloadSigner, SessionIssuer, UserDirectory};

/// Cookie name for the local session.
pub const SESSION_COOKIE_NAME: &str = "tribune_session";

/// Cookie max age in seconds (24 hours).
pub const SESSION_COOKIE_MAX_AGE: i64 = 86400;

/// Shared state for the session layer.
#[derive(Clone)]
pub struct SessionLayer {
    signer: PayloadSigner,
    directory: Arc<dyn UserDirectory>,
    secure: bool,
}

impl SessionLayer {
    #[must_use]
    pub fn new(signer: PayloadSigner, directory: Arc<dyn UserDirectory>, secure: bool) -> Self {
        Self {
            signer,
            directory,
            secure,
        }
    }

    /// Build the `Set-Cookie` value for an authenticated user.
    #[must_use]
    pub fn create_cookie(&self, user_id: Uuid) -> String {
        let id = user_id.to_string();
        let sig = self.signer.sign(&id);
        let secure_flag = if self.secure { "; Secure" } else { "" };
        format!(
            "{SESSION_COOKIE_NAME}={id}.{sig}; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age={SESSION_COOKIE_MAX_AGE}"
        )
    }

    /// Extract and verify the session cookie, returning the user id.
    ///
    /// Returns `None` for absent, malformed or tampered cookies; a bad
    /// cookie is an anonymous request, never an error.
    #[must_use]
    pub fn extract(&self, headers: &HeaderMap) -> Option<Uuid> {
        let cookie_header = headers.get(COOKIE)?.to_str().ok()?;
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some(value) = part.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")) {
                let (id, sig) = value.split_once('.')?;
                if !self.signer.verify(id, sig) {
                    tracing::warn!("session cookie failed signature verification");
                    return None;
                }
                return Uuid::parse_str(id).ok();
            }
        }
        None
    }
}

impl SessionIssuer for SessionLayer {
    fn issue(&self, user: &LocalUser) -> Option<String> {
        Some(self.create_cookie(user.id))
    }
}

/// Resolve the current user from the session cookie and expose it to the
/// handlers as `Extension<Option<LocalUser>>`.
pub async fn current_user_middleware(
    State(layer): State<SessionLayer>,
    mut request: Request,
    next: Next,
) -> Response {
    let user: Option<LocalUser> = match layer.extract(request.headers()) {
        Some(user_id) => match layer.directory.find_by_id(user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "failed to resolve session user");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}
