//! Login-callback flow: the forum posts a signed identity assertion.
//!
//! The outer HMAC is the sole authority binding the asserted `external_id`
//! to a trusted request; no client-supplied field is honored unless the
//! whole payload verified.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Form;

use crate::audit::SsoEventKind;
use crate::error::{ConnectError, ConnectResult};
use crate::handlers::found_redirect;
use crate::models::SsoParams;
use crate::router::ConnectState;
use crate::sync::spawn_sync;

/// Complete a forum-initiated login against a signed `external_id`.
#[utoipa::path(
    post,
    path = "/session/sso_login",
    request_body = SsoParams,
    responses(
        (status = 302, description = "Session established, redirect to the forum"),
        (status = 400, description = "Invalid SSO request"),
    ),
    tag = "SSO"
)]
pub async fn sso_login(
    State(state): State<ConnectState>,
    Form(params): Form<SsoParams>,
) -> Response {
    match handle_login(&state, &params).await {
        Ok(response) => response,
        Err(e) => {
            if let Some(audit) = &state.audit {
                audit
                    .record(
                        None,
                        SsoEventKind::Error,
                        &format!("login callback rejected: {}", e.error_code()),
                    )
                    .await;
            }
            e.into_response()
        }
    }
}

async fn handle_login(state: &ConnectState, params: &SsoParams) -> ConnectResult<Response> {
    let (sso, sig) = params.require()?;
    let (inbound, external_id) = state.handshake.login_leg(sso, sig)?;

    let user = state
        .directory
        .find_by_external_id(&external_id)
        .await?
        .ok_or(ConnectError::UserNotFound)?;

    let identity = crate::directory::ForumIdentity::from(&user);
    let redirect = state.handshake.response_redirect(&identity, &inbound);

    let cookie = state
        .sessions
        .as_ref()
        .and_then(|issuer| issuer.issue(&user));

    tracing::info!(user_id = %user.id, "SSO login callback processed");
    if let Some(audit) = &state.audit {
        audit
            .record(
                Some(user.id),
                SsoEventKind::Login,
                "login callback established session",
            )
            .await;
    }
    if let Some(sync) = &state.sync {
        spawn_sync(
            sync.clone(),
            state.directory.clone(),
            state.audit.clone(),
            user,
        );
    }

    found_redirect(&redirect, cookie.as_deref())
}
