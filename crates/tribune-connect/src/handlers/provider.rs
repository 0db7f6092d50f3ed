//! Provider flow: the forum asks us to authenticate a browser.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form};

use crate::audit::SsoEventKind;
use crate::directory::LocalUser;
use crate::error::ConnectResult;
use crate::handlers::found_redirect;
use crate::handshake::ProviderOutcome;
use crate::models::SsoParams;
use crate::router::ConnectState;
use crate::sync::spawn_sync;

/// Provider-leg SSO via GET (the forum's normal entry).
#[utoipa::path(
    get,
    path = "/session/sso_provider",
    params(SsoParams),
    responses(
        (status = 302, description = "Redirect to local login or back to the forum"),
        (status = 400, description = "Invalid SSO request"),
    ),
    tag = "SSO"
)]
pub async fn sso_provider_get(
    State(state): State<ConnectState>,
    Extension(user): Extension<Option<LocalUser>>,
    Query(params): Query<SsoParams>,
) -> Response {
    match handle_provider(&state, user, &params).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Provider-leg SSO via POST form body.
#[utoipa::path(
    post,
    path = "/session/sso_provider",
    request_body = SsoParams,
    responses(
        (status = 302, description = "Redirect to local login or back to the forum"),
        (status = 400, description = "Invalid SSO request"),
    ),
    tag = "SSO"
)]
pub async fn sso_provider_post(
    State(state): State<ConnectState>,
    Extension(user): Extension<Option<LocalUser>>,
    Form(params): Form<SsoParams>,
) -> Response {
    match handle_provider(&state, user, &params).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle_provider(
    state: &ConnectState,
    user: Option<LocalUser>,
    params: &SsoParams,
) -> ConnectResult<Response> {
    let (sso, sig) = params.require()?;

    match state.handshake.provider_leg(sso, sig, user.as_ref())? {
        ProviderOutcome::AwaitLocalAuth { login_location } => {
            found_redirect(&login_location, None)
        }
        ProviderOutcome::Complete { redirect, identity } => {
            // Complete implies an authenticated subject.
            if let Some(user) = user {
                if let Some(audit) = &state.audit {
                    audit
                        .record(
                            Some(user.id),
                            SsoEventKind::Login,
                            &format!("provider SSO completed for {}", identity.username),
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
            }
            found_redirect(&redirect, None)
        }
    }
}
