//! The Connect SSO handshake.
//!
//! Two flows share this module:
//!
//! - **provider**: the forum asks us to authenticate a browser. Verify the
//!   signed inbound payload, then either bounce the user to the local login
//!   page (keeping `sso`/`sig` so the flow can resume) or answer with a
//!   freshly signed identity payload redirected to the forum's
//!   `return_sso_url`.
//! - **login-callback**: the forum posts a signed assertion carrying an
//!   `external_id` we minted; the signature is the sole authority that
//!   binds the id to a trusted assertion, after which a local session is
//!   established and the same response redirect is composed.
//!
//! The `Start → Verified → Decoded → (AwaitingLocalAuth | Authenticated) →
//! ResponseBuilt` progression is encoded in types: `verify_and_decode`
//! returns an [`InboundSso`] only after signature, decoding, required-field
//! and return-URL checks have all passed; the leg functions consume it.

use url::{form_urlencoded, Url};

use crate::crypto::PayloadSigner;
use crate::directory::{ForumIdentity, LocalUser};
use crate::error::{ConnectError, ConnectResult};
use crate::payload::{
    SsoPayload, FIELD_EMAIL, FIELD_EXTERNAL_ID, FIELD_NAME, FIELD_NONCE, FIELD_RETURN_URL,
    FIELD_USERNAME,
};
use crate::return_url::{append_sso_params, validate_return_url};

/// An inbound `sso`/`sig` pair that has passed verification, decoding and
/// field validation. Existence of a value of this type is the evidence the
/// leg functions rely on.
#[derive(Debug, Clone)]
pub struct InboundSso {
    sso: String,
    sig: String,
    payload: SsoPayload,
    nonce: String,
    return_url: Url,
}

impl InboundSso {
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    #[must_use]
    pub fn return_url(&self) -> &Url {
        &self.return_url
    }

    #[must_use]
    pub fn payload(&self) -> &SsoPayload {
        &self.payload
    }
}

/// Terminal outcome of the provider flow.
#[derive(Debug)]
pub enum ProviderOutcome {
    /// No authenticated local session: redirect to the local login page,
    /// `sso`/`sig` preserved so the handshake resumes after login. A
    /// deferred continuation, not a failure.
    AwaitLocalAuth { login_location: String },
    /// Authenticated: redirect back to the forum with a signed identity
    /// payload.
    Complete {
        redirect: String,
        identity: ForumIdentity,
    },
}

/// Orchestrates both Connect SSO flows over an injected signer.
#[derive(Debug, Clone)]
pub struct ConnectHandshake {
    signer: PayloadSigner,
    login_url: String,
}

impl ConnectHandshake {
    /// `login_url` is the local login entry point (path or absolute URL)
    /// the provider flow defers to for unauthenticated browsers.
    #[must_use]
    pub fn new(signer: PayloadSigner, login_url: impl Into<String>) -> Self {
        Self {
            signer,
            login_url: login_url.into(),
        }
    }

    /// Run the shared validation pipeline on an inbound pair.
    ///
    /// Order matters: the signature is checked before the payload is
    /// decoded, so nothing unauthenticated ever reaches the codec; the
    /// return URL is validated before it can appear in any redirect.
    pub fn verify_and_decode(&self, sso: &str, sig: &str) -> ConnectResult<InboundSso> {
        if sso.is_empty() || sig.is_empty() {
            return Err(ConnectError::MissingParameters);
        }

        if !self.signer.verify(sso, sig) {
            return Err(ConnectError::InvalidSignature);
        }

        let payload = SsoPayload::decode(sso)?;
        let nonce = payload.require(FIELD_NONCE)?.to_string();
        let return_url = validate_return_url(payload.require(FIELD_RETURN_URL)?)?;

        Ok(InboundSso {
            sso: sso.to_string(),
            sig: sig.to_string(),
            payload,
            nonce,
            return_url,
        })
    }

    /// Provider flow: branch on the local authentication state.
    pub fn provider_leg(
        &self,
        sso: &str,
        sig: &str,
        subject: Option<&LocalUser>,
    ) -> ConnectResult<ProviderOutcome> {
        let inbound = self.verify_and_decode(sso, sig)?;

        let Some(user) = subject else {
            tracing::info!(nonce = %inbound.nonce, "no local session, deferring SSO to login");
            return Ok(ProviderOutcome::AwaitLocalAuth {
                login_location: self.login_redirect(&inbound),
            });
        };

        let identity = ForumIdentity::from(user);
        let redirect = self.response_redirect(&identity, &inbound);
        tracing::info!(
            user_id = %user.id,
            return_host = %inbound.return_url.host_str().unwrap_or_default(),
            "SSO response built"
        );
        Ok(ProviderOutcome::Complete { redirect, identity })
    }

    /// Login-callback flow, validation half: on top of the shared pipeline,
    /// the payload must carry the `external_id` being asserted. Resolving
    /// the id against the directory is the caller's (async) job.
    pub fn login_leg(&self, sso: &str, sig: &str) -> ConnectResult<(InboundSso, String)> {
        let inbound = self.verify_and_decode(sso, sig)?;
        let external_id = inbound.payload.require(FIELD_EXTERNAL_ID)?.to_string();
        Ok((inbound, external_id))
    }

    /// Compose the redirect that completes either flow: a fresh payload
    /// from the authenticated subject's identity plus the original nonce,
    /// encoded, signed, and merged onto the validated return URL.
    #[must_use]
    pub fn response_redirect(&self, identity: &ForumIdentity, inbound: &InboundSso) -> String {
        let mut payload = SsoPayload::new();
        payload.set(FIELD_NONCE, inbound.nonce.as_str());
        payload.set(FIELD_EMAIL, identity.email.as_str());
        payload.set(FIELD_EXTERNAL_ID, identity.external_id.as_str());
        payload.set(FIELD_USERNAME, identity.username.as_str());
        payload.set(FIELD_NAME, identity.name.as_str());

        let blob = payload.encode();
        let sig = self.signer.sign(&blob);
        append_sso_params(&inbound.return_url, &blob, &sig)
    }

    /// Location of the local login page with the original pair preserved.
    fn login_redirect(&self, inbound: &InboundSso) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("sso", &inbound.sso)
            .append_pair("sig", &inbound.sig)
            .finish();
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.login_url, separator, query)
    }
}
