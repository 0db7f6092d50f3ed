//! Return-URL validation and redirect composition.
//!
//! The `return_sso_url` field arrives from the network and is echoed back
//! as a redirect target. Validation here is the sole defense against open
//! redirects: only absolute http/https URLs with a host are ever composed
//! into a Location header, on both legs of the handshake.

use url::Url;

use crate::error::{ConnectError, ConnectResult};

/// Validate a callback URL before it may appear in any redirect.
///
/// Accepts absolute `http`/`https` URLs with a non-empty host. Rejects
/// relative paths, `javascript:`/`data:` and other schemes, and anything
/// unparseable.
pub fn validate_return_url(raw: &str) -> ConnectResult<Url> {
    let url = Url::parse(raw).map_err(|e| ConnectError::InvalidReturnUrl {
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConnectError::InvalidReturnUrl {
                reason: format!("unsupported scheme: {other}"),
            })
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConnectError::InvalidReturnUrl {
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Append `sso` and `sig` query parameters to a validated callback URL.
///
/// Existing query pairs on the URL are kept; the new parameters are merged
/// in, never overwriting the query string wholesale.
#[must_use]
pub fn append_sso_params(url: &Url, sso: &str, sig: &str) -> String {
    let mut target = url.clone();
    target
        .query_pairs_mut()
        .append_pair("sso", sso)
        .append_pair("sig", sig);
    target.into()
}
