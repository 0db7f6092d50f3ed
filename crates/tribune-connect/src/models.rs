//! Request/response types for the SSO endpoints.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ConnectError, ConnectResult};

/// The `sso`/`sig` pair, arriving via query string (GET) or form body
/// (POST).
///
/// Fields are optional at the deserialization layer so that absence is
/// reported as the protocol's own `MissingParameters` rejection instead of
/// a framework extraction error.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct SsoParams {
    /// Base64-wrapped payload blob.
    pub sso: Option<String>,
    /// Hex-encoded HMAC-SHA256 signature of the blob.
    pub sig: Option<String>,
}

impl SsoParams {
    /// Both parameters, or the `MissingParameters` rejection.
    pub fn require(&self) -> ConnectResult<(&str, &str)> {
        match (self.sso.as_deref(), self.sig.as_deref()) {
            (Some(sso), Some(sig)) if !sso.is_empty() && !sig.is_empty() => Ok((sso, sig)),
            _ => Err(ConnectError::MissingParameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_both_present() {
        let params = SsoParams {
            sso: Some("QkxPQg".to_string()),
            sig: Some("deadbeef".to_string()),
        };
        assert_eq!(params.require().unwrap(), ("QkxPQg", "deadbeef"));
    }

    #[test]
    fn test_require_rejects_absent_sig() {
        let params = SsoParams {
            sso: Some("QkxPQg".to_string()),
            sig: None,
        };
        assert!(matches!(
            params.require(),
            Err(ConnectError::MissingParameters)
        ));
    }

    #[test]
    fn test_require_rejects_empty_values() {
        let params = SsoParams {
            sso: Some(String::new()),
            sig: Some("deadbeef".to_string()),
        };
        assert!(params.require().is_err());
    }
}
