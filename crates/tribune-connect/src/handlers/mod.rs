//! HTTP handlers for the Connect SSO endpoints.

pub mod login;
pub mod provider;

use axum::body::Body;
use axum::http::{header, Response as HttpResponse, StatusCode};
use axum::response::Response;

use crate::error::{ConnectError, ConnectResult};

pub use login::sso_login;
pub use provider::{sso_provider_get, sso_provider_post};

/// Build a plain 302 redirect.
///
/// The Connect contract is an HTTP 302; axum's `Redirect` helpers emit
/// 303/307/308, so the response is assembled explicitly. A location that
/// cannot form a header value aborts the response instead of emitting a
/// partially built redirect.
pub(crate) fn found_redirect(
    location: &str,
    set_cookie: Option<&str>,
) -> ConnectResult<Response> {
    let mut builder = HttpResponse::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location);
    if let Some(cookie) = set_cookie {
        builder = builder.header(header::SET_COOKIE, cookie);
    }
    builder
        .body(Body::empty())
        .map_err(|e| ConnectError::Internal(format!("failed to build redirect: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_redirect_is_302() {
        let resp = found_redirect("https://forum.example.com/cb?sso=a&sig=b", None).unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://forum.example.com/cb?sso=a&sig=b"
        );
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn test_found_redirect_carries_cookie() {
        let resp = found_redirect("/", Some("tribune_session=x; HttpOnly")).unwrap();
        assert_eq!(
            resp.headers().get(header::SET_COOKIE).unwrap(),
            "tribune_session=x; HttpOnly"
        );
    }

    #[test]
    fn test_found_redirect_rejects_unencodable_location() {
        assert!(found_redirect("https://forum.example.com/\ncb", None).is_err());
    }
}
