//! OpenAPI documentation for the SSO endpoints.

use utoipa::OpenApi;

/// API documentation assembled from the handler annotations.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tribune SSO Bridge",
        description = "Connect SSO handshake between Tribune and the forum"
    ),
    paths(
        tribune_connect::handlers::provider::sso_provider_get,
        tribune_connect::handlers::provider::sso_provider_post,
        tribune_connect::handlers::login::sso_login,
    ),
    tags(
        (name = "SSO", description = "Connect SSO handshake endpoints")
    )
)]
pub struct ApiDoc;
