//! OpenAPI/Utoipa configuration.

use crate::api::{callback, callback::CALLBACK_TAG, health::MISC_TAG};
use utoipa::OpenApi;

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    paths(callback::callback),
    info(
        title = "OAuth Callback Server",
        version = "1.0.0",
        description = "Completes the OAuth2 authorization code exchange with a third-party identity provider."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = CALLBACK_TAG, description = "OAuth2 redirect callback")
    )
)]
pub struct ApiDoc;
