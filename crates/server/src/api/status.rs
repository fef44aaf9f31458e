//! Root status endpoint.

use crate::AppResources;
use crate::api::health::MISC_TAG;
use axum::Extension;

/// Plain confirmation that the server runs, plus where the callback lives.
///
/// Credentials are deliberately absent from the body.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/api",
    tag = MISC_TAG,
    operation_id = "Server Status",
    summary = "Server status",
    description = "Confirms the callback server is running and names the route the provider redirects to.",
    responses(
        (status = 200, description = "Server is running", body = str, content_type = "text/plain",
         example = "OAuth callback server running. Callback route: /api/tiktok/callback")
    )
)]
pub async fn status(Extension(resources): Extension<AppResources>) -> String {
    format!(
        "OAuth callback server running. Callback route: {}",
        resources.config.callback_path()
    )
}
