//! HTTP surface of the callback server.
//!
//! - `callback` - provider redirect target (path taken from configuration)
//! - `status` - plain running confirmation (/api)
//! - `health` - liveness probe (/healthz)
//! - `openapi` - OpenAPI document, served as Redoc at /api-docs

pub mod callback;
pub mod health;
pub mod openapi;
pub mod status;

pub use callback::CALLBACK_TAG;
pub use health::MISC_TAG;

use crate::AppResources;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Builds the complete router.
///
/// Performs no I/O, so hosts that invoke the app per request can build it once
/// at cold start.
pub fn app(resources: AppResources) -> Router {
    let callback_path = resources.config.callback_path();

    // The callback path is configuration, so it is mounted as a plain route;
    // its documentation comes from ApiDoc.
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .routes(routes!(status::status))
        .routes(routes!(health::health))
        .route(&callback_path, get(callback::callback))
        .layer(axum::Extension(resources))
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Binds the configured address and serves until the process ends.
#[tracing::instrument(skip_all)]
pub async fn start_webserver(resources: AppResources) -> color_eyre::Result<()> {
    let bind_addr = resources.config.server.bind_addr.clone();
    let callback_path = resources.config.callback_path();
    let router = app(resources);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        name = "server.listening",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        addr = %bind_addr,
        callback_path = %callback_path,
        message = "Server running"
    );
    axum::serve(listener, router)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
