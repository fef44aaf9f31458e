//! Provider redirect callback.
//!
//! Receives `?code=..&state=..`, exchanges the code at the token endpoint and
//! renders the result. `state` is recorded but not validated: there is no
//! per-attempt state store to compare it against.

use crate::AppResources;
use crate::error::CallbackError;
use crate::pages::SuccessPage;
use askama::Template;
use axum::{Extension, extract::Query, response::Html};
use serde::Deserialize;
use utoipa::IntoParams;

/// Tag for OpenAPI documentation.
pub const CALLBACK_TAG: &str = "OAuth Callback";

/// Query parameters the provider appends to the redirect URI.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizationRequest {
    /// Single-use authorization code issued by the provider.
    pub code: Option<String>,
    /// Opaque value echoed back by the provider. Not validated.
    pub state: Option<String>,
    /// Set by the provider instead of `code` when the user declines.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthorizationRequest {
    fn provider_error(&self) -> Option<String> {
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => Some(format!("{error}: {description}")),
            (Some(error), None) => Some(error.clone()),
            (None, Some(description)) => Some(description.clone()),
            (None, None) => None,
        }
    }
}

#[tracing::instrument(
    name = "callback",
    skip_all,
    fields(code_present, state_present, outcome)
)]
#[utoipa::path(
    get,
    path = "/api/tiktok/callback",
    params(AuthorizationRequest),
    tag = CALLBACK_TAG,
    operation_id = "OAuth Callback",
    summary = "Complete the authorization code exchange",
    description = "Target of the provider's redirect. Exchanges `code` for tokens with a single form POST to the \
                   configured token endpoint and renders the outcome.\n\n\
                   The route is served at the path of the configured `redirect_uri` (or `server.callback_path`); \
                   the path shown here is the default.\n\n\
                   The access token is only displayed when `debug.expose_access_token` is enabled. \
                   The refresh token is never displayed.",
    responses(
        (status = 200, description = "Exchange succeeded", content_type = "text/html"),
        (status = 400, description = "No authorization code in the request", body = str, content_type = "text/plain"),
        (status = 500, description = "Exchange failed; the page embeds the provider's payload or the transport error", content_type = "text/html")
    )
)]
pub async fn callback(
    Query(params): Query<AuthorizationRequest>,
    Extension(resources): Extension<AppResources>,
) -> Result<Html<String>, CallbackError> {
    let span = tracing::Span::current();
    let code = params.code.as_deref().filter(|code| !code.is_empty());
    span.record("code_present", code.is_some());
    span.record("state_present", params.state.is_some());

    if params.state.is_none() {
        tracing::warn!(
            name = "callback.state.missing",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            message = "Callback received without state parameter"
        );
    }

    let Some(code) = code else {
        let provider_error = params.provider_error();
        tracing::warn!(
            name = "callback.code.missing",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            provider_error = provider_error.as_deref().unwrap_or(""),
            message = "Callback received without authorization code"
        );
        span.record("outcome", "missing_code");
        return Err(CallbackError::MissingAuthorizationCode { provider_error });
    };

    tracing::info!(
        name = "callback.exchange.started",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        redirect_uri = resources.token_client.redirect_uri(),
        message = "Exchanging authorization code"
    );

    let token = match resources.token_client.exchange_code(code).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(
                name = "callback.exchange.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                kind = e.kind(),
                error = %e,
                message = "Token exchange failed"
            );
            span.record("outcome", e.kind());
            return Err(e);
        }
    };

    tracing::info!(
        name = "callback.exchange.succeeded",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        open_id = %token.open_id,
        scope = %token.scope,
        expires_in = token.expires_in,
        refresh_token_received = token.refresh_token.is_some(),
        message = "Tokens received from provider"
    );
    span.record("outcome", "success");

    let html = SuccessPage::new(&token, resources.config.debug.expose_access_token).render()?;
    Ok(Html(html))
}
