use crate::pages::ErrorPage;
use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Everything that can go wrong while handling a provider callback.
///
/// Each variant is converted into an HTTP response at the handler boundary;
/// none of them propagate further.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The callback carried no (or an empty) `code` query parameter.
    #[error("authorization code was not received")]
    MissingAuthorizationCode {
        /// `error` / `error_description` the provider put on the redirect, if any.
        provider_error: Option<String>,
    },
    /// The token endpoint could not be reached or did not answer in time.
    #[error("token exchange request failed: {message}")]
    TokenExchangeTransport { message: String },
    /// The provider answered with a non-success status.
    #[error("provider rejected the token exchange with HTTP {status}: {body}")]
    TokenExchangeProvider { status: StatusCode, body: String },
    /// The provider answered 2xx but without a usable token.
    #[error("provider returned HTTP {status} without a usable token ({reason}): {body}")]
    MalformedProviderResponse {
        status: StatusCode,
        body: String,
        reason: String,
    },
    #[error("failed to render response page: {0}")]
    Render(#[from] askama::Error),
}

impl CallbackError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CallbackError::MissingAuthorizationCode { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-friendly label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            CallbackError::MissingAuthorizationCode { .. } => "missing_authorization_code",
            CallbackError::TokenExchangeTransport { .. } => "token_exchange_transport",
            CallbackError::TokenExchangeProvider { .. } => "token_exchange_provider",
            CallbackError::MalformedProviderResponse { .. } => "malformed_provider_response",
            CallbackError::Render(_) => "render",
        }
    }

    /// Text shown to the client: the provider's payload (token values
    /// redacted) when there is one, otherwise the transport error message.
    pub fn diagnostic(&self) -> String {
        match self {
            CallbackError::TokenExchangeProvider { body, .. }
            | CallbackError::MalformedProviderResponse { body, .. }
                if !body.is_empty() =>
            {
                body.clone()
            }
            CallbackError::TokenExchangeTransport { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            CallbackError::MissingAuthorizationCode { provider_error } => {
                let body = match provider_error {
                    Some(reported) => {
                        format!("Error: authorization code not received. Provider reported: {reported}")
                    }
                    None => "Error: authorization code not received.".to_string(),
                };
                (status, body).into_response()
            }
            CallbackError::Render(_) => (status, self.to_string()).into_response(),
            _ => {
                let diagnostic = self.diagnostic();
                match (ErrorPage {
                    diagnostic: &diagnostic,
                })
                .render()
                {
                    Ok(html) => (status, Html(html)).into_response(),
                    Err(e) => {
                        tracing::error!(
                            name = "callback.error_page.render_failed",
                            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                            error = %e,
                            message = "Failed to render error page"
                        );
                        (status, diagnostic).into_response()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_code_is_a_client_error() {
        let err = CallbackError::MissingAuthorizationCode {
            provider_error: None,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "missing_authorization_code");
    }

    #[test]
    fn provider_errors_surface_raw_body() {
        let err = CallbackError::TokenExchangeProvider {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"invalid_grant"}"#.into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.diagnostic(), r#"{"error":"invalid_grant"}"#);
    }

    #[test]
    fn empty_provider_body_falls_back_to_message() {
        let err = CallbackError::TokenExchangeProvider {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert!(err.diagnostic().contains("502"));
    }

    #[test]
    fn transport_errors_surface_message() {
        let err = CallbackError::TokenExchangeTransport {
            message: "connection refused".into(),
        };
        assert_eq!(err.diagnostic(), "connection refused");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
