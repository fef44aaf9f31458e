//! Token exchange against the identity provider.
//!
//! One POST per callback: the authorization code plus the static client
//! credentials and redirect URI go to the token endpoint as
//! `application/x-www-form-urlencoded`, and the JSON answer is classified
//! into a [`TokenResponse`] or a [`CallbackError`].

use crate::config::AppConfig;
use crate::error::CallbackError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::fmt;
use std::time::Duration;

pub const GRANT_TYPE: &str = "authorization_code";

/// Provider bodies larger than this are cut before being shown to the client.
const MAX_DIAGNOSTIC_BYTES: usize = 8 * 1024;

/// Fields whose values never leave the process, even inside a failed answer.
const SECRET_FIELDS: &[&str] = &["access_token", "refresh_token", "id_token"];

const REDACTED: &str = "[redacted]";

/// Form body sent to the token endpoint.
#[derive(Serialize)]
pub struct ExchangeForm<'a> {
    pub client_key: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
    pub grant_type: &'static str,
    pub redirect_uri: &'a str,
}

/// Successful token endpoint answer.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,
    #[serde(default)]
    pub open_id: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("open_id", &self.open_id)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Error fields some providers (TikTok among them) put in failed answers.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    log_id: Option<String>,
}

/// HTTP client bound to one provider registration.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    token_endpoint: String,
    client_key: String,
    client_secret: String,
    redirect_uri: String,
    timeout: Duration,
}

impl fmt::Debug for TokenClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClient")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_key", &self.client_key)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TokenClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(config.http.timeout())
            .connect_timeout(config.http.connect_timeout())
            .build()?;

        Ok(Self {
            http,
            token_endpoint: config.provider.token_endpoint.clone(),
            client_key: config.provider.client_key.clone(),
            client_secret: config.provider.client_secret.clone(),
            redirect_uri: config.provider.redirect_uri.clone(),
            timeout: config.http.timeout(),
        })
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Form for `code`. Everything except the code comes from configuration.
    pub fn exchange_form<'a>(&'a self, code: &'a str) -> ExchangeForm<'a> {
        ExchangeForm {
            client_key: &self.client_key,
            client_secret: &self.client_secret,
            code,
            grant_type: GRANT_TYPE,
            redirect_uri: &self.redirect_uri,
        }
    }

    /// Exchange an authorization code for tokens. Not retried: codes are single use.
    #[tracing::instrument(name = "provider.exchange_code", skip_all, fields(endpoint = %self.token_endpoint))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, CallbackError> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&self.exchange_form(code))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e))?;

        tracing::debug!(
            name = "provider.exchange_code.response",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            status = status.as_u16(),
            body_len = body.len(),
            message = "Token endpoint answered"
        );

        classify_response(status, &body)
    }

    fn transport_error(&self, err: &reqwest::Error) -> CallbackError {
        let message = if err.is_timeout() {
            format!(
                "request to {} timed out after {}s",
                self.token_endpoint,
                self.timeout.as_secs()
            )
        } else {
            error_chain(err)
        };
        tracing::warn!(
            name = "provider.exchange_code.transport_failed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            error = %message,
            message = "Token endpoint unreachable"
        );
        CallbackError::TokenExchangeTransport { message }
    }
}

/// Turn a token endpoint answer into tokens or the matching error.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Result<TokenResponse, CallbackError> {
    let raw = redacted_diagnostic(body);

    if !status.is_success() {
        let details: ProviderErrorBody = serde_json::from_slice(body).unwrap_or_default();
        tracing::warn!(
            name = "provider.exchange_code.rejected",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            status = status.as_u16(),
            error = details.error.as_deref().unwrap_or("unknown"),
            error_description = details.error_description.as_deref().unwrap_or(""),
            log_id = details.log_id.as_deref().unwrap_or(""),
            message = "Provider rejected token exchange"
        );
        return Err(CallbackError::TokenExchangeProvider { status, body: raw });
    }

    match serde_json::from_slice::<TokenResponse>(body) {
        Ok(token) if !token.access_token.is_empty() => Ok(token),
        Ok(_) => Err(CallbackError::MalformedProviderResponse {
            status,
            body: raw,
            reason: "access_token is empty".into(),
        }),
        Err(e) => {
            let details: ProviderErrorBody = serde_json::from_slice(body).unwrap_or_default();
            tracing::warn!(
                name = "provider.exchange_code.malformed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                status = status.as_u16(),
                error = details.error.as_deref().unwrap_or("none"),
                log_id = details.log_id.as_deref().unwrap_or(""),
                parse_error = %e,
                message = "Provider answered without a usable token"
            );
            Err(CallbackError::MalformedProviderResponse {
                status,
                body: raw,
                reason: e.to_string(),
            })
        }
    }
}

/// Diagnostic text for a provider body with token values blanked out.
///
/// JSON bodies keep their shape so `error`/`error_description`/`log_id` stay
/// readable. Non-JSON bodies that mention a token field are withheld whole.
fn redacted_diagnostic(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(mut value) => {
            if !redact_secret_fields(&mut value) {
                return diagnostic_text(body);
            }
            match serde_json::to_vec(&value) {
                Ok(redacted) => diagnostic_text(&redacted),
                Err(_) => withheld_body(body.len()),
            }
        }
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            if SECRET_FIELDS.iter().any(|field| text.contains(field)) {
                withheld_body(body.len())
            } else {
                diagnostic_text(body)
            }
        }
    }
}

/// Replace every non-null secret field, at any depth. Returns whether anything changed.
fn redact_secret_fields(value: &mut serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(map) => {
            let mut changed = false;
            for (key, field) in map.iter_mut() {
                if SECRET_FIELDS.contains(&key.as_str()) {
                    if !field.is_null() {
                        *field = serde_json::Value::String(REDACTED.into());
                        changed = true;
                    }
                } else {
                    changed |= redact_secret_fields(field);
                }
            }
            changed
        }
        serde_json::Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| redact_secret_fields(item) | changed),
        _ => false,
    }
}

fn withheld_body(len: usize) -> String {
    format!("[{len} byte provider body withheld: it contains token fields]")
}

fn diagnostic_text(body: &[u8]) -> String {
    let cut = &body[..body.len().min(MAX_DIAGNOSTIC_BYTES)];
    let mut text = String::from_utf8_lossy(cut).into_owned();
    if body.len() > MAX_DIAGNOSTIC_BYTES {
        text.push_str(" [truncated]");
    }
    text
}

/// reqwest hides the interesting part (refused, DNS, TLS) in the source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
