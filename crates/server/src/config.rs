use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// TikTok Open API v2 token endpoint, used when none is configured.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://open.tiktokapis.com/v2/oauth/token/";
/// Served when the redirect URI cannot be parsed (validation rejects that case).
pub const DEFAULT_CALLBACK_PATH: &str = "/api/tiktok/callback";
/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "OAUTH_CALLBACK_CONFIG";
/// Prefix for environment overrides, e.g. `OAUTH__PROVIDER__CLIENT_KEY`.
pub const ENV_PREFIX: &str = "OAUTH";

/// Routes owned by the server itself; the callback may not shadow them.
const RESERVED_PATHS: [&str; 3] = ["/api", "/healthz", "/api-docs"];

/// Flat variable names accepted as low-priority defaults for older deployments.
const LEGACY_ENV_DEFAULTS: [(&str, &str); 2] = [
    ("provider.client_key", "TIKTOK_CLIENT_KEY"),
    ("provider.client_secret", "TIKTOK_CLIENT_SECRET"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Credentials and endpoints registered with the identity provider.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub client_key: String,
    pub client_secret: String,
    /// Must match the URI registered with the provider byte for byte.
    pub redirect_uri: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_key", &self.client_key)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Overrides the route derived from `provider.redirect_uri`, for deployments
    /// behind a path-rewriting proxy.
    #[serde(default)]
    pub callback_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            callback_path: None,
        }
    }
}

/// Outbound client settings for the token exchange.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DebugConfig {
    /// Render the freshly issued access token on the success page.
    /// Only meant for local debugging; keep it off anywhere else.
    #[serde(default)]
    pub expose_access_token: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Path the callback handler is mounted on.
    pub fn callback_path(&self) -> String {
        if let Some(path) = &self.server.callback_path {
            return path.clone();
        }
        Url::parse(&self.provider.redirect_uri)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| DEFAULT_CALLBACK_PATH.to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.client_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "provider.client_key must not be empty".into(),
            ));
        }
        if self.provider.client_secret.trim().is_empty() {
            return Err(ConfigError::Validation(
                "provider.client_secret must not be empty".into(),
            ));
        }
        validate_http_url("provider.redirect_uri", &self.provider.redirect_uri)?;
        validate_http_url("provider.token_endpoint", &self.provider.token_endpoint)?;

        if let Some(path) = &self.server.callback_path {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "server.callback_path must start with '/': {path}"
                )));
            }
        }
        let callback_path = self.callback_path();
        if RESERVED_PATHS.contains(&callback_path.as_str()) {
            return Err(ConfigError::Validation(format!(
                "callback path {callback_path} collides with a built-in route"
            )));
        }

        self.server.bind_addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!(
                "server.bind_addr is not a socket address ({}): {e}",
                self.server.bind_addr
            ))
        })?;

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Validation("http.timeout_secs must be > 0".into()));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http.connect_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{key} is not a valid URL ({value}): {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::Validation(format!(
            "{key} must be an absolute http(s) URL: {value}"
        )));
    }
    Ok(())
}

fn default_token_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Load application configuration from `config.yaml` (or the file named by
/// `OAUTH_CALLBACK_CONFIG`) plus environment overrides.
///
/// Environment variables use the `OAUTH` prefix and double underscores between
/// key segments, e.g. `OAUTH__PROVIDER__CLIENT_SECRET`. The config file is
/// optional so that environment-only deployments work.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.yaml".to_string());
    load_config_from(&path)
}

/// Same as [`load_config`] with an explicit config file path.
pub fn load_config_from(path: &str) -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};

    let mut builder = Config::builder();
    for (key, var) in LEGACY_ENV_DEFAULTS {
        if let Ok(value) = std::env::var(var) {
            builder = builder.set_default(key, value)?;
        }
    }

    let cfg = builder
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
