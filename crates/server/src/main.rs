use oauth_callback_server::AppResources;
use oauth_callback_server::api::start_webserver;
use oauth_callback_server::config::load_config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "oauth_callback_server=info,tower_http=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let layer = fmt::layer().with_target(true).with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    // A missing .env is the normal case outside local development.
    let dotenv = dotenvy::dotenv();

    initialize_tracing();
    if let Err(e) = &dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to read .env file");
        }
    }

    let config = load_config()?;
    tracing::info!(
        token_endpoint = %config.provider.token_endpoint,
        redirect_uri = %config.provider.redirect_uri,
        callback_path = %config.callback_path(),
        timeout_secs = config.http.timeout_secs,
        expose_access_token = config.debug.expose_access_token,
        "configuration loaded"
    );
    if config.debug.expose_access_token {
        tracing::warn!(
            "debug.expose_access_token is enabled: access tokens will be rendered to clients"
        );
    }

    let resources = AppResources::new(config)?;
    start_webserver(resources).await
}
