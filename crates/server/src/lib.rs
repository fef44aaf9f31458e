//! A small server completing the OAuth2 authorization code exchange.
//!
//! The identity provider redirects the user to the callback route with a
//! `code`; the server trades it for tokens at the provider's token endpoint and
//! renders the outcome as an HTML page. Nothing is stored between requests.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::provider::TokenClient;

pub mod api;
pub mod config;
pub mod error;
pub mod pages;
pub mod provider;

/// Read-only state shared by all requests.
#[derive(Clone, Debug)]
pub struct AppResources {
    pub config: Arc<AppConfig>,
    pub token_client: TokenClient,
}

impl AppResources {
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let token_client = TokenClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            token_client,
        })
    }
}
