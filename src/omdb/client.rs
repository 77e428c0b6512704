use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::types::OmdbMovie;
use crate::config::OmdbConfig;
use crate::db::NewMovie;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Movie lookup is not configured (no OMDb API key)")]
    NotConfigured,
    #[error("Movie lookup failed: {0}")]
    Request(reqwest::Error),
    #[error("Movie not found: {0}")]
    NotFound(String),
    #[error("Invalid movie data: {0}")]
    Invalid(String),
}

/// Source of movie metadata, looked up by title.
#[async_trait]
pub trait MovieLookup: Send + Sync {
    async fn lookup(&self, title: &str) -> Result<NewMovie, LookupError>;
}

pub struct OmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OmdbClient {
    pub fn new(config: &OmdbConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(request_error)?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            api_key: config.apikey.clone(),
        })
    }

    fn build_url(&self, api_key: &str, title: &str) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}apikey={}&t={}&plot=short",
            self.base_url,
            separator,
            urlencoding::encode(api_key),
            urlencoding::encode(title)
        )
    }
}

/// The request URL carries the API key, so it never leaves this module.
fn request_error(e: reqwest::Error) -> LookupError {
    LookupError::Request(e.without_url())
}

#[async_trait]
impl MovieLookup for OmdbClient {
    async fn lookup(&self, title: &str) -> Result<NewMovie, LookupError> {
        let api_key = self.api_key.as_deref().ok_or(LookupError::NotConfigured)?;
        let url = self.build_url(api_key, title);

        debug!(title, "looking up movie");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let answer = match response {
            Ok(r) => r.json::<OmdbMovie>().await,
            Err(e) => Err(e),
        }
        .map_err(request_error)?;

        answer.into_new_movie(title)
    }
}
