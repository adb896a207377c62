//! HTTP client for the upstream birds API that owns player characters

use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;

use super::roster::RosterBird;

#[derive(Debug, Deserialize)]
struct BirdsResponse {
    data: Vec<RosterBird>,
}

/// Client for the birds API; authenticated per request by the caller's
/// wallet signature
#[derive(Clone)]
pub struct BirdsApiClient {
    client: Client,
    base_url: String,
}

impl BirdsApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.birds_api_url.clone(),
        }
    }

    /// Fetch the characters owned by the holder of `signature`
    pub async fn fetch_birds(&self, signature: &str) -> Result<Vec<RosterBird>, BirdsApiError> {
        let url = format!("{}/birds", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("signature", signature)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(BirdsApiError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BirdsApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BirdsResponse = response.json().await.map_err(BirdsApiError::Parse)?;
        Ok(parsed.data)
    }
}

/// Birds API errors
#[derive(Debug, thiserror::Error)]
pub enum BirdsApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),
}
