//! OAuth2 access tokens for the Google APIs.
//!
//! Tokens come either from configuration (local development) or from the
//! instance metadata server, cached until shortly before they expire.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, VisionLogError};

/// Default metadata server endpoint for the default service account.
pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the advertised expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

enum Source {
    Static(String),
    Metadata { url: String, http_client: Client },
}

/// Supplies bearer tokens to the Vision and BigQuery clients.
pub struct AccessTokenSource {
    source: Source,
    cache: RwLock<Option<CachedToken>>,
}

impl AccessTokenSource {
    /// Always hand out the given token.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: Source::Static(token.into()),
            cache: RwLock::new(None),
        }
    }

    /// Fetch tokens from the metadata server at `url`.
    pub fn metadata(url: impl Into<String>, http_client: Client) -> Self {
        Self {
            source: Source::Metadata {
                url: url.into(),
                http_client,
            },
            cache: RwLock::new(None),
        }
    }

    /// Current bearer token, refreshing it if it is missing or about to expire.
    pub async fn token(&self) -> Result<String> {
        let (url, http_client) = match &self.source {
            Source::Static(token) => return Ok(token.clone()),
            Source::Metadata { url, http_client } => (url, http_client),
        };

        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the write lock.
        if let Some(ref cached) = *cache {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        debug!(url = %url, "Fetching access token from metadata server");
        let response = http_client
            .get(url.as_str())
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to reach metadata server");
                VisionLogError::Token(format!("metadata server unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Metadata server refused token request");
            return Err(VisionLogError::Token(format!(
                "metadata server returned status {status}"
            )));
        }

        let parsed: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|e| VisionLogError::Token(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = parsed.expires_in, "Refreshed access token");

        *cache = Some(CachedToken {
            token: parsed.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(parsed.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_token() {
        let source = AccessTokenSource::fixed("ya29.test");
        assert_eq!(source.token().await.unwrap(), "ya29.test");
        assert_eq!(source.token().await.unwrap(), "ya29.test");
    }

    #[tokio::test]
    async fn test_metadata_token_served_from_cache() {
        let source = AccessTokenSource::metadata("http://metadata.invalid/token", Client::new());
        *source.cache.write().await = Some(CachedToken {
            token: "cached".to_string(),
            expires_at: Instant::now() + Duration::from_secs(600),
        });

        assert_eq!(source.token().await.unwrap(), "cached");
    }
}
