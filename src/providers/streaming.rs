//! Watchmode-backed streaming-availability provider.
//!
//! Optional upstream: failures degrade to an empty option list at this
//! boundary. Auth uses an `X-Api-Key` header. The liveness probe treats 403
//! and 404 as reachable, because lower subscription tiers receive those
//! codes from a perfectly healthy service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::{RateLimitConfig, UpstreamConfig};
use crate::error::UpstreamError;
use crate::limiter::TokenBucket;

use super::{StreamingOption, StreamingProvider, REQUEST_TIMEOUT};

const DEFAULT_BASE_URL: &str = "https://api.watchmode.com/v1";
const UPSTREAM: &str = "watchmode";

// ---------------------------------------------------------------------------
// Watchmode API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WatchmodeSource {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    region: String,
    web_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Streaming-availability client backed by the Watchmode API.
pub struct StreamingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: TokenBucket,
    cache: TtlCache<Vec<StreamingOption>>,
}

impl StreamingClient {
    pub fn new(config: &UpstreamConfig, cache: TtlCache<Vec<StreamingOption>>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: config.api_key.clone(),
            bucket: TokenBucket::new(
                config
                    .rate_limit
                    .unwrap_or_else(RateLimitConfig::optional_default)
                    .bucket_config(),
            ),
            cache,
        }
    }

    async fn fetch(&self, movie_id: u64) -> Result<Vec<StreamingOption>, UpstreamError> {
        self.bucket.acquire().await;

        let path = format!("/title/movie-{movie_id}/sources/");
        debug!(movie_id, "streaming availability request");
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                upstream: UPSTREAM,
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                upstream: UPSTREAM,
                status: status.as_u16(),
            });
        }

        let sources: Vec<WatchmodeSource> =
            resp.json().await.map_err(|source| UpstreamError::Decode {
                upstream: UPSTREAM,
                source,
            })?;

        Ok(sources
            .into_iter()
            .map(|s| StreamingOption {
                service: s.name,
                kind: s.kind,
                region: s.region,
                url: s.web_url,
            })
            .collect())
    }
}

#[async_trait]
impl StreamingProvider for StreamingClient {
    fn name(&self) -> &'static str {
        UPSTREAM
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn availability(&self, movie_id: u64) -> Vec<StreamingOption> {
        if !self.is_available() {
            debug!("streaming upstream not configured; skipping");
            return Vec::new();
        }

        let cache_key = format!("{UPSTREAM}:sources:{movie_id}");
        if let Some(hit) = self.cache.get(&cache_key) {
            debug!(movie_id, "streaming availability cache hit");
            return hit;
        }

        match self.fetch(movie_id).await {
            Ok(options) => {
                self.cache.set(cache_key, options.clone());
                options
            }
            Err(e) => {
                warn!(
                    movie_id,
                    error = %e,
                    "streaming availability fetch failed; continuing with empty list"
                );
                Vec::new()
            }
        }
    }

    async fn probe(&self) -> Result<Duration, UpstreamError> {
        if !self.is_available() {
            return Err(UpstreamError::NotConfigured { upstream: UPSTREAM });
        }

        let started = Instant::now();
        let resp = self
            .client
            .get(format!("{}/regions/", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                upstream: UPSTREAM,
                source,
            })?;

        let status = resp.status();
        // Tier-aware exception: 403/404 means the service answered but the
        // current subscription cannot use this endpoint.
        if status.is_success() || status.as_u16() == 403 || status.as_u16() == 404 {
            return Ok(started.elapsed());
        }
        Err(UpstreamError::Status {
            upstream: UPSTREAM,
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_returns_empty() {
        let client = StreamingClient::new(&UpstreamConfig::default(), TtlCache::default());
        assert!(!client.is_available());
        assert!(client.availability(27205).await.is_empty());
    }
}
