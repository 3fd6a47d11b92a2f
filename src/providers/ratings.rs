//! OMDb-backed ratings provider.
//!
//! Optional upstream: every failure mode (missing credential, non-2xx,
//! malformed body, transport error) degrades to `None` here at the client
//! boundary, with a warning for observability. OMDb only supports
//! query-parameter auth, so the key travels as a request parameter; log
//! lines carry the IMDb id, never the URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::{RateLimitConfig, UpstreamConfig};
use crate::error::UpstreamError;
use crate::limiter::TokenBucket;

use super::{MovieRatings, RatingsProvider, REQUEST_TIMEOUT};

const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";
const UPSTREAM: &str = "omdb";

// ---------------------------------------------------------------------------
// OMDb API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "Ratings")]
    ratings: Option<Vec<OmdbRating>>,
}

#[derive(Debug, Deserialize)]
struct OmdbRating {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Value")]
    value: String,
}

/// Parse OMDb's `imdbRating` field: a decimal string or `"N/A"`.
fn parse_imdb_rating(raw: Option<&str>) -> Option<f64> {
    raw.filter(|v| !v.eq_ignore_ascii_case("N/A"))
        .and_then(|v| v.parse().ok())
}

/// Parse the Rotten Tomatoes entry of the `Ratings` array: `"87%"` -> 87.0.
fn parse_rotten_tomatoes(ratings: &[OmdbRating]) -> Option<f64> {
    ratings
        .iter()
        .find(|r| r.source == "Rotten Tomatoes")
        .and_then(|r| r.value.strip_suffix('%'))
        .and_then(|v| v.parse().ok())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Ratings client backed by the OMDb API, keyed by IMDb id.
pub struct RatingsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: TokenBucket,
    cache: TtlCache<MovieRatings>,
}

impl RatingsClient {
    pub fn new(config: &UpstreamConfig, cache: TtlCache<MovieRatings>) -> Self {
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

    async fn fetch(&self, imdb_id: &str) -> Result<MovieRatings, UpstreamError> {
        self.bucket.acquire().await;

        debug!(imdb_id, "ratings request");
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str()), ("i", imdb_id)])
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

        let body: OmdbResponse = resp.json().await.map_err(|source| UpstreamError::Decode {
            upstream: UPSTREAM,
            source,
        })?;

        Ok(MovieRatings {
            imdb: parse_imdb_rating(body.imdb_rating.as_deref()),
            rotten_tomatoes: parse_rotten_tomatoes(&body.ratings.unwrap_or_default()),
        })
    }
}

#[async_trait]
impl RatingsProvider for RatingsClient {
    fn name(&self) -> &'static str {
        UPSTREAM
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn movie_ratings(&self, imdb_id: &str) -> Option<MovieRatings> {
        if !self.is_available() {
            debug!("ratings upstream not configured; skipping");
            return None;
        }

        let cache_key = format!("{UPSTREAM}:ratings:{imdb_id}");
        if let Some(hit) = self.cache.get(&cache_key) {
            debug!(imdb_id, "ratings cache hit");
            return Some(hit);
        }

        match self.fetch(imdb_id).await {
            Ok(ratings) => {
                self.cache.set(cache_key, ratings);
                Some(ratings)
            }
            Err(e) => {
                warn!(imdb_id, error = %e, "ratings fetch failed; continuing without ratings");
                None
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
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
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
        Ok(started.elapsed())
    }
}
