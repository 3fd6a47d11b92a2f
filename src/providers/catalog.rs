//! TMDB-backed catalog provider.
//!
//! The catalog is the critical upstream: its failures propagate as
//! [`UpstreamError`] and fail the whole request. Auth uses a v4 read-access
//! token in the `Authorization: Bearer` header, so the credential never
//! appears in a URL (an earlier revision passed it as a query parameter).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::{RateLimitConfig, UpstreamConfig};
use crate::error::UpstreamError;
use crate::limiter::TokenBucket;

use super::{
    year_label, CatalogProvider, MovieDetail, MovieSummary, VideoEntry, REQUEST_TIMEOUT,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const UPSTREAM: &str = "tmdb";

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    id: u64,
    title: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    id: u64,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    genres: Option<Vec<TmdbGenre>>,
    poster_path: Option<String>,
    imdb_id: Option<String>,
    videos: Option<TmdbVideos>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbVideos {
    results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideo {
    key: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    official: bool,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Catalog client backed by the TMDB v3 REST API.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    bucket: TokenBucket,
    search_cache: TtlCache<Vec<MovieSummary>>,
    detail_cache: TtlCache<MovieDetail>,
}

impl CatalogClient {
    pub fn new(
        config: &UpstreamConfig,
        search_cache: TtlCache<Vec<MovieSummary>>,
        detail_cache: TtlCache<MovieDetail>,
    ) -> Self {
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
            token: config.api_key.clone(),
            bucket: TokenBucket::new(
                config
                    .rate_limit
                    .unwrap_or_else(RateLimitConfig::catalog_default)
                    .bucket_config(),
            ),
            search_cache,
            detail_cache,
        }
    }

    /// Execute a GET request after acquiring a rate-limit token.
    async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, UpstreamError> {
        self.bucket.acquire().await;

        debug!(path, "catalog request");
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .query(params)
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
        Ok(resp)
    }
}

fn poster_url(path: Option<&str>) -> Option<String> {
    path.map(|p| format!("{IMAGE_BASE}{p}"))
}

fn normalize_detail(detail: TmdbMovieDetail) -> MovieDetail {
    MovieDetail {
        id: detail.id,
        title: detail.title.unwrap_or_default(),
        original_title: detail.original_title,
        overview: detail.overview,
        release_date: detail.release_date,
        runtime_minutes: detail.runtime,
        genres: detail
            .genres
            .unwrap_or_default()
            .into_iter()
            .map(|g| g.name)
            .collect(),
        poster_url: poster_url(detail.poster_path.as_deref()),
        imdb_id: detail.imdb_id,
        videos: detail
            .videos
            .map(|v| v.results)
            .unwrap_or_default()
            .into_iter()
            .map(|v| VideoEntry {
                key: v.key,
                site: v.site,
                kind: v.kind,
                official: v.official,
            })
            .collect(),
    }
}

#[async_trait]
impl CatalogProvider for CatalogClient {
    fn name(&self) -> &'static str {
        UPSTREAM
    }

    fn is_available(&self) -> bool {
        !self.token.is_empty()
    }

    async fn search(&self, query: &str) -> Result<Vec<MovieSummary>, UpstreamError> {
        if !self.is_available() {
            return Err(UpstreamError::NotConfigured { upstream: UPSTREAM });
        }

        let cache_key = format!("{UPSTREAM}:search:{query}");
        if let Some(hit) = self.search_cache.get(&cache_key) {
            debug!(query, "catalog search cache hit");
            return Ok(hit);
        }

        let body: TmdbSearchResponse = self
            .get("/search/movie", &[("query", query)])
            .await?
            .json()
            .await
            .map_err(|source| UpstreamError::Decode {
                upstream: UPSTREAM,
                source,
            })?;

        let results: Vec<MovieSummary> = body
            .results
            .into_iter()
            .map(|r| MovieSummary {
                id: r.id,
                title: r.title.unwrap_or_default(),
                year: year_label(r.release_date.as_deref()),
                poster_url: poster_url(r.poster_path.as_deref()),
                rating: r.vote_average,
            })
            .collect();

        self.search_cache.set(cache_key, results.clone());
        Ok(results)
    }

    async fn detail(&self, id: u64) -> Result<MovieDetail, UpstreamError> {
        if !self.is_available() {
            return Err(UpstreamError::NotConfigured { upstream: UPSTREAM });
        }

        let cache_key = format!("{UPSTREAM}:detail:{id}");
        if let Some(hit) = self.detail_cache.get(&cache_key) {
            debug!(id, "catalog detail cache hit");
            return Ok(hit);
        }

        let body: TmdbMovieDetail = self
            .get(
                &format!("/movie/{id}"),
                &[("append_to_response", "videos")],
            )
            .await?
            .json()
            .await
            .map_err(|source| UpstreamError::Decode {
                upstream: UPSTREAM,
                source,
            })?;

        let detail = normalize_detail(body);
        self.detail_cache.set(cache_key, detail.clone());
        Ok(detail)
    }

    async fn probe(&self) -> Result<Duration, UpstreamError> {
        if !self.is_available() {
            return Err(UpstreamError::NotConfigured { upstream: UPSTREAM });
        }

        // Cheap endpoint; bypasses cache and rate limiter so a saturated
        // bucket cannot mask liveness.
        let started = Instant::now();
        let resp = self
            .client
            .get(format!("{}/configuration", self.base_url))
            .bearer_auth(&self.token)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poster_url_construction() {
        assert_eq!(
            poster_url(Some("/abc123.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc123.jpg")
        );
        assert_eq!(poster_url(None), None);
    }

    #[test]
    fn detail_normalization_defaults() {
        let detail = normalize_detail(TmdbMovieDetail {
            id: 27205,
            title: Some("Inception".into()),
            original_title: None,
            overview: None,
            release_date: Some("2010-07-15".into()),
            runtime: Some(148),
            genres: None,
            poster_path: None,
            imdb_id: Some("tt1375666".into()),
            videos: None,
        });

        assert_eq!(detail.id, 27205);
        assert_eq!(detail.title, "Inception");
        assert!(detail.genres.is_empty());
        assert!(detail.videos.is_empty());
        assert_eq!(detail.imdb_id.as_deref(), Some("tt1375666"));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_fast() {
        let client = CatalogClient::new(
            &UpstreamConfig::default(),
            TtlCache::default(),
            TtlCache::default(),
        );
        assert!(!client.is_available());
        let err = client.search("Inception").await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotConfigured { .. }));
    }
}
