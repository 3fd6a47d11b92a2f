//! Upstream client system: one trait and one reqwest-backed client per
//! external data source.
//!
//! - [`catalog`] -- TMDB-style catalog/search provider (critical).
//! - [`ratings`] -- OMDb-style ratings provider, keyed by IMDb id (optional).
//! - [`streaming`] -- Watchmode-style availability provider (optional).
//!
//! Every client operation follows the same order: consult its cache, acquire
//! a token from its own rate limiter, issue the network call, normalize the
//! response, store it, return. Clients never retry. The optional clients
//! swallow failures into absent/empty results at this boundary; only the
//! catalog client propagates [`UpstreamError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

pub mod catalog;
pub mod ratings;
pub mod streaming;

pub use catalog::CatalogClient;
pub use ratings::RatingsClient;
pub use streaming::StreamingClient;

/// Per-call deadline for upstream requests.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Normalized output types
// ---------------------------------------------------------------------------

/// Lightweight search result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    /// Leading year component of the release date, or `"Unknown"`.
    pub year: String,
    pub poster_url: Option<String>,
    pub rating: Option<f64>,
}

/// Full catalog record for one movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    /// Cross-reference key for the ratings upstream.
    pub imdb_id: Option<String>,
    pub videos: Vec<VideoEntry>,
}

/// One video attached to a catalog record (trailer, teaser, clip, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntry {
    pub key: String,
    pub site: String,
    pub kind: String,
    pub official: bool,
}

/// Ratings fetched from the ratings upstream. Both fields are independently
/// optional; a genuine zero rating is `Some(0.0)`, distinct from absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovieRatings {
    /// Primary rating on a 0-10 scale.
    pub imdb: Option<f64>,
    /// Secondary rating as a 0-100 percentage.
    pub rotten_tomatoes: Option<f64>,
}

/// One way to stream the movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingOption {
    pub service: String,
    /// Offer kind: subscription, rent, buy, free.
    pub kind: String,
    pub region: String,
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

/// The critical upstream: catalog search and per-movie detail. Failures
/// propagate; there is no record without catalog data.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `true` when a credential is configured.
    fn is_available(&self) -> bool;

    async fn search(&self, query: &str) -> Result<Vec<MovieSummary>, UpstreamError>;

    async fn detail(&self, id: u64) -> Result<MovieDetail, UpstreamError>;

    /// Lightweight liveness request, returning observed latency on success.
    async fn probe(&self) -> Result<Duration, UpstreamError>;
}

/// Optional ratings upstream. Any failure (missing credential, non-2xx,
/// malformed body, transport) degrades to `None`.
#[async_trait]
pub trait RatingsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    async fn movie_ratings(&self, imdb_id: &str) -> Option<MovieRatings>;

    async fn probe(&self) -> Result<Duration, UpstreamError>;
}

/// Optional streaming-availability upstream. Any failure degrades to an
/// empty option list.
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    async fn availability(&self, movie_id: u64) -> Vec<StreamingOption>;

    async fn probe(&self) -> Result<Duration, UpstreamError>;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Extract the leading four-digit year from a date like `"2010-07-15"`,
/// falling back to `"Unknown"`.
pub(crate) fn year_label(date: Option<&str>) -> String {
    date.and_then(|d| d.get(..4))
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_label_extraction() {
        assert_eq!(year_label(Some("2010-07-15")), "2010");
        assert_eq!(year_label(Some("1999")), "1999");
        assert_eq!(year_label(Some("")), "Unknown");
        assert_eq!(year_label(Some("n/a")), "Unknown");
        assert_eq!(year_label(None), "Unknown");
    }
}
