//! Enrichment orchestrator: fans out to the upstream clients and merges
//! their answers into one record.
//!
//! The catalog fetch is critical; if it fails the whole operation fails.
//! Streaming availability runs concurrently with it and degrades to an empty
//! list. The ratings fetch runs after the catalog answer because it needs
//! the IMDb cross-reference key, and degrades to an absent sub-object.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::UpstreamError;
use crate::providers::{
    CatalogProvider, MovieSummary, RatingsProvider, StreamingOption, StreamingProvider,
    VideoEntry,
};

/// Ratings sub-object of an enriched record. Every field is independently
/// optional; a true zero rating stays `Some(0.0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingsBlock {
    /// Primary rating, 0-10 scale.
    pub imdb: Option<f64>,
    /// Secondary rating, 0-100 scale.
    pub rotten_tomatoes: Option<f64>,
    /// Mean of the two on a 0-10 scale, or whichever is present.
    pub combined: Option<f64>,
}

/// The merged output record. Identity fields (`id`, `title`) are always
/// present when enrichment succeeds; everything else degrades to
/// absent/empty rather than failing the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedMovie {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub ratings: Option<RatingsBlock>,
    pub streaming_options: Vec<StreamingOption>,
}

/// Orchestrates the three upstream clients for one request.
pub struct Enricher {
    catalog: Arc<dyn CatalogProvider>,
    ratings: Arc<dyn RatingsProvider>,
    streaming: Arc<dyn StreamingProvider>,
}

impl Enricher {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        ratings: Arc<dyn RatingsProvider>,
        streaming: Arc<dyn StreamingProvider>,
    ) -> Self {
        Self {
            catalog,
            ratings,
            streaming,
        }
    }

    /// Search the catalog for movies matching `query` (already validated).
    pub async fn search(&self, query: &str) -> Result<Vec<MovieSummary>, UpstreamError> {
        self.catalog.search(query).await
    }

    /// Build one [`EnrichedMovie`] for a validated identifier.
    pub async fn enrich(&self, id: u64) -> Result<EnrichedMovie, UpstreamError> {
        // Catalog detail and streaming availability have no data dependency,
        // so they race. Only the catalog result can fail the operation; the
        // streaming client already degraded any failure to an empty list.
        let (detail, streaming_options) =
            tokio::join!(self.catalog.detail(id), self.streaming.availability(id));
        let detail = detail?;

        // Ratings need the cross-reference key from the catalog answer.
        let ratings = match detail.imdb_id.as_deref() {
            Some(imdb_id) => self
                .ratings
                .movie_ratings(imdb_id)
                .await
                .map(|r| RatingsBlock {
                    imdb: r.imdb,
                    rotten_tomatoes: r.rotten_tomatoes,
                    combined: combined_rating(r.imdb, r.rotten_tomatoes),
                }),
            None => {
                debug!(id, "catalog record has no IMDb id; skipping ratings");
                None
            }
        };

        info!(
            id,
            title = %detail.title,
            has_ratings = ratings.is_some(),
            streaming_options = streaming_options.len(),
            "enriched movie record"
        );

        Ok(EnrichedMovie {
            id: detail.id,
            title: detail.title,
            original_title: detail.original_title,
            overview: detail.overview,
            release_date: detail.release_date,
            runtime_minutes: detail.runtime_minutes,
            genres: detail.genres,
            poster_url: detail.poster_url,
            trailer_url: select_trailer(&detail.videos),
            ratings,
            streaming_options,
        })
    }
}

/// Combine the primary (0-10) and secondary (0-100) ratings: the arithmetic
/// mean on a 0-10 scale when both are present, the single present value
/// (scale-converted) otherwise, absent when neither is.
fn combined_rating(imdb: Option<f64>, rotten_tomatoes: Option<f64>) -> Option<f64> {
    match (imdb, rotten_tomatoes) {
        (Some(p), Some(s)) => Some((p + s / 10.0) / 2.0),
        (Some(p), None) => Some(p),
        (None, Some(s)) => Some(s / 10.0),
        (None, None) => None,
    }
}

/// Pick a trailer: an official YouTube trailer if any, otherwise any YouTube
/// trailer, rendered as a watch URL.
fn select_trailer(videos: &[VideoEntry]) -> Option<String> {
    let is_trailer = |v: &&VideoEntry| v.kind == "Trailer" && v.site == "YouTube";

    videos
        .iter()
        .filter(is_trailer)
        .find(|v| v.official)
        .or_else(|| videos.iter().find(is_trailer))
        .map(|v| format!("https://www.youtube.com/watch?v={}", v.key))
}
