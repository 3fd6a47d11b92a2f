//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] around stub providers and can
//! start the Axum app on a random port for HTTP-level testing.
//! [`MockUpstream`] is a small Axum server emulating the three real upstream
//! APIs, used to exercise the reqwest-backed clients end to end.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use cinefuse::config::Config;
use cinefuse::enrich::Enricher;
use cinefuse::error::UpstreamError;
use cinefuse::health::HealthChecker;
use cinefuse::providers::{
    CatalogProvider, MovieDetail, MovieRatings, MovieSummary, RatingsProvider, StreamingOption,
    StreamingProvider, VideoEntry,
};
use cinefuse::server::{create_router, AppContext};

// ---------------------------------------------------------------------------
// Stub providers
// ---------------------------------------------------------------------------

pub struct StubCatalog {
    pub results: Vec<MovieSummary>,
    pub detail: Option<MovieDetail>,
    pub probe_ok: bool,
}

#[async_trait]
impl CatalogProvider for StubCatalog {
    fn name(&self) -> &'static str {
        "stub-catalog"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search(&self, _query: &str) -> Result<Vec<MovieSummary>, UpstreamError> {
        Ok(self.results.clone())
    }

    async fn detail(&self, _id: u64) -> Result<MovieDetail, UpstreamError> {
        self.detail.clone().ok_or(UpstreamError::Status {
            upstream: "stub-catalog",
            status: 502,
        })
    }

    async fn probe(&self) -> Result<Duration, UpstreamError> {
        if self.probe_ok {
            Ok(Duration::from_millis(3))
        } else {
            Err(UpstreamError::Status {
                upstream: "stub-catalog",
                status: 500,
            })
        }
    }
}

pub struct StubRatings {
    pub ratings: Option<MovieRatings>,
    pub probe_ok: bool,
}

#[async_trait]
impl RatingsProvider for StubRatings {
    fn name(&self) -> &'static str {
        "stub-ratings"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn movie_ratings(&self, _imdb_id: &str) -> Option<MovieRatings> {
        self.ratings
    }

    async fn probe(&self) -> Result<Duration, UpstreamError> {
        if self.probe_ok {
            Ok(Duration::from_millis(3))
        } else {
            Err(UpstreamError::Status {
                upstream: "stub-ratings",
                status: 500,
            })
        }
    }
}

pub struct StubStreaming {
    pub options: Vec<StreamingOption>,
    pub probe_ok: bool,
}

#[async_trait]
impl StreamingProvider for StubStreaming {
    fn name(&self) -> &'static str {
        "stub-streaming"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn availability(&self, _movie_id: u64) -> Vec<StreamingOption> {
        self.options.clone()
    }

    async fn probe(&self) -> Result<Duration, UpstreamError> {
        if self.probe_ok {
            Ok(Duration::from_millis(3))
        } else {
            Err(UpstreamError::Status {
                upstream: "stub-streaming",
                status: 500,
            })
        }
    }
}

/// Catalog detail all stub-backed tests share.
pub fn inception_detail() -> MovieDetail {
    MovieDetail {
        id: 27205,
        title: "Inception".into(),
        original_title: Some("Inception".into()),
        overview: Some("A thief who steals corporate secrets through dream-sharing.".into()),
        release_date: Some("2010-07-15".into()),
        runtime_minutes: Some(148),
        genres: vec!["Action".into(), "Science Fiction".into()],
        poster_url: Some("https://image.tmdb.org/t/p/w500/incep.jpg".into()),
        imdb_id: Some("tt1375666".into()),
        videos: vec![VideoEntry {
            key: "YoHD9XEInc0".into(),
            site: "YouTube".into(),
            kind: "Trailer".into(),
            official: true,
        }],
    }
}

pub fn netflix_option() -> StreamingOption {
    StreamingOption {
        service: "Netflix".into(),
        kind: "sub".into(),
        region: "US".into(),
        url: Some("https://www.netflix.com/title/70131314".into()),
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
}

impl TestHarness {
    /// Harness with well-behaved default stubs (Inception detail, full
    /// ratings, one streaming option, all probes up).
    pub fn new() -> Self {
        Self::with_providers(
            StubCatalog {
                results: vec![MovieSummary {
                    id: 27205,
                    title: "Inception".into(),
                    year: "2010".into(),
                    poster_url: Some("https://image.tmdb.org/t/p/w500/incep.jpg".into()),
                    rating: Some(8.4),
                }],
                detail: Some(inception_detail()),
                probe_ok: true,
            },
            StubRatings {
                ratings: Some(MovieRatings {
                    imdb: Some(8.8),
                    rotten_tomatoes: Some(87.0),
                }),
                probe_ok: true,
            },
            StubStreaming {
                options: vec![netflix_option()],
                probe_ok: true,
            },
        )
    }

    pub fn with_providers(
        catalog: StubCatalog,
        ratings: StubRatings,
        streaming: StubStreaming,
    ) -> Self {
        let catalog: Arc<dyn CatalogProvider> = Arc::new(catalog);
        let ratings: Arc<dyn RatingsProvider> = Arc::new(ratings);
        let streaming: Arc<dyn StreamingProvider> = Arc::new(streaming);

        let enricher = Arc::new(Enricher::new(
            catalog.clone(),
            ratings.clone(),
            streaming.clone(),
        ));
        let health = Arc::new(HealthChecker::new(
            catalog,
            ratings,
            streaming,
            Duration::from_secs(5),
            Duration::from_secs(60),
        ));

        Self {
            ctx: AppContext {
                config: Arc::new(Config::default()),
                enricher,
                health,
            },
        }
    }

    /// Start the app on a random port and return the bound address.
    pub async fn serve(&self) -> SocketAddr {
        serve_router(create_router(self.ctx.clone())).await
    }

    /// Shorthand: default harness, already serving.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let addr = harness.serve().await;
        (harness, addr)
    }
}

pub async fn serve_router(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind random port");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

// ---------------------------------------------------------------------------
// Mock upstream server
// ---------------------------------------------------------------------------

/// Failure switches and hit counters for the mock upstream endpoints.
#[derive(Default)]
pub struct MockState {
    pub catalog_fail: AtomicBool,
    pub ratings_fail: AtomicBool,
    pub streaming_fail: AtomicBool,
    pub search_hits: AtomicUsize,
    pub detail_hits: AtomicUsize,
    pub ratings_hits: AtomicUsize,
    pub sources_hits: AtomicUsize,
}

/// One Axum server emulating all three upstreams under distinct prefixes.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

pub const CATALOG_TOKEN: &str = "catalog-test-token";
pub const RATINGS_KEY: &str = "ratings-test-key";
pub const STREAMING_KEY: &str = "streaming-test-key";

impl MockUpstream {
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/tmdb/search/movie", get(tmdb_search))
            .route("/tmdb/movie/:id", get(tmdb_detail))
            .route("/tmdb/configuration", get(tmdb_configuration))
            .route("/omdb", get(omdb_lookup))
            .route("/watchmode/title/:slug/sources/", get(watchmode_sources))
            .route("/watchmode/regions/", get(watchmode_regions))
            .with_state(state.clone());

        let addr = serve_router(app).await;
        Self { addr, state }
    }

    /// Config pointing the real clients at this mock.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.catalog.api_key = CATALOG_TOKEN.into();
        config.catalog.base_url = Some(format!("http://{}/tmdb", self.addr));
        config.ratings.api_key = RATINGS_KEY.into();
        config.ratings.base_url = Some(format!("http://{}/omdb", self.addr));
        config.streaming.api_key = STREAMING_KEY.into();
        config.streaming.base_url = Some(format!("http://{}/watchmode", self.addr));
        config
    }
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {CATALOG_TOKEN}"))
        .unwrap_or(false)
}

async fn tmdb_search(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.search_hits.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if state.catalog_fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "results": [
                {
                    "id": 27205,
                    "title": "Inception",
                    "release_date": "2010-07-15",
                    "poster_path": "/incep.jpg",
                    "vote_average": 8.4
                },
                {
                    "id": 64956,
                    "title": "Inception: The Cobol Job",
                    "release_date": null,
                    "poster_path": null,
                    "vote_average": null
                }
            ]
        })),
    )
}

async fn tmdb_detail(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.detail_hits.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if state.catalog_fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "id": 27205,
            "title": "Inception",
            "original_title": "Inception",
            "overview": "A thief who steals corporate secrets through dream-sharing.",
            "release_date": "2010-07-15",
            "runtime": 148,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "poster_path": "/incep.jpg",
            "imdb_id": "tt1375666",
            "videos": {
                "results": [
                    {"key": "fan-cut", "site": "YouTube", "type": "Trailer", "official": false},
                    {"key": "YoHD9XEInc0", "site": "YouTube", "type": "Trailer", "official": true}
                ]
            }
        })),
    )
}

async fn tmdb_configuration(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if state.catalog_fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
    }
    (StatusCode::OK, Json(json!({"images": {}})))
}

async fn omdb_lookup(State(state): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    state.ratings_hits.fetch_add(1, Ordering::SeqCst);
    if state.ratings_fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "Title": "Inception",
            "imdbRating": "8.8",
            "Ratings": [
                {"Source": "Internet Movie Database", "Value": "8.8/10"},
                {"Source": "Rotten Tomatoes", "Value": "87%"}
            ],
            "Response": "True"
        })),
    )
}

async fn watchmode_sources(State(state): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    state.sources_hits.fetch_add(1, Ordering::SeqCst);
    if state.streaming_fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!([])));
    }
    (
        StatusCode::OK,
        Json(json!([
            {
                "name": "Netflix",
                "type": "sub",
                "region": "US",
                "web_url": "https://www.netflix.com/title/70131314"
            },
            {
                "name": "iTunes",
                "type": "buy",
                "region": "US",
                "web_url": null
            }
        ])),
    )
}

async fn watchmode_regions(State(state): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    if state.streaming_fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!([])));
    }
    (StatusCode::OK, Json(json!(["US", "GB", "CA"])))
}
