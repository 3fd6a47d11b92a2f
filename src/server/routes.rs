use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::enrich::EnrichedMovie;
use crate::error::ApiError;
use crate::health::AggregateStatus;
use crate::providers::MovieSummary;
use crate::server::request_id::RequestId;
use crate::server::AppContext;
use crate::validate::{validate_movie_id, validate_search_query};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/search", get(search))
        .route("/movies/:id", get(enrich_movie))
}

/// Error body shape shared by all API errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub request_id: String,
}

fn error_response(err: ApiError, request_id: &RequestId) -> (StatusCode, Json<ErrorBody>) {
    if matches!(err, ApiError::Upstream(_)) {
        // Upstream detail stays server-side, keyed by request id.
        error!(error = %err, "request failed");
    }
    (
        err.status_code(),
        Json(ErrorBody {
            error: err.public_message(),
            request_id: request_id.0.clone(),
        }),
    )
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    results: Vec<MovieSummary>,
    request_id: String,
}

async fn search(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorBody>)> {
    let query = validate_search_query(&params.query)
        .map_err(|e| error_response(e.into(), &request_id))?;

    let results = ctx
        .enricher
        .search(query)
        .await
        .map_err(|e| error_response(e.into(), &request_id))?;

    Ok(Json(SearchResponse {
        results,
        request_id: request_id.0,
    }))
}

#[derive(Debug, Serialize)]
struct EnrichResponse {
    #[serde(flatten)]
    movie: EnrichedMovie,
    request_id: String,
}

async fn enrich_movie(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<EnrichResponse>, (StatusCode, Json<ErrorBody>)> {
    // The id is validated in string form: "27.5" or "+5" must 400 rather
    // than silently coerce.
    let id = validate_movie_id(&id).map_err(|e| error_response(e.into(), &request_id))?;

    let movie = ctx
        .enricher
        .enrich(id)
        .await
        .map_err(|e| error_response(e.into(), &request_id))?;

    Ok(Json(EnrichResponse {
        movie,
        request_id: request_id.0,
    }))
}

pub async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let health = ctx.health.check().await;
    let status = match health.status {
        AggregateStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(health))
}
