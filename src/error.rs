//! Error taxonomy for the aggregation pipeline.
//!
//! Validation failures and critical-upstream failures propagate to the HTTP
//! boundary; optional-upstream failures never get this far, because the
//! ratings and streaming clients swallow them into absent/empty values.

use axum::http::StatusCode;
use thiserror::Error;

use crate::validate::ValidationError;

/// Failure talking to an upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-success HTTP status.
    #[error("{upstream} returned HTTP {status}")]
    Status {
        upstream: &'static str,
        status: u16,
    },

    /// The request never completed (connect failure, timeout, etc.).
    #[error("{upstream} request failed: {source}")]
    Transport {
        upstream: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered 2xx but the body did not deserialize.
    #[error("{upstream} response could not be decoded: {source}")]
    Decode {
        upstream: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream has no credential configured.
    #[error("{upstream} is not configured")]
    NotConfigured { upstream: &'static str },
}

impl UpstreamError {
    pub fn upstream(&self) -> &'static str {
        match self {
            Self::Status { upstream, .. }
            | Self::Transport { upstream, .. }
            | Self::Decode { upstream, .. }
            | Self::NotConfigured { upstream } => upstream,
        }
    }
}

/// Request-level error surfaced by the API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to callers. Validation errors carry the specific
    /// reason; upstream detail stays in the logs, keyed by request id.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Upstream(_) => "upstream data sources are currently unavailable".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400_with_reason() {
        let err = ApiError::from(ValidationError::EmptyQuery);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "search query cannot be empty");
    }

    #[test]
    fn upstream_maps_to_500_with_generic_message() {
        let err = ApiError::from(UpstreamError::Status {
            upstream: "tmdb",
            status: 502,
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("502"));
    }
}
