//! Dependency health checking and aggregation.
//!
//! Each upstream is probed with its own lightweight request raced against a
//! fixed timeout. The aggregate result is cached whole; after the TTL
//! expires the next caller pays for a fresh probe of all three dependencies.
//! Catalog down makes the service `unhealthy`, an optional upstream down
//! only `degraded`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use crate::error::UpstreamError;
use crate::providers::{CatalogProvider, RatingsProvider, StreamingProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
}

/// Probe outcome for one upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl DependencyHealth {
    fn up(latency: Duration) -> Self {
        Self {
            status: DependencyStatus::Up,
            latency_ms: Some(latency.as_millis() as u64),
        }
    }

    fn down() -> Self {
        Self {
            status: DependencyStatus::Down,
            latency_ms: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == DependencyStatus::Up
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DependencySet {
    pub catalog: DependencyHealth,
    pub ratings: DependencyHealth,
    pub streaming: DependencyHealth,
}

/// Aggregate health report, served whole from cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateHealth {
    pub status: AggregateStatus,
    pub checked_at: DateTime<Utc>,
    pub dependencies: DependencySet,
}

/// Derive the aggregate status from the three dependency probes.
fn aggregate(deps: &DependencySet) -> AggregateStatus {
    if !deps.catalog.is_up() {
        AggregateStatus::Unhealthy
    } else if !deps.ratings.is_up() || !deps.streaming.is_up() {
        AggregateStatus::Degraded
    } else {
        AggregateStatus::Healthy
    }
}

/// Probes the three upstreams and caches the aggregate result.
pub struct HealthChecker {
    catalog: Arc<dyn CatalogProvider>,
    ratings: Arc<dyn RatingsProvider>,
    streaming: Arc<dyn StreamingProvider>,
    probe_timeout: Duration,
    cache_ttl: Duration,
    cached: Mutex<Option<(Instant, AggregateHealth)>>,
}

impl HealthChecker {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        ratings: Arc<dyn RatingsProvider>,
        streaming: Arc<dyn StreamingProvider>,
        probe_timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            catalog,
            ratings,
            streaming,
            probe_timeout,
            cache_ttl,
            cached: Mutex::new(None),
        }
    }

    /// Return the aggregate health, serving from cache while fresh.
    pub async fn check(&self) -> AggregateHealth {
        if let Some((at, health)) = self.cached.lock().as_ref() {
            if at.elapsed() <= self.cache_ttl {
                return health.clone();
            }
        }

        let (catalog, ratings, streaming) = tokio::join!(
            self.probe_one(self.catalog.name(), self.catalog.probe()),
            self.probe_one(self.ratings.name(), self.ratings.probe()),
            self.probe_one(self.streaming.name(), self.streaming.probe()),
        );

        let dependencies = DependencySet {
            catalog,
            ratings,
            streaming,
        };
        let health = AggregateHealth {
            status: aggregate(&dependencies),
            checked_at: Utc::now(),
            dependencies,
        };

        *self.cached.lock() = Some((Instant::now(), health.clone()));
        health
    }

    async fn probe_one<F>(&self, name: &'static str, probe: F) -> DependencyHealth
    where
        F: Future<Output = Result<Duration, UpstreamError>>,
    {
        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(latency)) => DependencyHealth::up(latency),
            Ok(Err(e)) => {
                warn!(upstream = name, error = %e, "health probe failed");
                DependencyHealth::down()
            }
            Err(_) => {
                warn!(
                    upstream = name,
                    timeout_secs = self.probe_timeout.as_secs(),
                    "health probe timed out"
                );
                DependencyHealth::down()
            }
        }
    }
}
