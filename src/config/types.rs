use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::limiter::BucketConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub catalog: UpstreamConfig,

    #[serde(default)]
    pub ratings: UpstreamConfig,

    #[serde(default)]
    pub streaming: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Settings for one upstream API.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Credential for this upstream. Never logged, never placed in URLs for
    /// header-authenticated upstreams.
    #[serde(default)]
    pub api_key: String,

    /// Override for the upstream base URL (used by tests and proxies).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Token bucket override; each client falls back to its own default.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Token bucket tuning for one upstream.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub max_tokens: u32,
    pub refill_amount: u32,
    pub refill_interval_ms: u64,
}

impl RateLimitConfig {
    /// Catalog default: 40-deep burst, 4 tokens back per second.
    pub fn catalog_default() -> Self {
        Self {
            max_tokens: 40,
            refill_amount: 4,
            refill_interval_ms: 1000,
        }
    }

    /// Conservative default for the optional upstreams.
    pub fn optional_default() -> Self {
        Self {
            max_tokens: 10,
            refill_amount: 1,
            refill_interval_ms: 1000,
        }
    }

    pub fn bucket_config(&self) -> BucketConfig {
        BucketConfig {
            max_tokens: self.max_tokens.max(1),
            refill_amount: self.refill_amount.max(1),
            refill_interval: Duration::from_millis(self.refill_interval_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_capacity() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    /// How long an aggregate health result is served from cache.
    #[serde(default = "default_health_ttl")]
    pub cache_ttl_secs: u64,

    /// Per-dependency probe timeout.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_health_ttl() -> u64 {
    60
}
fn default_probe_timeout() -> u64 {
    5
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_health_ttl(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}
