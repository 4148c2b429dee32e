use serde::{Deserialize, Serialize};

use crate::config::default::{default_degraded_ttl_secs, default_healthy_ttl_secs};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: usize,
    pub duration: u64,
}

/// 响应缓存的过期时间，单位为秒
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CacheConfig {
    #[serde(default = "default_healthy_ttl_secs")]
    pub healthy_ttl: u64,
    #[serde(default = "default_degraded_ttl_secs")]
    pub degraded_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            healthy_ttl: default_healthy_ttl_secs(),
            degraded_ttl: default_degraded_ttl_secs(),
        }
    }
}
