use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::youtube::VideoRecord;

/// 请求的形状，当前只有请求的视频数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestShape {
    pub max_results: u32,
}

/// 一旦写入就不再修改的缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: Arc<Vec<VideoRecord>>,
    pub created_at: DateTime<Utc>,
    pub degraded: bool,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: &CacheTtl) -> bool {
        now - self.created_at >= ttl.for_entry(self.degraded)
    }
}

/// 健康结果与降级结果使用不同的过期时间，降级结果过期得更快以便尽早重试上游
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub healthy: TimeDelta,
    pub degraded: TimeDelta,
}

impl CacheTtl {
    fn for_entry(&self, degraded: bool) -> TimeDelta {
        if degraded { self.degraded } else { self.healthy }
    }
}

pub struct ResponseCache {
    entries: Mutex<HashMap<RequestShape, CacheEntry>>,
    ttl: CacheTtl,
}

impl ResponseCache {
    pub fn new(ttl: CacheTtl) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// 返回未过期的条目
    pub fn get(&self, shape: &RequestShape) -> Option<CacheEntry> {
        self.get_at(shape, Utc::now())
    }

    pub fn get_at(&self, shape: &RequestShape, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.entries
            .lock()
            .get(shape)
            .filter(|entry| !entry.is_expired_at(now, &self.ttl))
            .cloned()
    }

    /// 忽略过期时间，返回仍带有视频数据的条目，上游不可用时作为次优选择
    pub fn get_stale(&self, shape: &RequestShape) -> Option<CacheEntry> {
        self.entries
            .lock()
            .get(shape)
            .filter(|entry| !entry.records.is_empty())
            .cloned()
    }

    /// 后写入者覆盖先写入者
    pub fn put(&self, shape: RequestShape, records: Arc<Vec<VideoRecord>>, degraded: bool) {
        self.put_at(shape, records, degraded, Utc::now());
    }

    pub fn put_at(&self, shape: RequestShape, records: Arc<Vec<VideoRecord>>, degraded: bool, now: DateTime<Utc>) {
        self.entries.lock().insert(
            shape,
            CacheEntry {
                records,
                created_at: now,
                degraded,
            },
        );
    }
}
