use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::adapter::{Source, VideoSource};
use crate::cache::{RequestShape, ResponseCache};
use crate::config::Config;
use crate::fallback::FallbackSet;
use crate::workflow::aggregate;
use crate::youtube::{CredentialPool, MAX_PAGE_SIZE, QuotaStatus, ResilientExecutor, VideoRecord, YtClient};

/// get_videos 的返回值，degraded 为 true 时 note 说明数据来源
#[derive(Debug, Clone, Serialize)]
pub struct VideoList {
    pub videos: Arc<Vec<VideoRecord>>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Cow<'static, str>>,
}

impl VideoList {
    fn live(videos: Arc<Vec<VideoRecord>>) -> Self {
        Self {
            videos,
            degraded: false,
            note: None,
        }
    }

    fn degraded(videos: Arc<Vec<VideoRecord>>, note: &'static str) -> Self {
        Self {
            videos,
            degraded: true,
            note: Some(Cow::Borrowed(note)),
        }
    }
}

const NOTE_PARTIAL: &str = "Some sources could not be fetched, showing partial data";
const NOTE_CACHED_DEGRADED: &str = "Showing cached data from a degraded fetch";
const NOTE_STALE: &str = "Using cached data due to API issues";
const NOTE_FALLBACK_EMPTY: &str = "Using fallback data due to API issues";
const NOTE_FALLBACK_ERROR: &str = "Using fallback data due to API error";

pub struct VideoService<S: VideoSource = Source> {
    client: YtClient,
    executor: ResilientExecutor,
    sources: Vec<S>,
    cache: ResponseCache,
    fallback: FallbackSet,
    default_max_results: u32,
    deadline: Duration,
}

impl VideoService<Source> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let pool = Arc::new(CredentialPool::new(
            config.resolve_credentials(),
            config.quota_reset_offset(),
        ));
        if pool.is_empty() {
            warn!("未配置任何 YouTube API 密钥，将始终返回兜底数据");
        } else {
            info!("已加载 {} 个 YouTube API 密钥用于自动轮换", pool.len());
        }
        let sources = config.parsed_sources()?;
        for source in &sources {
            info!("已加载{}：{}", source, source.url());
        }
        Self::new(
            YtClient::new(config.request_timeout(), config.rate_limit.as_ref()),
            ResilientExecutor::new(pool, config.request_timeout()),
            sources,
            ResponseCache::new(config.cache_ttl()),
            FallbackSet::load(config.fallback_path.as_deref())?,
            config.max_results_per_source,
            config.deadline(),
        )
    }
}

impl<S: VideoSource> VideoService<S> {
    pub fn new(
        client: YtClient,
        executor: ResilientExecutor,
        sources: Vec<S>,
        cache: ResponseCache,
        fallback: FallbackSet,
        default_max_results: u32,
        deadline: Duration,
    ) -> Result<Self> {
        if sources.is_empty() && fallback.is_empty() {
            bail!("no video source configured and the fallback set is empty");
        }
        if sources.is_empty() {
            warn!("未配置任何视频来源，将始终返回兜底数据");
        }
        Ok(Self {
            client,
            executor,
            sources,
            cache,
            fallback,
            default_max_results,
            deadline,
        })
    }

    pub fn default_max_results(&self) -> u32 {
        self.default_max_results
    }

    pub fn quota_status(&self) -> QuotaStatus {
        self.executor.pool().status()
    }

    pub fn reset_quota(&self) {
        self.executor.pool().reset_all();
    }

    pub async fn get_videos(&self, max_results: u32) -> VideoList {
        self.get_videos_with_deadline(max_results, self.deadline).await
    }

    /// 依次尝试：未过期的缓存、在截止时间内的实时请求、过期缓存、兜底数据；不会返回错误
    pub async fn get_videos_with_deadline(&self, max_results: u32, deadline: Duration) -> VideoList {
        let shape = RequestShape {
            max_results: max_results.clamp(1, MAX_PAGE_SIZE),
        };
        if let Some(entry) = self.cache.get(&shape) {
            debug!("命中缓存（max_results = {}，degraded = {}）", shape.max_results, entry.degraded);
            return match (entry.records.is_empty(), entry.degraded) {
                (false, false) => VideoList::live(entry.records),
                (false, true) => VideoList::degraded(entry.records, NOTE_CACHED_DEGRADED),
                (true, _) => self.fallback(shape, NOTE_FALLBACK_EMPTY),
            };
        }
        info!("缓存未命中，开始从 YouTube 获取视频..");
        let live = tokio::time::timeout(
            deadline,
            aggregate(&self.sources, &self.client, &self.executor, shape.max_results),
        )
        .await;
        let note = match live {
            Ok(res) if !res.degraded => {
                info!("成功获取 {} 个视频", res.records.len());
                let records = Arc::new(res.records);
                self.cache.put(shape, records.clone(), false);
                return VideoList::live(records);
            }
            Ok(res) if !res.records.is_empty() => {
                warn!("部分来源获取失败，返回 {} 个视频并按降级结果缓存", res.records.len());
                let records = Arc::new(res.records);
                self.cache.put(shape, records.clone(), true);
                return VideoList::degraded(records, NOTE_PARTIAL);
            }
            Ok(_) => NOTE_FALLBACK_EMPTY,
            Err(_) => {
                warn!("获取视频超过截止时间 {deadline:?}，放弃本次请求");
                NOTE_FALLBACK_ERROR
            }
        };
        if let Some(stale) = self.cache.get_stale(&shape) {
            warn!("上游不可用，返回过期的缓存数据");
            self.cache.put(shape, stale.records.clone(), true);
            return VideoList::degraded(stale.records, NOTE_STALE);
        }
        self.cache.put(shape, Arc::new(Vec::new()), true);
        self.fallback(shape, note)
    }

    /// 兜底数据只截取请求的数量，且永远不作为健康结果缓存
    fn fallback(&self, shape: RequestShape, note: &'static str) -> VideoList {
        warn!("返回兜底视频数据：{note}");
        let records = self.fallback.records();
        let videos = if records.len() > shape.max_results as usize {
            Arc::new(records[..shape.max_results as usize].to_vec())
        } else {
            records
        };
        VideoList::degraded(videos, note)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{FixedOffset, TimeDelta};

    use super::*;
    use crate::cache::CacheTtl;
    use crate::workflow::tests::{FakeSource, record, upstream};

    fn ttl() -> CacheTtl {
        CacheTtl {
            healthy: TimeDelta::hours(24),
            degraded: TimeDelta::hours(2),
        }
    }

    fn service(sources: Vec<FakeSource>) -> VideoService<FakeSource> {
        let (client, executor) = upstream();
        VideoService::new(
            client,
            executor,
            sources,
            ResponseCache::new(ttl()),
            FallbackSet::embedded().unwrap(),
            5,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_pool_returns_fallback() {
        let config = Config::default();
        // from_config 会读取环境变量中的密钥，这里直接构造一个空密钥池
        let pool = Arc::new(CredentialPool::new(Vec::new(), FixedOffset::east_opt(0).unwrap()));
        let service = VideoService::new(
            YtClient::new(config.request_timeout(), None),
            ResilientExecutor::new(pool, config.request_timeout()),
            config.parsed_sources().unwrap(),
            ResponseCache::new(config.cache_ttl()),
            FallbackSet::embedded().unwrap(),
            5,
            config.deadline(),
        )
        .unwrap();
        let fallback = FallbackSet::embedded().unwrap().records();
        for max_results in [3, 50] {
            let res = service.get_videos(max_results).await;
            assert!(res.degraded);
            assert!(res.note.is_some());
            let expected = fallback.iter().take(max_results as usize).cloned().collect::<Vec<_>>();
            assert_eq!(*res.videos, expected);
        }
        // 第二次请求命中降级缓存，仍然返回兜底数据
        let res = service.get_videos(3).await;
        assert!(res.degraded);
        assert_eq!(res.videos.len(), 3);
        assert_eq!(service.quota_status().total_keys, 0);
    }

    #[tokio::test]
    async fn test_healthy_result_is_cached() {
        let service = service(vec![FakeSource::videos(vec![
            record("a", "2024-01-01T00:00:00Z", "a"),
            record("b", "2024-02-01T00:00:00Z", "b"),
        ])]);
        let res = service.get_videos(5).await;
        assert!(!res.degraded);
        assert!(res.note.is_none());
        assert_eq!(res.videos[0].id, "b");
        let res = service.get_videos(5).await;
        assert!(!res.degraded);
        assert_eq!(service.sources[0].calls(), 1);
        // 不同的请求形状使用不同的缓存条目
        service.get_videos(10).await;
        assert_eq!(service.sources[0].calls(), 2);
    }

    #[tokio::test]
    async fn test_partial_result_is_degraded() {
        let service = service(vec![
            FakeSource::failing(|| anyhow!("backend error")),
            FakeSource::videos(vec![record("a", "2024-01-01T00:00:00Z", "a")]),
        ]);
        let res = service.get_videos(5).await;
        assert!(res.degraded);
        assert_eq!(res.videos.len(), 1);
        let entry = service.cache.get(&RequestShape { max_results: 5 }).unwrap();
        assert!(entry.degraded);
    }

    #[tokio::test]
    async fn test_stale_cache_preferred_over_fallback() {
        let service = service(vec![FakeSource::failing(|| anyhow!("backend error"))]);
        let shape = RequestShape { max_results: 5 };
        let old = chrono::Utc::now() - TimeDelta::days(3);
        service
            .cache
            .put_at(shape, Arc::new(vec![record("old", "2023-01-01T00:00:00Z", "old")]), false, old);
        let res = service.get_videos(5).await;
        assert!(res.degraded);
        assert_eq!(res.videos[0].id, "old");
        assert_eq!(res.note.as_deref(), Some(NOTE_STALE));
        // 过期数据以降级条目重新缓存，短时间内不会再请求上游
        let res = service.get_videos(5).await;
        assert_eq!(res.videos[0].id, "old");
        assert_eq!(service.sources[0].calls(), 1);
    }

    #[tokio::test]
    async fn test_deadline_falls_back() {
        struct SlowSource;

        #[async_trait::async_trait]
        impl VideoSource for SlowSource {
            fn display_name(&self) -> String {
                "慢速来源".to_owned()
            }

            async fn fetch_videos(&self, _: &YtClient, _: &ResilientExecutor, _: u32) -> Result<Vec<VideoRecord>> {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(vec![record("late", "2024-01-01T00:00:00Z", "late")])
            }
        }

        let (client, executor) = upstream();
        let service = VideoService::new(
            client,
            executor,
            vec![SlowSource],
            ResponseCache::new(ttl()),
            FallbackSet::embedded().unwrap(),
            5,
            Duration::from_millis(50),
        )
        .unwrap();
        let res = service.get_videos(2).await;
        assert!(res.degraded);
        assert_eq!(res.note.as_deref(), Some(NOTE_FALLBACK_ERROR));
        assert_eq!(res.videos.len(), 2);
    }

    #[tokio::test]
    async fn test_no_sources() {
        let (client, executor) = upstream();
        let empty = FallbackSet::from_json("[]").unwrap();
        let res = VideoService::<FakeSource>::new(
            client,
            executor,
            Vec::new(),
            ResponseCache::new(ttl()),
            empty,
            5,
            Duration::from_secs(1),
        );
        assert!(res.is_err());

        let service = service(Vec::new());
        let res = service.get_videos(4).await;
        assert!(res.degraded);
        assert_eq!(res.videos.len(), 4);
    }
}
