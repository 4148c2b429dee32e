use std::cmp::Reverse;

use itertools::Itertools;

use crate::adapter::VideoSource;
use crate::youtube::{ResilientExecutor, VideoRecord, YtClient, is_pool_exhausted};

/// 一次聚合的结果，degraded 表示结果不是完整、健康的上游数据
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub records: Vec<VideoRecord>,
    pub degraded: bool,
}

/// 按顺序请求所有来源，合并后按 id 去重（保留首次出现）并按发布时间倒序排列
///
/// 某个来源报告密钥池耗尽后不再请求剩余来源；任何来源失败或合并结果为空都记为降级，但不会返回错误
pub async fn aggregate<S: VideoSource>(
    sources: &[S],
    client: &YtClient,
    executor: &ResilientExecutor,
    max_results: u32,
) -> Aggregated {
    let mut batches = Vec::with_capacity(sources.len());
    let mut degraded = false;
    for (idx, source) in sources.iter().enumerate() {
        match source.fetch_videos(client, executor, max_results).await {
            Ok(videos) => {
                info!("从{}获取到 {} 个视频", source.display_name(), videos.len());
                batches.push(videos);
            }
            Err(e) => {
                degraded = true;
                if is_pool_exhausted(&e) {
                    error!(
                        "获取{}时 API 密钥已全部失效，跳过剩余的 {} 个来源：{e:#}",
                        source.display_name(),
                        sources.len() - idx - 1
                    );
                    break;
                }
                error!("获取{}时遇到错误：{e:#}", source.display_name());
            }
        }
    }
    let records = merge_records(batches);
    if records.is_empty() {
        warn!("所有来源均未获取到视频");
        degraded = true;
    }
    Aggregated { records, degraded }
}

pub fn merge_records(batches: Vec<Vec<VideoRecord>>) -> Vec<VideoRecord> {
    let mut records = batches
        .into_iter()
        .flatten()
        .unique_by(|record| record.id.clone())
        .collect::<Vec<_>>();
    // sort_by_key 是稳定排序，发布时间相同的视频保持来源顺序
    records.sort_by_key(|record| Reverse(record.published_at));
    records
}
