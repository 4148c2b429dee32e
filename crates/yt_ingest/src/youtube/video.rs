use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::youtube::{ListResponse, ResilientExecutor, YtClient};

/// 对外提供的视频信息，时长与播放量均已格式化为展示用的字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: String,
    pub view_count: String,
    pub published_at: DateTime<Utc>,
    pub channel_title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VideoItem {
    id: Option<String>,
    snippet: Option<VideoSnippet>,
    content_details: Option<VideoContentDetails>,
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    channel_title: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
}

impl VideoSnippet {
    fn published_at(&self) -> Option<DateTime<Utc>> {
        let published_at = DateTime::parse_from_rfc3339(self.published_at.as_deref()?).ok()?;
        Some(published_at.with_timezone(&Utc))
    }
}

impl VideoItem {
    /// 缺少 id 或发布时间的条目无法去重与排序
    fn is_complete(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
            && self.snippet.as_ref().and_then(VideoSnippet::published_at).is_some()
    }

    fn into_record(self) -> Option<VideoRecord> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let snippet = self.snippet?;
        let published_at = snippet.published_at()?;
        let thumbnail = snippet
            .thumbnails
            .and_then(|t| t.high.or(t.medium).or(t.default))
            .map(|t| t.url)
            .unwrap_or_default();
        let duration = self
            .content_details
            .and_then(|c| c.duration)
            .map_or_else(|| "0:00".to_owned(), |d| parse_duration(&d));
        let view_count = self
            .statistics
            .and_then(|s| s.view_count)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_default();
        Some(VideoRecord {
            id,
            title: snippet.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Untitled".to_owned()),
            description: snippet.description.unwrap_or_default(),
            thumbnail,
            duration,
            view_count: format_view_count(view_count),
            published_at,
            channel_title: snippet.channel_title.unwrap_or_default(),
        })
    }
}

/// 一次批量请求所有视频的详细信息（时长、播放量、发布时间、封面）
pub(super) async fn fetch_details(
    client: &YtClient,
    executor: &ResilientExecutor,
    video_ids: &[String],
    source: &str,
) -> Result<Vec<VideoRecord>> {
    let ids = video_ids.join(",");
    let items = executor
        .execute(
            &format!("获取 {source} 的视频详情"),
            |credential| {
                let ids = ids.as_str();
                async move {
                    client
                        .list::<VideoItem>(
                            "videos",
                            &[("part", "snippet,contentDetails,statistics"), ("id", ids)],
                            &credential,
                        )
                        .await
                }
            },
            |res: &ListResponse<VideoItem>| res.items.iter().any(VideoItem::is_complete),
        )
        .await
        .with_context(|| format!("failed to get video details of {source}"))?
        .items;
    let total = items.len();
    let records: Vec<VideoRecord> = items.into_iter().filter_map(VideoItem::into_record).collect();
    if records.len() < total {
        warn!("{source} 中有 {} 个视频信息不完整，已丢弃", total - records.len());
    }
    Ok(records)
}

static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").expect("invalid duration regex")
});

/// 将 ISO-8601 时长转换为 `H:MM:SS` 或 `M:SS`，天数折算进小时，无法解析时返回 `0:00`
pub fn parse_duration(duration: &str) -> String {
    let Some(caps) = DURATION_REGEX.captures(duration) else {
        return "0:00".to_owned();
    };
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok()).unwrap_or(0);
    let hours = part(1).saturating_mul(24).saturating_add(part(2));
    // 分钟与秒可能超过进位，统一换算成秒后再拆分
    let total = hours
        .saturating_mul(3600)
        .saturating_add(part(3).saturating_mul(60))
        .saturating_add(part(4));
    let (h, m, s) = (total / 3600, total % 3600 / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// 播放量格式化：不足一千原样输出，否则保留一位小数并附加 K / M / B
pub fn format_view_count(count: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
    for (i, (base, suffix)) in UNITS.iter().enumerate() {
        if count < *base {
            continue;
        }
        let value = (count as f64 / *base as f64 * 10.0).round() / 10.0;
        // 四舍五入后达到 1000 时进位到更大的单位，例如 999_960 显示为 1M 而非 1000K
        if value >= 1000.0 && i > 0 {
            let (base, suffix) = UNITS[i - 1];
            return trim_decimal((count as f64 / base as f64 * 10.0).round() / 10.0, suffix);
        }
        return trim_decimal(value, suffix);
    }
    count.to_string()
}

fn trim_decimal(value: f64, suffix: &str) -> String {
    let formatted = format!("{value:.1}");
    let formatted = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{formatted}{suffix}")
}
