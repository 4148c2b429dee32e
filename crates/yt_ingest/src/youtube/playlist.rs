use anyhow::{Context, Result};
use serde::Deserialize;

use crate::youtube::video::fetch_details;
use crate::youtube::{ListResponse, ResilientExecutor, VideoRecord, YtClient};

/// playlistItems 接口单页最多返回 50 条
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: Option<String>,
}

impl PlaylistItem {
    fn video_id(&self) -> Option<&str> {
        self.content_details.as_ref()?.video_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// 从播放列表链接的 list 参数中取出播放列表 id
pub fn parse_playlist_id(url: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(k, v)| k == "list" && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// 列出播放列表中最前面的至多 max_results 个视频 id
pub(super) async fn list_video_ids(
    client: &YtClient,
    executor: &ResilientExecutor,
    playlist_id: &str,
    max_results: u32,
    source: &str,
) -> Result<Vec<String>> {
    let max_results = max_results.clamp(1, MAX_PAGE_SIZE).to_string();
    let res = executor
        .execute(
            &format!("获取 {source} 的视频列表"),
            |credential| {
                let max_results = max_results.as_str();
                async move {
                    client
                        .list::<PlaylistItem>(
                            "playlistItems",
                            &[
                                ("part", "contentDetails"),
                                ("playlistId", playlist_id),
                                ("maxResults", max_results),
                            ],
                            &credential,
                        )
                        .await
                }
            },
            |res: &ListResponse<PlaylistItem>| res.items.iter().any(|item| item.video_id().is_some()),
        )
        .await
        .with_context(|| format!("failed to list videos of playlist {playlist_id}"))?;
    Ok(res
        .items
        .iter()
        .filter_map(PlaylistItem::video_id)
        .map(str::to_owned)
        .collect())
}

pub struct Playlist<'a> {
    client: &'a YtClient,
    executor: &'a ResilientExecutor,
    pub playlist_id: &'a str,
}

impl<'a> Playlist<'a> {
    pub fn new(client: &'a YtClient, executor: &'a ResilientExecutor, playlist_id: &'a str) -> Self {
        Self {
            client,
            executor,
            playlist_id,
        }
    }

    pub async fn fetch_videos(&self, max_results: u32) -> Result<Vec<VideoRecord>> {
        let source = format!("播放列表 {}", self.playlist_id);
        let video_ids = list_video_ids(self.client, self.executor, self.playlist_id, max_results, &source).await?;
        fetch_details(self.client, self.executor, &video_ids, &source).await
    }
}
