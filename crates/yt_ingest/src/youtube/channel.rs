use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;

use crate::youtube::playlist::list_video_ids;
use crate::youtube::video::fetch_details;
use crate::youtube::{ListResponse, ResilientExecutor, VideoRecord, YtClient};

/// 频道链接中可能出现的几种频道标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `youtube.com/@handle`，需要先搜索得到频道 id
    Handle(String),
    /// `youtube.com/channel/UC...`
    Id(String),
    /// `youtube.com/user/name`，可以直接按用户名查询
    Username(String),
    /// `youtube.com/c/name`，与 handle 一样通过搜索解析
    Custom(String),
}

static CHANNEL_PATTERNS: LazyLock<[(Regex, fn(String) -> ChannelRef); 4]> = LazyLock::new(|| {
    let build = |p: &str| Regex::new(p).expect("invalid channel regex");
    [
        (build(r"youtube\.com/(@[^/?#]+)"), ChannelRef::Handle),
        (build(r"youtube\.com/channel/([^/?#]+)"), ChannelRef::Id),
        (build(r"youtube\.com/user/([^/?#]+)"), ChannelRef::Username),
        (build(r"youtube\.com/c/([^/?#]+)"), ChannelRef::Custom),
    ]
});

impl ChannelRef {
    pub fn parse(url: &str) -> Option<Self> {
        for (pattern, build) in CHANNEL_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(url) {
                return Some(build(caps[1].to_owned()));
            }
        }
        // 兜底：取路径的第一段，形如 @handle 或 24 位的 UC 开头 id
        let url = reqwest::Url::parse(url).ok()?;
        if !url.host_str().is_some_and(|h| h.ends_with("youtube.com")) {
            return None;
        }
        let first = url.path_segments()?.find(|s| !s.is_empty())?;
        if first.starts_with('@') {
            Some(ChannelRef::Handle(first.to_owned()))
        } else if first.starts_with("UC") && first.len() == 24 {
            Some(ChannelRef::Id(first.to_owned()))
        } else {
            None
        }
    }
}

impl Display for ChannelRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelRef::Handle(handle) => write!(f, "{handle}"),
            ChannelRef::Id(id) => write!(f, "channel/{id}"),
            ChannelRef::Username(name) => write!(f, "user/{name}"),
            ChannelRef::Custom(name) => write!(f, "c/{name}"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

impl ChannelItem {
    fn uploads(&self) -> Option<&str> {
        self.content_details
            .as_ref()?
            .related_playlists
            .as_ref()?
            .uploads
            .as_deref()
    }
}

pub struct Channel<'a> {
    client: &'a YtClient,
    executor: &'a ResilientExecutor,
    pub reference: &'a ChannelRef,
}

impl<'a> Channel<'a> {
    pub fn new(client: &'a YtClient, executor: &'a ResilientExecutor, reference: &'a ChannelRef) -> Self {
        Self {
            client,
            executor,
            reference,
        }
    }

    /// 通过名称搜索频道，优先选择标题中包含搜索词的结果，否则取第一个
    async fn search_channel_id(&self, name: &str) -> Result<String> {
        let client = self.client;
        let res = self
            .executor
            .execute(
                &format!("搜索频道 {name}"),
                |credential| async move {
                    client
                        .list::<SearchItem>(
                            "search",
                            &[("part", "snippet"), ("q", name), ("type", "channel"), ("maxResults", "5")],
                            &credential,
                        )
                        .await
                },
                |res: &ListResponse<SearchItem>| res.items.iter().any(|item| item.snippet.channel_id.is_some()),
            )
            .await
            .with_context(|| format!("failed to search channel {name}"))?;
        let query = name.to_lowercase();
        let candidates = res
            .items
            .into_iter()
            .filter_map(|item| item.snippet.channel_id.clone().map(|id| (id, item.snippet)))
            .collect::<Vec<_>>();
        let matched = candidates.iter().find(|(_, snippet)| {
            snippet.title.to_lowercase().contains(&query) || snippet.channel_title.to_lowercase().contains(&query)
        });
        matched
            .or(candidates.first())
            .map(|(id, _)| id.clone())
            .ok_or_else(|| anyhow!("no channel found for {name}"))
    }

    /// 获取频道的上传列表 id
    async fn uploads_playlist(&self) -> Result<String> {
        let filter = match self.reference {
            ChannelRef::Id(id) => ("id", id.clone()),
            ChannelRef::Username(name) => ("forUsername", name.clone()),
            ChannelRef::Handle(name) | ChannelRef::Custom(name) => {
                ("id", self.search_channel_id(name.trim_start_matches('@')).await?)
            }
        };
        let client = self.client;
        let (field, value) = (filter.0, filter.1.as_str());
        let res = self
            .executor
            .execute(
                &format!("获取频道 {} 的信息", self.reference),
                |credential| async move {
                    client
                        .list::<ChannelItem>("channels", &[("part", "contentDetails"), (field, value)], &credential)
                        .await
                },
                |res: &ListResponse<ChannelItem>| res.items.first().and_then(ChannelItem::uploads).is_some(),
            )
            .await
            .with_context(|| format!("failed to get uploads playlist of channel {}", self.reference))?;
        res.items
            .first()
            .and_then(ChannelItem::uploads)
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("no uploads playlist found for channel {}", self.reference))
    }

    pub async fn fetch_videos(&self, max_results: u32) -> Result<Vec<VideoRecord>> {
        let source = format!("频道 {}", self.reference);
        let uploads = self.uploads_playlist().await?;
        let video_ids = list_video_ids(self.client, self.executor, &uploads, max_results, &source).await?;
        fetch_details(self.client, self.executor, &video_ids, &source).await
    }
}
