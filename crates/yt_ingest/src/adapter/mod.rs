use std::fmt::{Display, Formatter};

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::youtube::{Channel, ChannelRef, Playlist, ResilientExecutor, VideoRecord, YtClient};

/// 一个可以产出视频列表的来源，聚合器只依赖这个 trait
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// 日志中展示的来源名称
    fn display_name(&self) -> String;

    async fn fetch_videos(
        &self,
        client: &YtClient,
        executor: &ResilientExecutor,
        max_results: u32,
    ) -> Result<Vec<VideoRecord>>;
}

/// 配置中的一个来源链接，启动时解析，运行期间不再变化
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Channel { url: String, reference: ChannelRef },
    Playlist { url: String, playlist_id: String },
}

impl Source {
    /// 包含 list= 参数的视为播放列表，其余按频道链接解析
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.contains("list=") {
            let Some(playlist_id) = crate::youtube::parse_playlist_id(url) else {
                bail!("cannot extract playlist id from {url}");
            };
            return Ok(Source::Playlist {
                url: url.to_owned(),
                playlist_id,
            });
        }
        let Some(reference) = ChannelRef::parse(url) else {
            bail!("cannot extract channel from {url}");
        };
        Ok(Source::Channel {
            url: url.to_owned(),
            reference,
        })
    }

    pub fn url(&self) -> &str {
        match self {
            Source::Channel { url, .. } | Source::Playlist { url, .. } => url,
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Channel { reference, .. } => write!(f, "频道 {reference}"),
            Source::Playlist { playlist_id, .. } => write!(f, "播放列表 {playlist_id}"),
        }
    }
}

#[async_trait]
impl VideoSource for Source {
    fn display_name(&self) -> String {
        self.to_string()
    }

    async fn fetch_videos(
        &self,
        client: &YtClient,
        executor: &ResilientExecutor,
        max_results: u32,
    ) -> Result<Vec<VideoRecord>> {
        match self {
            Source::Channel { reference, .. } => {
                Channel::new(client, executor, reference)
                    .fetch_videos(max_results)
                    .await
            }
            Source::Playlist { playlist_id, .. } => {
                Playlist::new(client, executor, playlist_id)
                    .fetch_videos(max_results)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        let source = Source::parse("https://www.youtube.com/@islamlavn").unwrap();
        assert_eq!(
            source,
            Source::Channel {
                url: "https://www.youtube.com/@islamlavn".to_owned(),
                reference: ChannelRef::Handle("@islamlavn".to_owned()),
            }
        );
        assert_eq!(source.to_string(), "频道 @islamlavn");

        let source = Source::parse(" https://www.youtube.com/playlist?list=PLabc ").unwrap();
        assert_eq!(source.url(), "https://www.youtube.com/playlist?list=PLabc");
        assert!(matches!(source, Source::Playlist { ref playlist_id, .. } if playlist_id == "PLabc"));

        assert!(Source::parse("https://www.youtube.com/playlist?list=").is_err());
        assert!(Source::parse("https://vimeo.com/channels/staffpicks").is_err());
    }
}
