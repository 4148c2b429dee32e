use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::workflow::merge_records;
use crate::youtube::VideoRecord;

const EMBEDDED_FALLBACK: &str = include_str!("../assets/fallback_videos.json");

/// 上游与缓存都无法提供数据时返回的固定视频列表，运行期间只读
#[derive(Clone)]
pub struct FallbackSet {
    records: Arc<Vec<VideoRecord>>,
}

impl FallbackSet {
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_FALLBACK).context("failed to parse embedded fallback videos")
    }

    /// 配置了 fallback_path 时使用该文件替代内置列表
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::embedded();
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fallback videos from {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("failed to parse fallback videos in {}", path.display()))
    }

    pub(crate) fn from_json(content: &str) -> Result<Self> {
        let records: Vec<VideoRecord> = serde_json::from_str(content)?;
        Ok(Self {
            records: Arc::new(merge_records(vec![records])),
        })
    }

    pub fn records(&self) -> Arc<Vec<VideoRecord>> {
        self.records.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
