use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

mod args;
mod default;
mod global;
mod item;

use crate::adapter::Source;
use crate::cache::CacheTtl;
use crate::config::default::*;
pub use crate::config::global::{ARGS, CONFIG_DIR};
pub use crate::config::item::{CacheConfig, RateLimit};
use crate::youtube::MAX_PAGE_SIZE;

/// 未在配置文件中填写密钥时，最多从环境变量中读取的编号密钥数量
const MAX_ENV_KEYS: usize = 10;

#[derive(Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_auth_token")]
    pub auth_token: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 按顺序轮换使用的 API 密钥，留空表示从环境变量读取
    #[serde(default)]
    pub credentials: Vec<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_max_results_per_source")]
    pub max_results_per_source: u32,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimit>,
    #[serde(default = "default_quota_reset_utc_offset_hours")]
    pub quota_reset_utc_offset_hours: i32,
    #[serde(default)]
    pub fallback_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_token: default_auth_token(),
            bind_address: default_bind_address(),
            credentials: Vec::new(),
            sources: default_sources(),
            max_results_per_source: default_max_results_per_source(),
            cache: CacheConfig::default(),
            request_timeout_ms: default_request_timeout_ms(),
            deadline_ms: default_deadline_ms(),
            rate_limit: default_rate_limit(),
            quota_reset_utc_offset_hours: default_quota_reset_utc_offset_hours(),
            fallback_path: None,
        }
    }
}

impl Config {
    /// 读取配置文件，文件不存在时使用默认配置并写回磁盘
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");
        let config = match std::fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", config_path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("配置文件不存在，使用默认配置..");
                let config = Config::default();
                config.save(config_dir)?;
                config
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", config_path.display())),
        };
        Ok(config)
    }

    pub fn save(&self, config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir)?;
        std::fs::write(config_dir.join("config.toml"), toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 检查配置是否合法，一次性报告所有问题
    pub fn check(&self) -> Result<()> {
        let mut errors = Vec::new();
        for url in &self.sources {
            if let Err(e) = Source::parse(url) {
                errors.push(format!("无法识别的来源链接：{e}"));
            }
        }
        if self.max_results_per_source == 0 || self.max_results_per_source > MAX_PAGE_SIZE {
            errors.push(format!("max_results_per_source 应位于 1 到 {MAX_PAGE_SIZE} 之间"));
        }
        if self.cache.healthy_ttl == 0 || self.cache.degraded_ttl == 0 {
            errors.push("缓存过期时间必须大于 0".to_owned());
        }
        if ttl_from_secs(self.cache.healthy_ttl).is_none() || ttl_from_secs(self.cache.degraded_ttl).is_none() {
            errors.push("缓存过期时间过大".to_owned());
        }
        if self.cache.degraded_ttl >= self.cache.healthy_ttl {
            errors.push("降级结果的缓存时间应短于健康结果".to_owned());
        }
        if self.request_timeout_ms == 0 || self.deadline_ms == 0 {
            errors.push("request_timeout_ms 与 deadline_ms 必须大于 0".to_owned());
        }
        if self.rate_limit.as_ref().is_some_and(|r| r.limit == 0 || r.duration == 0) {
            errors.push("rate_limit 的 limit 与 duration 必须大于 0".to_owned());
        }
        if self.reset_offset().is_none() {
            errors.push("quota_reset_utc_offset_hours 超出范围".to_owned());
        }
        if self.auth_token.is_empty() {
            errors.push("auth_token 不能为空".to_owned());
        }
        if !errors.is_empty() {
            bail!("config is invalid:\n{}", errors.join("\n"));
        }
        Ok(())
    }

    pub fn parsed_sources(&self) -> Result<Vec<Source>> {
        self.sources.iter().map(|url| Source::parse(url)).collect()
    }

    /// 配置文件中的密钥优先，否则依次读取 YOUTUBE_API_KEY_1..10，最后是 YOUTUBE_API_KEY
    pub fn resolve_credentials(&self) -> Vec<String> {
        if !self.credentials.is_empty() {
            return self.credentials.clone();
        }
        credentials_from_env(|name| std::env::var(name).ok())
    }

    pub fn cache_ttl(&self) -> CacheTtl {
        CacheTtl {
            healthy: ttl_from_secs(self.cache.healthy_ttl).unwrap_or(TimeDelta::MAX),
            degraded: ttl_from_secs(self.cache.degraded_ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// 超出范围的偏移量在 check 中报告，这里退回 UTC
    pub fn quota_reset_offset(&self) -> FixedOffset {
        self.reset_offset().unwrap_or(Utc.fix())
    }

    fn reset_offset(&self) -> Option<FixedOffset> {
        self.quota_reset_utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
    }
}

fn ttl_from_secs(secs: u64) -> Option<TimeDelta> {
    TimeDelta::try_seconds(i64::try_from(secs).ok()?)
}

fn credentials_from_env(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    let mut keys = Vec::new();
    for index in 1..=MAX_ENV_KEYS {
        match lookup(&format!("YOUTUBE_API_KEY_{index}")).filter(|k| !k.is_empty()) {
            Some(key) => keys.push(key),
            None => break,
        }
    }
    if keys.is_empty() {
        keys.extend(lookup("YOUTUBE_API_KEY").filter(|k| !k.is_empty()));
    }
    keys
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.check().is_ok());
        assert_eq!(config.auth_token.len(), 16);
        let ttl = config.cache_ttl();
        assert!(ttl.degraded < ttl.healthy);
        assert_eq!(config.quota_reset_offset().local_minus_utc(), -8 * 3600);
    }

    #[test]
    fn test_check_reports_every_problem() {
        let config = Config {
            sources: vec!["https://vimeo.com/123".to_owned()],
            max_results_per_source: 0,
            cache: CacheConfig {
                healthy_ttl: 60,
                degraded_ttl: 600,
            },
            ..Default::default()
        };
        let message = config.check().unwrap_err().to_string();
        assert!(message.contains("vimeo.com"));
        assert!(message.contains("max_results_per_source"));
        assert!(message.contains("降级结果"));
    }

    #[test]
    fn test_absurd_numbers_are_reported() {
        let config = Config {
            quota_reset_utc_offset_hours: i32::MAX,
            cache: CacheConfig {
                healthy_ttl: u64::MAX,
                degraded_ttl: 7200,
            },
            ..Default::default()
        };
        let message = config.check().unwrap_err().to_string();
        assert!(message.contains("quota_reset_utc_offset_hours"));
        assert!(message.contains("缓存过期时间过大"));
        assert_eq!(config.quota_reset_offset().local_minus_utc(), 0);
        assert_eq!(config.cache_ttl().healthy, TimeDelta::MAX);
        assert_eq!(config.cache_ttl().degraded, TimeDelta::hours(2));
        let config = Config {
            quota_reset_utc_offset_hours: 30,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_config_toml_defaults() {
        let config: Config = toml::from_str(
            r#"
            credentials = ["key-1", "key-2"]
            sources = ["https://www.youtube.com/playlist?list=PLabc"]
            "#,
        )
        .unwrap();
        assert_eq!(config.resolve_credentials(), vec!["key-1", "key-2"]);
        assert_eq!(config.max_results_per_source, 5);
        assert_eq!(config.cache.healthy_ttl, 86400);
        assert_eq!(config.rate_limit, default_rate_limit());
        assert_eq!(config.parsed_sources().unwrap().len(), 1);
        let dumped = toml::to_string_pretty(&config).unwrap();
        assert!(dumped.contains("degraded_ttl"));
    }

    #[test]
    fn test_credentials_from_env() {
        let env = HashMap::from([
            ("YOUTUBE_API_KEY_1", "a"),
            ("YOUTUBE_API_KEY_2", "b"),
            ("YOUTUBE_API_KEY_4", "d"),
            ("YOUTUBE_API_KEY", "single"),
        ]);
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());
        assert_eq!(credentials_from_env(lookup), vec!["a", "b"]);

        let env = HashMap::from([("YOUTUBE_API_KEY", "single")]);
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());
        assert_eq!(credentials_from_env(lookup), vec!["single"]);

        assert!(credentials_from_env(|_| None).is_empty());
    }
}
