use rand::seq::IndexedRandom;

use crate::config::item::RateLimit;

/// 默认的 auth_token 实现，生成随机 16 位字符串
pub(super) fn default_auth_token() -> String {
    let byte_choices = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+-=";
    let mut rng = rand::rng();
    (0..16)
        .map(|_| *(byte_choices.choose(&mut rng).expect("choose byte failed")) as char)
        .collect()
}

pub(super) fn default_bind_address() -> String {
    "0.0.0.0:12345".to_string()
}

pub(super) fn default_sources() -> Vec<String> {
    vec!["https://www.youtube.com/@islamlavn".to_owned()]
}

pub(super) fn default_max_results_per_source() -> u32 {
    5
}

pub(super) fn default_request_timeout_ms() -> u64 {
    5000
}

pub(super) fn default_deadline_ms() -> u64 {
    8000
}

/// YouTube 的每日配额在太平洋时间零点重置
pub(super) fn default_quota_reset_utc_offset_hours() -> i32 {
    -8
}

// 默认每秒最多请求 5 次
pub(super) fn default_rate_limit() -> Option<RateLimit> {
    Some(RateLimit {
        limit: 5,
        duration: 1000,
    })
}

pub(super) fn default_healthy_ttl_secs() -> u64 {
    24 * 60 * 60
}

pub(super) fn default_degraded_ttl_secs() -> u64 {
    2 * 60 * 60
}
