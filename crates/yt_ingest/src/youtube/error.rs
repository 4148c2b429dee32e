use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum YtError {
    #[error("API returned error code {code} ({reason}): {message}")]
    ErrorResponse { code: i64, reason: String, message: String },
    #[error("response is not a valid API payload: {0}")]
    InvalidResponse(String),
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0} returned no usable data")]
    EmptyResult(String),
    #[error("no API key available, every key is marked failed")]
    PoolExhausted,
    #[error("{0} failed with all available API keys")]
    UpstreamExhausted(String),
}

/// 一次失败对密钥意味着什么
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 配额耗尽、限流或密钥本身无效，需要标记密钥
    QuotaOrAuth,
    /// 其它一切失败，只换下一个密钥重试
    Transient,
}

const QUOTA_OR_AUTH_REASONS: [&str; 9] = [
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "keyInvalid",
    "keyExpired",
    "accessNotConfigured",
    "forbidden",
    "ipRefererBlocked",
];

const QUOTA_OR_AUTH_KEYWORDS: [&str; 7] = [
    "quota",
    "exceeded",
    "rate limit",
    "api key",
    "suspended",
    "disabled",
    "unauthorized",
];

/// 与密钥无关的内容错误，即使状态码是 403 也不应该连累密钥
const CONTENT_REASONS: [&str; 7] = [
    "playlistItemsNotAccessible",
    "playlistNotFound",
    "channelNotFound",
    "channelClosed",
    "channelSuspended",
    "videoNotFound",
    "subscriptionForbidden",
];

impl YtError {
    pub fn kind(&self) -> FailureKind {
        let YtError::ErrorResponse { code, reason, message } = self else {
            return FailureKind::Transient;
        };
        if CONTENT_REASONS.contains(&reason.as_str()) {
            return FailureKind::Transient;
        }
        let message = message.to_lowercase();
        let mentions_quota = QUOTA_OR_AUTH_KEYWORDS.iter().any(|k| message.contains(k));
        // 带有 reason 时状态码不足以说明问题，只有缺少 reason 时才按状态码判断
        let quota_or_auth = if reason.is_empty() {
            matches!(code, 401 | 403 | 429) || mentions_quota
        } else {
            QUOTA_OR_AUTH_REASONS.contains(&reason.as_str()) || mentions_quota
        };
        if quota_or_auth {
            FailureKind::QuotaOrAuth
        } else {
            FailureKind::Transient
        }
    }
}

/// 沿着错误链寻找 YtError 并分类，找不到（网络错误、解析错误等）一律视为暂时性失败
pub fn classify(err: &anyhow::Error) -> FailureKind {
    for cause in err.chain() {
        if let Some(yt_error) = cause.downcast_ref::<YtError>() {
            return yt_error.kind();
        }
    }
    FailureKind::Transient
}

pub fn is_pool_exhausted(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<YtError>().is_some_and(|e| matches!(e, YtError::PoolExhausted)))
}
