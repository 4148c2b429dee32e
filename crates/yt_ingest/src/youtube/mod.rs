use anyhow::{Result, bail};

pub use channel::{Channel, ChannelRef};
pub use client::{ListResponse, YtClient};
pub use credential::{Credential, CredentialPool, QuotaStatus};
pub use error::{FailureKind, YtError, classify, is_pool_exhausted};
pub use executor::ResilientExecutor;
pub use playlist::{MAX_PAGE_SIZE, Playlist, parse_playlist_id};
pub use video::VideoRecord;

mod channel;
mod client;
mod credential;
mod error;
mod executor;
mod playlist;
mod video;

pub(crate) trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output>;
}

/// 正常响应不包含 error 字段，出错时的外壳形如
/// `{"error": {"code": 403, "message": "...", "errors": [{"reason": "quotaExceeded"}]}}`
impl Validate for serde_json::Value {
    type Output = serde_json::Value;

    fn validate(self) -> Result<Self::Output> {
        if !self.is_object() {
            bail!(YtError::InvalidResponse(self.to_string()));
        }
        let error = &self["error"];
        if error.is_null() {
            return Ok(self);
        }
        let code = error["code"].as_i64().unwrap_or_default();
        let message = error["message"].as_str().unwrap_or_default().to_owned();
        let reason = error["errors"][0]["reason"]
            .as_str()
            .or_else(|| error["status"].as_str())
            .unwrap_or_default()
            .to_owned();
        bail!(YtError::ErrorResponse { code, reason, message })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validate_error_envelope() {
        let res = json!({
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{ "domain": "youtube.quota", "reason": "quotaExceeded" }]
            }
        })
        .validate();
        let err = res.unwrap_err();
        assert_eq!(classify(&err), FailureKind::QuotaOrAuth);
        match err.downcast_ref::<YtError>() {
            Some(YtError::ErrorResponse { code, reason, .. }) => {
                assert_eq!(*code, 403);
                assert_eq!(reason, "quotaExceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_pass_through() {
        let value = json!({ "kind": "youtube#videoListResponse", "items": [] });
        assert_eq!(value.clone().validate().unwrap(), value);
        assert!(json!("not an object").validate().is_err());
    }
}
