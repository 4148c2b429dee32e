use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::youtube::{Credential, CredentialPool, FailureKind, YtError, classify};

/// 在密钥池上执行一次上游调用：逐个密钥尝试，直到拿到通过校验的数据或所有密钥都试过
pub struct ResilientExecutor {
    pool: Arc<CredentialPool>,
    call_timeout: Duration,
}

impl ResilientExecutor {
    pub fn new(pool: Arc<CredentialPool>, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// `validate` 用于区分“真正的数据”与“空结果”，空结果与暂时性失败同等对待：换密钥重试但不标记密钥
    pub async fn execute<T, F, Fut, V>(&self, label: &str, operation: F, validate: V) -> Result<T>
    where
        F: Fn(Credential) -> Fut,
        Fut: Future<Output = Result<T>>,
        V: Fn(&T) -> bool,
    {
        let max_attempts = self.pool.len();
        let mut last_error: Option<anyhow::Error> = None;
        let mut attempts = 0;
        while attempts < max_attempts {
            let Some(credential) = self.pool.next_available() else {
                if let Some(err) = &last_error {
                    warn!("{label} 已无可用的 API 密钥，最后一次错误：{err:#}");
                }
                return Err(YtError::PoolExhausted.into());
            };
            attempts += 1;
            let position = credential.position();
            let res = match tokio::time::timeout(self.call_timeout, operation(credential.clone())).await {
                Ok(res) => res,
                Err(_) => Err(YtError::Timeout(self.call_timeout).into()),
            };
            match res {
                Ok(data) if validate(&data) => {
                    self.pool.mark_succeeded(&credential);
                    debug!(
                        "{label} 使用第 {position} 个 API 密钥成功（累计 {} 次）",
                        self.pool.usage_count(credential.index)
                    );
                    return Ok(data);
                }
                Ok(_) => {
                    warn!("{label} 使用第 {position} 个 API 密钥未返回数据，尝试下一个密钥..");
                    last_error = Some(YtError::EmptyResult(label.to_owned()).into());
                }
                Err(err) => {
                    match classify(&err) {
                        FailureKind::QuotaOrAuth => {
                            warn!("第 {position} 个 API 密钥配额耗尽或鉴权失败，标记为不可用：{err:#}");
                            self.pool.mark_failed(&credential);
                        }
                        FailureKind::Transient => {
                            warn!("{label} 使用第 {position} 个 API 密钥失败：{err:#}");
                        }
                    }
                    last_error = Some(err);
                }
            }
            self.pool.rotate();
        }
        if max_attempts == 0 {
            return Err(YtError::PoolExhausted.into());
        }
        Err(last_error.unwrap_or_else(|| anyhow!(YtError::UpstreamExhausted(label.to_owned()))))
    }
}
