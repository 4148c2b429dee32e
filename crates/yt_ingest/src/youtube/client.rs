use std::time::Duration;

use anyhow::{Context, Result};
use leaky_bucket::RateLimiter;
use parking_lot::Once;
use reqwest::{Method, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::RateLimit;
use crate::youtube::{Credential, Validate};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

// 一个对 reqwest::Client 的简单封装，用于 YouTube Data API 请求
#[derive(Clone)]
pub struct Client(reqwest::Client);

impl Client {
    pub fn new(timeout: Duration) -> Self {
        Self::with_builder(reqwest::Client::builder(), timeout)
    }

    fn with_builder(builder: reqwest::ClientBuilder, timeout: Duration) -> Self {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");
        });
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        Self(
            builder
                .default_headers(headers)
                .gzip(true)
                .connect_timeout(timeout)
                .timeout(timeout)
                .build()
                .expect("failed to build reqwest client"),
        )
    }

    // 每个请求都通过 key 参数携带一个密钥
    pub fn request(&self, method: Method, url: &str, credential: &Credential) -> reqwest::RequestBuilder {
        self.0.request(method, url).query(&[("key", credential.key())])
    }
}

/// 所有 list 接口共用的响应外壳，items 缺失视为空列表
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

pub struct YtClient {
    client: Client,
    limiter: Option<RateLimiter>,
    base_url: String,
}

impl YtClient {
    pub fn new(timeout: Duration, rate_limit: Option<&RateLimit>) -> Self {
        let limiter = rate_limit.map(|RateLimit { limit, duration }| {
            RateLimiter::builder()
                .initial(*limit)
                .refill(*limit)
                .max(*limit)
                .interval(Duration::from_millis(*duration))
                .build()
        });
        Self {
            client: Client::new(timeout),
            limiter,
            base_url: API_BASE.to_owned(),
        }
    }

    /// 指向本地服务的客户端，不经过代理也不限速
    #[cfg(test)]
    pub(crate) fn with_base_url(timeout: Duration, base_url: String) -> Self {
        Self {
            client: Client::with_builder(reqwest::Client::builder().no_proxy(), timeout),
            limiter: None,
            base_url,
        }
    }

    /// 获取一个预构建的请求，通过该方法获取请求时会检查并等待速率限制
    pub async fn request(&self, method: Method, endpoint: &str, credential: &Credential) -> reqwest::RequestBuilder {
        if let Some(limiter) = &self.limiter {
            limiter.acquire_one().await;
        }
        self.client
            .request(method, &format!("{}/{endpoint}", self.base_url), credential)
    }

    /// 调用某个 list 接口，完成错误外壳的校验后解析 items
    pub async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        credential: &Credential,
    ) -> Result<ListResponse<T>> {
        let res = self
            .request(Method::GET, endpoint, credential)
            .await
            .query(query)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?
            .validate()?;
        serde_json::from_value(res).with_context(|| format!("failed to parse {endpoint} response"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::FixedOffset;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;
    use crate::youtube::{CredentialPool, FailureKind, ResilientExecutor, YtError, classify};

    pub(crate) type Params = HashMap<String, String>;

    /// 在本地端口上运行一个模拟的 Data API，返回指向它的客户端
    pub(crate) async fn serve(router: Router) -> YtClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        YtClient::with_base_url(Duration::from_secs(5), format!("http://{addr}"))
    }

    pub(crate) fn executor(size: usize) -> ResilientExecutor {
        let pool = CredentialPool::new(
            (1..=size).map(|i| format!("key-{i}")).collect(),
            FixedOffset::east_opt(0).unwrap(),
        );
        ResilientExecutor::new(Arc::new(pool), Duration::from_secs(5))
    }

    /// 每次调用都记录请求参数，并用 respond 生成响应
    pub(crate) fn endpoint(
        seen: &Arc<Mutex<Vec<Params>>>,
        respond: fn(&Params) -> Value,
    ) -> axum::routing::MethodRouter {
        let seen = seen.clone();
        get(move |Query(params): Query<Params>| {
            let body = respond(&params);
            seen.lock().push(params);
            async move { Json(body) }
        })
    }

    #[tokio::test]
    async fn test_list_sends_key_and_query() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = serve(Router::new().route(
            "/videos",
            endpoint(&seen, |_| json!({ "kind": "youtube#videoListResponse", "items": [{ "id": "abc123" }] })),
        ))
        .await;
        let credential = executor(1).pool().next_available().unwrap();
        let res = client
            .list::<Value>("videos", &[("id", "abc123"), ("part", "snippet")], &credential)
            .await
            .unwrap();
        assert_eq!(res.items.len(), 1);
        let seen = seen.lock();
        assert_eq!(seen[0]["key"], "key-1");
        assert_eq!(seen[0]["id"], "abc123");
        assert_eq!(seen[0]["part"], "snippet");
    }

    #[tokio::test]
    async fn test_list_surfaces_error_envelope() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = serve(Router::new().route(
            "/search",
            endpoint(&seen, |_| {
                json!({
                    "error": {
                        "code": 403,
                        "message": "The request cannot be completed because you have exceeded your quota.",
                        "errors": [{ "reason": "quotaExceeded" }]
                    }
                })
            }),
        ))
        .await;
        let credential = executor(1).pool().next_available().unwrap();
        let err = client.list::<Value>("search", &[], &credential).await.unwrap_err();
        assert_eq!(classify(&err), FailureKind::QuotaOrAuth);
        assert!(matches!(
            err.downcast_ref::<YtError>(),
            Some(YtError::ErrorResponse { code: 403, .. })
        ));
    }
}
