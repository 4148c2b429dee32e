use std::sync::Arc;

use axum::Router;
use axum::extract::{Extension, Request};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::wrapper::ApiResponse;

mod quota;
mod videos;

/// 写操作需要携带的 Authorization 头
#[derive(Clone)]
pub struct AuthToken(pub Arc<str>);

pub fn router() -> Router {
    Router::new().nest("/api", videos::router().merge(quota::router()))
}

/// 中间件：验证请求头中的 Authorization 是否与配置中的 auth_token 匹配
pub async fn auth(
    Extension(token): Extension<AuthToken>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|s| s == &*token.0)
    {
        return next.run(request).await;
    }
    ApiResponse::<()>::unauthorized("auth token does not match").into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::service::VideoService;

    fn app() -> Router {
        let config = Config {
            // 不触发任何上游请求
            sources: Vec::new(),
            ..Default::default()
        };
        let service = VideoService::from_config(&config).unwrap();
        router()
            .layer(Extension(Arc::new(service)))
            .layer(Extension(AuthToken(Arc::from("secret"))))
    }

    async fn call(app: Router, request: axum::http::Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_videos_route() {
        let (status, body) = call(app(), get("/api/videos?max_results=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["videos"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["degraded"], true);
        assert_eq!(body["data"]["videos"][0]["id"], "dQw4w9WgXcQ");

        let (status, body) = call(app(), get("/api/videos")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["videos"].as_array().unwrap().len(), 5);

        for uri in ["/api/videos?max_results=0", "/api/videos?max_results=51", "/api/videos?max_results=abc"] {
            let (status, body) = call(app(), get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["status_code"], 400);
        }
    }

    #[tokio::test]
    async fn test_quota_reset_requires_token() {
        let (status, body) = call(app(), get("/api/quota")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["total_keys"].is_number());

        let reset = |token: Option<&str>| {
            let mut builder = axum::http::Request::post("/api/quota/reset");
            if let Some(token) = token {
                builder = builder.header("Authorization", token);
            }
            builder.body(Body::empty()).unwrap()
        };
        let (status, _) = call(app(), reset(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(app(), reset(Some("wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = call(app(), reset(Some("secret"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["available_keys"].is_number());
    }
}
