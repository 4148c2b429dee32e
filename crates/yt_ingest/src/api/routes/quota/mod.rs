use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::{get, post};
use axum::{Router, middleware};

use crate::api::routes::auth;
use crate::api::wrapper::{ApiError, ApiResponse};
use crate::service::VideoService;
use crate::youtube::QuotaStatus;

pub(super) fn router() -> Router {
    Router::new()
        .route("/quota/reset", post(reset_quota).layer(middleware::from_fn(auth)))
        .route("/quota", get(get_quota))
}

/// 查看各个 API 密钥的使用情况
pub async fn get_quota(Extension(service): Extension<Arc<VideoService>>) -> Result<ApiResponse<QuotaStatus>, ApiError> {
    Ok(ApiResponse::ok(service.quota_status()))
}

/// 手动清除所有密钥的失效标记，返回重置后的状态
pub async fn reset_quota(
    Extension(service): Extension<Arc<VideoService>>,
) -> Result<ApiResponse<QuotaStatus>, ApiError> {
    service.reset_quota();
    info!("已手动重置所有 API 密钥的失效状态");
    Ok(ApiResponse::ok(service.quota_status()))
}
