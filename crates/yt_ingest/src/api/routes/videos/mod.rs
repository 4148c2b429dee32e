use std::sync::Arc;

use axum::Router;
use axum::extract::Extension;
use axum::routing::get;

use crate::api::request::VideosRequest;
use crate::api::wrapper::{ApiError, ApiResponse, ValidatedQuery};
use crate::service::{VideoList, VideoService};

pub(super) fn router() -> Router {
    Router::new().route("/videos", get(get_videos))
}

/// 获取各来源合并后的最新视频，上游不可用时返回缓存或兜底数据
pub async fn get_videos(
    Extension(service): Extension<Arc<VideoService>>,
    ValidatedQuery(params): ValidatedQuery<VideosRequest>,
) -> Result<ApiResponse<VideoList>, ApiError> {
    let max_results = params.max_results.unwrap_or_else(|| service.default_max_results());
    Ok(ApiResponse::ok(service.get_videos(max_results).await))
}
