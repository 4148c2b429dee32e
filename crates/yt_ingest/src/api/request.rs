use serde::Deserialize;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct VideosRequest {
    /// 留空时使用配置中的 max_results_per_source
    #[validate(range(min = 1, max = 50))]
    pub max_results: Option<u32>,
}
