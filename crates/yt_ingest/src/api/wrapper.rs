use std::borrow::Cow;

use anyhow::Error;
use axum::Json;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::api::error::InnerApiError;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Cow<'static, str>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status_code: 200,
            data: Some(data),
            message: None,
        }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status_code: 400,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status_code: 401,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn internal_server_error(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status_code: 500,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub struct ApiError(Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(value: E) -> Self {
        Self(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let Some(InnerApiError::BadRequest(_)) = self.0.downcast_ref::<InnerApiError>() {
            return ApiResponse::<()>::bad_request(self.0.to_string()).into_response();
        }
        ApiResponse::<()>::internal_server_error(self.0.to_string()).into_response()
    }
}

/// 解析查询参数后立即校验，失败时统一返回 400
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| InnerApiError::BadRequest(e.body_text()))?;
        value
            .validate()
            .map_err(|e| InnerApiError::BadRequest(e.to_string()))?;
        Ok(ValidatedQuery(value))
    }
}
