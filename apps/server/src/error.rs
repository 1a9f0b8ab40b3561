use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use xm_core::constants::{ERROR_CODE_INTERNAL_ERROR, ERROR_CODE_INVALID_REQUEST_ORIGIN};
use xm_core::errors::Error as CoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("Not Found")]
    NotFound,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationBody {
    error_key: &'static str,
    errors: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: ERROR_CODE_INTERNAL_ERROR,
        }),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(serde_json::Value::Null)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Core(CoreError::Validation(e)) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationBody {
                    error_key: e.error_key(),
                    errors: e.errors(),
                }),
            )
                .into_response(),
            ApiError::Core(e) if e.is_not_found() => not_found(),
            ApiError::Core(e) => {
                tracing::error!("Request failed: {}", e);
                internal_error()
            }
            ApiError::NotFound => not_found(),
            ApiError::Unauthorized(reason) => {
                tracing::warn!("Rejected request: {}", reason);
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorBody {
                        error: ERROR_CODE_INVALID_REQUEST_ORIGIN,
                    }),
                )
                    .into_response()
            }
            ApiError::Internal(reason) => {
                tracing::error!("Request failed: {}", reason);
                internal_error()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
