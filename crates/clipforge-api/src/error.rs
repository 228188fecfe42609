//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clipforge_media::MediaError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Splicing error: {0}")]
    Splicing(String),

    #[error("Audio mix error: {0}")]
    AudioMix(String),

    #[error("Timeout: compilation exceeded {0} seconds")]
    Timeout(u64),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Fetch(_)
            | ApiError::Normalization(_)
            | ApiError::Splicing(_)
            | ApiError::AudioMix(_)
            | ApiError::Timeout(_)
            | ApiError::Upload(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Fetch { .. } => ApiError::Fetch(e.to_string()),
            MediaError::Normalization { .. } => ApiError::Normalization(e.to_string()),
            MediaError::Splicing(msg) => ApiError::Splicing(msg),
            MediaError::AudioMix(msg) => ApiError::AudioMix(msg),
            MediaError::Timeout(secs) => ApiError::Timeout(secs),
            MediaError::QuoteRender(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<clipforge_storage::StorageError> for ApiError {
    fn from(e: clipforge_storage::StorageError) -> Self {
        ApiError::Upload(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl ApiError {
    /// Stable error kind name reported in response bodies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => "ValidationError",
            ApiError::NotFound(_) => "NotFound",
            ApiError::RateLimited => "RateLimited",
            ApiError::Fetch(_) => "FetchError",
            ApiError::Normalization(_) => "NormalizationError",
            ApiError::Splicing(_) => "SplicingError",
            ApiError::AudioMix(_) => "AudioMixError",
            ApiError::Timeout(_) => "TimeoutError",
            ApiError::Upload(_) => "UploadError",
            ApiError::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Upload(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse { detail };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_pipeline_failures_map_to_500() {
        for err in [
            ApiError::Fetch("x".into()),
            ApiError::Normalization("x".into()),
            ApiError::Splicing("x".into()),
            ApiError::AudioMix("x".into()),
            ApiError::Timeout(300),
            ApiError::Upload("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_media_error_conversion() {
        let err: ApiError = MediaError::Timeout(300).into();
        assert!(matches!(err, ApiError::Timeout(300)));
        assert_eq!(err.kind(), "TimeoutError");

        let err: ApiError = MediaError::splicing("graph failed").into();
        assert_eq!(err.kind(), "SplicingError");
    }
}
