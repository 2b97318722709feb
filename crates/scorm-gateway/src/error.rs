//! Error types and JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scorm_storage::StorageError;
use serde_json::json;
use thiserror::Error;

/// Error classes reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UploadError,
    FileTooLarge,
    UploadFailed,
    ServerError,
    DeleteFailed,
    InvalidName,
    InvalidArgument,
    InvalidChunk,
    IncompleteUpload,
    NoSuchUpload,
    UploadInProgress,
    InternalError,
}

impl ErrorCode {
    /// Label placed in the `error` field of the response
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadError => "Upload error",
            Self::FileTooLarge => "File too large",
            Self::UploadFailed => "Upload failed",
            Self::ServerError => "Server error",
            Self::DeleteFailed => "Error deleting folder",
            Self::InvalidName => "Invalid name",
            Self::InvalidArgument => "Invalid argument",
            Self::InvalidChunk => "Invalid chunk",
            Self::IncompleteUpload => "Incomplete upload",
            Self::NoSuchUpload => "No such upload",
            Self::UploadInProgress => "Upload in progress",
            Self::InternalError => "Internal error",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidName
            | Self::InvalidArgument
            | Self::InvalidChunk
            | Self::IncompleteUpload => StatusCode::BAD_REQUEST,
            Self::NoSuchUpload => StatusCode::NOT_FOUND,
            Self::UploadInProgress => StatusCode::CONFLICT,
            Self::UploadError
            | Self::UploadFailed
            | Self::ServerError
            | Self::DeleteFailed
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Api { code: ErrorCode, message: String },

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Wrap a storage error, reporting it under `code` unless it was caused
    /// by an invalid name
    pub fn storage(code: ErrorCode, err: StorageError) -> Self {
        let code = if err.is_invalid_input() {
            ErrorCode::InvalidName
        } else {
            code
        };
        Self::new(code, err.to_string())
    }

    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::Storage(e) if e.is_invalid_input() => ErrorCode::InvalidName,
            Self::Storage(_) | Self::Io(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let body = json!({
            "error": code.as_str(),
            "details": self.to_string(),
        });

        (code.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_storage_invalid_name_maps_to_bad_request() {
        let err = ApiError::storage(
            ErrorCode::UploadError,
            StorageError::InvalidName("relative segment '..' is not allowed".to_string()),
        );
        assert_eq!(err.error_code(), ErrorCode::InvalidName);
        assert_eq!(err.error_code().status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_backend_error_keeps_code() {
        let err = ApiError::storage(
            ErrorCode::DeleteFailed,
            StorageError::Connection("refused".to_string()),
        );
        assert_eq!(err.error_code(), ErrorCode::DeleteFailed);
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_io_error_is_internal() {
        let err: ApiError = std::io::Error::other("disk full").into();
        assert_eq!(err.error_code(), ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = ApiError::new(ErrorCode::FileTooLarge, "limit is 10 bytes").into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "File too large");
        assert_eq!(json["details"], "limit is 10 bytes");
    }
}
