//! Chunked upload handlers

use crate::handlers::upload::{resolve_folder, FOLDER_NAME_FIELD};
use crate::response::{CompletedUploadResponse, MessageResponse};
use crate::{ApiError, AppState, ErrorCode};
use axum::{
    extract::{multipart::MultipartRejection, FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use bytes::Bytes;
use scorm_storage::{ObjectKey, RelativePath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// POST /upload-chunk - Persist one numbered chunk of a file
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::new(ErrorCode::InvalidArgument, e.body_text()))?;

    let mut chunk_index: Option<String> = None;
    let mut total_chunks: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(chunk_multipart_error)? {
        if field.file_name().is_some() {
            if data.is_some() {
                return Err(ApiError::new(
                    ErrorCode::InvalidArgument,
                    "expected a single chunk per request",
                ));
            }
            data = Some(field.bytes().await.map_err(chunk_multipart_error)?);
            continue;
        }

        let name = field.name().unwrap_or_default().to_string();
        let slot = match name.as_str() {
            "chunkIndex" => &mut chunk_index,
            "totalChunks" => &mut total_chunks,
            "fileName" => &mut file_name,
            _ => continue,
        };
        *slot = Some(field.text().await.map_err(chunk_multipart_error)?);
    }

    let index = parse_count("chunkIndex", chunk_index)?;
    let total = parse_count("totalChunks", total_chunks)?;
    let file_name = file_name.ok_or_else(|| missing("fileName"))?;
    let data = data.ok_or_else(|| missing("chunk data"))?;

    let receipt = state
        .chunk_manager
        .store_chunk(&file_name, index, total, data)
        .await
        .inspect_err(|e| warn!(file_name = %file_name, index, error = %e, "Chunk rejected"))?;

    Ok(Json(MessageResponse::new(format!(
        "Chunk {} of {} uploaded successfully",
        receipt.index, receipt.total_chunks
    ))))
}

/// Body of a completion request
#[derive(Debug, Deserialize)]
pub struct CompleteUploadRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "folderName")]
    pub folder_name: Option<String>,
}

impl<S> FromRequest<S> for CompleteUploadRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    /// Accepts urlencoded, multipart or JSON bodies
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::new(ErrorCode::InvalidArgument, e.body_text()))?;

            let mut file_name = None;
            let mut folder_name = None;
            while let Some(field) = multipart.next_field().await.map_err(chunk_multipart_error)? {
                match field.name() {
                    Some("fileName") => {
                        file_name = Some(field.text().await.map_err(chunk_multipart_error)?)
                    }
                    Some(FOLDER_NAME_FIELD) => {
                        folder_name = Some(field.text().await.map_err(chunk_multipart_error)?)
                    }
                    _ => {}
                }
            }

            Ok(Self {
                file_name: file_name.ok_or_else(|| missing("fileName"))?,
                folder_name,
            })
        } else if content_type.starts_with("application/json") {
            let Json(body) = Json::<Self>::from_request(req, state)
                .await
                .map_err(|e| ApiError::new(ErrorCode::InvalidArgument, e.body_text()))?;
            Ok(body)
        } else {
            let Form(body) = Form::<Self>::from_request(req, state)
                .await
                .map_err(|e| ApiError::new(ErrorCode::InvalidArgument, e.body_text()))?;
            Ok(body)
        }
    }
}

/// POST /complete-upload - Merge the chunks of a file and store the result
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    request: CompleteUploadRequest,
) -> Result<Json<CompletedUploadResponse>, ApiError> {
    let folder = resolve_folder(request.folder_name.as_deref(), &state.config.default_folder)
        .map_err(|e| ApiError::storage(ErrorCode::InvalidName, e))?;
    let path = RelativePath::from_segments([request.file_name.as_str()])
        .map_err(|e| ApiError::storage(ErrorCode::InvalidName, e))?;
    let key = ObjectKey::new(folder, path);

    let stored = state
        .chunk_manager
        .complete(&request.file_name, &key, state.storage.as_ref())
        .await
        .inspect_err(|e| {
            if e.error_code() == ErrorCode::UploadFailed {
                error!(file_name = %request.file_name, error = %e, "Error uploading merged file");
            } else {
                warn!(file_name = %request.file_name, error = %e, "Completion rejected");
            }
        })?;

    info!(file_name = %request.file_name, url = %stored.url, size = stored.size, "Chunked upload stored");

    Ok(Json(CompletedUploadResponse {
        message: "File uploaded successfully".to_string(),
        url: stored.url,
    }))
}

fn missing(field: &str) -> ApiError {
    ApiError::new(ErrorCode::InvalidArgument, format!("missing {}", field))
}

fn parse_count(field: &str, value: Option<String>) -> Result<u32, ApiError> {
    let value = value.ok_or_else(|| missing(field))?;
    value.trim().parse().map_err(|_| {
        ApiError::new(
            ErrorCode::InvalidArgument,
            format!("{} must be a non-negative integer, got '{}'", field, value),
        )
    })
}

fn chunk_multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    let code = if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::FileTooLarge
    } else {
        ErrorCode::InvalidArgument
    };
    ApiError::new(code, err.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("7", 7)]
    #[case(" 3 ", 3)]
    #[case("0", 0)]
    fn test_parse_count(#[case] value: &str, #[case] expected: u32) {
        assert_eq!(parse_count("chunkIndex", Some(value.to_string())).unwrap(), expected);
    }

    #[rstest]
    #[case("-1")]
    #[case("two")]
    #[case("4294967296")]
    #[case("")]
    fn test_parse_count_rejects(#[case] value: &str) {
        let err = parse_count("chunkIndex", Some(value.to_string())).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_parse_count_missing() {
        let err = parse_count("totalChunks", None).unwrap_err();
        assert!(err.to_string().contains("totalChunks"));
    }
}
