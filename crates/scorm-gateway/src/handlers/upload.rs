//! Multipart folder upload handler

use crate::response::MessageResponse;
use crate::{ApiError, AppState, ErrorCode};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use scorm_storage::{FolderName, ObjectKey, RelativePath, StorageAdapter};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text field naming the destination folder
pub const FOLDER_NAME_FIELD: &str = "folderName";

/// A file part held until the whole request has been read
struct PendingFile {
    field_name: String,
    file_name: String,
    data: Bytes,
}

/// POST /upload - Store every file part of a multipart request
///
/// The body is read completely before anything is written, so a request
/// that trips the size cap leaves storage untouched.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::new(ErrorCode::UploadError, e.body_text()))?;
    let max_files = state.config.max_files;

    let mut folder_name: Option<String> = None;
    let mut files: Vec<PendingFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            if field_name == FOLDER_NAME_FIELD {
                folder_name = Some(field.text().await.map_err(multipart_error)?);
            } else {
                debug!(field = %field_name, "Ignoring text field");
            }
            continue;
        };

        if files.len() >= max_files {
            warn!(max_files, "Upload exceeds file limit");
            return Err(ApiError::new(
                ErrorCode::UploadError,
                format!("too many files: at most {} per upload", max_files),
            ));
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        files.push(PendingFile {
            field_name,
            file_name,
            data,
        });
    }

    if files.is_empty() {
        return Err(ApiError::new(ErrorCode::UploadError, "no files in request"));
    }

    let folder = resolve_folder(folder_name.as_deref(), &state.config.default_folder)
        .map_err(|e| ApiError::storage(ErrorCode::UploadError, e))?;

    // Validate every destination before the first write
    let keys = files
        .iter()
        .map(|file| {
            destination_path(&file.field_name, &file.file_name)
                .map(|path| ObjectKey::new(folder.clone(), path))
        })
        .collect::<scorm_storage::Result<Vec<_>>>()
        .map_err(|e| ApiError::storage(ErrorCode::UploadError, e))?;

    let count = files.len();
    let total_bytes: usize = files.iter().map(|f| f.data.len()).sum();

    for (file, key) in files.into_iter().zip(keys) {
        state
            .storage
            .put_bytes(&key, file.data)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %key, "Upload error");
                ApiError::storage(ErrorCode::UploadError, e)
            })?;
    }

    info!(folder = %folder, files = count, bytes = total_bytes, "Files uploaded successfully");

    Ok(Json(MessageResponse::new("Folder uploaded successfully")))
}

/// Folder from the request, falling back to the configured default
pub fn resolve_folder(requested: Option<&str>, default: &str) -> scorm_storage::Result<FolderName> {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => FolderName::parse(name),
        None => FolderName::parse(default),
    }
}

/// Relative destination of a file part inside its folder
///
/// Field names containing `/` carry the path: the first segment is a fixed
/// marker and is dropped, the remaining segments are directories followed by
/// the file's own name. Otherwise the part's filename is used, which browsers
/// may send as a relative path for folder uploads.
pub fn destination_path(field_name: &str, file_name: &str) -> scorm_storage::Result<RelativePath> {
    if field_name.contains('/') {
        RelativePath::from_segments(field_name.split('/').skip(1))
    } else {
        RelativePath::parse(file_name)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload rejected: body exceeds size limit");
        ApiError::new(ErrorCode::FileTooLarge, err.body_text())
    } else {
        ApiError::new(ErrorCode::UploadError, err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_path_style_field_strips_marker() {
        let path = destination_path("upload/res/js/app.js", "app.js").unwrap();
        assert_eq!(path.segments(), ["res", "js", "app.js"]);

        let flat = destination_path("upload/index.html", "index.html").unwrap();
        assert_eq!(flat.segments(), ["index.html"]);
    }

    #[test]
    fn test_plain_field_uses_file_name() {
        let path = destination_path("files", "imsmanifest.xml").unwrap();
        assert_eq!(path.segments(), ["imsmanifest.xml"]);

        let nested = destination_path("files", "shared/style.css").unwrap();
        assert_eq!(nested.segments(), ["shared", "style.css"]);
    }

    #[rstest]
    #[case("upload/../../etc/passwd", "passwd")]
    #[case("upload/", "x")]
    #[case("upload", "")]
    #[case("files", "../secret")]
    #[case("files", "C:\\fakepath\\a.txt")]
    fn test_destination_rejects_traversal(#[case] field_name: &str, #[case] file_name: &str) {
        assert!(destination_path(field_name, file_name).is_err());
    }

    #[test]
    fn test_resolve_folder() {
        assert_eq!(resolve_folder(Some("course"), "scorm_files").unwrap().as_str(), "course");
        assert_eq!(resolve_folder(Some("  "), "scorm_files").unwrap().as_str(), "scorm_files");
        assert_eq!(resolve_folder(None, "scorm_files").unwrap().as_str(), "scorm_files");
        assert!(resolve_folder(Some(".."), "scorm_files").is_err());
    }
}
