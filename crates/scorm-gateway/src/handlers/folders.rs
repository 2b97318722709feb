//! Folder listing and deletion handlers

use crate::response::MessageResponse;
use crate::{ApiError, AppState, ErrorCode};
use axum::{
    extract::{Path, State},
    Json,
};
use scorm_storage::{FolderEntry, FolderName, StorageAdapter};
use std::sync::Arc;
use tracing::{error, info};

/// GET /folders - List top-level folders
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FolderEntry>>, ApiError> {
    let folders = state
        .storage
        .list_folders(state.config.max_list_results)
        .await
        .map_err(|e| {
            error!(error = %e, "Error fetching folders");
            ApiError::storage(ErrorCode::ServerError, e)
        })?;

    Ok(Json(folders))
}

/// DELETE /folders/{folder_name} - Delete a folder and its contents
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Path(folder_name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let folder = FolderName::parse(&folder_name)
        .map_err(|e| ApiError::storage(ErrorCode::InvalidName, e))?;

    state.storage.delete_folder(&folder).await.map_err(|e| {
        error!(error = %e, folder = %folder, "Error deleting folder");
        ApiError::storage(ErrorCode::DeleteFailed, e)
    })?;

    info!(folder = %folder, "Folder deleted");

    Ok(Json(MessageResponse::new(format!(
        "Folder \"{}\" deleted successfully",
        folder
    ))))
}
