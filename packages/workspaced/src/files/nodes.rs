use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use super::paths::{clean_relative, resolve_within};
use super::types::{FilePathQuery, MoveRequest, RenameRequest};
use crate::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Delete a file or folder (recursively).
pub async fn delete_node(
    State(state): State<AppState>,
    Query(query): Query<FilePathQuery>,
) -> Response {
    let clean = match clean_relative(&query.path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    if clean.as_os_str().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "cannot delete root");
    }

    let abs = state.workspace.code_dir.join(&clean);
    let metadata = match std::fs::symlink_metadata(&abs) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return error_response(StatusCode::NOT_FOUND, "path not found");
        }
        Err(e) => {
            error!(path = %abs.display(), error = %e, "failed to stat path");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to delete path");
        }
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(&abs)
    } else {
        std::fs::remove_file(&abs)
    };
    if let Err(e) = result {
        error!(path = %abs.display(), error = %e, "failed to delete path");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to delete path");
    }

    Json(json!({
        "message": "deleted successfully",
        "path": clean.to_string_lossy(),
    }))
    .into_response()
}

pub async fn rename_node(
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> Response {
    let old_abs = match resolve_within(&state.workspace.code_dir, &req.old_path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let new_abs = match resolve_within(&state.workspace.code_dir, &req.new_path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if !old_abs.exists() {
        return error_response(StatusCode::NOT_FOUND, "old path does not exist");
    }
    if let Some(parent) = new_abs.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!(path = %new_abs.display(), error = %e, "failed to create destination directory");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create destination directory",
            );
        }
    }
    if new_abs.exists() {
        return error_response(StatusCode::CONFLICT, "a file/folder already exists at newPath");
    }
    if let Err(e) = std::fs::rename(&old_abs, &new_abs) {
        error!(from = %old_abs.display(), to = %new_abs.display(), error = %e, "rename failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to rename file/folder");
    }

    let old_clean = clean_relative(&req.old_path).unwrap_or_default();
    let new_clean = clean_relative(&req.new_path).unwrap_or_default();
    Json(json!({
        "message": "renamed successfully",
        "oldPath": old_clean.to_string_lossy(),
        "newPath": new_clean.to_string_lossy(),
    }))
    .into_response()
}

/// Move a file or folder into a target directory, keeping its base name.
pub async fn move_node(State(state): State<AppState>, Json(req): Json<MoveRequest>) -> Response {
    let src_abs = match resolve_within(&state.workspace.code_dir, &req.source_path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let target_dir = match resolve_within(&state.workspace.code_dir, &req.target_path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    // Moving a folder into its own subtree would orphan it.
    if target_dir.starts_with(&src_abs) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "cannot move a folder into its own subfolder",
        );
    }
    if !src_abs.exists() {
        return error_response(StatusCode::NOT_FOUND, "source path does not exist");
    }

    let Some(file_name) = src_abs.file_name() else {
        return error_response(StatusCode::BAD_REQUEST, "cannot move root");
    };
    let final_dst = target_dir.join(file_name);

    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        error!(path = %target_dir.display(), error = %e, "failed to create target directory");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to create target directory",
        );
    }
    if final_dst.exists() {
        return error_response(StatusCode::CONFLICT, "target already exists");
    }
    if let Err(e) = std::fs::rename(&src_abs, &final_dst) {
        error!(from = %src_abs.display(), to = %final_dst.display(), error = %e, "move failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to move file/folder");
    }

    let target_clean = clean_relative(&req.target_path).unwrap_or_default();
    Json(json!({
        "message": "moved successfully",
        "from": req.source_path,
        "to": format!("/{}", target_clean.join(file_name).display()),
    }))
    .into_response()
}
