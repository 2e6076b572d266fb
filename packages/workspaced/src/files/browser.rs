use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::Path;
use tracing::error;

use super::tree::build_file_tree;
use crate::AppState;

/// Full workspace tree, as a single-element array of root nodes.
pub async fn list_files(State(state): State<AppState>) -> Response {
    match build_file_tree(&state.workspace.code_dir, Path::new("")) {
        Ok(root) => Json(vec![root]).into_response(),
        Err(e) => {
            error!(code_dir = %state.workspace.code_dir.display(), error = %e, "failed to build file tree");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_files_returns_tree() {
        let (state, tmp) = crate::test_helpers::test_app_state().await;
        std::fs::write(tmp.path().join("readme.md"), "# hi").unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/main.rs"), "fn main() {}").unwrap();

        let app = Router::new()
            .route("/api/files", get(list_files))
            .with_state(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/files")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        let roots = json.as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["type"], "folder");
        assert_eq!(roots[0]["path"], "/");

        let children = roots[0]["children"].as_array().unwrap();
        // Folder sorts before file.
        assert_eq!(children[0]["name"], "src");
        assert_eq!(children[1]["name"], "readme.md");
        assert_eq!(children[1]["language"], "markdown");
    }

    #[tokio::test]
    async fn test_list_files_missing_root_is_500() {
        let (mut state, tmp) = crate::test_helpers::test_app_state().await;
        state.workspace = std::sync::Arc::new(crate::config::WorkspaceConfig {
            code_dir: tmp.path().join("gone"),
        });

        let app = Router::new()
            .route("/api/files", get(list_files))
            .with_state(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/files")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
