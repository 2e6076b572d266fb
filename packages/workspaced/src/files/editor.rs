use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use super::paths::resolve_within;
use super::types::{FilePathQuery, NewNodeRequest, SaveFileRequest};
use crate::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// File body as plain text.
pub async fn get_file_content(
    State(state): State<AppState>,
    Query(query): Query<FilePathQuery>,
) -> Response {
    if query.path.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "path query parameter is required");
    }
    let abs = match resolve_within(&state.workspace.code_dir, &query.path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match std::fs::read_to_string(&abs) {
        Ok(content) => content.into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, "file not found")
        }
        Err(e) => {
            error!(path = %abs.display(), error = %e, "failed to read file");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn save_file_content(
    State(state): State<AppState>,
    Query(query): Query<FilePathQuery>,
    Json(req): Json<SaveFileRequest>,
) -> Response {
    if query.path.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "path query parameter is required");
    }
    let abs = match resolve_within(&state.workspace.code_dir, &query.path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    if let Err(e) = std::fs::write(&abs, req.content.as_bytes()) {
        error!(path = %abs.display(), error = %e, "failed to save file");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    StatusCode::OK.into_response()
}

pub async fn create_file(
    State(state): State<AppState>,
    Json(req): Json<NewNodeRequest>,
) -> Response {
    if req.path.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "path is required");
    }
    let abs = match resolve_within(&state.workspace.code_dir, &req.path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if let Some(parent) = abs.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!(path = %abs.display(), error = %e, "failed to create parent directories");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to create directories");
        }
    }
    if abs.exists() {
        return error_response(StatusCode::CONFLICT, "file already exists");
    }
    if let Err(e) = std::fs::File::create(&abs) {
        error!(path = %abs.display(), error = %e, "failed to create file");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to create file");
    }

    let clean = super::paths::clean_relative(&req.path).unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "file created successfully",
            "fileName": req.name,
            "filePath": clean.to_string_lossy(),
        })),
    )
        .into_response()
}

pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<NewNodeRequest>,
) -> Response {
    if req.path.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "path is required");
    }
    let abs = match resolve_within(&state.workspace.code_dir, &req.path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if abs.exists() {
        return error_response(StatusCode::CONFLICT, "folder already exists");
    }
    if let Err(e) = std::fs::create_dir_all(&abs) {
        error!(path = %abs.display(), error = %e, "failed to create folder");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to create folder");
    }

    let clean = super::paths::clean_relative(&req.path).unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "folder created successfully",
            "folderName": req.name,
            "folderPath": clean.to_string_lossy(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::Request,
        routing::{get, post},
    };
    use tower::ServiceExt;

    fn app(state: crate::AppState) -> Router {
        Router::new()
            .route(
                "/api/files/content",
                get(get_file_content).post(save_file_content),
            )
            .route("/api/files/create", post(create_file))
            .route("/api/folder/create", post(create_folder))
            .with_state(state)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_get_file_content() {
        let (state, tmp) = crate::test_helpers::test_app_state().await;
        std::fs::write(tmp.path().join("hello.txt"), "hello world").unwrap();

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/files/content?path=/hello.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn test_get_file_content_not_found() {
        let (state, _tmp) = crate::test_helpers::test_app_state().await;
        let resp = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/files/content?path=/missing.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_file_content_rejects_traversal() {
        let (state, _tmp) = crate::test_helpers::test_app_state().await;
        let resp = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/files/content?path=../../etc/passwd")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_save_file_content() {
        let (state, tmp) = crate::test_helpers::test_app_state().await;
        std::fs::write(tmp.path().join("note.txt"), "old").unwrap();

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/files/content?path=/note.txt")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"content":"new text"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("note.txt")).unwrap(),
            "new text"
        );
    }

    #[tokio::test]
    async fn test_create_file_with_parents() {
        let (state, tmp) = crate::test_helpers::test_app_state().await;

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/files/create")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"mod.rs","path":"/src/deep/mod.rs"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["fileName"], "mod.rs");
        assert_eq!(json["filePath"], "src/deep/mod.rs");
        assert!(tmp.path().join("src/deep/mod.rs").is_file());
    }

    #[tokio::test]
    async fn test_create_file_conflict() {
        let (state, tmp) = crate::test_helpers::test_app_state().await;
        std::fs::write(tmp.path().join("taken.txt"), "x").unwrap();

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/files/create")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"taken.txt","path":"/taken.txt"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_folder() {
        let (state, tmp) = crate::test_helpers::test_app_state().await;

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/folder/create")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"assets","path":"/assets"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(tmp.path().join("assets").is_dir());
    }

    #[tokio::test]
    async fn test_create_folder_conflict() {
        let (state, tmp) = crate::test_helpers::test_app_state().await;
        std::fs::create_dir(tmp.path().join("assets")).unwrap();

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/folder/create")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"assets","path":"/assets"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
