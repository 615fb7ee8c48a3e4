//! Thin JSON tool façade exposing the five session-manager operations as
//! `/tools/*` endpoints, so the broker is runnable end to end without a
//! full MCP stdio transport. Each handler does only wire-shape translation;
//! all policy lives in [`sandbox_core::SessionManager`].

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use sandbox_core::error::SandboxError;
use sandbox_core::{validation, ContainerDriver, SessionManager};
use serde::Deserialize;
use std::sync::Arc;

pub fn router<D: ContainerDriver + 'static>(manager: Arc<SessionManager<D>>) -> Router {
    Router::new()
        .route("/tools/upload", post(upload::<D>))
        .route("/tools/execute", post(execute::<D>))
        .route("/tools/list/{session_id}", get(list::<D>))
        .route("/tools/read", post(read::<D>))
        .route("/tools/close/{session_id}", post(close::<D>))
        .with_state(manager)
}

#[derive(Deserialize)]
struct UploadRequest {
    session_id: Option<String>,
    filename: String,
    content_base64: String,
    #[serde(default)]
    overwrite: bool,
}

async fn upload<D: ContainerDriver + 'static>(
    State(manager): State<Arc<SessionManager<D>>>,
    Json(req): Json<UploadRequest>,
) -> Response {
    if let Err(err) = validation::validate_upload_size(
        &req.content_base64,
        manager.config().max_upload_bytes,
    ) {
        return error_response(&err);
    }
    let content = match base64::engine::general_purpose::STANDARD.decode(&req.content_base64) {
        Ok(bytes) => bytes,
        Err(_) => {
            return error_response(&SandboxError::InvalidContent(
                "content_base64 is not valid base64".to_string(),
            ))
        }
    };
    match manager
        .upload(req.session_id.as_deref(), &req.filename, &content, req.overwrite)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(&err),
    }
}

#[derive(Deserialize)]
struct ExecuteRequest {
    session_id: Option<String>,
    code: String,
}

async fn execute<D: ContainerDriver + 'static>(
    State(manager): State<Arc<SessionManager<D>>>,
    Json(req): Json<ExecuteRequest>,
) -> Response {
    match manager.execute(req.session_id.as_deref(), &req.code).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn list<D: ContainerDriver + 'static>(
    State(manager): State<Arc<SessionManager<D>>>,
    Path(session_id): Path<String>,
) -> Response {
    match manager.list(&session_id).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(&err),
    }
}

#[derive(Deserialize)]
struct ReadRequest {
    session_id: String,
    path: String,
}

async fn read<D: ContainerDriver + 'static>(
    State(manager): State<Arc<SessionManager<D>>>,
    Json(req): Json<ReadRequest>,
) -> Response {
    match manager.read(&req.session_id, &req.path).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn close<D: ContainerDriver + 'static>(
    State(manager): State<Arc<SessionManager<D>>>,
    Path(session_id): Path<String>,
) -> Response {
    match manager.close(&session_id).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &SandboxError) -> Response {
    let status = match err.kind() {
        "session_not_found" | "not_found" => axum::http::StatusCode::NOT_FOUND,
        "invalid_session_id" | "invalid_filename" | "invalid_path" | "invalid_content"
        | "code_too_large" | "upload_too_large" => axum::http::StatusCode::BAD_REQUEST,
        "file_exists" | "max_sessions" | "session_busy" => axum::http::StatusCode::CONFLICT,
        "artifact_too_large" => axum::http::StatusCode::PAYLOAD_TOO_LARGE,
        _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut body = serde_json::json!({ "error": err.kind(), "message": err.to_string() });
    if let Some(size_bytes) = err.size_bytes() {
        body["size_bytes"] = serde_json::json!(size_bytes);
    }
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_core::config::SandboxConfig;
    use sandbox_core::driver::fake::FakeDriver;
    use tower::ServiceExt;

    fn manager() -> Arc<SessionManager<FakeDriver>> {
        Arc::new(SessionManager::new(
            SandboxConfig::default(),
            Arc::new(FakeDriver::new()),
        ))
    }

    #[tokio::test]
    async fn upload_then_list_round_trips() {
        let mgr = manager();
        let app = router(mgr);

        let body = serde_json::json!({
            "filename": "a.txt",
            "content_base64": base64::engine::general_purpose::STANDARD.encode(b"hi"),
        });
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/tools/upload")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let upload_result: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let sid = upload_result["session_id"].as_str().unwrap().to_string();

        let req = axum::http::Request::builder()
            .uri(format!("/tools/list/{sid}"))
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let listing: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(listing["artifacts"][0]["filename"], "a.txt");
    }

    #[tokio::test]
    async fn execute_with_unknown_session_is_accepted_and_creates_one() {
        let app = router(manager());
        let body = serde_json::json!({ "code": "print('hi')" });
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/tools/execute")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn close_of_unknown_session_is_404() {
        let app = router(manager());
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/tools/close/sess_nope")
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
