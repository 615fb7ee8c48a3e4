//! Read-only artifact HTTP surface: a single route that serves a session's
//! artifact bytes by delegating to [`SessionManager::read`], never touching
//! the container's tar stream directly.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::Engine as _;
use sandbox_core::{ContainerDriver, SandboxError, SessionManager};
use std::sync::Arc;

pub fn router<D: ContainerDriver + 'static>(manager: Arc<SessionManager<D>>) -> Router {
    Router::new()
        .route("/files/{session_id}/{filename}", get(read_artifact::<D>))
        .with_state(manager)
}

async fn read_artifact<D: ContainerDriver + 'static>(
    State(manager): State<Arc<SessionManager<D>>>,
    Path((session_id, filename)): Path<(String, String)>,
) -> Response {
    match manager.read(&session_id, &filename).await {
        Ok(artifact) => {
            let bytes = match base64::engine::general_purpose::STANDARD
                .decode(&artifact.content_base64)
            {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::error!(%err, "artifact content was not valid base64");
                    return status_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error");
                }
            };
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, artifact.mime_type.clone()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{}\"", artifact.filename),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &SandboxError) -> Response {
    let status = match err.kind() {
        "session_not_found" | "not_found" | "invalid_path" => StatusCode::NOT_FOUND,
        "artifact_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    status_error(status, err.kind())
}

fn status_error(status: StatusCode, kind: &str) -> Response {
    (
        status,
        axum::Json(serde_json::json!({ "error": kind })),
    )
        .into_response()
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
    async fn serves_an_uploaded_artifact() {
        let mgr = manager();
        let up = mgr.upload(None, "hello.txt", b"hi there", false).await.unwrap();
        let app = router(mgr);

        let req = axum::http::Request::builder()
            .uri(format!("/files/{}/hello.txt", up.session_id))
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hi there");
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let app = router(manager());
        let req = axum::http::Request::builder()
            .uri("/files/sess_doesnotexist/x.txt")
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn artifact_over_read_limit_is_413() {
        let mut config = SandboxConfig::default();
        config.max_artifact_read_bytes = 2;
        let mgr = Arc::new(SessionManager::new(config, Arc::new(FakeDriver::new())));
        let up = mgr
            .upload(None, "big.bin", b"too big for the limit", false)
            .await
            .unwrap();
        let app = router(mgr);

        let req = axum::http::Request::builder()
            .uri(format!("/files/{}/big.bin", up.session_id))
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
