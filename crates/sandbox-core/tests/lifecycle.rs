//! End-to-end lifecycle scenarios against the in-memory fake driver,
//! exercising the session manager the way a real caller would: multiple
//! uploads, a run, a close, and the orphan sweep.

use sandbox_core::config::SandboxConfig;
use sandbox_core::driver::fake::FakeDriver;
use sandbox_core::driver::{ContainerDriver, ContainerSpec};
use sandbox_core::SessionManager;
use std::sync::Arc;

fn manager() -> Arc<SessionManager<FakeDriver>> {
    Arc::new(SessionManager::new(
        SandboxConfig::default(),
        Arc::new(FakeDriver::new()),
    ))
}

#[tokio::test]
async fn list_after_multiple_uploads_has_no_duplicates_or_omissions() {
    let mgr = manager();
    let first = mgr.upload(None, "a.txt", b"1", false).await.unwrap();
    mgr.upload(Some(&first.session_id), "b.txt", b"2", false)
        .await
        .unwrap();
    mgr.upload(Some(&first.session_id), "c.txt", b"3", false)
        .await
        .unwrap();

    let listing = mgr.list(&first.session_id).await.unwrap();
    let mut names: Vec<_> = listing.artifacts.iter().map(|a| a.filename.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
}

#[tokio::test]
async fn close_then_reuse_of_same_id_creates_a_fresh_session() {
    let mgr = manager();
    let up = mgr.upload(None, "a.txt", b"1", false).await.unwrap();
    let sid = up.session_id.clone();

    mgr.close(&sid).await.unwrap();
    assert!(!mgr.has_session(&sid));

    // Same id, now unknown to the registry: treated as Absent -> Live, a
    // fresh container with no carried-over files.
    mgr.upload(Some(&sid), "only.txt", b"fresh", false)
        .await
        .unwrap();
    let listing = mgr.list(&sid).await.unwrap();
    assert_eq!(listing.artifacts.len(), 1);
    assert_eq!(listing.artifacts[0].filename, "only.txt");
}

#[tokio::test]
async fn second_close_of_already_closed_session_is_session_not_found() {
    let mgr = manager();
    let up = mgr.upload(None, "a.txt", b"1", false).await.unwrap();
    mgr.close(&up.session_id).await.unwrap();

    let err = mgr.close(&up.session_id).await.unwrap_err();
    assert_eq!(err.kind(), "session_not_found");
}

#[tokio::test]
async fn orphan_sweep_removes_containers_from_a_previous_process() {
    let driver = Arc::new(FakeDriver::new());

    // Simulate a container leaked by a previous broker process, carrying
    // the app label but unknown to this process's registry.
    driver
        .create(ContainerSpec {
            image: "llm-sandbox:latest".to_string(),
            name: "sandbox-sess_leaked12345".to_string(),
            labels: std::collections::HashMap::from([
                ("app".to_string(), "mcp-code-sandbox".to_string()),
                ("session_id".to_string(), "sess_leaked12345".to_string()),
            ]),
            memory_limit: "512m".to_string(),
            cpu_limit: 1.0,
            tmp_size_bytes: 0,
        })
        .await
        .unwrap();

    let mgr = SessionManager::new(SandboxConfig::default(), driver.clone());
    let removed = mgr.sweep_orphans().await.unwrap();
    assert_eq!(removed, 1);
    assert!(driver.is_removed("sandbox-sess_leaked12345"));

    // A fresh session can now be created without interference.
    let up = mgr.upload(None, "a.txt", b"1", false).await.unwrap();
    assert!(mgr.has_session(&up.session_id));
}

#[tokio::test]
async fn max_sessions_limit_is_enforced_across_sessions() {
    let mut config = SandboxConfig::default();
    config.max_sessions = 1;
    let mgr = SessionManager::new(config, Arc::new(FakeDriver::new()));

    mgr.upload(None, "a.txt", b"1", false).await.unwrap();
    let err = mgr.upload(None, "b.txt", b"2", false).await.unwrap_err();
    assert_eq!(err.kind(), "max_sessions");
}
