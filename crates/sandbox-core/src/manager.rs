//! Session Manager: the public core. Composes the Container
//! Driver, Artifact Scanner, Tar Codec and Session Registry to implement
//! `upload`, `execute`, `list`, `read`, `close`, and owns the
//! engine-error-to-taxonomy mapping.

use crate::config::SandboxConfig;
use crate::driver::{ContainerDriver, ContainerSpec, ExecOutput};
use crate::error::{Result, SandboxError};
use crate::ids::{generate_run_id, generate_session_id};
use crate::models::{ArtifactInfo, CloseResult, ListResult, ReadResult, RunResult, UploadResult};
use crate::registry::SessionRegistry;
use crate::scanner;
use crate::tarcodec;
use crate::validation;
use base64::Engine as _;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const DATA_DIR: &str = "/mnt/data";
const APP_LABEL_KEY: &str = "app";
const APP_LABEL_VALUE: &str = "mcp-code-sandbox";

/// The broker's public core, generic over the container engine so it can
/// run against a real Docker daemon or, in tests, an in-memory fake.
pub struct SessionManager<D: ContainerDriver> {
    config: SandboxConfig,
    driver: Arc<D>,
    registry: SessionRegistry<D>,
    http_base_url: Option<String>,
}

impl<D: ContainerDriver> SessionManager<D> {
    pub fn new(config: SandboxConfig, driver: Arc<D>) -> Self {
        let registry = SessionRegistry::new(config.max_sessions);
        Self {
            config,
            driver,
            registry,
            http_base_url: None,
        }
    }

    /// Enable `download_url` decoration on `list` results once the
    /// artifact HTTP surface is up.
    pub fn with_http_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_base_url = Some(base_url.into());
        self
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Number of live sessions — used by the reaper and by health checks.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.registry.contains(session_id)
    }

    /// `(session_id, idle duration)` for every live session — the reaper's
    /// TTL sweep walks this each tick.
    pub fn idle_sessions(&self) -> Vec<(String, std::time::Duration)> {
        self.registry.idle_snapshot()
    }

    /// The per-session mutex, exposed so the reaper can detect a session
    /// that's mid-execution and skip it for this tick.
    pub fn session_mutex(&self, session_id: &str) -> Option<Arc<tokio::sync::Mutex<()>>> {
        self.registry.mutex(session_id)
    }

    /// One-shot orphan sweep, run before any session is accepted.
    /// Returns the number of containers removed.
    pub async fn sweep_orphans(&self) -> Result<usize> {
        let label = format!("{APP_LABEL_KEY}={APP_LABEL_VALUE}");
        let orphans = self
            .driver
            .list_by_label(&label)
            .await
            .map_err(SandboxError::from)?;
        let mut removed = 0;
        for handle in orphans {
            match self.driver.remove(&handle).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(?handle, %err, "orphan removal failed"),
            }
        }
        if removed > 0 {
            warn!(count = removed, "removed orphan containers from a previous run");
        }
        Ok(removed)
    }

    /// Resolve a session id to a container handle, creating a fresh
    /// container when the id is absent or unknown.
    async fn get_or_create(&self, session_id: Option<&str>) -> Result<(String, D::Handle)> {
        validation::validate_session_id(session_id)?;

        if let Some(sid) = session_id {
            if let Some(handle) = self.registry.touch(sid) {
                return Ok((sid.to_string(), handle));
            }
        }

        let sid = session_id
            .map(str::to_string)
            .unwrap_or_else(generate_session_id);

        let mut labels = HashMap::new();
        labels.insert(APP_LABEL_KEY.to_string(), APP_LABEL_VALUE.to_string());
        labels.insert("session_id".to_string(), sid.clone());

        let spec = ContainerSpec {
            image: self.config.image.clone(),
            name: format!("sandbox-{sid}"),
            labels,
            memory_limit: self.config.memory_limit.clone(),
            cpu_limit: self.config.cpu_limit,
            tmp_size_bytes: 64 * 1024 * 1024,
        };

        let handle = self.driver.create(spec).await.map_err(SandboxError::from)?;
        if let Err(err) = self.registry.insert(sid.clone(), handle.clone()) {
            // Capacity was exceeded between the check above and here, or
            // this id raced another create. Either way the container we
            // just started has no registry entry to clean it up later, so
            // remove it now rather than leave it until the next orphan
            // sweep.
            if let Err(remove_err) = self.driver.remove(&handle).await {
                warn!(
                    session_id = %sid,
                    %remove_err,
                    "failed to remove container after insert was rejected"
                );
            }
            return Err(err);
        }
        info!(session_id = %sid, "session created");
        Ok((sid, handle))
    }

    /// Upload a data file into a session.
    pub async fn upload(
        &self,
        session_id: Option<&str>,
        filename: &str,
        content: &[u8],
        overwrite: bool,
    ) -> Result<UploadResult> {
        validation::validate_filename(filename)?;

        let (sid, handle) = self.get_or_create(session_id).await?;

        if !overwrite {
            let probe = format!("test -e '{DATA_DIR}/{filename}'");
            let argv = vec!["sh".to_string(), "-c".to_string(), probe];
            let ExecOutput { exit_code, .. } = self
                .driver
                .exec(&handle, &argv, "/")
                .await
                .map_err(SandboxError::from)?;
            if exit_code == 0 {
                return Err(SandboxError::FileExists(filename.to_string()));
            }
        }

        let tar = tarcodec::build_single_file(filename, content)?;
        self.driver
            .put_archive(&handle, DATA_DIR, tar)
            .await
            .map_err(SandboxError::from)?;

        self.registry.mark_accessed(&sid);
        info!(session_id = %sid, filename, bytes = content.len(), "file uploaded");

        Ok(UploadResult {
            session_id: sid,
            path: format!("{DATA_DIR}/{filename}"),
        })
    }

    /// Execute code in a session.
    pub async fn execute(&self, session_id: Option<&str>, code: &str) -> Result<RunResult> {
        validation::validate_code_size(code, self.config.max_code_bytes)?;

        let (sid, handle) = self.get_or_create(session_id).await?;

        let mutex = self
            .registry
            .mutex(&sid)
            .ok_or_else(|| SandboxError::SessionNotFound(sid.clone()))?;
        let _guard = mutex
            .try_lock()
            .map_err(|_| SandboxError::SessionBusy)?;

        let run_id = generate_run_id();
        let before = scanner::snapshot(self.driver.as_ref(), &handle).await?;

        let argv = vec![
            "timeout".to_string(),
            self.config.exec_timeout_s.to_string(),
            "python3".to_string(),
            "-c".to_string(),
            code.to_string(),
        ];

        let start = std::time::Instant::now();
        let ExecOutput {
            exit_code,
            stdout,
            stderr,
        } = self
            .driver
            .exec(&handle, &argv, DATA_DIR)
            .await
            .map_err(SandboxError::from)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (normalized_exit_code, mut stderr) = if exit_code == 124 {
            (-1, stderr)
        } else {
            (exit_code as i32, stderr)
        };
        if exit_code == 124 {
            let note = format!(
                "\n[sandbox] execution timed out after {}s\n",
                self.config.exec_timeout_s
            );
            stderr.extend_from_slice(note.as_bytes());
        }

        let (stdout, stdout_truncated) = truncate_output(&stdout, self.config.max_output_bytes);
        let (stderr, stderr_truncated) = truncate_output(&stderr, self.config.max_output_bytes);

        let artifacts = if normalized_exit_code == 0 {
            let after = scanner::snapshot(self.driver.as_ref(), &handle).await?;
            let changed = scanner::diff(&before, &after);
            changed
                .into_iter()
                .map(|name| {
                    let (size_bytes, _) = after.get(&name).copied().unwrap_or((0, 0.0));
                    self.artifact_info(&sid, &name, size_bytes)
                })
                .collect()
        } else {
            Vec::new()
        };

        self.registry.mark_accessed(&sid);
        info!(
            session_id = %sid,
            run_id = %run_id,
            exit_code = normalized_exit_code,
            duration_ms,
            "run complete"
        );

        Ok(RunResult {
            session_id: sid,
            run_id,
            exit_code: normalized_exit_code,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            artifacts,
            duration_ms,
        })
    }

    /// List a session's current artifacts.
    pub async fn list(&self, session_id: &str) -> Result<ListResult> {
        validation::validate_session_id(Some(session_id))?;
        let handle = self
            .registry
            .touch(session_id)
            .ok_or_else(|| SandboxError::SessionNotFound(session_id.to_string()))?;

        let snapshot = scanner::snapshot(self.driver.as_ref(), &handle).await?;
        let artifacts = snapshot
            .into_iter()
            .map(|(name, (size_bytes, _))| self.artifact_info(session_id, &name, size_bytes))
            .collect();

        Ok(ListResult { artifacts })
    }

    /// Read a single artifact's bytes.
    pub async fn read(&self, session_id: &str, path: &str) -> Result<ReadResult> {
        validation::validate_session_id(Some(session_id))?;
        let handle = self
            .registry
            .touch(session_id)
            .ok_or_else(|| SandboxError::SessionNotFound(session_id.to_string()))?;

        let (canonical_path, filename) = validation::resolve_data_path(path)?;

        let tar = self
            .driver
            .get_archive(&handle, &canonical_path)
            .await
            .map_err(|e| match e {
                crate::error::DriverError::NotFound(_) => SandboxError::NotFound,
                other => SandboxError::from(other),
            })?;
        let bytes = tarcodec::extract_first_file(&tar)?;

        if bytes.len() as u64 > self.config.max_artifact_read_bytes {
            return Err(SandboxError::ArtifactTooLarge {
                size_bytes: bytes.len() as u64,
            });
        }

        self.registry.mark_accessed(session_id);

        Ok(ReadResult {
            path: canonical_path,
            mime_type: crate::mime::guess(&filename),
            size_bytes: bytes.len() as u64,
            content_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            filename,
        })
    }

    /// Close a session, destroying its container.
    pub async fn close(&self, session_id: &str) -> Result<CloseResult> {
        validation::validate_session_id(Some(session_id))?;

        let mutex = self
            .registry
            .mutex(session_id)
            .ok_or_else(|| SandboxError::SessionNotFound(session_id.to_string()))?;
        let _guard = mutex.try_lock().map_err(|_| SandboxError::SessionBusy)?;

        let handle = self
            .registry
            .remove(session_id)
            .ok_or_else(|| SandboxError::SessionNotFound(session_id.to_string()))?;

        self.driver.remove(&handle).await.map_err(SandboxError::from)?;
        info!(session_id, "session closed");
        Ok(CloseResult::closed())
    }

    fn artifact_info(&self, session_id: &str, filename: &str, size_bytes: u64) -> ArtifactInfo {
        let download_url = self
            .http_base_url
            .as_ref()
            .map(|base| format!("{base}/files/{session_id}/{filename}"));
        ArtifactInfo {
            path: format!("{DATA_DIR}/{filename}"),
            filename: filename.to_string(),
            size_bytes,
            mime_type: crate::mime::guess(filename),
            download_url,
        }
    }
}

/// Truncate `bytes` to at most `max` bytes on a valid UTF-8 char boundary,
/// decoding with lossy replacement — truncation is a success condition
///, never an error.
fn truncate_output(bytes: &[u8], max: usize) -> (String, bool) {
    if bytes.len() <= max {
        return (String::from_utf8_lossy(bytes).into_owned(), false);
    }
    let mut end = max;
    while end > 0 && (bytes[end] & 0b1100_0000) == 0b1000_0000 {
        end -= 1;
    }
    (String::from_utf8_lossy(&bytes[..end]).into_owned(), true)
}
