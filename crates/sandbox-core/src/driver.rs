//! Container Driver contract: a thin abstraction over a local
//! container engine, kept behind a trait so the session manager is testable
//! without a real Docker daemon — the same seam the `sandbox`
//! crate reaches for `async-trait` to hold.

use crate::error::DriverError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Resource caps and security hardening applied to every sandbox container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub memory_limit: String,
    pub cpu_limit: f64,
    pub tmp_size_bytes: u64,
}

/// Demultiplexed result of a single exec call.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Thin abstraction over a local container engine.
///
/// `Handle` identifies a running container; the production implementation
/// uses the container id bollard returns from `create`.
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    type Handle: Clone + Send + Sync + std::fmt::Debug;

    /// Create and start a long-lived no-op sleeper container per `spec`.
    async fn create(&self, spec: ContainerSpec) -> Result<Self::Handle, DriverError>;

    /// Run `argv` inside the container, working directory `working_dir`.
    async fn exec(
        &self,
        handle: &Self::Handle,
        argv: &[String],
        working_dir: &str,
    ) -> Result<ExecOutput, DriverError>;

    /// Inject a TAR archive at `dest_dir` inside the container.
    async fn put_archive(
        &self,
        handle: &Self::Handle,
        dest_dir: &str,
        tar_bytes: Vec<u8>,
    ) -> Result<(), DriverError>;

    /// Pull a TAR archive of `src_path` out of the container.
    async fn get_archive(
        &self,
        handle: &Self::Handle,
        src_path: &str,
    ) -> Result<Vec<u8>, DriverError>;

    /// List containers by label, for the orphan sweep.
    async fn list_by_label(&self, label: &str) -> Result<Vec<Self::Handle>, DriverError>;

    /// Force-remove a container and its anonymous volumes.
    async fn remove(&self, handle: &Self::Handle) -> Result<(), DriverError>;
}

pub mod bollard_driver;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
