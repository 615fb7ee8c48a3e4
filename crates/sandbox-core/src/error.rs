//! The broker's closed error taxonomy.
//!
//! Errors are values, not exceptions: every fallible operation on
//! [`crate::manager::SessionManager`] returns `Result<T, SandboxError>`, and
//! `SandboxError::kind` gives the machine-readable string a caller (or the
//! HTTP surface) maps to a status code or a tool-call error payload.

use thiserror::Error;

/// A single tagged-variant error covering the whole broker.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("invalid session_id '{0}': must match ^[A-Za-z0-9_-]{{1,64}}$")]
    InvalidSessionId(String),

    #[error("invalid filename '{0}'")]
    InvalidFilename(String),

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("code is {actual} bytes, exceeds {limit} byte limit")]
    CodeTooLarge { actual: usize, limit: usize },

    #[error("upload exceeds {limit} byte limit")]
    UploadTooLarge { limit: u64 },

    #[error("file '{0}' already exists in session")]
    FileExists(String),

    #[error("no active session with id {0}")]
    SessionNotFound(String),

    #[error("max_sessions limit of {limit} reached")]
    MaxSessions { limit: usize },

    #[error("session is busy executing another run")]
    SessionBusy,

    #[error("artifact not found")]
    NotFound,

    #[error("artifact is {size_bytes} bytes, exceeds the read limit")]
    ArtifactTooLarge { size_bytes: u64 },

    #[error("docker error: {0}")]
    DockerError(String),

    #[error("docker unavailable: {0}")]
    DockerUnavailable(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl SandboxError {
    /// The machine-readable error kind, used by the tool and HTTP surfaces
    /// to map a failure onto a status code or a structured error payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSessionId(_) => "invalid_session_id",
            Self::InvalidFilename(_) => "invalid_filename",
            Self::InvalidPath(_) => "invalid_path",
            Self::InvalidContent(_) => "invalid_content",
            Self::CodeTooLarge { .. } => "code_too_large",
            Self::UploadTooLarge { .. } => "upload_too_large",
            Self::FileExists(_) => "file_exists",
            Self::SessionNotFound(_) => "session_not_found",
            Self::MaxSessions { .. } => "max_sessions",
            Self::SessionBusy => "session_busy",
            Self::NotFound => "not_found",
            Self::ArtifactTooLarge { .. } => "artifact_too_large",
            Self::DockerError(_) => "docker_error",
            Self::DockerUnavailable(_) => "docker_unavailable",
            Self::ExecutionFailed(_) => "execution_failed",
        }
    }

    /// `size_bytes` metadata, populated only for `artifact_too_large`.
    pub fn size_bytes(&self) -> Option<u64> {
        match self {
            Self::ArtifactTooLarge { size_bytes } => Some(*size_bytes),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors surfaced by a [`crate::driver::ContainerDriver`], mapped 1:1 onto
/// the `docker_*`/`not_found`/`execution_failed` taxonomy at the manager
/// boundary.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("engine refused the request: {0}")]
    ApiError(String),

    #[error("engine unreachable: {0}")]
    Unavailable(String),
}

impl From<DriverError> for SandboxError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotFound(id) => SandboxError::SessionNotFound(id),
            DriverError::ApiError(msg) => SandboxError::DockerError(msg),
            DriverError::Unavailable(msg) => SandboxError::DockerUnavailable(msg),
        }
    }
}
