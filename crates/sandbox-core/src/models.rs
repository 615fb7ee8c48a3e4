//! Wire-shaped response types returned by the session manager's public
//! operations and serialized across the tool and HTTP surfaces.

use serde::{Deserialize, Serialize};

/// Metadata for a file under `/mnt/data/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactInfo {
    pub path: String,
    pub filename: String,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Response from `upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub session_id: String,
    pub path: String,
}

/// Response from `execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub session_id: String,
    pub run_id: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub stdout_truncated: bool,
    #[serde(default)]
    pub stderr_truncated: bool,
    #[serde(default)]
    pub artifacts: Vec<ArtifactInfo>,
    pub duration_ms: u64,
}

/// Response from `read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResult {
    pub path: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content_base64: String,
}

/// Response from `list`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListResult {
    pub artifacts: Vec<ArtifactInfo>,
}

/// Response from `close`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseResult {
    pub status: String,
}

impl CloseResult {
    pub fn closed() -> Self {
        Self {
            status: "closed".to_string(),
        }
    }
}

/// A single file listing entry: (name, size_bytes, mtime_seconds).
pub type Snapshot = std::collections::HashMap<String, (u64, f64)>;
