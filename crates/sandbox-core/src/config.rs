//! Configuration, loaded from `SANDBOX_*` environment variables.
//!
//! Every field is optional with a default, and the whole thing is a single
//! flat `serde::Deserialize` struct loaded with `envy` — the same crate
//! `crates/collab` reaches for to turn an env-var set into a typed struct.

use serde::Deserialize;

fn default_memory_limit() -> String {
    "512m".to_string()
}
fn default_cpu_limit() -> f64 {
    1.0
}
fn default_exec_timeout_s() -> u64 {
    60
}
fn default_session_ttl_m() -> u64 {
    30
}
fn default_max_sessions() -> usize {
    10
}
fn default_cleanup_interval_m() -> u64 {
    5
}
fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_max_artifact_read_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_max_output_bytes() -> usize {
    100 * 1024
}
fn default_max_code_bytes() -> usize {
    100 * 1024
}
fn default_image() -> String {
    "llm-sandbox:latest".to_string()
}
fn default_http_host() -> String {
    "127.0.0.1".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> String {
    "logs/sandbox.log".to_string()
}
fn default_log_format() -> String {
    "console".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: f64,

    #[serde(default = "default_exec_timeout_s")]
    pub exec_timeout_s: u64,

    #[serde(default = "default_session_ttl_m")]
    pub session_ttl_m: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_cleanup_interval_m")]
    pub cleanup_interval_m: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_max_artifact_read_bytes")]
    pub max_artifact_read_bytes: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_limit: default_memory_limit(),
            cpu_limit: default_cpu_limit(),
            exec_timeout_s: default_exec_timeout_s(),
            session_ttl_m: default_session_ttl_m(),
            max_sessions: default_max_sessions(),
            cleanup_interval_m: default_cleanup_interval_m(),
            max_upload_bytes: default_max_upload_bytes(),
            max_artifact_read_bytes: default_max_artifact_read_bytes(),
            max_output_bytes: default_max_output_bytes(),
            max_code_bytes: default_max_code_bytes(),
            image: default_image(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            log_file: default_log_file(),
            log_format: default_log_format(),
        }
    }
}

impl SandboxConfig {
    /// Load from `SANDBOX_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("SANDBOX_").from_env()
    }
}
