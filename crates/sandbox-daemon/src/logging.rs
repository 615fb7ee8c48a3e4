//! Structured, file-only logging, wired once at boot. Console output is
//! never used for the operational log — only the configured log file.

use sandbox_core::SandboxConfig;
use std::fs::OpenOptions;
use std::path::Path;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. The returned guard must be
/// held for the process lifetime — dropping it stops the background
/// flush thread and silently truncates pending log lines.
pub fn init(config: &SandboxConfig) -> anyhow::Result<WorkerGuard> {
    if let Some(parent) = Path::new(&config.log_file).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let log_file = opts.open(&config.log_file)?;
    let (writer, guard) = non_blocking(log_file);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sandbox_core={0},sandbox_http={0},sandbox_daemon={0}", config.log_level)));

    let layer = tracing_subscriber::fmt::layer().with_writer(writer);

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(layer.json())
            .with(env_filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        tracing_subscriber::registry()
            .with(layer)
            .with(env_filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(guard)
}
