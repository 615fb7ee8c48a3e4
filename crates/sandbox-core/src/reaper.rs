//! Background cleanup: an orphan sweep run once at startup, then a periodic
//! TTL loop that closes sessions idle past `session_ttl_m`.

use crate::driver::ContainerDriver;
use crate::manager::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Spawn the periodic TTL sweep as a background task. The orphan sweep is
/// a separate, one-shot call the caller makes before accepting sessions
/// ([`SessionManager::sweep_orphans`]) — this only handles the recurring
/// idle-session reaping.
pub fn spawn_ttl_reaper<D: ContainerDriver + 'static>(
    manager: Arc<SessionManager<D>>,
) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(manager.config().cleanup_interval_m * 60);
    let ttl = Duration::from_secs(manager.config().session_ttl_m * 60);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so we don't reap a
        // session created in the same instant the reaper starts.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            reap_idle_sessions(&manager, ttl).await;
        }
    })
}

async fn reap_idle_sessions<D: ContainerDriver>(manager: &SessionManager<D>, ttl: Duration) {
    for (session_id, idle_for) in manager.idle_sessions() {
        if idle_for < ttl {
            continue;
        }
        match manager.close(&session_id).await {
            Ok(_) => info!(session_id, idle_secs = idle_for.as_secs(), "reaped idle session"),
            Err(err) if err.kind() == "session_busy" => {
                // Still running a job; leave it for the next tick.
            }
            Err(err) => error!(session_id, %err, "failed to reap idle session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxConfig;
    use crate::driver::fake::FakeDriver;

    #[tokio::test]
    async fn idle_past_ttl_is_closed_busy_session_is_skipped() {
        let driver = Arc::new(FakeDriver::new());
        let mgr = Arc::new(SessionManager::new(SandboxConfig::default(), driver));

        let idle = mgr.upload(None, "a.txt", b"x", false).await.unwrap();
        let busy = mgr.upload(None, "b.txt", b"x", false).await.unwrap();

        // Hold the busy session's lock open across the sweep.
        let mutex = mgr.session_mutex(&busy.session_id).unwrap();
        let _guard = mutex.lock().await;

        reap_idle_sessions(&mgr, Duration::from_secs(0)).await;

        assert!(mgr.session_count() == 1);
        assert!(!mgr.has_session(&idle.session_id));
        assert!(mgr.has_session(&busy.session_id));
    }
}
