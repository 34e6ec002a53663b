//! The single shared record of what is currently published.
//!
//! [`SessionState`] owns the live provider process. `activate` tears the
//! previous process down before installing the new one, so at most one
//! tunnel process exists at any time. All mutation happens under one
//! async mutex; observers follow changes through a watch channel.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument};

use tunnelkeeper_core::{SessionInfo, TunnelState};

use crate::host::process::TunnelProcess;

#[derive(Debug, Default)]
struct Session {
    url: Option<String>,
    process: Option<TunnelProcess>,
}

impl Session {
    fn is_active(&self) -> bool {
        self.url.is_some()
    }
}

/// Thread-safe session container.
#[derive(Debug)]
pub struct SessionState {
    inner: Mutex<Session>,
    info: watch::Sender<SessionInfo>,
    grace: Duration,
}

impl SessionState {
    /// Creates an inactive session. `grace` bounds process teardown.
    pub fn new(grace: Duration) -> Self {
        let (info, _) = watch::channel(SessionInfo::default());
        Self {
            inner: Mutex::new(Session::default()),
            info,
            grace,
        }
    }

    /// Installs a verified tunnel, terminating any previous process first.
    #[instrument(skip(self, process), fields(provider = %provider, url = %url))]
    pub async fn activate(&self, provider: &str, url: &str, process: TunnelProcess) {
        let mut session = self.inner.lock().await;

        if let Some(mut previous) = session.process.take() {
            debug!(pid = ?previous.pid(), "Terminating previous tunnel process");
            previous.terminate(self.grace).await;
        }

        let now = Utc::now();
        session.url = Some(url.to_string());
        session.process = Some(process);

        self.info.send_modify(|info| {
            info.state = TunnelState::Active {
                provider: provider.to_string(),
                url: url.to_string(),
            };
            info.activated_at = Some(now);
            info.last_error = None;
            info.updated_at = Some(now);
        });

        info!("Tunnel active");
    }

    /// Terminates the held process and clears the URL.
    ///
    /// Idempotent. Returns true if a tunnel was active.
    pub async fn deactivate(&self) -> bool {
        let mut session = self.inner.lock().await;
        self.deactivate_locked(&mut session).await
    }

    /// Deactivates only if `url` is still the active URL.
    ///
    /// Lets a health check that raced with a newer activation leave the
    /// newer tunnel alone.
    pub async fn deactivate_url(&self, url: &str) -> bool {
        let mut session = self.inner.lock().await;
        if session.url.as_deref() != Some(url) {
            return false;
        }
        self.deactivate_locked(&mut session).await
    }

    async fn deactivate_locked(&self, session: &mut Session) -> bool {
        let was_active = session.is_active();

        if let Some(mut process) = session.process.take() {
            process.terminate(self.grace).await;
        }
        session.url = None;

        if was_active {
            info!("Tunnel deactivated");
            self.set_state(TunnelState::Deactivated);
        }
        was_active
    }

    /// The active public URL.
    pub async fn current_url(&self) -> Option<String> {
        self.inner.lock().await.url.clone()
    }

    /// Whether a verified tunnel is installed.
    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.is_active()
    }

    /// Whether the active tunnel's process is still running.
    ///
    /// False when inactive.
    pub async fn process_alive(&self) -> bool {
        let mut session = self.inner.lock().await;
        session.process.as_mut().is_some_and(TunnelProcess::is_running)
    }

    /// OS pid of the active tunnel process.
    pub async fn active_pid(&self) -> Option<u32> {
        self.inner.lock().await.process.as_ref().and_then(TunnelProcess::pid)
    }

    // ------------------------------------------------------------------------
    // Observed state
    // ------------------------------------------------------------------------

    /// Publishes a lifecycle state that does not change the session itself.
    pub fn set_state(&self, state: TunnelState) {
        self.info.send_modify(|info| {
            info.state = state;
            info.updated_at = Some(Utc::now());
            if !info.state.is_active() {
                info.activated_at = None;
            }
        });
    }

    /// Counts a new failover cycle.
    pub fn record_cycle(&self) {
        self.info.send_modify(|info| info.cycles += 1);
    }

    /// Remembers the most recent failure.
    pub fn record_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.info.send_modify(|info| {
            info.last_error = Some(error);
            info.updated_at = Some(Utc::now());
        });
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionInfo {
        self.info.borrow().clone()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> TunnelState {
        self.info.borrow().state.clone()
    }

    /// Follows every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<SessionInfo> {
        self.info.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::host::process::pid_is_alive;
    use crate::test_support::spawn_sleeper;

    const GRACE: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_sequential_activations_leave_one_live_process() {
        let session = SessionState::new(GRACE);
        let mut pids = Vec::new();

        for n in 0..4 {
            let process = spawn_sleeper();
            pids.push(process.pid().unwrap());
            session
                .activate("serveo", &format!("https://t{n}.serveo.net"), process)
                .await;

            let alive: Vec<_> = pids.iter().filter(|pid| pid_is_alive(**pid)).collect();
            assert_eq!(alive, vec![pids.last().unwrap()]);
        }

        assert_eq!(session.current_url().await.as_deref(), Some("https://t3.serveo.net"));
        session.deactivate().await;
    }

    #[tokio::test]
    async fn test_deactivate_is_idempotent() {
        let session = SessionState::new(GRACE);
        let process = spawn_sleeper();
        let pid = process.pid().unwrap();
        session.activate("pinggy", "https://a.a.free.pinggy.link", process).await;

        assert!(session.deactivate().await);
        assert!(!pid_is_alive(pid));
        assert!(!session.is_active().await);
        assert_eq!(session.current_url().await, None);

        assert!(!session.deactivate().await);
        assert_eq!(session.state(), TunnelState::Deactivated);
    }

    #[tokio::test]
    async fn test_deactivate_url_ignores_stale_url() {
        let session = SessionState::new(GRACE);
        session.activate("serveo", "https://new.serveo.net", spawn_sleeper()).await;

        assert!(!session.deactivate_url("https://old.serveo.net").await);
        assert!(session.is_active().await);
        assert!(session.process_alive().await);

        assert!(session.deactivate_url("https://new.serveo.net").await);
    }

    #[tokio::test]
    async fn test_snapshot_follows_activation() {
        let session = SessionState::new(GRACE);
        let mut rx = session.subscribe();
        session.record_cycle();
        session.record_error("all providers exhausted");

        session.activate("cloudflared", "https://a.trycloudflare.com", spawn_sleeper()).await;
        assert!(rx.has_changed().unwrap());

        let info = rx.borrow_and_update().clone();
        assert_eq!(info.url(), Some("https://a.trycloudflare.com"));
        assert_eq!(info.cycles, 1);
        assert!(info.last_error.is_none());
        assert!(info.activated_at.is_some());

        session.deactivate().await;
        assert!(session.snapshot().activated_at.is_none());
    }
}
