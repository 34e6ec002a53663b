//! Long-running orchestration.
//!
//! The supervisor owns two tasks:
//!
//! - the reconnection loop, which runs failover cycles until one succeeds,
//!   cools down after total failure, and waits for reconnect requests while
//!   a tunnel is active;
//! - the health monitor, spawned separately so a slow attempt never delays
//!   health detection. It deactivates a failed session and asks the loop
//!   for a new cycle over a channel of capacity one.
//!
//! Only the reconnection loop ever runs a cycle, so at most one cycle is in
//! flight at any time.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use tunnelkeeper_core::TunnelState;

use crate::context::TunnelContext;
use crate::pipeline::{CycleOutcome, FailoverPipeline};
use crate::probe::verify;
use crate::retry::CycleState;
use crate::session::SessionState;

// ============================================================================
// Reconnect Reason
// ============================================================================

/// Why the health monitor asked for a new cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectReason {
    /// The public URL stopped answering 200.
    HealthCheckFailed {
        /// The URL that failed.
        url: String,
        /// Probe status or transport error.
        reason: String,
    },
    /// The provider process exited on its own.
    ProcessExited {
        /// The URL it was serving.
        url: String,
    },
}

impl fmt::Display for ReconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HealthCheckFailed { url, reason } => {
                write!(f, "health check of {url} failed: {reason}")
            }
            Self::ProcessExited { url } => write!(f, "tunnel process for {url} exited"),
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Keeps a verified tunnel published until shutdown.
pub struct Supervisor {
    ctx: Arc<TunnelContext>,
    pipeline: Arc<FailoverPipeline>,
    session: Arc<SessionState>,
    cycles: AtomicU64,
}

impl Supervisor {
    /// Creates a supervisor with a fresh, inactive session.
    pub fn new(ctx: Arc<TunnelContext>, pipeline: FailoverPipeline) -> Self {
        let session = Arc::new(SessionState::new(ctx.settings.terminate_grace));
        Self {
            ctx,
            pipeline: Arc::new(pipeline),
            session,
            cycles: AtomicU64::new(0),
        }
    }

    /// The shared session.
    pub fn session(&self) -> Arc<SessionState> {
        Arc::clone(&self.session)
    }

    /// The context.
    pub fn context(&self) -> &TunnelContext {
        &self.ctx
    }

    /// Number of failover cycles started by [`Supervisor::run`].
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Runs a single cycle and leaves the result in the session.
    pub async fn run_once(&self) -> CycleOutcome {
        self.session.record_cycle();
        self.pipeline
            .run_cycle(&self.ctx, &self.session, &mut CycleState::new())
            .await
    }

    /// Runs until `shutdown` turns true (or its sender is dropped).
    ///
    /// On shutdown the in-flight attempt is dropped, which kills its child,
    /// and the active tunnel process is terminated.
    #[instrument(skip_all)]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let (reconnect_tx, mut reconnect_rx) = mpsc::channel(1);

        let monitor = tokio::spawn(health_monitor(
            Arc::clone(&self.ctx),
            Arc::clone(&self.session),
            reconnect_tx.clone(),
        ));

        info!(
            local = %self.ctx.target(),
            providers = ?self.pipeline.provider_ids(),
            "Supervisor started"
        );

        tokio::select! {
            () = self.reconnection_loop(&mut reconnect_rx) => {}
            () = wait_for_shutdown(&mut shutdown) => info!("Shutdown requested"),
        }

        monitor.abort();
        drop(reconnect_tx);

        self.session.deactivate().await;
        self.session.set_state(TunnelState::Stopped);
        info!(cycles = self.cycles_started(), "Supervisor stopped");
    }

    async fn reconnection_loop(&self, reconnect: &mut mpsc::Receiver<ReconnectReason>) {
        let mut cycle = CycleState::new();
        let settings = &self.ctx.settings;

        loop {
            self.wait_for_local().await;

            self.cycles.fetch_add(1, Ordering::SeqCst);
            self.session.record_cycle();

            let outcome = self
                .pipeline
                .run_cycle(&self.ctx, &self.session, &mut cycle)
                .await;

            match outcome.result {
                Ok(activation) => {
                    info!(
                        provider = %activation.provider_id,
                        url = %activation.url,
                        attempts = outcome.attempts.len(),
                        "Cycle succeeded"
                    );

                    match reconnect.recv().await {
                        Some(reason) => info!(reason = %reason, "Reconnecting"),
                        None => return,
                    }
                }
                Err(e) => {
                    let cooldown = settings.retry.cooldown;
                    warn!(error = %e, cooldown = ?cooldown, "Cycle failed, cooling down");
                    self.session.record_error(e.to_string());

                    let until = cooldown_deadline(Utc::now(), cooldown);
                    self.session.set_state(TunnelState::CoolingDown { until });
                    tokio::time::sleep(cooldown).await;
                }
            }
        }
    }

    /// Blocks until the local service answers its health path.
    async fn wait_for_local(&self) {
        let settings = &self.ctx.settings;
        if !settings.require_local_health {
            return;
        }

        let url = settings.local_health_url();
        let mut waiting = false;

        loop {
            let result = self.ctx.probe.check(&url).await;
            if result.success {
                if waiting {
                    info!(url = %url, "Local service is healthy");
                }
                return;
            }

            if !waiting {
                warn!(
                    url = %url,
                    reason = %result.failure_reason(),
                    "Local service not healthy, waiting"
                );
                self.session.set_state(TunnelState::WaitingForLocal);
                waiting = true;
            }

            tokio::time::sleep(settings.local_wait).await;
        }
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("providers", &self.pipeline.provider_ids())
            .field("cycles", &self.cycles_started())
            .finish_non_exhaustive()
    }
}

/// End of a cooldown starting at `now`, saturating at the latest
/// representable time.
fn cooldown_deadline(now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(cooldown)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a shutdown request.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

// ============================================================================
// Health Monitor
// ============================================================================

/// Re-probes the active URL on every tick.
///
/// On failure the session is deactivated first; only the tick that
/// actually deactivated it sends a reconnect request.
async fn health_monitor(
    ctx: Arc<TunnelContext>,
    session: Arc<SessionState>,
    reconnect: mpsc::Sender<ReconnectReason>,
) {
    let settings = &ctx.settings;
    let mut ticker = tokio::time::interval(settings.health_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let Some(url) = session.current_url().await else {
            continue;
        };

        let failure = if session.process_alive().await {
            let result = verify(ctx.probe.as_ref(), &url, &settings.health_path).await;
            if result.success {
                debug!(url = %url, response_time_ms = result.response_time_ms, "Tunnel healthy");
                None
            } else {
                Some(ReconnectReason::HealthCheckFailed {
                    url: url.clone(),
                    reason: result.failure_reason(),
                })
            }
        } else {
            Some(ReconnectReason::ProcessExited { url: url.clone() })
        };

        let Some(reason) = failure else {
            continue;
        };

        warn!(reason = %reason, "Active tunnel failed");
        session.record_error(reason.to_string());

        if session.deactivate_url(&url).await && reconnect.try_send(reason).is_err() {
            debug!("Reconnect already pending");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::context::TunnelSettings;
    use crate::host::process::pid_is_alive;
    use crate::provider::TunnelProvider;
    use crate::test_support::{ScriptedProbe, ScriptedProvider, ShellProvider, test_settings, wait_until};

    fn supervisor(
        providers: Vec<Arc<dyn TunnelProvider>>,
        probe: Arc<ScriptedProbe>,
        configure: impl FnOnce(&mut TunnelSettings),
    ) -> Arc<Supervisor> {
        let mut settings = test_settings(5);
        configure(&mut settings);
        let ctx = TunnelContext::builder().probe(probe).settings(settings).build();
        Arc::new(Supervisor::new(Arc::new(ctx), FailoverPipeline::new(providers)))
    }

    fn start(sup: &Arc<Supervisor>) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = watch::channel(false);
        let sup = Arc::clone(sup);
        let handle = tokio::spawn(async move { sup.run(rx).await });
        (tx, handle)
    }

    fn serving(session: &SessionState, url: &str) -> bool {
        session.snapshot().url() == Some(url)
    }

    #[tokio::test]
    async fn test_failed_health_check_runs_exactly_one_new_cycle() {
        let a = Arc::new(ScriptedProvider::urls("a", ["https://x.example", "https://y.example"]));
        let probe = Arc::new(ScriptedProbe::healthy([
            "https://x.example/health",
            "https://y.example/health",
        ]));
        let sup = supervisor(vec![a.clone() as Arc<dyn TunnelProvider>], probe.clone(), |s| {
            s.health_interval = Duration::from_millis(50);
        });
        let session = sup.session();
        let (shutdown, handle) = start(&sup);

        assert!(wait_until(|| serving(&session, "https://x.example")).await);
        assert_eq!(sup.cycles_started(), 1);
        let first_pid = session.active_pid().await.unwrap();

        probe.set_healthy("https://x.example/health", false);

        assert!(wait_until(|| serving(&session, "https://y.example")).await);
        // Several more monitor ticks pass without another cycle.
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(sup.cycles_started(), 2);
        assert_eq!(a.calls(), 2);
        assert!(!pid_is_alive(first_pid));

        shutdown.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(session.state(), TunnelState::Stopped);
        assert!(!session.is_active().await);
    }

    #[tokio::test]
    async fn test_dead_process_triggers_reconnect() {
        let a = Arc::new(ScriptedProvider::urls("a", ["https://x.example", "https://y.example"]));
        let probe = Arc::new(ScriptedProbe::healthy([
            "https://x.example/health",
            "https://y.example/health",
        ]));
        let sup = supervisor(vec![a.clone() as Arc<dyn TunnelProvider>], probe, |s| {
            s.health_interval = Duration::from_millis(50);
        });
        let session = sup.session();
        let (shutdown, handle) = start(&sup);

        assert!(wait_until(|| serving(&session, "https://x.example")).await);
        let pid = session.active_pid().await.unwrap();
        std::process::Command::new("kill")
            .args(["-KILL", &pid.to_string()])
            .status()
            .unwrap();

        assert!(wait_until(|| serving(&session, "https://y.example")).await);

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_total_failure_cools_down_and_retries() {
        let a = Arc::new(ScriptedProvider::always_fail("a"));
        let sup = supervisor(
            vec![a.clone() as Arc<dyn TunnelProvider>],
            Arc::new(ScriptedProbe::new()),
            |s| {
                s.retry.max_attempts = 2;
                s.retry.cooldown = Duration::from_millis(200);
            },
        );
        let session = sup.session();
        let (shutdown, handle) = start(&sup);

        assert!(
            wait_until(|| matches!(session.state(), TunnelState::CoolingDown { .. })).await
        );
        assert!(wait_until(|| sup.cycles_started() >= 3).await);

        shutdown.send(true).unwrap();
        handle.await.unwrap();

        // Every cycle starts from zero, so each one spends the full bound.
        let cycles = u32::try_from(sup.cycles_started()).unwrap();
        assert!(a.calls() >= 2 * (cycles - 1));
        assert!(a.calls() <= 2 * cycles);
        assert!(session.snapshot().last_error.is_some());
    }

    #[test]
    fn test_cooldown_deadline_saturates() {
        let now = Utc::now();
        assert_eq!(
            cooldown_deadline(now, Duration::from_secs(300)),
            now + chrono::Duration::seconds(300)
        );
        assert_eq!(
            cooldown_deadline(now, Duration::from_secs(10_000_000_000_000)),
            DateTime::<Utc>::MAX_UTC
        );
        assert_eq!(cooldown_deadline(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_huge_cooldown_keeps_supervisor_alive() {
        let a = Arc::new(ScriptedProvider::always_fail("a"));
        let sup = supervisor(
            vec![a.clone() as Arc<dyn TunnelProvider>],
            Arc::new(ScriptedProbe::new()),
            |s| {
                s.retry.max_attempts = 1;
                s.retry.cooldown = Duration::from_secs(10_000_000_000_000);
            },
        );
        let session = sup.session();
        let (shutdown, handle) = start(&sup);

        assert!(
            wait_until(|| matches!(session.state(), TunnelState::CoolingDown { .. })).await
        );
        assert!(!handle.is_finished());

        shutdown.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(session.state(), TunnelState::Stopped);
    }

    #[tokio::test]
    async fn test_waits_for_local_service() {
        let a = Arc::new(ScriptedProvider::urls("a", ["https://x.example"]));
        let probe = Arc::new(ScriptedProbe::healthy(["https://x.example/health"]));
        let sup = supervisor(vec![a.clone() as Arc<dyn TunnelProvider>], probe.clone(), |s| {
            s.require_local_health = true;
            s.local_wait = Duration::from_millis(20);
        });
        let session = sup.session();
        let (shutdown, handle) = start(&sup);

        assert!(wait_until(|| session.state() == TunnelState::WaitingForLocal).await);
        assert_eq!(a.calls(), 0);

        probe.set_healthy("http://127.0.0.1:5000/health", true);
        assert!(wait_until(|| serving(&session, "https://x.example")).await);

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_attempt() {
        let slow = Arc::new(
            ShellProvider::new("exec sleep 30", r"https://never\.example\.test")
                .with_timeout(Duration::from_secs(30)),
        );
        let sup = supervisor(
            vec![slow.clone() as Arc<dyn TunnelProvider>],
            Arc::new(ScriptedProbe::new()),
            |_| {},
        );
        let session = sup.session();
        let (shutdown, handle) = start(&sup);

        assert!(wait_until(|| slow.last_pid().is_some()).await);
        let pid = slow.last_pid().unwrap();
        assert!(matches!(session.state(), TunnelState::Attempting { .. }));

        shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(wait_until(|| !pid_is_alive(pid)).await);
        assert_eq!(session.state(), TunnelState::Stopped);
    }
}
