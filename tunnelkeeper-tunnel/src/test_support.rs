//! Scripted probes and providers for unit tests.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use tunnelkeeper_core::LocalTarget;

use crate::context::{TunnelContext, TunnelSettings};
use crate::error::AttemptError;
use crate::host::process::{CommandSpec, ProcessRunner, TunnelProcess};
use crate::host::publish::MemoryPublisher;
use crate::probe::{HealthProbe, ProbeResult};
use crate::provider::{Candidate, TunnelProvider};
use crate::retry::RetryPolicy;

static EXAMPLE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[a-z0-9-]+\.example").unwrap());

// ============================================================================
// Probe
// ============================================================================

/// Probe answering 200 for a configurable set of URLs.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProbe {
    healthy: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedProbe {
    /// Every URL is unhealthy.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn healthy<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let probe = Self::new();
        probe
            .healthy
            .lock()
            .unwrap()
            .extend(urls.into_iter().map(Into::into));
        probe
    }

    pub(crate) fn set_healthy(&self, url: &str, healthy: bool) {
        let mut set = self.healthy.lock().unwrap();
        if healthy {
            set.insert(url.to_string());
        } else {
            set.remove(url);
        }
    }

    pub(crate) fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn check(&self, url: &str) -> ProbeResult {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        if self.healthy.lock().unwrap().contains(url) {
            ProbeResult::ok(200, Duration::ZERO)
        } else {
            ProbeResult::ok(502, Duration::ZERO)
        }
    }
}

// ============================================================================
// Scripted Provider
// ============================================================================

#[derive(Debug)]
enum Script {
    AlwaysFail,
    SucceedOn(u32, String),
    Urls(Vec<String>),
    SpawnError,
}

/// Provider whose attempts follow a script. Successful attempts are backed
/// by a real `sleep` process so teardown can be observed.
#[derive(Debug)]
pub(crate) struct ScriptedProvider {
    id: String,
    script: Script,
    installed: bool,
    max_attempts: Option<u32>,
    calls: AtomicU32,
    pids: Mutex<Vec<u32>>,
}

impl ScriptedProvider {
    fn with_script(id: &str, script: Script) -> Self {
        Self {
            id: id.to_string(),
            script,
            installed: true,
            max_attempts: None,
            calls: AtomicU32::new(0),
            pids: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always_fail(id: &str) -> Self {
        Self::with_script(id, Script::AlwaysFail)
    }

    /// Fails until attempt `n`, which yields `url`.
    pub(crate) fn succeed_on(id: &str, n: u32, url: &str) -> Self {
        Self::with_script(id, Script::SucceedOn(n, url.to_string()))
    }

    /// Yields the next URL on every call; fails once they run out.
    pub(crate) fn urls<const N: usize>(id: &str, urls: [&str; N]) -> Self {
        Self::with_script(id, Script::Urls(urls.iter().map(ToString::to_string).collect()))
    }

    pub(crate) fn not_installed(id: &str) -> Self {
        Self {
            installed: false,
            ..Self::always_fail(id)
        }
    }

    pub(crate) fn spawn_error(id: &str) -> Self {
        Self::with_script(id, Script::SpawnError)
    }

    pub(crate) fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Pids of every process handed out, oldest first.
    pub(crate) fn pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }

    fn url_for(&self, call: u32) -> Result<Option<String>, AttemptError> {
        match &self.script {
            Script::AlwaysFail => Ok(None),
            Script::SucceedOn(n, url) => Ok((call >= *n).then(|| url.clone())),
            Script::Urls(urls) => Ok(urls.get(call as usize - 1).cloned()),
            Script::SpawnError => Err(AttemptError::ProcessSpawn(std::io::Error::other(
                "fork failed",
            ))),
        }
    }
}

#[async_trait]
impl TunnelProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn command(&self, _target: &LocalTarget) -> CommandSpec {
        CommandSpec::new("sleep").arg("30")
    }

    fn url_pattern(&self) -> &Regex {
        &EXAMPLE_URL
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    async fn is_available(&self, _ctx: &TunnelContext) -> bool {
        self.installed
    }

    async fn connect(&self, ctx: &TunnelContext) -> Result<Candidate, AttemptError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(url) = self.url_for(call)? else {
            return Err(AttemptError::ConnectTimeout(self.connect_timeout()));
        };

        let (process, _output) = ctx
            .process
            .spawn_streaming(&self.command(ctx.target()))?;
        if let Some(pid) = process.pid() {
            self.pids.lock().unwrap().push(pid);
        }
        Ok(Candidate::new(&self.id, url, process))
    }
}

// ============================================================================
// Shell Provider
// ============================================================================

/// Provider running an `sh -c` script through the real attempt runner.
#[derive(Debug)]
pub(crate) struct ShellProvider {
    script: String,
    pattern: Regex,
    program: String,
    timeout: Duration,
    pid_file: NamedTempFile,
}

impl ShellProvider {
    pub(crate) fn new(script: &str, pattern: &str) -> Self {
        Self {
            script: script.to_string(),
            pattern: Regex::new(pattern).unwrap(),
            program: "sh".to_string(),
            timeout: Duration::from_secs(5),
            pid_file: NamedTempFile::new().unwrap(),
        }
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// Pid of the most recently started script.
    pub(crate) fn last_pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.pid_file.path())
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    fn pid_path(&self) -> PathBuf {
        self.pid_file.path().to_path_buf()
    }
}

#[async_trait]
impl TunnelProvider for ShellProvider {
    fn id(&self) -> &str {
        "shell"
    }

    fn command(&self, _target: &LocalTarget) -> CommandSpec {
        let script = format!("echo $$ > '{}'; {}", self.pid_path().display(), self.script);
        CommandSpec::new(&self.program).args(["-c", script.as_str()])
    }

    fn url_pattern(&self) -> &Regex {
        &self.pattern
    }

    fn connect_timeout(&self) -> Duration {
        self.timeout
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Spawns a child that stays alive until terminated.
pub(crate) fn spawn_sleeper() -> TunnelProcess {
    let (process, _output) = ProcessRunner::new()
        .spawn_streaming(&CommandSpec::new("sleep").arg("30"))
        .unwrap();
    process
}

/// Settings with every delay removed and no local gate.
pub(crate) fn test_settings(max_attempts: u32) -> TunnelSettings {
    TunnelSettings {
        retry: RetryPolicy::new(max_attempts)
            .with_delay(Duration::ZERO)
            .with_cooldown(Duration::from_secs(30)),
        verify_delay: Duration::ZERO,
        terminate_grace: Duration::from_secs(1),
        require_local_health: false,
        local_wait: Duration::from_millis(20),
        ..TunnelSettings::default()
    }
}

/// Context around `probe` that records published URLs in memory.
pub(crate) fn test_context(
    probe: Arc<ScriptedProbe>,
    max_attempts: u32,
) -> (TunnelContext, Arc<MemoryPublisher>) {
    let publisher = Arc::new(MemoryPublisher::new());
    let ctx = TunnelContext::builder()
        .probe(probe)
        .publisher(publisher.clone())
        .settings(test_settings(max_attempts))
        .build();
    (ctx, publisher)
}

/// Polls `condition` every 10ms for up to five seconds.
pub(crate) fn wait_until<F>(mut condition: F) -> impl Future<Output = bool>
where
    F: FnMut() -> bool,
{
    async move {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }
}
