//! Subprocess execution for tunnel provider binaries.
//!
//! Tunnel providers are long-running children (`ssh`, `cloudflared`, `lt`)
//! whose combined stdout/stderr is consumed as a stream of text lines.
//! This module spawns them, forwards their output, and tears them down.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace, warn};

use crate::error::ProcessError;

/// Lines buffered between the reader tasks and the consumer.
const LINE_BUFFER: usize = 256;

/// Default time a child gets to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(3);

// ============================================================================
// Command Spec
// ============================================================================

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Renders the command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Tunnel Process
// ============================================================================

/// Handle to a running provider child process.
///
/// The child is spawned with `kill_on_drop`, so dropping the handle never
/// leaves the process behind. Prefer [`TunnelProcess::terminate`] for a
/// graceful stop.
#[derive(Debug)]
pub struct TunnelProcess {
    child: Child,
    pid: Option<u32>,
    program: String,
}

impl TunnelProcess {
    /// Returns the OS process id.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns `Some(code)` once the child has exited (reaping it), `None`
    /// while it is still running.
    pub fn exit_status(&mut self) -> Option<Option<i32>> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code()),
            Ok(None) => None,
            Err(e) => {
                warn!(program = %self.program, error = %e, "Failed to poll child status");
                Some(None)
            }
        }
    }

    /// Returns true while the child has not exited.
    pub fn is_running(&mut self) -> bool {
        self.exit_status().is_none()
    }

    /// Stops the child: SIGTERM, then SIGKILL if it outlives `grace`.
    ///
    /// Idempotent; a child that already exited is only reaped.
    #[instrument(skip(self), fields(program = %self.program, pid = ?self.pid))]
    pub async fn terminate(&mut self, grace: Duration) {
        if !self.is_running() {
            debug!("Process already exited");
            return;
        }

        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                send_sigterm(pid).await;
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(status = %status, "Process terminated"),
            Ok(Err(e)) => warn!(error = %e, "Failed waiting for process"),
            Err(_) => {
                warn!(grace = ?grace, "Process ignored SIGTERM, killing");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "Failed to kill process");
                }
            }
        }
    }
}

#[cfg(unix)]
async fn send_sigterm(pid: u32) {
    let result = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => trace!(pid, "Sent SIGTERM"),
        Ok(_) => debug!(pid, "kill -TERM returned non-zero"),
        Err(e) => debug!(pid, error = %e, "Failed to run kill"),
    }
}

/// Returns `true` when a process with `pid` appears alive on this platform.
pub fn pid_is_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        if pid == 0 {
            return false;
        }

        let proc_dir = PathBuf::from("/proc");
        if proc_dir.exists() {
            // A zombie has exited but not been reaped yet.
            return std::fs::read_to_string(proc_dir.join(pid.to_string()).join("stat"))
                .ok()
                .and_then(|stat| {
                    stat.rsplit_once(')')
                        .and_then(|(_, rest)| rest.trim_start().chars().next())
                })
                .is_some_and(|state| state != 'Z' && state != 'X');
        }

        std::process::Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        pid == std::process::id()
    }
}

// ============================================================================
// Output Stream
// ============================================================================

/// Combined stdout/stderr of a child, one cleaned line at a time.
///
/// Yields `None` once both pipes have closed.
#[derive(Debug)]
pub struct OutputStream {
    rx: mpsc::Receiver<String>,
}

impl OutputStream {
    /// Receives the next line.
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Creates a stream fed by the given receiver.
    pub fn from_receiver(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }
}

/// Strips ANSI escapes and trailing line terminators.
pub fn clean_line(raw: &str) -> String {
    strip_ansi_escapes::strip_str(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Forwards lines from one pipe into the channel.
///
/// Once the consumer goes away the pipe keeps being drained, so a
/// long-running child never blocks on a full pipe.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>, program: String)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut forwarding = true;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = clean_line(&String::from_utf8_lossy(&buf));
                trace!(program = %program, line = %line, "child output");
                if forwarding && tx.send(line).await.is_err() {
                    forwarding = false;
                }
            }
            Err(e) => {
                debug!(program = %program, error = %e, "Child pipe read failed");
                break;
            }
        }
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// API for launching provider processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Spawns `spec` with stdout and stderr merged into one line stream.
    #[instrument(skip(self), fields(cmd = %spec.program))]
    pub fn spawn_streaming(
        &self,
        spec: &CommandSpec,
    ) -> Result<(TunnelProcess, OutputStream), ProcessError> {
        let cmd_path = self.which(&spec.program).ok_or_else(|| {
            warn!(cmd = %spec.program, "Command not found");
            ProcessError::NotFound(spec.program.clone())
        })?;

        debug!(command = %spec.display(), "Spawning provider process");

        let mut command = Command::new(&cmd_path);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(ProcessError::Spawn)?;
        let pid = child.id();

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone(), spec.program.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx, spec.program.clone()));
        }

        debug!(pid = ?pid, "Provider process started");

        Ok((
            TunnelProcess {
                child,
                pid,
                program: spec.program.clone(),
            },
            OutputStream::from_receiver(rx),
        ))
    }

    /// Check if a command exists on PATH.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Find the path to a command.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        let runner = ProcessRunner::new();

        assert!(runner.command_exists("sh"));
        assert!(!runner.command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_command_spec_display() {
        let spec = CommandSpec::new("ssh")
            .args(["-R", "80:127.0.0.1:5000"])
            .arg("serveo.net");
        assert_eq!(spec.display(), "ssh -R 80:127.0.0.1:5000 serveo.net");
    }

    #[test]
    fn test_clean_line_strips_ansi() {
        assert_eq!(clean_line("\x1b[32mhttps://a.loca.lt\x1b[0m\r\n"), "https://a.loca.lt");
    }

    #[test]
    fn test_spawn_not_found() {
        let runner = ProcessRunner::new();
        let result = runner.spawn_streaming(&CommandSpec::new("not_a_real_command_xyz"));
        assert!(matches!(result, Err(ProcessError::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_and_stderr_are_merged() {
        let runner = ProcessRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err 1>&2"]);
        let (mut process, mut output) = runner.spawn_streaming(&spec).unwrap();

        let mut lines = Vec::new();
        while let Some(line) = output.next_line().await {
            lines.push(line);
        }
        lines.sort();

        assert_eq!(lines, vec!["err".to_string(), "out".to_string()]);
        process.terminate(DEFAULT_TERMINATE_GRACE).await;
        assert!(!process.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_stops_long_running_child() {
        let runner = ProcessRunner::new();
        let (mut process, _output) = runner
            .spawn_streaming(&CommandSpec::new("sleep").arg("30"))
            .unwrap();
        let pid = process.pid().unwrap();

        assert!(process.is_running());
        process.terminate(Duration::from_secs(2)).await;

        assert!(!process.is_running());
        assert!(!pid_is_alive(pid));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_escalates_when_sigterm_ignored() {
        let runner = ProcessRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "trap '' TERM; while true; do sleep 1; done"]);
        let (mut process, _output) = runner.spawn_streaming(&spec).unwrap();

        // Give the shell a moment to install the trap.
        tokio::time::sleep(Duration::from_millis(200)).await;
        process.terminate(Duration::from_millis(300)).await;

        assert!(!process.is_running());
    }
}
