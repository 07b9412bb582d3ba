//! Supervised execution of the external planner
//!
//! The worker process races a deadline. If the worker exits first the
//! deadline is dropped; otherwise the termination signal is delivered and
//! the worker is still awaited, so no zombie is left behind. Either way
//! `run` returns only after the worker has been reaped.

mod error;
mod terminator;

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

pub use error::SupervisorError;
pub use terminator::{SignalTerminator, Terminator};

/// Default wait after the termination signal before escalating to SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// One program invocation under a deadline
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub signal: Signal,
    /// How long to wait after `signal` before sending SIGKILL
    pub kill_grace: Duration,
    /// Discard the worker's stdout and stderr
    pub quiet: bool,
}

impl RunRequest {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration, signal: Signal) -> Self {
        Self {
            program: program.into(),
            args,
            current_dir: None,
            timeout,
            signal,
            kill_grace: DEFAULT_KILL_GRACE,
            quiet: false,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// How a supervised run ended
#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    /// The worker exited before the deadline
    pub completed_normally: bool,
    /// Exit status of the reaped worker
    pub status: ExitStatus,
    pub pid: u32,
    pub elapsed: Duration,
}

/// Runs workers against a deadline
#[derive(Clone)]
pub struct Supervisor {
    terminator: Arc<dyn Terminator>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor").finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Supervisor that signals the worker's process group
    pub fn new() -> Self {
        Self::with_terminator(Arc::new(SignalTerminator::default()))
    }

    pub fn with_terminator(terminator: Arc<dyn Terminator>) -> Self {
        Self { terminator }
    }

    /// Run the worker, terminating it if the deadline elapses first
    ///
    /// Blocks for at most `timeout` plus the termination latency: after
    /// the deadline the configured signal is sent, then SIGKILL once
    /// `kill_grace` has passed.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, SupervisorError> {
        debug!(?request, "Supervisor::run: called");
        let start = Instant::now();

        // The worker leads its own process group so the signal reaches its children
        let mut std_command = std::process::Command::new(&request.program);
        std_command.args(&request.args).stdin(Stdio::null()).process_group(0);
        if let Some(dir) = &request.current_dir {
            std_command.current_dir(dir);
        }
        if request.quiet {
            std_command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        let mut command = Command::from(std_command);
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| {
            debug!(error = %source, "Supervisor::run: spawn failed");
            SupervisorError::Launch {
                program: request.program.clone(),
                source,
            }
        })?;
        let pid = child.id().ok_or(SupervisorError::MissingPid)?;
        info!(pid, timeout_ms = request.timeout.as_millis() as u64, "Worker started");

        let (completed_normally, status) = tokio::select! {
            biased;

            status = child.wait() => {
                let status = status.map_err(SupervisorError::Wait)?;
                debug!(pid, ?status, "Supervisor::run: worker finished before deadline");
                (true, status)
            }

            _ = tokio::time::sleep(request.timeout) => {
                warn!(pid, signal = %request.signal, "Timeout reached, terminating worker");
                let status = self.terminate(&mut child, pid, request).await?;
                (false, status)
            }
        };

        let elapsed = start.elapsed();
        if completed_normally && !status.success() {
            warn!(pid, ?status, "Worker exited unsuccessfully");
        }
        info!(pid, completed_normally, elapsed_ms = elapsed.as_millis() as u64, "Worker reaped");
        Ok(RunOutcome {
            completed_normally,
            status,
            pid,
            elapsed,
        })
    }

    /// Signal a worker past its deadline and reap it
    ///
    /// A failed delivery falls back to killing the worker directly; the run
    /// still ends as a timeout.
    async fn terminate(&self, child: &mut Child, pid: u32, request: &RunRequest) -> Result<ExitStatus, SupervisorError> {
        debug!(pid, "Supervisor::terminate: called");
        let target = Pid::from_raw(pid as i32);

        let status = if let Err(e) = self.terminator.terminate(target, request.signal) {
            warn!(pid, signal = %request.signal, error = %e, "Failed to signal worker, killing directly");
            if let Err(e) = child.start_kill() {
                debug!(pid, error = %e, "Supervisor::terminate: direct kill failed");
            }
            child.wait().await.map_err(SupervisorError::Wait)?
        } else if request.signal == Signal::SIGKILL {
            child.wait().await.map_err(SupervisorError::Wait)?
        } else {
            match tokio::time::timeout(request.kill_grace, child.wait()).await {
                Ok(status) => {
                    debug!(pid, "Supervisor::terminate: worker exited after signal");
                    status.map_err(SupervisorError::Wait)?
                }
                Err(_) => {
                    warn!(pid, signal = %request.signal, "Worker ignored signal, sending SIGKILL");
                    if let Err(e) = self.terminator.terminate(target, Signal::SIGKILL) {
                        debug!(pid, error = %e, "Supervisor::terminate: SIGKILL via terminator failed");
                        child.start_kill().map_err(SupervisorError::Wait)?;
                    }
                    child.wait().await.map_err(SupervisorError::Wait)?
                }
            }
        };

        // The leader is gone but its children may have ignored the signal
        if let Err(e) = self.terminator.sweep(target) {
            warn!(pid, error = %e, "Failed to kill remaining workers in process group");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every delivery, then forwards to real signals
    #[derive(Default)]
    struct RecordingTerminator {
        inner: SignalTerminator,
        sent: Mutex<Vec<(Pid, Signal)>>,
    }

    impl Terminator for RecordingTerminator {
        fn terminate(&self, pid: Pid, signal: Signal) -> nix::Result<()> {
            self.sent.lock().unwrap().push((pid, signal));
            self.inner.terminate(pid, signal)
        }

        fn sweep(&self, pid: Pid) -> nix::Result<()> {
            self.inner.sweep(pid)
        }
    }

    /// Refuses every delivery, as for a worker owned by another user
    struct DeniedTerminator;

    impl Terminator for DeniedTerminator {
        fn terminate(&self, _pid: Pid, _signal: Signal) -> nix::Result<()> {
            Err(nix::Error::EPERM)
        }
    }

    fn sh(script: &str, timeout: Duration, signal: Signal) -> RunRequest {
        RunRequest::new("/bin/sh", vec!["-c".to_string(), script.to_string()], timeout, signal)
    }

    fn process_exists(pid: u32) -> bool {
        nix::sys::signal::kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    /// Orphans are reaped by init, so a killed one may linger briefly as a zombie
    async fn wait_until_gone(pid: u32) -> bool {
        for _ in 0..40 {
            let zombie = std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .map(|stat| stat.rsplit_once(')').is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')))
                .unwrap_or(false);
            if !process_exists(pid) || zombie {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_worker_finishes_first() {
        let recorder = Arc::new(RecordingTerminator::default());
        let supervisor = Supervisor::with_terminator(recorder.clone());

        let outcome = supervisor
            .run(&sh("exit 0", Duration::from_secs(10), Signal::SIGKILL))
            .await
            .unwrap();

        assert!(outcome.completed_normally);
        assert!(outcome.status.success());
        assert!(outcome.elapsed < Duration::from_secs(10));
        assert!(recorder.sent.lock().unwrap().is_empty());
        assert!(!process_exists(outcome.pid));
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_completes_normally() {
        let outcome = Supervisor::new()
            .run(&sh("exit 3", Duration::from_secs(10), Signal::SIGKILL))
            .await
            .unwrap();

        assert!(outcome.completed_normally);
        assert_eq!(outcome.status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_timeout_signals_and_reaps_worker() {
        let recorder = Arc::new(RecordingTerminator::default());
        let supervisor = Supervisor::with_terminator(recorder.clone());

        let outcome = supervisor
            .run(&sh("sleep 30", Duration::from_millis(200), Signal::SIGKILL))
            .await
            .unwrap();

        assert!(!outcome.completed_normally);
        assert!(outcome.elapsed < Duration::from_secs(10));
        let sent = recorder.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![(Pid::from_raw(outcome.pid as i32), Signal::SIGKILL)]);
        assert!(!process_exists(outcome.pid), "worker must be reaped before run returns");
    }

    #[tokio::test]
    async fn test_timeout_with_custom_signal() {
        let recorder = Arc::new(RecordingTerminator::default());
        let supervisor = Supervisor::with_terminator(recorder.clone());

        let outcome = supervisor
            .run(&sh("sleep 30", Duration::from_millis(200), Signal::SIGTERM))
            .await
            .unwrap();

        assert!(!outcome.completed_normally);
        let sent = recorder.sent.lock().unwrap().clone();
        assert_eq!(sent.first().map(|(_, s)| *s), Some(Signal::SIGTERM));
        assert!(!process_exists(outcome.pid));
    }

    #[tokio::test]
    async fn test_ignored_signal_escalates_to_sigkill() {
        let recorder = Arc::new(RecordingTerminator::default());
        let supervisor = Supervisor::with_terminator(recorder.clone());
        let request = sh(
            "trap '' TERM; while true; do sleep 0.05; done",
            Duration::from_millis(200),
            Signal::SIGTERM,
        )
        .kill_grace(Duration::from_millis(300));

        let outcome = supervisor.run(&request).await.unwrap();

        assert!(!outcome.completed_normally);
        let signals: Vec<Signal> = recorder.sent.lock().unwrap().iter().map(|(_, s)| *s).collect();
        assert_eq!(signals, vec![Signal::SIGTERM, Signal::SIGKILL]);
        assert!(!process_exists(outcome.pid));
    }

    #[tokio::test]
    async fn test_launch_failure_is_distinct() {
        let request = RunRequest::new(
            "/nonexistent/planner/python",
            vec![],
            Duration::from_secs(1),
            Signal::SIGKILL,
        );

        let err = Supervisor::new().run(&request).await.unwrap_err();

        assert!(matches!(err, SupervisorError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_runs_in_current_dir() {
        let temp = tempfile::tempdir().unwrap();
        let request = sh("touch marker", Duration::from_secs(10), Signal::SIGKILL)
            .current_dir(temp.path())
            .quiet(true);

        let outcome = Supervisor::new().run(&request).await.unwrap();

        assert!(outcome.completed_normally);
        assert!(temp.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_timeout_kills_children_that_ignore_signal() {
        let temp = tempfile::tempdir().unwrap();
        let request = sh(
            "(trap '' TERM; sleep 30) & echo $! > child.pid; wait",
            Duration::from_millis(300),
            Signal::SIGTERM,
        )
        .current_dir(temp.path())
        .kill_grace(Duration::from_millis(500));

        let outcome = Supervisor::new().run(&request).await.unwrap();

        assert!(!outcome.completed_normally);
        assert!(!process_exists(outcome.pid));
        let child_pid: u32 = std::fs::read_to_string(temp.path().join("child.pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(wait_until_gone(child_pid).await, "planner child {child_pid} outlived the run");
    }

    #[tokio::test]
    async fn test_failed_signal_still_reports_timeout() {
        let supervisor = Supervisor::with_terminator(Arc::new(DeniedTerminator));

        let outcome = supervisor
            .run(&sh("sleep 30", Duration::from_millis(200), Signal::SIGTERM))
            .await
            .unwrap();

        assert!(!outcome.completed_normally);
        assert!(outcome.elapsed < Duration::from_secs(10));
        assert!(!process_exists(outcome.pid));
    }
}
