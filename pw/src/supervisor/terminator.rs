//! Signal delivery to a worker that outlived its deadline

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill, killpg};
use nix::unistd::Pid;
use tracing::debug;

/// Delivers the termination signal to a timed-out worker
pub trait Terminator: Send + Sync {
    fn terminate(&self, pid: Pid, signal: Signal) -> nix::Result<()>;

    /// Kill whatever is left of the worker's process group once the leader is reaped
    fn sweep(&self, _pid: Pid) -> nix::Result<()> {
        Ok(())
    }
}

/// Sends real signals with `kill(2)` or `killpg(2)`
#[derive(Debug, Clone, Copy)]
pub struct SignalTerminator {
    /// Signal the worker's whole process group (the worker leads its own group)
    pub process_group: bool,
}

impl Default for SignalTerminator {
    fn default() -> Self {
        Self { process_group: true }
    }
}

impl Terminator for SignalTerminator {
    fn terminate(&self, pid: Pid, signal: Signal) -> nix::Result<()> {
        debug!(%pid, %signal, process_group = self.process_group, "SignalTerminator::terminate: called");
        let result = if self.process_group {
            killpg(pid, signal)
        } else {
            kill(pid, signal)
        };

        match result {
            // Worker exited between the deadline and the signal
            Err(Errno::ESRCH) => {
                debug!(%pid, "SignalTerminator::terminate: no such process");
                Ok(())
            }
            other => other,
        }
    }

    fn sweep(&self, pid: Pid) -> nix::Result<()> {
        // A reaped pid may be reused, but a live group keeps its id reserved
        if !self.process_group {
            return Ok(());
        }
        debug!(%pid, "SignalTerminator::sweep: called");
        match killpg(pid, Signal::SIGKILL) {
            Err(Errno::ESRCH) => Ok(()),
            other => other,
        }
    }
}
