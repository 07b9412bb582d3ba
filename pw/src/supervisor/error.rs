//! Supervisor error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from a supervised run
///
/// A deadline expiry is not an error: it is reported through
/// [`RunOutcome::completed_normally`](super::RunOutcome).
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker started without a process id")]
    MissingPid,

    #[error("Failed waiting for worker: {0}")]
    Wait(#[source] std::io::Error),
}
