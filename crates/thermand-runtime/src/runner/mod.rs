//! Autonomous run-loop managers.
//!
//! A runner owns one root [`Process`](thermand_process::Process) and
//! drives it at the cadence the process reports:
//!
//! 1. `initialize(now)` the root at start.
//! 2. Compute `t = root.next_run_at()`.
//! 3. Wait until `t` (or be signalled to stop).
//! 4. `run` the root with an empty state map; a fatal error halts the
//!    runner with one structured log line.
//! 5. Repeat.
//!
//! Two variants share that loop shape but differ in how time passes:
//!
//! | Runner | Clock | Waiting |
//! |--------|-------|---------|
//! | [`StandardRunner`] | OS monotonic (injectable) | real, interruptible sleep in a background thread |
//! | [`FastRunner`] | simulated from 0 | clock jumps to `t` instantly, single-threaded |
//!
//! Before entering its loop a runner installs its clock into the
//! thread-local slot ([`thermand_types::time`]), so every process it
//! executes reads the runner's notion of time.

mod fast;
mod standard;

pub use fast::FastRunner;
pub use standard::StandardRunner;

use serde::{Deserialize, Serialize};
use thermand_process::ProcessError;
use thermand_types::ErrorCode;
use thiserror::Error;

/// Runner lifecycle state.
///
/// ```text
/// created ──start()──▶ running ──stop()──▶ stopping ──loop exit──▶ stopped
/// ```
///
/// `start` on anything but `created` is an error; `stop` on `stopped`
/// is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    /// Built, not yet started.
    #[default]
    Created,

    /// Execution loop is live.
    Running,

    /// Stop requested; the loop will exit after any in-flight tick.
    Stopping,

    /// Execution loop has exited.
    Stopped,
}

impl std::fmt::Display for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Runner lifecycle and execution errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunnerError {
    /// `start` was called outside the `created` state.
    #[error("runner cannot start from state '{0}'")]
    AlreadyStarted(RunnerState),

    /// The root process returned a fatal error and the runner halted.
    #[error("root process halted: {0}")]
    Halted(#[from] ProcessError),
}

impl ErrorCode for RunnerError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyStarted(_) => "RUNNER_ALREADY_STARTED",
            Self::Halted(_) => "RUNNER_HALTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
