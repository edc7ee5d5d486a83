//! Process layer errors.
//!
//! # Error Policy
//!
//! The process layer distinguishes two severities, and everything in
//! the execution model hangs off that split:
//!
//! | Severity | Variants | Handling |
//! |----------|----------|----------|
//! | Operational | [`ExecutionFailed`](ProcessError::ExecutionFailed) | logged at the failing process, input passed through, the loop keeps ticking |
//! | Fatal | [`Permission`](ProcessError::Permission), [`TimeRegression`](ProcessError::TimeRegression) | propagates through pipelines and systems to the runner, which halts |
//!
//! Operational failures are facts of life against hardware: a read
//! glitches, a computation divides by a stale zero. Thermal control
//! must continue. Fatal errors are programming mistakes; continuing
//! would mask them.

use thermand_types::ErrorCode;
use thiserror::Error;

use crate::PermissionViolation;

/// Process layer error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    /// A process failed during a tick.
    ///
    /// Recovered at the process boundary: the input passes through and
    /// the next tick proceeds normally.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A process produced an output its role forbids.
    ///
    /// Fatal: indicates a programming bug, not an operational hiccup.
    #[error(transparent)]
    Permission(#[from] PermissionViolation),

    /// A buffer received a timestamp earlier than its newest entry.
    ///
    /// Fatal: time only moves forward under every supported clock, so
    /// a regression means the caller mixed time sources.
    #[error("time regression: buffer at {latest_ns} received {attempted_ns}")]
    TimeRegression {
        /// Newest timestamp already stored.
        latest_ns: u64,
        /// The earlier timestamp that was rejected.
        attempted_ns: u64,
    },
}

impl ProcessError {
    /// Returns `true` if the error must propagate to the runner
    /// instead of being absorbed by the pass-through policy.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Permission(_) | Self::TimeRegression { .. })
    }
}

impl ErrorCode for ProcessError {
    fn code(&self) -> &'static str {
        match self {
            Self::ExecutionFailed(_) => "PROCESS_EXECUTION_FAILED",
            Self::Permission(violation) => violation.code(),
            Self::TimeRegression { .. } => "PROCESS_TIME_REGRESSION",
        }
    }

    fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }
}
