//! State layer errors.

use thermand_types::ErrorCode;
use thiserror::Error;

/// State assembly error.
///
/// States are maps keyed by device name, so most operations cannot
/// fail; assembly from an explicit device list can, and does so loudly
/// at construction time rather than silently dropping a device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Two devices in one assembly share a name.
    #[error("duplicate device name: {0}")]
    DuplicateDevice(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateDevice(_) => "STATE_DUPLICATE_DEVICE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
