//! Unified error interface.
//!
//! Every thermand error type implements [`ErrorCode`] so that the
//! runner, log pipeline, and external supervisors can handle errors by
//! machine-readable code instead of string matching.
//!
//! # Code Format
//!
//! - `UPPER_SNAKE_CASE`
//! - Prefixed with the owning domain: `STATE_`, `PROCESS_`,
//!   `PERMISSION_`, `CONFIG_`, `RUNNER_`
//! - Stable once defined (codes are an API contract)
//!
//! # Recoverability
//!
//! Recoverable errors are operational: a sensor read failed, a child
//! process threw during a tick. Retrying (the next tick) may succeed,
//! and the daemon keeps running. Non-recoverable errors are programming
//! or configuration mistakes: a permission violation, a time
//! regression, a duplicate name. Retry will not help.
//!
//! # Example
//!
//! ```
//! use thermand_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum ReadError {
//!     Transient,
//!     BadPath,
//! }
//!
//! impl ErrorCode for ReadError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Transient => "READ_TRANSIENT",
//!             Self::BadPath => "READ_BAD_PATH",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Transient)
//!     }
//! }
//!
//! assert_eq!(ReadError::Transient.code(), "READ_TRANSIENT");
//! assert!(ReadError::Transient.is_recoverable());
//! ```

/// Unified error code interface.
///
/// Implemented by all thermand error enums. The code is the stable,
/// machine-readable identity of the failure; recoverability tells the
/// execution layer whether the failure is operational (keep ticking)
/// or structural (halt and report).
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    ///
    /// `UPPER_SNAKE_CASE`, domain-prefixed, stable across versions.
    fn code(&self) -> &'static str;

    /// Returns whether the error is recoverable.
    ///
    /// - `true`: operational failure; the next tick may succeed
    /// - `false`: programming or configuration error; retry will not help
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows thermand conventions.
///
/// Checks that the code is non-empty, carries the expected prefix, and
/// is `UPPER_SNAKE_CASE`.
///
/// # Panics
///
/// Panics with a descriptive message if validation fails. Intended for
/// use in tests that enumerate every variant of an error enum.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'",
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE",
    );
}

/// Validates a batch of error codes at once.
///
/// Use with a `Vec` of every variant to keep the convention enforced as
/// variants are added.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
