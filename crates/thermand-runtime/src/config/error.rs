//! Configuration errors.

use thermand_process::CollectionError;
use thermand_types::ErrorCode;
use thiserror::Error;

/// Error raised while validating or building a configuration.
///
/// Configuration problems surface when a tree is built - loudly, from
/// the constructor - and never at tick time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A process or runner name is empty.
    #[error("name must not be empty")]
    EmptyName,

    /// Two siblings share a name.
    #[error("duplicate process name: {0}")]
    DuplicateName(String),

    /// An interval is unusable in its position.
    #[error("invalid interval for '{name}': {reason}")]
    InvalidInterval {
        /// The offending process.
        name: String,
        /// Why the interval is rejected.
        reason: String,
    },

    /// A history configuration has no finite retention bound.
    #[error("history for '{0}' has no finite bound")]
    UnboundedHistory(String),

    /// A structural mutation failed while assembling the tree.
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// The configuration text could not be parsed.
    #[error("configuration parse error: {0}")]
    Parse(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyName => "CONFIG_EMPTY_NAME",
            Self::DuplicateName(_) => "CONFIG_DUPLICATE_NAME",
            Self::InvalidInterval { .. } => "CONFIG_INVALID_INTERVAL",
            Self::UnboundedHistory(_) => "CONFIG_UNBOUNDED_HISTORY",
            Self::Collection(inner) => inner.code(),
            Self::Parse(_) => "CONFIG_PARSE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermand_types::assert_error_codes;

    #[test]
    fn codes_follow_convention() {
        assert_error_codes(
            &[
                ConfigError::EmptyName,
                ConfigError::DuplicateName("x".into()),
                ConfigError::InvalidInterval {
                    name: "x".into(),
                    reason: "zero".into(),
                },
                ConfigError::UnboundedHistory("x".into()),
                ConfigError::Parse("bad toml".into()),
            ],
            "CONFIG_",
        );
    }

    #[test]
    fn collection_errors_keep_their_code() {
        let err = ConfigError::from(CollectionError::ChildNotFound("x".into()));
        assert_eq!(err.code(), "COLLECTION_CHILD_NOT_FOUND");
    }
}
