//! History cells for processes that need memory.
//!
//! A stateful process separates two records:
//!
//! - **Configuration** ([`HistoryConfig`]): serializable retention
//!   bounds. This is what persists across daemon restarts.
//! - **Runtime state** ([`History`]): the [`Buffer`] and anything
//!   derived from it. Rebuilt empty by `initialize`; never persisted.
//!
//! A process embeds a [`History`] and records each incoming state map
//! from its `import_state` hook:
//!
//! ```
//! use thermand_process::{History, HistoryConfig, ProcessError};
//! use thermand_state::StateMap;
//! use thermand_types::time;
//!
//! struct TrendWatcher {
//!     history: History,
//! }
//!
//! impl TrendWatcher {
//!     fn import(&mut self, input: &StateMap) -> Result<(), ProcessError> {
//!         self.history.record(time::now_ns(), input)
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use thermand_state::StateMap;

use crate::{Buffer, ProcessError};

/// Default retention: 1000 entries.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default retention: 5 minutes.
pub const DEFAULT_MAX_AGE_NS: u64 = 300_000_000_000;

/// Serializable retention bounds for a [`History`].
///
/// At least one bound must be finite, or the buffer would grow without
/// limit; [`HistoryConfig::is_bounded`] is checked when configuration
/// is built, never at tick time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum entry count; oldest entries fall off first.
    pub max_entries: Option<usize>,

    /// Maximum entry age relative to the recording time.
    pub max_age_ns: Option<u64>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: Some(DEFAULT_MAX_ENTRIES),
            max_age_ns: Some(DEFAULT_MAX_AGE_NS),
        }
    }
}

impl HistoryConfig {
    /// Returns `true` if at least one retention bound is finite.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.max_entries.is_some() || self.max_age_ns.is_some()
    }
}

/// Runtime history cell: a [`Buffer`] plus its retention policy.
///
/// Contents are runtime-only and are discarded on restart; the owning
/// process calls [`reset`](History::reset) from its `initialize`.
#[derive(Debug, Clone, Default)]
pub struct History {
    config: HistoryConfig,
    buffer: Buffer,
}

impl History {
    /// Creates an empty history with the given retention bounds.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            buffer: Buffer::new(),
        }
    }

    /// The retention configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Read access to the underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Discards all recorded entries.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Stores a snapshot at `now_ns`, then prunes by age and count.
    ///
    /// # Errors
    ///
    /// [`ProcessError::TimeRegression`] if `now_ns` is earlier than
    /// the newest recorded entry.
    pub fn record(&mut self, now_ns: u64, states: &StateMap) -> Result<(), ProcessError> {
        self.buffer.store(now_ns, states.clone())?;

        if let Some(max_age_ns) = self.config.max_age_ns {
            self.buffer.prune_before(now_ns.saturating_sub(max_age_ns));
        }
        if let Some(max_entries) = self.config.max_entries {
            while self.buffer.len() > max_entries {
                self.buffer.pop_oldest();
            }
        }
        Ok(())
    }

    /// Debug summary of the buffer contents.
    ///
    /// ```
    /// use thermand_process::{History, HistoryConfig};
    /// use thermand_state::StateMap;
    ///
    /// let mut history = History::new(HistoryConfig::default());
    /// history.record(100, &StateMap::new()).unwrap();
    /// history.record(400, &StateMap::new()).unwrap();
    ///
    /// let summary = history.summary();
    /// assert_eq!(summary["entries"], 2);
    /// assert_eq!(summary["span_ns"], 300);
    /// ```
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        let oldest = self.buffer.oldest().map(|(ts, _)| ts);
        let latest = self.buffer.latest().map(|(ts, _)| ts);
        let span = match (oldest, latest) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        };
        json!({
            "entries": self.buffer.len(),
            "oldest_ns": oldest,
            "latest_ns": latest,
            "span_ns": span,
        })
    }
}
