//! Timestamped state-map history.

use std::collections::VecDeque;

use thermand_state::StateMap;

use crate::ProcessError;

/// A time-ordered sequence of `(timestamp_ns, StateMap)` entries.
///
/// The buffer is a pure container: it stores, windows, and prunes, and
/// performs no derived computation (no derivatives, no averages) -
/// that belongs to the owning process.
///
/// Timestamps must be non-decreasing. Time only moves forward under
/// every supported clock, so an out-of-order store means the caller
/// mixed time sources; it is rejected as a programming error rather
/// than silently reordered.
///
/// # Example
///
/// ```
/// use thermand_process::Buffer;
/// use thermand_state::StateMap;
///
/// let mut buf = Buffer::new();
/// buf.store(100, StateMap::new()).unwrap();
/// buf.store(200, StateMap::new()).unwrap();
/// buf.store(300, StateMap::new()).unwrap();
///
/// assert_eq!(buf.len(), 3);
/// assert_eq!(buf.recent(100).len(), 2);       // 200 and 300
/// assert_eq!(buf.range(100, 200).len(), 2);   // inclusive window
/// assert_eq!(buf.prune_before(250), 2);
/// assert_eq!(buf.oldest().map(|(ts, _)| ts), Some(300));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    entries: VecDeque<(u64, StateMap)>,
}

impl Buffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// [`ProcessError::TimeRegression`] if `timestamp_ns` is earlier
    /// than the newest stored entry. Equal timestamps are accepted.
    pub fn store(&mut self, timestamp_ns: u64, states: StateMap) -> Result<(), ProcessError> {
        if let Some(&(latest_ns, _)) = self.entries.back() {
            if timestamp_ns < latest_ns {
                return Err(ProcessError::TimeRegression {
                    latest_ns,
                    attempted_ns: timestamp_ns,
                });
            }
        }
        self.entries.push_back((timestamp_ns, states));
        Ok(())
    }

    /// Entries within `duration_ns` of the newest entry, inclusive.
    ///
    /// Measured from the newest *stored* timestamp, so the query is
    /// deterministic and clock-free. Empty buffer yields nothing.
    #[must_use]
    pub fn recent(&self, duration_ns: u64) -> Vec<(u64, &StateMap)> {
        let Some(&(latest_ns, _)) = self.entries.back() else {
            return Vec::new();
        };
        let cutoff = latest_ns.saturating_sub(duration_ns);
        self.entries
            .iter()
            .filter(|(ts, _)| *ts >= cutoff)
            .map(|(ts, states)| (*ts, states))
            .collect()
    }

    /// Entries with `start_ns <= timestamp <= end_ns`.
    #[must_use]
    pub fn range(&self, start_ns: u64, end_ns: u64) -> Vec<(u64, &StateMap)> {
        self.entries
            .iter()
            .filter(|(ts, _)| (start_ns..=end_ns).contains(ts))
            .map(|(ts, states)| (*ts, states))
            .collect()
    }

    /// Drops entries older than `timestamp_ns`; returns how many.
    ///
    /// Entries at exactly `timestamp_ns` are kept.
    pub fn prune_before(&mut self, timestamp_ns: u64) -> usize {
        let before = self.entries.len();
        while let Some(&(ts, _)) = self.entries.front() {
            if ts >= timestamp_ns {
                break;
            }
            self.entries.pop_front();
        }
        before - self.entries.len()
    }

    /// Removes and returns the oldest entry.
    pub fn pop_oldest(&mut self) -> Option<(u64, StateMap)> {
        self.entries.pop_front()
    }

    /// The most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<(u64, &StateMap)> {
        self.entries.back().map(|(ts, states)| (*ts, states))
    }

    /// The oldest entry.
    #[must_use]
    pub fn oldest(&self) -> Option<(u64, &StateMap)> {
        self.entries.front().map(|(ts, states)| (*ts, states))
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &StateMap)> {
        self.entries.iter().map(|(ts, states)| (*ts, states))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermand_state::{Device, State};

    fn map_with_value(value: f64) -> StateMap {
        StateMap::new().with_actual(
            State::new().with_device(Device::sensor("cpu_temp").with_value(value, 0)),
        )
    }

    fn filled() -> Buffer {
        let mut buf = Buffer::new();
        for (ts, v) in [(100, 1.0), (200, 2.0), (300, 3.0), (400, 4.0)] {
            buf.store(ts, map_with_value(v)).expect("monotonic");
        }
        buf
    }

    #[test]
    fn store_in_order() {
        let buf = filled();
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.oldest().map(|(ts, _)| ts), Some(100));
        assert_eq!(buf.latest().map(|(ts, _)| ts), Some(400));
    }

    #[test]
    fn store_equal_timestamp_is_accepted() {
        let mut buf = Buffer::new();
        buf.store(100, StateMap::new()).expect("first");
        buf.store(100, StateMap::new()).expect("same timestamp");
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn store_regression_is_rejected() {
        let mut buf = Buffer::new();
        buf.store(200, StateMap::new()).expect("first");
        let err = buf.store(100, StateMap::new()).expect_err("regression");
        assert_eq!(
            err,
            ProcessError::TimeRegression {
                latest_ns: 200,
                attempted_ns: 100
            }
        );
        // nothing was stored
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn recent_measures_from_latest() {
        let buf = filled();
        let recent = buf.recent(150);
        let stamps: Vec<u64> = recent.iter().map(|(ts, _)| *ts).collect();
        // cutoff 400 - 150 = 250, inclusive
        assert_eq!(stamps, vec![300, 400]);
    }

    #[test]
    fn recent_includes_boundary() {
        let buf = filled();
        let stamps: Vec<u64> = buf.recent(100).iter().map(|(ts, _)| *ts).collect();
        assert_eq!(stamps, vec![300, 400]);
    }

    #[test]
    fn recent_on_empty() {
        assert!(Buffer::new().recent(1_000).is_empty());
    }

    #[test]
    fn range_is_inclusive() {
        let buf = filled();
        let stamps: Vec<u64> = buf.range(200, 300).iter().map(|(ts, _)| *ts).collect();
        assert_eq!(stamps, vec![200, 300]);
    }

    #[test]
    fn range_outside_is_empty() {
        let buf = filled();
        assert!(buf.range(401, 999).is_empty());
    }

    #[test]
    fn prune_before_keeps_boundary() {
        let mut buf = filled();
        assert_eq!(buf.prune_before(300), 2);
        assert_eq!(buf.oldest().map(|(ts, _)| ts), Some(300));
    }

    #[test]
    fn prune_everything() {
        let mut buf = filled();
        assert_eq!(buf.prune_before(1_000), 4);
        assert!(buf.is_empty());
    }

    #[test]
    fn pop_oldest() {
        let mut buf = filled();
        let (ts, _) = buf.pop_oldest().expect("non-empty");
        assert_eq!(ts, 100);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn clear() {
        let mut buf = filled();
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.latest().is_none());
        assert!(buf.oldest().is_none());
    }

    #[test]
    fn entries_keep_their_contents() {
        let buf = filled();
        let (_, states) = buf.latest().expect("non-empty");
        let value = states
            .actual()
            .and_then(|s| s.device("cpu_temp"))
            .map(thermand_state::Device::value);
        assert_eq!(value, Some(4.0));
    }
}
