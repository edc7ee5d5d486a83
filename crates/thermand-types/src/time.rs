//! Clocks and the thread-local time source.
//!
//! Everything in thermand is timed in monotonic nanoseconds. Code never
//! reads the OS clock directly; it calls [`now_ns`], which consults a
//! thread-local [`Clock`] installed by whichever runner is driving the
//! current thread. Without an installed clock, [`now_ns`] falls back to
//! the OS monotonic clock.
//!
//! This indirection is what makes long-horizon thermal behaviour
//! testable: a runner that installs a [`SimulatedClock`] makes every
//! process it executes see simulated time - sensor timestamps, buffer
//! pruning, cadence calculations - with no change to the processes
//! themselves.
//!
//! # Installation Discipline
//!
//! Installation is scoped: [`TimeSourceGuard::install`] returns an RAII
//! guard that restores the previous state on drop. A runner installs its
//! clock on loop entry and the guard uninstalls it when the loop exits,
//! even on panic. Multiple runners in multiple threads coexist because
//! the slot is per-thread.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use thermand_types::time::{now_ns, SimulatedClock, TimeSourceGuard};
//!
//! let clock = Arc::new(SimulatedClock::new());
//! clock.set(42);
//! {
//!     let _guard = TimeSourceGuard::install(clock.clone());
//!     assert_eq!(now_ns(), 42);
//! }
//! // Guard dropped: back to the OS monotonic clock.
//! ```

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// A source of monotonic nanosecond time.
///
/// Implementations must be monotonic: successive `now_ns` calls on the
/// same clock never go backwards.
pub trait Clock: Send + Sync {
    /// Current time in monotonic nanoseconds.
    fn now_ns(&self) -> u64;

    /// Attempts to jump this clock forward to `deadline_ns`.
    ///
    /// Virtual clocks jump and return `true`; physical clocks return
    /// `false`, telling the caller it must physically wait instead.
    /// Jumping never moves a clock backwards.
    fn advance_to(&self, deadline_ns: u64) -> bool {
        let _ = deadline_ns;
        false
    }
}

/// The OS monotonic clock.
///
/// Reports nanoseconds elapsed since a process-wide anchor taken on
/// first use. Cannot be advanced.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        // u64 nanoseconds cover ~584 years of uptime.
        anchor().elapsed().as_nanos() as u64
    }
}

/// A virtual clock for deterministic execution.
///
/// Starts at zero (or [`SimulatedClock::starting_at`]) and only moves
/// when told to. Runners advance it to each due time instead of
/// sleeping, which executes hours of simulated behaviour in
/// milliseconds of real time.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now: AtomicU64,
}

impl SimulatedClock {
    /// Creates a simulated clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a simulated clock at the given time.
    #[must_use]
    pub fn starting_at(now_ns: u64) -> Self {
        Self {
            now: AtomicU64::new(now_ns),
        }
    }

    /// Sets the current time. Never moves backwards.
    pub fn set(&self, now_ns: u64) {
        self.now.fetch_max(now_ns, Ordering::SeqCst);
    }

    /// Advances the current time by `delta_ns`.
    pub fn advance(&self, delta_ns: u64) {
        self.now.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl Clock for SimulatedClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn advance_to(&self, deadline_ns: u64) -> bool {
        self.now.fetch_max(deadline_ns, Ordering::SeqCst);
        true
    }
}

thread_local! {
    static INSTALLED: RefCell<Option<Arc<dyn Clock>>> = const { RefCell::new(None) };
}

/// Current time in monotonic nanoseconds.
///
/// Consults the thread-local clock installed by the driving runner;
/// falls back to [`MonotonicClock`] when none is installed.
#[must_use]
pub fn now_ns() -> u64 {
    INSTALLED
        .with(|slot| slot.borrow().as_ref().map(|clock| clock.now_ns()))
        .unwrap_or_else(|| MonotonicClock.now_ns())
}

/// Returns the clock installed on this thread, if any.
#[must_use]
pub fn installed_clock() -> Option<Arc<dyn Clock>> {
    INSTALLED.with(|slot| slot.borrow().clone())
}

/// RAII guard that installs a clock into the thread-local slot.
///
/// The previous slot contents are restored on drop, so nested
/// installations (a runner temporarily driven inside another runner's
/// thread, as test harnesses do) unwind correctly.
pub struct TimeSourceGuard {
    previous: Option<Arc<dyn Clock>>,
}

impl TimeSourceGuard {
    /// Installs `clock` as this thread's time source.
    #[must_use = "the clock is uninstalled when the guard is dropped"]
    pub fn install(clock: Arc<dyn Clock>) -> Self {
        let previous = INSTALLED.with(|slot| slot.borrow_mut().replace(clock));
        Self { previous }
    }
}

impl Drop for TimeSourceGuard {
    fn drop(&mut self) {
        INSTALLED.with(|slot| {
            *slot.borrow_mut() = self.previous.take();
        });
    }
}
