//! The simulation runner: virtual time, single-threaded.

use std::sync::Arc;

use thermand_process::Process;
use thermand_state::StateMap;
use thermand_types::time::{Clock, SimulatedClock, TimeSourceGuard};
use thermand_types::EntityId;
use tracing::warn;

use super::RunnerError;

/// Default runaway guard: one hour of simulated time.
pub const DEFAULT_MAX_DURATION_NS: u64 = 3_600_000_000_000;

/// Default runaway guard: ticks per `run_for` call.
pub const DEFAULT_TICK_BUDGET: u64 = 1_000_000;

/// Autonomous runner against simulated time.
///
/// Maintains an internal clock starting at 0 and, instead of sleeping,
/// jumps the clock to each due time. Hours of thermal behaviour
/// execute in milliseconds, and every process sees exactly the
/// timestamps it would have seen live - the clock is installed
/// thread-locally for the duration of each call, so no process code
/// changes.
///
/// Unlike [`StandardRunner`](super::StandardRunner) there is no
/// background thread: [`run_for`](FastRunner::run_for) and
/// [`run_ticks`](FastRunner::run_ticks) execute synchronously on the
/// caller's thread and return when the horizon or tick count is
/// reached.
///
/// # Runaway Guards
///
/// A root that is always due (zero interval) would loop forever under
/// a clock that never needs to pass. Two rails bound every call: a
/// maximum simulated duration (default one hour) and a per-call tick
/// budget (default 1,000,000). Hitting either logs a warning and
/// returns normally.
///
/// # Example
///
/// ```
/// use thermand_process::testing::CountingProcess;
/// use thermand_runtime::FastRunner;
/// use std::sync::atomic::Ordering;
///
/// let counter = CountingProcess::new("count", 10_000_000); // 10 ms
/// let ticks = counter.counter();
///
/// let mut runner = FastRunner::new("sim", Box::new(counter));
/// runner.run_for(100_000_000).unwrap(); // 100 ms simulated
///
/// assert_eq!(ticks.load(Ordering::SeqCst), 10);
/// assert_eq!(runner.now_ns(), 100_000_000);
/// ```
pub struct FastRunner {
    name: String,
    id: EntityId,
    root: Box<dyn Process>,
    clock: Arc<SimulatedClock>,
    max_duration_ns: u64,
    tick_budget: u64,
    initialized: bool,
    ticks: u64,
}

impl FastRunner {
    /// Creates a simulation runner with the clock at zero.
    #[must_use]
    pub fn new(name: impl Into<String>, root: Box<dyn Process>) -> Self {
        Self {
            name: name.into(),
            id: EntityId::random(),
            root,
            clock: Arc::new(SimulatedClock::new()),
            max_duration_ns: DEFAULT_MAX_DURATION_NS,
            tick_budget: DEFAULT_TICK_BUDGET,
            initialized: false,
            ticks: 0,
        }
    }

    /// Replaces the maximum simulated duration (builder style).
    #[must_use]
    pub fn with_max_duration(mut self, max_duration_ns: u64) -> Self {
        self.max_duration_ns = max_duration_ns;
        self
    }

    /// Replaces the per-call tick budget (builder style).
    #[must_use]
    pub fn with_tick_budget(mut self, tick_budget: u64) -> Self {
        self.tick_budget = tick_budget;
        self
    }

    /// The runner's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The runner's identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current simulated time.
    #[must_use]
    pub fn now_ns(&self) -> u64 {
        self.clock.now_ns()
    }

    /// Total root executions across all calls.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Read access to the root process.
    #[must_use]
    pub fn root(&self) -> &dyn Process {
        self.root.as_ref()
    }

    fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.root.initialize(self.now_ns());
            self.initialized = true;
        }
    }

    /// Runs until simulated time passes `duration_ns` from now.
    ///
    /// A root due exactly at the horizon still runs; afterwards the
    /// clock parks at the horizon, so consecutive calls compose:
    /// `run_for(a)` then `run_for(b)` equals `run_for(a + b)`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Halted`] if the root returns a fatal error.
    pub fn run_for(&mut self, duration_ns: u64) -> Result<(), RunnerError> {
        let _time_guard = TimeSourceGuard::install(self.clock.clone());
        self.ensure_initialized();

        let horizon_ns = self.clock.now_ns().saturating_add(duration_ns);
        let mut budget = self.tick_budget;

        loop {
            let due_ns = self.root.next_run_at();
            if due_ns > horizon_ns {
                break;
            }
            if due_ns > self.max_duration_ns {
                warn!(
                    runner = %self.name,
                    max_duration_ns = self.max_duration_ns,
                    "simulation exceeded maximum duration; stopping"
                );
                return Ok(());
            }
            if budget == 0 {
                warn!(
                    runner = %self.name,
                    tick_budget = self.tick_budget,
                    "tick budget exhausted; stopping"
                );
                return Ok(());
            }
            budget -= 1;

            self.clock.advance_to(due_ns);
            self.root.run(StateMap::new()).map_err(RunnerError::Halted)?;
            self.ticks += 1;
        }

        self.clock.advance_to(horizon_ns);
        Ok(())
    }

    /// Runs exactly `count` root executions.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Halted`] if the root returns a fatal error.
    pub fn run_ticks(&mut self, count: u64) -> Result<(), RunnerError> {
        let _time_guard = TimeSourceGuard::install(self.clock.clone());
        self.ensure_initialized();

        for _ in 0..count {
            let due_ns = self.root.next_run_at();
            if due_ns > self.max_duration_ns {
                warn!(
                    runner = %self.name,
                    max_duration_ns = self.max_duration_ns,
                    "simulation exceeded maximum duration; stopping"
                );
                return Ok(());
            }
            self.clock.advance_to(due_ns);
            self.root.run(StateMap::new()).map_err(RunnerError::Halted)?;
            self.ticks += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use thermand_process::testing::{CountingProcess, NoopProcess, SensorTamperController, StubEnvironment};
    use thermand_process::{Collection, Pipeline, System};
    use thermand_state::Device;

    #[test]
    fn runs_exact_tick_count_over_duration() {
        let counter = CountingProcess::new("count", 10); // 10 ns cadence
        let ticks = counter.counter();
        let mut runner = FastRunner::new("sim", Box::new(counter));
        runner.run_for(100).expect("run");
        // due at 10, 20, …, 100 inclusive
        assert_eq!(ticks.load(Ordering::SeqCst), 10);
        assert_eq!(runner.now_ns(), 100);
        assert_eq!(runner.ticks(), 10);
    }

    #[test]
    fn consecutive_runs_compose() {
        let counter = CountingProcess::new("count", 10);
        let ticks = counter.counter();
        let mut runner = FastRunner::new("sim", Box::new(counter));
        runner.run_for(40).expect("first");
        runner.run_for(60).expect("second");
        assert_eq!(ticks.load(Ordering::SeqCst), 10);
        assert_eq!(runner.now_ns(), 100);
    }

    #[test]
    fn clock_parks_at_horizon_when_nothing_due() {
        let noop = NoopProcess::with_interval("idle", 1_000_000);
        let mut runner = FastRunner::new("sim", Box::new(noop));
        runner.run_for(10).expect("run");
        assert_eq!(runner.now_ns(), 10);
        assert_eq!(runner.ticks(), 0);
    }

    #[test]
    fn run_ticks_counts_exactly() {
        let counter = CountingProcess::new("count", 7);
        let ticks = counter.counter();
        let mut runner = FastRunner::new("sim", Box::new(counter));
        runner.run_ticks(5).expect("run");
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
        assert_eq!(runner.now_ns(), 35);
    }

    #[test]
    fn tick_budget_stops_zero_interval_root() {
        let counter = CountingProcess::new("spin", 0);
        let ticks = counter.counter();
        let mut runner = FastRunner::new("sim", Box::new(counter)).with_tick_budget(50);
        runner.run_for(1_000).expect("run");
        assert_eq!(ticks.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn max_duration_stops_long_simulations() {
        let counter = CountingProcess::new("count", 100);
        let ticks = counter.counter();
        let mut runner = FastRunner::new("sim", Box::new(counter)).with_max_duration(450);
        runner.run_for(10_000).expect("run");
        // due times 100..=400 execute; 500 exceeds the guard
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn fatal_error_returns_halted() {
        let mut pipeline = Pipeline::new("flow", 10);
        pipeline
            .append(Box::new(StubEnvironment::new(
                "env",
                vec![Device::sensor("cpu_temp").with_value(50.0, 0)],
            )))
            .expect("env");
        pipeline
            .append(Box::new(SensorTamperController::new("tamper")))
            .expect("tamper");

        let mut runner = FastRunner::new("sim", Box::new(pipeline));
        let err = runner.run_for(100).expect_err("halt");
        assert!(matches!(err, RunnerError::Halted(_)));
    }

    #[test]
    fn system_children_interleave_on_their_cadences() {
        let a = CountingProcess::new("a", 10_000_000); // 10 ms
        let b = CountingProcess::new("b", 30_000_000); // 30 ms
        let ticks_a = a.counter();
        let ticks_b = b.counter();

        let mut system = System::new("host");
        system.append(Box::new(a)).expect("a");
        system.append(Box::new(b)).expect("b");

        let mut runner = FastRunner::new("sim", Box::new(system));
        runner.run_for(100_000_000).expect("run"); // 100 ms

        assert_eq!(ticks_a.load(Ordering::SeqCst), 10);
        assert_eq!(ticks_b.load(Ordering::SeqCst), 3);
    }
}
