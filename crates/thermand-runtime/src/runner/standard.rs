//! The production runner: real time, background thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thermand_process::Process;
use thermand_state::StateMap;
use thermand_types::time::{Clock, MonotonicClock, TimeSourceGuard};
use thermand_types::{ErrorCode, EntityId};
use tracing::{error, info, warn};

use super::{RunnerError, RunnerState};

/// Default bounded wait when joining the execution thread.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

struct Shared {
    state: Mutex<RunnerState>,
    state_changed: Condvar,
}

/// Autonomous runner against real time.
///
/// Owns one root process and executes it in a named background thread
/// at the cadence the process reports, sleeping between ticks. The
/// inter-tick sleep is interruptible: [`stop`](StandardRunner::stop)
/// wakes it promptly, lets any in-flight tick finish, and joins the
/// thread within a bounded wait.
///
/// The clock defaults to the OS monotonic clock.
/// [`with_clock`](StandardRunner::with_clock) injects any
/// [`Clock`]; a virtual clock that jumps on
/// [`advance_to`](Clock::advance_to) turns the same loop into a
/// deterministic, full-speed simulation - useful for verifying that
/// the threaded path and [`FastRunner`](super::FastRunner) agree.
///
/// # Halting
///
/// A fatal error from the root (permission violation, time
/// regression) is logged once, structured, and the runner halts. This
/// is the last line of defence: operational failures never get this
/// far, the process-level policy already absorbed them.
///
/// # Example
///
/// ```no_run
/// use thermand_process::Pipeline;
/// use thermand_runtime::StandardRunner;
///
/// let pipeline = Pipeline::new("cpu_zone", 100_000_000);
/// let mut runner = StandardRunner::new("main", Box::new(pipeline));
/// runner.start().unwrap();
/// // … daemon runs …
/// runner.stop();
/// ```
pub struct StandardRunner {
    name: String,
    id: EntityId,
    root: Option<Box<dyn Process>>,
    clock: Arc<dyn Clock>,
    shared: Arc<Shared>,
    stop_timeout: Duration,
    handle: Option<JoinHandle<()>>,
}

impl StandardRunner {
    /// Creates a runner over the OS monotonic clock.
    #[must_use]
    pub fn new(name: impl Into<String>, root: Box<dyn Process>) -> Self {
        Self {
            name: name.into(),
            id: EntityId::random(),
            root: Some(root),
            clock: Arc::new(MonotonicClock),
            shared: Arc::new(Shared {
                state: Mutex::new(RunnerState::Created),
                state_changed: Condvar::new(),
            }),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            handle: None,
        }
    }

    /// Replaces the clock (builder style, before `start`).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the bounded stop wait (builder style).
    #[must_use]
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
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

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunnerState {
        *self.shared.state.lock()
    }

    /// Returns `true` while the execution loop is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state(), RunnerState::Running | RunnerState::Stopping)
    }

    /// Starts the execution loop in a background thread.
    ///
    /// # Errors
    ///
    /// [`RunnerError::AlreadyStarted`] unless the runner is in the
    /// `created` state.
    pub fn start(&mut self) -> Result<(), RunnerError> {
        {
            let mut state = self.shared.state.lock();
            if *state != RunnerState::Created {
                return Err(RunnerError::AlreadyStarted(*state));
            }
            *state = RunnerState::Running;
        }

        // The root moves into the thread; it comes back only through
        // the thread ending.
        let root = self
            .root
            .take()
            .ok_or(RunnerError::AlreadyStarted(RunnerState::Stopped))?;
        let clock = self.clock.clone();
        let shared = self.shared.clone();
        let name = self.name.clone();

        info!(runner = %name, "starting runner");
        let handle = std::thread::Builder::new()
            .name(format!("runner-{name}"))
            .spawn(move || execution_loop(&name, root, &clock, &shared))
            .map_err(|err| {
                let mut state = self.shared.state.lock();
                *state = RunnerState::Stopped;
                error!(runner = %self.name, error = %err, "failed to spawn runner thread");
                RunnerError::Halted(thermand_process::ProcessError::ExecutionFailed(
                    err.to_string(),
                ))
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Requests a cooperative stop and joins within the bounded wait.
    ///
    /// Idempotent: stopping a stopped (or never-started) runner is a
    /// no-op.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            match *state {
                RunnerState::Created => {
                    *state = RunnerState::Stopped;
                    return;
                }
                RunnerState::Stopped => return,
                RunnerState::Running => {
                    info!(runner = %self.name, "stopping runner");
                    *state = RunnerState::Stopping;
                    self.shared.state_changed.notify_all();
                }
                RunnerState::Stopping => {}
            }

            let timed_out = self
                .shared
                .state_changed
                .wait_while_for(&mut state, |s| *s != RunnerState::Stopped, self.stop_timeout)
                .timed_out();
            if timed_out {
                warn!(
                    runner = %self.name,
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "runner thread did not stop within timeout"
                );
                return;
            }
        }

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StandardRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn execution_loop(
    name: &str,
    mut root: Box<dyn Process>,
    clock: &Arc<dyn Clock>,
    shared: &Arc<Shared>,
) {
    let _time_guard = TimeSourceGuard::install(clock.clone());

    root.initialize(clock.now_ns());
    info!(runner = %name, root = %root.name(), "runner loop entered");

    loop {
        if *shared.state.lock() != RunnerState::Running {
            break;
        }

        let due_ns = root.next_run_at();
        let now_ns = clock.now_ns();
        if due_ns > now_ns {
            if !clock.advance_to(due_ns) {
                // Physical clock: sleep until due or woken by stop.
                let mut state = shared.state.lock();
                if *state != RunnerState::Running {
                    break;
                }
                let wait = Duration::from_nanos(due_ns - now_ns);
                let _ = shared.state_changed.wait_for(&mut state, wait);
            }
            continue;
        }

        if let Err(err) = root.run(StateMap::new()) {
            error!(
                runner = %name,
                root = %root.name(),
                code = err.code(),
                error = %err,
                "root process fatal error; halting runner"
            );
            break;
        }
    }

    let mut state = shared.state.lock();
    *state = RunnerState::Stopped;
    shared.state_changed.notify_all();
    drop(state);
    info!(runner = %name, "runner loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Instant;
    use thermand_process::testing::{CountingProcess, SensorTamperController, StubEnvironment};
    use thermand_process::{Collection, Pipeline};
    use thermand_state::Device;
    use thermand_types::time::SimulatedClock;

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        done()
    }

    #[test]
    fn lifecycle_created_to_stopped() {
        let counter = CountingProcess::new("count", 1_000_000);
        let mut runner = StandardRunner::new("lifecycle", Box::new(counter));
        assert_eq!(runner.state(), RunnerState::Created);

        runner.start().expect("start");
        assert!(runner.is_running());

        runner.stop();
        assert_eq!(runner.state(), RunnerState::Stopped);
    }

    #[test]
    fn start_twice_errors() {
        let counter = CountingProcess::new("count", 1_000_000);
        let mut runner = StandardRunner::new("double", Box::new(counter));
        runner.start().expect("first start");
        let err = runner.start().expect_err("second start");
        assert!(matches!(err, RunnerError::AlreadyStarted(_)));
        runner.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let counter = CountingProcess::new("count", 1_000_000);
        let mut runner = StandardRunner::new("idem", Box::new(counter));
        runner.start().expect("start");
        runner.stop();
        runner.stop();
        assert_eq!(runner.state(), RunnerState::Stopped);
    }

    #[test]
    fn stop_without_start_is_noop() {
        let counter = CountingProcess::new("count", 1_000_000);
        let mut runner = StandardRunner::new("unstarted", Box::new(counter));
        runner.stop();
        assert_eq!(runner.state(), RunnerState::Stopped);
    }

    #[test]
    fn executes_root_on_cadence() {
        let counter = CountingProcess::new("count", 1_000_000); // 1 ms
        let ticks = counter.counter();
        let mut runner = StandardRunner::new("cadence", Box::new(counter));
        runner.start().expect("start");

        assert!(wait_until(Duration::from_secs(2), || {
            ticks.load(Ordering::SeqCst) >= 5
        }));
        runner.stop();
    }

    #[test]
    fn simulated_clock_drives_the_same_loop() {
        let counter = CountingProcess::new("count", 10_000_000); // 10 ms simulated
        let ticks = counter.counter();
        let clock = Arc::new(SimulatedClock::new());
        let mut runner =
            StandardRunner::new("virtual", Box::new(counter)).with_clock(clock);
        runner.start().expect("start");

        // Virtual time free-runs; hundreds of simulated ticks arrive in
        // real milliseconds.
        assert!(wait_until(Duration::from_secs(2), || {
            ticks.load(Ordering::SeqCst) >= 100
        }));
        runner.stop();
    }

    #[test]
    fn permission_violation_halts_runner() {
        let mut pipeline = Pipeline::new("flow", 1_000_000);
        pipeline
            .append(Box::new(StubEnvironment::new(
                "env",
                vec![Device::sensor("cpu_temp").with_value(50.0, 0)],
            )))
            .expect("env");
        pipeline
            .append(Box::new(SensorTamperController::new("tamper")))
            .expect("tamper");

        let mut runner = StandardRunner::new("halting", Box::new(pipeline));
        runner.start().expect("start");

        let shared = runner.shared.clone();
        assert!(wait_until(Duration::from_secs(2), || {
            *shared.state.lock() == RunnerState::Stopped
        }));
    }
}
