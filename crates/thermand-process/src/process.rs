//! The computational-unit abstraction.
//!
//! A [`Process`] transforms a [`StateMap`] and declares when it wants
//! to run next. Everything that computes in thermand - environments
//! reading hardware, controllers deciding actuator settings, pipelines
//! and systems composing them - is a `Process`.
//!
//! # Execution Entry Points
//!
//! | Method | Caller | Purpose |
//! |--------|--------|---------|
//! | [`Process::run`] | parents and runners | tick with failure policy + permission check |
//! | [`Process::execute`] | `run` | the transformation itself |
//! | hooks | `execute` | `import_state` → `think` → `export_state` |
//!
//! The three-hook split exists so that algorithms wanting a
//! numeric-library-native representation convert once on import and
//! once on export instead of at every step of their logic. Overriding
//! any subset works; the defaults pass the input through unchanged.
//!
//! # Failure Policy
//!
//! `run` absorbs operational failures: the error is logged at warn
//! level and the *input* StateMap is returned unchanged, so thermal
//! control continues when a single stage fails. Fatal errors
//! (permission violations, time regressions) propagate - they are
//! programming bugs and masking them would be worse than halting.
//!
//! # Cadence
//!
//! Next run times use the modulo scheme:
//! `start + (executions + 1) × interval`. Average cadence stays exact
//! under jitter; a process that ran late does not burst to catch up,
//! it simply runs later than ideal. An interval of `0` means "run
//! every time the parent polls me" and is the normal setting for
//! pipelines nested inside systems.

use serde::{Deserialize, Serialize};
use thermand_state::StateMap;
use thermand_types::EntityId;
use tracing::warn;

use crate::{permission, ProcessError};

/// Default tick cadence: 100 ms.
pub const DEFAULT_INTERVAL_NS: u64 = 100_000_000;

/// Identity surface shared by every entity that shows up in logs.
pub trait Identified {
    /// Human-readable name, unique within the parent scope.
    fn name(&self) -> &str;

    /// Stable identifier for logging and cross-referencing.
    fn id(&self) -> EntityId;
}

/// The permission role a process advertises.
///
/// Roles are static: the arbiter compares each (input, output) pair
/// against the producer's role instead of inspecting who called what.
///
/// | Role | Owns | May never |
/// |------|------|-----------|
/// | `Environment` | sensor values | rewrite an actuator's value |
/// | `Controller` | actuator values | touch a sensor value, mint or drop devices |
/// | `Neutral` | nothing (plumbing) | - unconstrained |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    /// Coordination plumbing: pipelines, systems, loggers.
    #[default]
    Neutral,

    /// Interfaces with the physical or simulated world.
    Environment,

    /// Decision-making logic driving actuators.
    Controller,
}

impl std::fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neutral => write!(f, "neutral"),
            Self::Environment => write!(f, "environment"),
            Self::Controller => write!(f, "controller"),
        }
    }
}

/// Cadence counters for a process.
///
/// Runtime state, never serialized: [`reset`](Timing::reset) seeds it
/// from the current clock when a runner initializes the process tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    start_ns: u64,
    executions: u64,
}

impl Timing {
    /// Seeds the counters at `now_ns`.
    pub fn reset(&mut self, now_ns: u64) {
        self.start_ns = now_ns;
        self.executions = 0;
    }

    /// Records one completed execution.
    pub fn record(&mut self) {
        self.executions += 1;
    }

    /// The time this timing was seeded at.
    #[must_use]
    pub fn start_ns(&self) -> u64 {
        self.start_ns
    }

    /// Completed executions since the last reset.
    #[must_use]
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Next run time under the modulo scheme.
    ///
    /// `start + (executions + 1) × interval`. With a zero interval the
    /// result is always the start time, i.e. always due.
    #[must_use]
    pub fn next_run_at(&self, interval_ns: u64) -> u64 {
        self.start_ns
            .saturating_add((self.executions + 1).saturating_mul(interval_ns))
    }
}

/// Identity, cadence config, and counters bundled for embedding.
///
/// Every concrete process carries one of these; the [`Process`] impl
/// forwards its accessors here. Keeps per-process boilerplate to one
/// field.
#[derive(Debug, Clone)]
pub struct ProcessCore {
    name: String,
    id: EntityId,
    interval_ns: u64,
    timing: Timing,
}

impl ProcessCore {
    /// Creates a core with a random identity.
    #[must_use]
    pub fn new(name: impl Into<String>, interval_ns: u64) -> Self {
        Self {
            name: name.into(),
            id: EntityId::random(),
            interval_ns,
            timing: Timing::default(),
        }
    }

    /// The process name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The process identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Configured cadence in nanoseconds.
    #[must_use]
    pub fn interval_ns(&self) -> u64 {
        self.interval_ns
    }

    /// Cadence counters.
    #[must_use]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Mutable cadence counters.
    pub fn timing_mut(&mut self) -> &mut Timing {
        &mut self.timing
    }
}

/// A computational unit that transforms state maps on a cadence.
///
/// # Implementing
///
/// Embed a [`ProcessCore`], forward the accessor methods, and override
/// whichever hooks your logic needs:
///
/// ```
/// use thermand_process::{Identified, Process, ProcessCore, ProcessError, ProcessRole, Timing};
/// use thermand_state::StateMap;
/// use thermand_types::EntityId;
///
/// /// Publishes how many devices it has seen, as a log line.
/// struct DeviceCounter {
///     core: ProcessCore,
///     seen: usize,
/// }
///
/// impl Identified for DeviceCounter {
///     fn name(&self) -> &str { self.core.name() }
///     fn id(&self) -> EntityId { self.core.id() }
/// }
///
/// impl Process for DeviceCounter {
///     fn interval_ns(&self) -> u64 { self.core.interval_ns() }
///     fn timing(&self) -> &Timing { self.core.timing() }
///     fn timing_mut(&mut self) -> &mut Timing { self.core.timing_mut() }
///
///     fn import_state(&mut self, input: &StateMap) -> Result<(), ProcessError> {
///         self.seen = input.iter().map(|(_, s)| s.len()).sum();
///         Ok(())
///     }
/// }
/// ```
///
/// # Contract
///
/// - `run` is what parents call; do not override it.
/// - Output must respect the advertised [`ProcessRole`]; the arbiter
///   checks every tick and violations halt the runner.
/// - Read time via [`thermand_types::time::now_ns`], never the OS
///   clock directly, so simulated clocks reach you.
pub trait Process: Identified + Send {
    /// The permission role this process runs under.
    fn role(&self) -> ProcessRole {
        ProcessRole::Neutral
    }

    /// Preferred inter-tick spacing in nanoseconds.
    ///
    /// `0` means "run whenever the parent polls".
    fn interval_ns(&self) -> u64 {
        DEFAULT_INTERVAL_NS
    }

    /// Cadence counters owned by the implementation.
    fn timing(&self) -> &Timing;

    /// Mutable cadence counters.
    fn timing_mut(&mut self) -> &mut Timing;

    /// Seeds cadence counters and rebuilds runtime state.
    ///
    /// Called by the runner (or a parent collection) before execution
    /// begins. Implementations with runtime state (buffers,
    /// integrators, schedules) clear it here and must call the default
    /// behaviour (`self.timing_mut().reset(now_ns)`) too.
    fn initialize(&mut self, now_ns: u64) {
        self.timing_mut().reset(now_ns);
    }

    /// Monotonic nanosecond time at which this process next wants to
    /// run.
    fn next_run_at(&self) -> u64 {
        self.timing().next_run_at(self.interval_ns())
    }

    /// Absorbs the input into internal working form.
    ///
    /// Default: nothing. Stateful processes store the input into their
    /// history here; numeric algorithms convert to their native
    /// representation.
    fn import_state(&mut self, input: &StateMap) -> Result<(), ProcessError> {
        let _ = input;
        Ok(())
    }

    /// Pure computation on internal state.
    ///
    /// Default: nothing.
    fn think(&mut self) -> Result<(), ProcessError> {
        Ok(())
    }

    /// Emits the output state map.
    ///
    /// Receives the original input; the default returns it unchanged,
    /// which makes the default process the identity.
    fn export_state(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        Ok(input)
    }

    /// The transformation: `import_state` → `think` → `export_state`.
    ///
    /// Composite processes (pipelines, systems) override this whole
    /// method instead of the individual hooks.
    fn execute(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        self.import_state(&input)?;
        self.think()?;
        self.export_state(input)
    }

    /// Runs one tick with the full policy applied.
    ///
    /// This is the entry point parents and runners use:
    ///
    /// 1. `execute` the transformation.
    /// 2. On an operational error: log one warning and substitute the
    ///    input (pass-through). On a fatal error: propagate.
    /// 3. Check the (input, output) pair against this process's role.
    /// 4. Advance the execution counter.
    ///
    /// The counter advances on passed-through failures too; otherwise
    /// a failing process would stay permanently due and hot-spin its
    /// parent.
    ///
    /// # Errors
    ///
    /// Only fatal errors ([`ProcessError::is_fatal`]) escape.
    fn run(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let output = match self.execute(input.clone()) {
            Ok(output) => output,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(
                    process = %self.name(),
                    error = %err,
                    "process failed, passing input through"
                );
                input.clone()
            }
        };
        permission::check_transition(self.role(), &input, &output)?;
        self.timing_mut().record();
        Ok(output)
    }
}

impl std::fmt::Debug for dyn Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Process")
            .field("name", &self.name())
            .field("id", &self.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermand_state::{Device, State};

    struct Passthrough {
        core: ProcessCore,
    }

    impl Passthrough {
        fn new(interval_ns: u64) -> Self {
            Self {
                core: ProcessCore::new("passthrough", interval_ns),
            }
        }
    }

    impl Identified for Passthrough {
        fn name(&self) -> &str {
            self.core.name()
        }
        fn id(&self) -> EntityId {
            self.core.id()
        }
    }

    impl Process for Passthrough {
        fn interval_ns(&self) -> u64 {
            self.core.interval_ns()
        }
        fn timing(&self) -> &Timing {
            self.core.timing()
        }
        fn timing_mut(&mut self) -> &mut Timing {
            self.core.timing_mut()
        }
    }

    fn sample_map() -> StateMap {
        StateMap::new().with_actual(
            State::new().with_device(Device::sensor("cpu_temp").with_value(50.0, 1)),
        )
    }

    #[test]
    fn default_process_is_identity() {
        let mut p = Passthrough::new(0);
        let input = sample_map();
        let output = p.run(input.clone()).expect("run");
        assert_eq!(output, input);
    }

    #[test]
    fn run_advances_execution_count() {
        let mut p = Passthrough::new(10);
        p.initialize(0);
        assert_eq!(p.timing().executions(), 0);
        p.run(StateMap::new()).expect("run");
        p.run(StateMap::new()).expect("run");
        assert_eq!(p.timing().executions(), 2);
    }

    #[test]
    fn modulo_cadence() {
        let mut p = Passthrough::new(10);
        p.initialize(100);
        assert_eq!(p.next_run_at(), 110);
        p.run(StateMap::new()).expect("run");
        assert_eq!(p.next_run_at(), 120);
        p.run(StateMap::new()).expect("run");
        assert_eq!(p.next_run_at(), 130);
    }

    #[test]
    fn zero_interval_is_always_due() {
        let mut p = Passthrough::new(0);
        p.initialize(500);
        assert_eq!(p.next_run_at(), 500);
        p.run(StateMap::new()).expect("run");
        assert_eq!(p.next_run_at(), 500);
    }

    #[test]
    fn initialize_resets_counters() {
        let mut p = Passthrough::new(10);
        p.initialize(0);
        p.run(StateMap::new()).expect("run");
        p.initialize(1000);
        assert_eq!(p.timing().executions(), 0);
        assert_eq!(p.next_run_at(), 1010);
    }

    #[test]
    fn default_role_is_neutral() {
        let p = Passthrough::new(10);
        assert_eq!(p.role(), ProcessRole::Neutral);
    }

    struct Failing {
        core: ProcessCore,
    }

    impl Identified for Failing {
        fn name(&self) -> &str {
            self.core.name()
        }
        fn id(&self) -> EntityId {
            self.core.id()
        }
    }

    impl Process for Failing {
        fn interval_ns(&self) -> u64 {
            self.core.interval_ns()
        }
        fn timing(&self) -> &Timing {
            self.core.timing()
        }
        fn timing_mut(&mut self) -> &mut Timing {
            self.core.timing_mut()
        }
        fn think(&mut self) -> Result<(), ProcessError> {
            Err(ProcessError::ExecutionFailed("deliberate".into()))
        }
    }

    #[test]
    fn operational_failure_passes_input_through() {
        let mut p = Failing {
            core: ProcessCore::new("broken", 10),
        };
        p.initialize(0);
        let input = sample_map();
        let output = p.run(input.clone()).expect("pass-through");
        assert_eq!(output, input);
        // cadence still advances
        assert_eq!(p.timing().executions(), 1);
    }

    #[test]
    fn role_display() {
        assert_eq!(format!("{}", ProcessRole::Environment), "environment");
        assert_eq!(format!("{}", ProcessRole::Controller), "controller");
        assert_eq!(format!("{}", ProcessRole::Neutral), "neutral");
    }

    #[test]
    fn timing_saturates_instead_of_overflowing() {
        let mut t = Timing::default();
        t.reset(u64::MAX - 5);
        assert_eq!(t.next_run_at(u64::MAX), u64::MAX);
    }
}
