//! Test harness processes.
//!
//! Reusable mock processes for exercising pipelines, systems, and
//! runners without hardware. These are first-class citizens: the
//! crate's own tests use them, and out-of-tree process implementations
//! are encouraged to test against them too.
//!
//! | Mock | Role | Behaviour |
//! |------|------|-----------|
//! | [`NoopProcess`] | Neutral | identity |
//! | [`CountingProcess`] | Neutral | identity + shared tick counter |
//! | [`RecordingProcess`] | Neutral | identity + shared log of observed inputs |
//! | [`FailingProcess`] | Neutral | always fails operationally |
//! | [`StubEnvironment`] | Environment | publishes configured readings into `"actual"` |
//! | [`SensorTamperController`] | Controller | bumps sensor values (permission violator) |
//! | [`ActuatorTamperEnvironment`] | Environment | bumps actuator values (permission violator) |
//!
//! # Example
//!
//! ```
//! use thermand_process::testing::{RecordingProcess, StubEnvironment};
//! use thermand_process::{Collection, Pipeline, Process};
//! use thermand_state::{Device, StateMap};
//!
//! let env = StubEnvironment::new("env", vec![
//!     Device::sensor("cpu_temp").with_value(50.0, 0),
//! ]);
//! let probe = RecordingProcess::new("probe", 0);
//! let log = probe.log();
//!
//! let mut pipeline = Pipeline::new("flow", 0);
//! pipeline.append(Box::new(env)).unwrap();
//! pipeline.append(Box::new(probe)).unwrap();
//! pipeline.initialize(0);
//! pipeline.run(StateMap::new()).unwrap();
//!
//! assert_eq!(log.lock().len(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thermand_state::{Device, State, StateMap};
use thermand_types::{time, EntityId};

use crate::{Identified, Process, ProcessCore, ProcessError, ProcessRole, Timing};

macro_rules! forward_process_core {
    () => {
        fn interval_ns(&self) -> u64 {
            self.core.interval_ns()
        }
        fn timing(&self) -> &Timing {
            self.core.timing()
        }
        fn timing_mut(&mut self) -> &mut Timing {
            self.core.timing_mut()
        }
    };
}

macro_rules! impl_identified {
    ($ty:ty) => {
        impl Identified for $ty {
            fn name(&self) -> &str {
                self.core.name()
            }
            fn id(&self) -> EntityId {
                self.core.id()
            }
        }
    };
}

/// The identity process: returns its input untouched.
pub struct NoopProcess {
    core: ProcessCore,
}

impl NoopProcess {
    /// Identity process with zero interval (driven by parent polls).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_interval(name, 0)
    }

    /// Identity process with an explicit cadence.
    #[must_use]
    pub fn with_interval(name: impl Into<String>, interval_ns: u64) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
        }
    }
}

impl_identified!(NoopProcess);

impl Process for NoopProcess {
    forward_process_core!();
}

/// Identity process that counts its ticks on a shared counter.
pub struct CountingProcess {
    core: ProcessCore,
    count: Arc<AtomicU64>,
}

impl CountingProcess {
    /// Counting process with the given cadence.
    #[must_use]
    pub fn new(name: impl Into<String>, interval_ns: u64) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared handle to the tick counter.
    #[must_use]
    pub fn counter(&self) -> Arc<AtomicU64> {
        self.count.clone()
    }
}

impl_identified!(CountingProcess);

impl Process for CountingProcess {
    forward_process_core!();

    fn think(&mut self) -> Result<(), ProcessError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Identity process that records every input it observes.
pub struct RecordingProcess {
    core: ProcessCore,
    log: Arc<Mutex<Vec<StateMap>>>,
    order_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecordingProcess {
    /// Recording process with the given cadence.
    #[must_use]
    pub fn new(name: impl Into<String>, interval_ns: u64) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            log: Arc::new(Mutex::new(Vec::new())),
            order_log: None,
        }
    }

    /// Recording process that also appends its name to a shared order
    /// log on every tick, for cross-process ordering assertions.
    #[must_use]
    pub fn with_order_log(
        name: impl Into<String>,
        interval_ns: u64,
        order_log: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            log: Arc::new(Mutex::new(Vec::new())),
            order_log: Some(order_log),
        }
    }

    /// Shared handle to the observation log.
    #[must_use]
    pub fn log(&self) -> Arc<Mutex<Vec<StateMap>>> {
        self.log.clone()
    }

    /// Number of ticks observed so far.
    #[must_use]
    pub fn ticks(&self) -> usize {
        self.log.lock().len()
    }
}

impl_identified!(RecordingProcess);

impl Process for RecordingProcess {
    forward_process_core!();

    fn import_state(&mut self, input: &StateMap) -> Result<(), ProcessError> {
        self.log.lock().push(input.clone());
        if let Some(order_log) = &self.order_log {
            order_log.lock().push(self.core.name().to_string());
        }
        Ok(())
    }
}

/// A process that fails operationally on every tick.
pub struct FailingProcess {
    core: ProcessCore,
}

impl FailingProcess {
    /// Failing process with zero interval.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ProcessCore::new(name, 0),
        }
    }
}

impl_identified!(FailingProcess);

impl Process for FailingProcess {
    forward_process_core!();

    fn think(&mut self) -> Result<(), ProcessError> {
        Err(ProcessError::ExecutionFailed(
            "deliberate test failure".into(),
        ))
    }
}

/// An environment stub that publishes configured readings.
///
/// Every tick it overlays its readings onto the input's `"actual"`
/// state: sensors are re-reported with a fresh timestamp, actuators
/// already present in the input are carried through untouched (a
/// controller may have driven them), and devices the input lacks are
/// introduced (first-tick discovery).
///
/// [`StubEnvironment::with_ramp`] makes a reading climb by a fixed
/// step per tick - enough to exercise derivative-computing
/// controllers. `initialize` restores the initial readings so repeated
/// runs are identical.
pub struct StubEnvironment {
    core: ProcessCore,
    initial: Vec<Device>,
    readings: Vec<Device>,
    ramps: BTreeMap<String, f64>,
}

impl StubEnvironment {
    /// Environment stub reporting the given devices, zero interval.
    #[must_use]
    pub fn new(name: impl Into<String>, readings: Vec<Device>) -> Self {
        Self::with_interval(name, 0, readings)
    }

    /// Environment stub with an explicit cadence.
    #[must_use]
    pub fn with_interval(
        name: impl Into<String>,
        interval_ns: u64,
        readings: Vec<Device>,
    ) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            initial: readings.clone(),
            readings,
            ramps: BTreeMap::new(),
        }
    }

    /// Makes the named reading climb by `step` per tick.
    #[must_use]
    pub fn with_ramp(mut self, name: impl Into<String>, step: f64) -> Self {
        self.ramps.insert(name.into(), step);
        self
    }
}

impl_identified!(StubEnvironment);

impl Process for StubEnvironment {
    fn role(&self) -> ProcessRole {
        ProcessRole::Environment
    }

    forward_process_core!();

    fn initialize(&mut self, now_ns: u64) {
        self.core.timing_mut().reset(now_ns);
        self.readings = self.initial.clone();
    }

    fn export_state(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let now_ns = time::now_ns();
        let base = input.actual().cloned().unwrap_or_else(State::new);
        let mut next = base.clone();
        for device in &self.readings {
            // Actuators the input already carries belong to the
            // controllers; only re-report our own sensors and
            // introduce devices the input lacks.
            if device.is_actuator() && base.contains(device.name()) {
                continue;
            }
            next = next.with_device(device.clone().with_value(device.value(), now_ns));
        }
        let output = input.with_actual(next);

        for (name, step) in &self.ramps {
            if let Some(reading) = self.readings.iter_mut().find(|d| d.name() == name) {
                *reading = reading.clone().with_value(reading.value() + step, now_ns);
            }
        }
        Ok(output)
    }
}

/// A controller that rewrites sensor values: a deliberate permission
/// violator for arbiter tests.
pub struct SensorTamperController {
    core: ProcessCore,
}

impl SensorTamperController {
    /// Tampering controller with zero interval.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ProcessCore::new(name, 0),
        }
    }
}

impl_identified!(SensorTamperController);

impl Process for SensorTamperController {
    fn role(&self) -> ProcessRole {
        ProcessRole::Controller
    }

    forward_process_core!();

    fn export_state(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let now_ns = time::now_ns();
        let mut output = input.clone();
        for (role, state) in input.iter() {
            let mut next = state.clone();
            for device in state.iter() {
                if device.is_sensor() {
                    next = next
                        .with_device(device.clone().with_value(device.value() + 1.0, now_ns));
                }
            }
            output = output.with_state(role, next);
        }
        Ok(output)
    }
}

/// An environment that rewrites actuator values: a deliberate
/// permission violator for arbiter tests.
pub struct ActuatorTamperEnvironment {
    core: ProcessCore,
}

impl ActuatorTamperEnvironment {
    /// Tampering environment with zero interval.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ProcessCore::new(name, 0),
        }
    }
}

impl_identified!(ActuatorTamperEnvironment);

impl Process for ActuatorTamperEnvironment {
    fn role(&self) -> ProcessRole {
        ProcessRole::Environment
    }

    forward_process_core!();

    fn export_state(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let now_ns = time::now_ns();
        let mut output = input.clone();
        for (role, state) in input.iter() {
            let mut next = state.clone();
            for device in state.iter() {
                if device.is_actuator() {
                    next = next
                        .with_device(device.clone().with_value(device.value() + 1.0, now_ns));
                }
            }
            output = output.with_state(role, next);
        }
        Ok(output)
    }
}
