//! Proportional-integral-derivative control.

use serde::Serialize;
use thermand_process::{
    History, HistoryConfig, Identified, Process, ProcessCore, ProcessError, ProcessRole, Timing,
};
use thermand_state::StateMap;
use thermand_types::{time, EntityId};
use tracing::debug;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// The terms computed on the last tick, for debugging and tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PidTerms {
    /// Setpoint minus reading.
    pub error: f64,
    /// Error derivative, per second.
    pub derivative: f64,
    /// Accumulated integral, error-seconds.
    pub integral: f64,
    /// Clamped actuator output.
    pub output: f64,
}

/// A PID controller over one sensor and one actuator.
///
/// The canonical stateful process: each tick it records the incoming
/// state map into its [`History`], reads the configured sensor from
/// the newest sample, and drives the configured actuator with
///
/// ```text
/// output = clamp(kp·e + ki·∫e dt + kd·de/dt)
/// ```
///
/// The derivative comes from the two newest buffered samples, with dt
/// taken from their timestamps - under a simulated clock the terms are
/// exactly reproducible. The integrator and history are runtime state:
/// `initialize` clears both, and only the configuration (gains,
/// setpoint, retention bounds) is serializable.
///
/// Readings whose quality is not usable (`failed`/`unavailable`) are
/// skipped: the controller holds its last output rather than act on a
/// value nobody vouches for.
///
/// # Example
///
/// ```
/// use thermand_runtime::PidController;
///
/// let controller = PidController::new("cpu_pid", 100_000_000, "cpu_temp", "fan1", 65.0)
///     .with_gains(-4.0, -0.5, -1.0)
///     .with_output_range(0.0, 255.0);
/// ```
pub struct PidController {
    core: ProcessCore,
    sensor: String,
    actuator: String,
    setpoint: f64,
    kp: f64,
    ki: f64,
    kd: f64,
    output_min: f64,
    output_max: f64,
    history: History,
    integral: f64,
    last_terms: Option<PidTerms>,
}

impl PidController {
    /// Creates a controller with unit proportional gain and a
    /// `0..=255` output range (PWM-style).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        interval_ns: u64,
        sensor: impl Into<String>,
        actuator: impl Into<String>,
        setpoint: f64,
    ) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            sensor: sensor.into(),
            actuator: actuator.into(),
            setpoint,
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            output_min: 0.0,
            output_max: 255.0,
            history: History::new(HistoryConfig::default()),
            integral: 0.0,
            last_terms: None,
        }
    }

    /// Sets the three gains (builder style).
    #[must_use]
    pub fn with_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// Sets the output clamp range (builder style).
    #[must_use]
    pub fn with_output_range(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    /// Replaces the history retention bounds (builder style).
    #[must_use]
    pub fn with_history(mut self, config: HistoryConfig) -> Self {
        self.history = History::new(config);
        self
    }

    /// The terms computed on the last tick, if any.
    #[must_use]
    pub fn last_terms(&self) -> Option<PidTerms> {
        self.last_terms
    }

    /// Debug summary of the underlying history buffer.
    #[must_use]
    pub fn history_summary(&self) -> serde_json::Value {
        self.history.summary()
    }

    fn reading_from(&self, states: &StateMap) -> Option<(u64, f64)> {
        let device = states.actual()?.device(&self.sensor)?;
        if !device.quality().is_usable() {
            return None;
        }
        Some((device.timestamp_ns(), device.value()))
    }
}

impl Identified for PidController {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn id(&self) -> EntityId {
        self.core.id()
    }
}

impl Process for PidController {
    fn role(&self) -> ProcessRole {
        ProcessRole::Controller
    }

    fn interval_ns(&self) -> u64 {
        self.core.interval_ns()
    }

    fn timing(&self) -> &Timing {
        self.core.timing()
    }

    fn timing_mut(&mut self) -> &mut Timing {
        self.core.timing_mut()
    }

    fn initialize(&mut self, now_ns: u64) {
        self.core.timing_mut().reset(now_ns);
        self.history.reset();
        self.integral = 0.0;
        self.last_terms = None;
    }

    fn import_state(&mut self, input: &StateMap) -> Result<(), ProcessError> {
        self.history.record(time::now_ns(), input)
    }

    fn think(&mut self) -> Result<(), ProcessError> {
        // Two newest samples carrying a usable reading.
        let samples: Vec<(u64, f64)> = self
            .history
            .buffer()
            .iter()
            .filter_map(|(_, states)| self.reading_from(states))
            .collect();

        let Some(&(now_ns, reading)) = samples.last() else {
            debug!(
                controller = %self.core.name(),
                sensor = %self.sensor,
                "no usable reading; holding output"
            );
            return Ok(());
        };
        let error = self.setpoint - reading;

        let mut derivative = 0.0;
        if samples.len() >= 2 {
            let (prev_ns, prev_reading) = samples[samples.len() - 2];
            let dt_s = (now_ns.saturating_sub(prev_ns)) as f64 / NANOS_PER_SEC;
            if dt_s > 0.0 {
                let prev_error = self.setpoint - prev_reading;
                derivative = (error - prev_error) / dt_s;
                self.integral += error * dt_s;
            }
        }

        let raw = self.kp * error + self.ki * self.integral + self.kd * derivative;
        let output = raw.clamp(self.output_min, self.output_max);

        self.last_terms = Some(PidTerms {
            error,
            derivative,
            integral: self.integral,
            output,
        });
        Ok(())
    }

    fn export_state(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let Some(terms) = self.last_terms else {
            return Ok(input);
        };
        let now_ns = time::now_ns();
        let mut output = input.clone();

        // Value-replace wherever the actuator already appears.
        for (role, state) in input.iter() {
            match state.device(&self.actuator) {
                Some(device) if device.is_actuator() => {
                    output = output.with_state(
                        role,
                        state.with_device(device.clone().with_value(terms.output, now_ns)),
                    );
                }
                _ => {}
            }
        }

        // Project the command into "desired" for the tail environment.
        let known = input
            .iter()
            .find_map(|(_, state)| state.device(&self.actuator))
            .filter(|device| device.is_actuator());
        if let Some(device) = known {
            let desired = output.desired().cloned().unwrap_or_default();
            output = output.with_desired(
                desired.with_device(device.clone().with_value(terms.output, now_ns)),
            );
        }
        Ok(output)
    }
}
