//! Constant-output control.

use std::collections::BTreeMap;

use thermand_process::{Identified, Process, ProcessCore, ProcessError, ProcessRole, Timing};
use thermand_state::StateMap;
use thermand_types::{time, EntityId};
use tracing::debug;

/// A controller that applies fixed values to actuators.
///
/// The simplest possible decision logic: every tick, each configured
/// actuator is value-replaced with its fixed setting wherever it
/// appears in the input. Useful for testing, debugging, and bring-up,
/// where a constant thermal output is exactly what is wanted.
///
/// Targets absent from the input are skipped (with a debug log) -
/// introducing devices is the environments' privilege, not ours.
///
/// # Example
///
/// ```
/// use thermand_process::Process;
/// use thermand_runtime::FixedSpeedController;
/// use thermand_state::{Device, State, StateMap};
///
/// let mut controller = FixedSpeedController::new("full_blast", 0)
///     .with_setting("fan1", 255.0);
///
/// let input = StateMap::new().with_actual(
///     State::new().with_device(Device::actuator("fan1").with_value(0.0, 0)),
/// );
/// let output = controller.run(input).unwrap();
/// let fan = output.actual().and_then(|s| s.device("fan1")).unwrap();
/// assert_eq!(fan.value(), 255.0);
/// ```
pub struct FixedSpeedController {
    core: ProcessCore,
    settings: BTreeMap<String, f64>,
}

impl FixedSpeedController {
    /// Creates a controller with no settings.
    #[must_use]
    pub fn new(name: impl Into<String>, interval_ns: u64) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            settings: BTreeMap::new(),
        }
    }

    /// Adds a fixed actuator setting (builder style).
    #[must_use]
    pub fn with_setting(mut self, actuator: impl Into<String>, value: f64) -> Self {
        self.settings.insert(actuator.into(), value);
        self
    }

    /// Bulk-replaces the settings table.
    #[must_use]
    pub fn with_settings(mut self, settings: BTreeMap<String, f64>) -> Self {
        self.settings = settings;
        self
    }

    /// The configured settings.
    #[must_use]
    pub fn settings(&self) -> &BTreeMap<String, f64> {
        &self.settings
    }
}

impl Identified for FixedSpeedController {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn id(&self) -> EntityId {
        self.core.id()
    }
}

impl Process for FixedSpeedController {
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

    fn export_state(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let now_ns = time::now_ns();
        let mut output = input.clone();

        // Value-replace wherever the actuator already appears.
        for (role, state) in input.iter() {
            let mut next = state.clone();
            let mut touched = false;
            for (name, value) in &self.settings {
                match state.device(name) {
                    Some(device) if device.is_actuator() => {
                        next = next.with_device(device.clone().with_value(*value, now_ns));
                        touched = true;
                    }
                    Some(_) => {
                        debug!(
                            controller = %self.core.name(),
                            device = %name,
                            "fixed setting targets a sensor; skipping"
                        );
                    }
                    None => {}
                }
            }
            if touched {
                output = output.with_state(role, next);
            }
        }

        // Project the commands into "desired" for the tail environment.
        let mut desired = output.desired().cloned().unwrap_or_default();
        let mut commanded = false;
        for (name, value) in &self.settings {
            let known = input
                .iter()
                .find_map(|(_, state)| state.device(name))
                .filter(|device| device.is_actuator());
            if let Some(device) = known {
                desired = desired.with_device(device.clone().with_value(*value, now_ns));
                commanded = true;
            }
        }
        if commanded {
            output = output.with_desired(desired);
        }
        Ok(output)
    }
}
