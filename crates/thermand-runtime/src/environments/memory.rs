//! An environment over an in-memory device table.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thermand_process::{Identified, Process, ProcessCore, ProcessError, ProcessRole, Timing};
use thermand_state::{Device, Quality, State, StateMap};
use thermand_types::{time, EntityId};

/// An environment whose "hardware" is an in-memory device table.
///
/// Behaviour per tick, identical at any pipeline position:
///
/// 1. **Write outward**: if the input carries `"desired"`, matching
///    actuator values are applied to the table (the table *is* the
///    hardware here).
/// 2. **Read**: publish `"actual"` - sensors snapshotted from the
///    table, stamped with the current time and re-attested `Valid`.
///    Actuators already present in the input are carried through
///    untouched (their values belong to the controllers); actuators
///    the input lacks are introduced from the table, which is how
///    first-tick discovery happens.
/// 3. All other input roles pass through untouched.
///
/// # Head and Tail of One Pipeline
///
/// The classic flow reads at the head and writes at the tail with the
/// *same* hardware. [`alias`](MemoryEnvironment::alias) creates a
/// second process handle over the shared table for that:
///
/// ```
/// use thermand_process::{Collection, Pipeline, Process};
/// use thermand_runtime::MemoryEnvironment;
/// use thermand_state::Device;
///
/// let head = MemoryEnvironment::new("env_read", 0, vec![
///     Device::sensor("cpu_temp").with_value(50.0, 0),
///     Device::actuator("fan1"),
/// ]);
/// let tail = head.alias("env_write");
///
/// let mut pipeline = Pipeline::new("cpu_zone", 100_000_000);
/// pipeline.append(Box::new(head)).unwrap();
/// // … controller goes here …
/// pipeline.append(Box::new(tail)).unwrap();
/// ```
///
/// The table handle stays valid after the environment moves into a
/// runner, so tests and outward I/O adapters can observe applied
/// actuator settings via [`applied`](MemoryEnvironment::applied) and
/// feed sensor changes via [`set_reading`](MemoryEnvironment::set_reading).
pub struct MemoryEnvironment {
    core: ProcessCore,
    table: Arc<Mutex<BTreeMap<String, Device>>>,
}

impl MemoryEnvironment {
    /// Creates an environment owning a fresh table.
    ///
    /// Later devices win on duplicate names, matching discovery
    /// semantics (the last enumeration of a name is current).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        interval_ns: u64,
        devices: impl IntoIterator<Item = Device>,
    ) -> Self {
        let table = devices
            .into_iter()
            .map(|device| (device.name().to_string(), device))
            .collect();
        Self {
            core: ProcessCore::new(name, interval_ns),
            table: Arc::new(Mutex::new(table)),
        }
    }

    /// Creates another process handle over the same table.
    ///
    /// Used to place one piece of hardware at both the head and the
    /// tail of a pipeline under distinct child names.
    #[must_use]
    pub fn alias(&self, name: impl Into<String>) -> Self {
        Self {
            core: ProcessCore::new(name, self.core.interval_ns()),
            table: self.table.clone(),
        }
    }

    /// The currently applied value of a table device.
    #[must_use]
    pub fn applied(&self, name: &str) -> Option<f64> {
        self.table.lock().get(name).map(Device::value)
    }

    /// Overwrites a sensor reading in the table (the world changed).
    ///
    /// Returns `false` if the table has no such device.
    pub fn set_reading(&self, name: &str, value: f64) -> bool {
        let mut table = self.table.lock();
        match table.get_mut(name) {
            Some(device) => {
                *device = device.clone().with_value(value, time::now_ns());
                true
            }
            None => false,
        }
    }
}

impl Identified for MemoryEnvironment {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn id(&self) -> EntityId {
        self.core.id()
    }
}

impl Process for MemoryEnvironment {
    fn role(&self) -> ProcessRole {
        ProcessRole::Environment
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

    fn import_state(&mut self, input: &StateMap) -> Result<(), ProcessError> {
        // Write outward: desired actuator values land in the table.
        let Some(desired) = input.desired() else {
            return Ok(());
        };
        let mut table = self.table.lock();
        for device in desired.iter() {
            if !device.is_actuator() {
                continue;
            }
            if let Some(entry) = table.get_mut(device.name()) {
                if entry.is_actuator() {
                    *entry = entry
                        .clone()
                        .with_value(device.value(), device.timestamp_ns());
                }
            }
        }
        Ok(())
    }

    fn export_state(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let now_ns = time::now_ns();
        let base = input.actual().cloned().unwrap_or_else(State::new);
        let mut next = base.clone();

        let table = self.table.lock();
        for (name, device) in table.iter() {
            if device.is_sensor() {
                next = next.with_device(
                    device
                        .clone()
                        .with_value(device.value(), now_ns)
                        .with_quality(Quality::Valid),
                );
            } else if !base.contains(name) {
                // First sight of this actuator: discovery.
                next = next.with_device(device.clone().with_timestamp(now_ns));
            }
            // Actuators the input already carries stay untouched.
        }
        drop(table);

        Ok(input.with_actual(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> MemoryEnvironment {
        MemoryEnvironment::new(
            "env",
            0,
            vec![
                Device::sensor("cpu_temp").with_value(50.0, 0),
                Device::actuator("fan1").with_value(0.0, 0),
            ],
        )
    }

    #[test]
    fn publishes_sensors_and_discovers_actuators() {
        let mut env = env();
        let output = env.run(StateMap::new()).expect("run");
        let actual = output.actual().expect("actual");
        assert_eq!(actual.device("cpu_temp").map(Device::value), Some(50.0));
        assert_eq!(actual.device("fan1").map(Device::value), Some(0.0));
        assert_eq!(
            actual.device("cpu_temp").map(Device::quality),
            Some(Quality::Valid)
        );
    }

    #[test]
    fn carries_driven_actuators_untouched() {
        let mut env = env();
        let input = StateMap::new().with_actual(
            State::new().with_device(Device::actuator("fan1").with_value(128.0, 10)),
        );
        let output = env.run(input).expect("run");
        assert_eq!(
            output
                .actual()
                .and_then(|s| s.device("fan1"))
                .map(Device::value),
            Some(128.0)
        );
    }

    #[test]
    fn applies_desired_to_table() {
        let mut env = env();
        let input = StateMap::new().with_desired(
            State::new().with_device(Device::actuator("fan1").with_value(200.0, 10)),
        );
        env.run(input).expect("run");
        assert_eq!(env.applied("fan1"), Some(200.0));
    }

    #[test]
    fn desired_sensors_are_ignored_outward() {
        let mut env = env();
        let input = StateMap::new().with_desired(
            State::new().with_device(Device::sensor("cpu_temp").with_value(99.0, 10)),
        );
        env.run(input).expect("run");
        assert_eq!(env.applied("cpu_temp"), Some(50.0));
    }

    #[test]
    fn unknown_roles_pass_through() {
        let mut env = env();
        let input = StateMap::new().with_state("forecast", State::new());
        let output = env.run(input).expect("run");
        assert!(output.contains("forecast"));
    }

    #[test]
    fn alias_shares_the_table() {
        let head = env();
        let mut tail = head.alias("env_write");
        assert_eq!(tail.name(), "env_write");

        let input = StateMap::new().with_desired(
            State::new().with_device(Device::actuator("fan1").with_value(64.0, 10)),
        );
        tail.run(input).expect("run");
        // visible through the original handle
        assert_eq!(head.applied("fan1"), Some(64.0));
    }

    #[test]
    fn set_reading_changes_the_world() {
        let mut environment = env();
        assert!(environment.set_reading("cpu_temp", 75.0));
        assert!(!environment.set_reading("nope", 1.0));

        let output = environment.run(StateMap::new()).expect("run");
        assert_eq!(
            output
                .actual()
                .and_then(|s| s.device("cpu_temp"))
                .map(Device::value),
            Some(75.0)
        );
    }

    #[test]
    fn sensor_timestamps_advance() {
        use std::sync::Arc;
        use thermand_types::time::{SimulatedClock, TimeSourceGuard};

        let clock = Arc::new(SimulatedClock::new());
        let _guard = TimeSourceGuard::install(clock.clone());
        let mut env = env();

        clock.set(100);
        let first = env.run(StateMap::new()).expect("run");
        clock.set(200);
        let second = env.run(first).expect("run");

        let stamp = |map: &StateMap| {
            map.actual()
                .and_then(|s| s.device("cpu_temp"))
                .map(Device::timestamp_ns)
        };
        assert_eq!(stamp(&second), Some(200));
    }
}
