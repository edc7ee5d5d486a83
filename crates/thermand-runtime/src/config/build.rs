//! Building process trees and runners from configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use thermand_process::{Collection, Pipeline, Process, System};

use super::{ConfigError, ProcessConfig, RunnerConfig, RunnerVariant};
use crate::controllers::{FixedSpeedController, PidController};
use crate::runner::{FastRunner, StandardRunner};

/// A runner built from configuration.
///
/// The two variants have different driving surfaces (threaded
/// start/stop vs synchronous `run_for`), so the builder hands back an
/// enum rather than erasing them.
pub enum BuiltRunner {
    /// Real-time runner.
    Standard(StandardRunner),
    /// Simulation runner.
    Fast(FastRunner),
}

impl std::fmt::Debug for BuiltRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltRunner::Standard(_) => write!(f, "BuiltRunner::Standard(..)"),
            BuiltRunner::Fast(_) => write!(f, "BuiltRunner::Fast(..)"),
        }
    }
}

/// Validates a configuration tree without building it.
///
/// # Errors
///
/// The first problem found: empty names, duplicate sibling names, or
/// an unbounded history.
pub fn validate_process(config: &ProcessConfig) -> Result<(), ConfigError> {
    if config.name().is_empty() {
        return Err(ConfigError::EmptyName);
    }

    let mut seen = BTreeSet::new();
    for child in config.children() {
        if !seen.insert(child.name().to_string()) {
            return Err(ConfigError::DuplicateName(child.name().to_string()));
        }
        validate_process(child)?;
    }

    if let ProcessConfig::Pid(pid) = config {
        if !pid.history.is_bounded() {
            return Err(ConfigError::UnboundedHistory(pid.name.clone()));
        }
    }
    Ok(())
}

/// Builds a process tree from configuration.
///
/// # Errors
///
/// Any [`validate_process`] error, raised before construction starts.
pub fn build_process(config: &ProcessConfig) -> Result<Box<dyn Process>, ConfigError> {
    validate_process(config)?;
    assemble(config)
}

fn assemble(config: &ProcessConfig) -> Result<Box<dyn Process>, ConfigError> {
    match config {
        ProcessConfig::Pipeline(c) => {
            let mut pipeline = Pipeline::new(&c.name, c.interval_ns);
            for child in &c.children {
                pipeline.append(assemble(child)?)?;
            }
            Ok(Box::new(pipeline))
        }
        ProcessConfig::System(c) => {
            let mut system = System::with_interval(&c.name, c.interval_ns);
            for child in &c.children {
                system.append(assemble(child)?)?;
            }
            Ok(Box::new(system))
        }
        ProcessConfig::FixedSpeed(c) => Ok(Box::new(
            FixedSpeedController::new(&c.name, c.interval_ns)
                .with_settings(c.settings.clone()),
        )),
        ProcessConfig::Pid(c) => Ok(Box::new(
            PidController::new(&c.name, c.interval_ns, &c.sensor, &c.actuator, c.setpoint)
                .with_gains(c.kp, c.ki, c.kd)
                .with_output_range(c.output_min, c.output_max)
                .with_history(c.history.clone()),
        )),
    }
}

/// Returns `true` if this root would be due on every poll.
fn root_is_always_due(config: &ProcessConfig) -> bool {
    match config {
        // A system defers to its children once it has any.
        ProcessConfig::System(c) => c.children.is_empty() && c.interval_ns == 0,
        other => other.interval_ns() == 0,
    }
}

/// Builds a runner and its root tree from configuration.
///
/// # Errors
///
/// Any tree validation error, plus: a standard runner whose root has
/// a zero effective interval ([`ConfigError::InvalidInterval`] - the
/// loop would never sleep).
pub fn build_runner(config: &RunnerConfig) -> Result<BuiltRunner, ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    if config.variant == RunnerVariant::Standard && root_is_always_due(&config.root) {
        return Err(ConfigError::InvalidInterval {
            name: config.root.name().to_string(),
            reason: "zero interval root would spin a standard runner".into(),
        });
    }

    let root = build_process(&config.root)?;
    Ok(match config.variant {
        RunnerVariant::Standard => BuiltRunner::Standard(
            StandardRunner::new(&config.name, root)
                .with_stop_timeout(Duration::from_nanos(config.stop_timeout_ns)),
        ),
        RunnerVariant::Fast => BuiltRunner::Fast(FastRunner::new(&config.name, root)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FixedSpeedConfig, PidConfig, PipelineConfig, SystemConfig};
    use std::collections::BTreeMap;
    use thermand_process::HistoryConfig;

    fn fixed(name: &str) -> ProcessConfig {
        ProcessConfig::FixedSpeed(FixedSpeedConfig {
            name: name.into(),
            interval_ns: 0,
            settings: BTreeMap::from([("fan1".to_string(), 128.0)]),
        })
    }

    fn pipeline(name: &str, interval_ns: u64, children: Vec<ProcessConfig>) -> ProcessConfig {
        ProcessConfig::Pipeline(PipelineConfig {
            name: name.into(),
            interval_ns,
            children,
        })
    }

    #[test]
    fn builds_a_nested_tree() {
        let config = ProcessConfig::System(SystemConfig {
            name: "host".into(),
            interval_ns: 100,
            children: vec![
                pipeline("cpu_zone", 10_000_000, vec![fixed("cpu_fixed")]),
                pipeline("gpu_zone", 30_000_000, vec![fixed("gpu_fixed")]),
            ],
        });
        let process = build_process(&config).expect("build");
        assert_eq!(process.name(), "host");
        assert_eq!(process.interval_ns(), 100);
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = build_process(&fixedlike_with_name("")).expect_err("empty name");
        assert_eq!(err, ConfigError::EmptyName);
    }

    fn fixedlike_with_name(name: &str) -> ProcessConfig {
        ProcessConfig::FixedSpeed(FixedSpeedConfig {
            name: name.into(),
            interval_ns: 0,
            settings: BTreeMap::new(),
        })
    }

    #[test]
    fn duplicate_sibling_names_are_rejected() {
        let config = pipeline("zone", 100, vec![fixed("a"), fixed("a")]);
        let err = build_process(&config).expect_err("duplicate");
        assert_eq!(err, ConfigError::DuplicateName("a".into()));
    }

    #[test]
    fn duplicates_are_caught_deep_in_the_tree() {
        let config = pipeline(
            "outer",
            100,
            vec![pipeline("inner", 0, vec![fixed("x"), fixed("x")])],
        );
        assert!(build_process(&config).is_err());
    }

    #[test]
    fn unbounded_history_is_rejected() {
        let config = ProcessConfig::Pid(PidConfig {
            name: "pid".into(),
            interval_ns: 0,
            sensor: "cpu_temp".into(),
            actuator: "fan1".into(),
            setpoint: 60.0,
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            output_min: 0.0,
            output_max: 255.0,
            history: HistoryConfig {
                max_entries: None,
                max_age_ns: None,
            },
        });
        let err = build_process(&config).expect_err("unbounded");
        assert_eq!(err, ConfigError::UnboundedHistory("pid".into()));
    }

    #[test]
    fn standard_runner_rejects_spinning_root() {
        let config = RunnerConfig {
            name: "main".into(),
            variant: RunnerVariant::Standard,
            stop_timeout_ns: 1,
            root: pipeline("zone", 0, vec![]),
        };
        let err = build_runner(&config).expect_err("spin");
        assert!(matches!(err, ConfigError::InvalidInterval { .. }));
    }

    #[test]
    fn fast_runner_accepts_zero_interval_root() {
        let config = RunnerConfig {
            name: "sim".into(),
            variant: RunnerVariant::Fast,
            stop_timeout_ns: 1,
            root: pipeline("zone", 0, vec![]),
        };
        assert!(matches!(
            build_runner(&config).expect("build"),
            BuiltRunner::Fast(_)
        ));
    }

    #[test]
    fn system_root_with_children_may_have_zero_interval() {
        let config = RunnerConfig {
            name: "main".into(),
            variant: RunnerVariant::Standard,
            stop_timeout_ns: 1,
            root: ProcessConfig::System(SystemConfig {
                name: "host".into(),
                interval_ns: 0,
                children: vec![pipeline("zone", 10_000_000, vec![])],
            }),
        };
        assert!(matches!(
            build_runner(&config).expect("build"),
            BuiltRunner::Standard(_)
        ));
    }

    #[test]
    fn built_tree_round_trips_through_toml() {
        let config = RunnerConfig {
            name: "main".into(),
            variant: RunnerVariant::Standard,
            stop_timeout_ns: 5_000_000_000,
            root: pipeline("zone", 100_000_000, vec![fixed("fixed")]),
        };
        let toml = config.to_toml().expect("serialize");
        let back = RunnerConfig::from_toml(&toml).expect("deserialize");
        assert!(matches!(
            build_runner(&back).expect("build"),
            BuiltRunner::Standard(_)
        ));
    }
}
