//! Serializable configuration types.
//!
//! Only configuration persists across daemon restarts: process trees,
//! cadences, gains, retention bounds. Buffers, integrators, and
//! schedules are runtime state, rebuilt by `initialize`.
//!
//! Configurations serialize to TOML. A minimal daemon:
//!
//! ```toml
//! name = "main"
//! variant = "standard"
//!
//! [root]
//! kind = "pipeline"
//! name = "cpu_zone"
//! interval_ns = 100000000
//!
//! [[root.children]]
//! kind = "fixed_speed"
//! name = "full_blast"
//!
//! [root.children.settings]
//! fan1 = 255.0
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thermand_process::{HistoryConfig, DEFAULT_INTERVAL_NS};

use super::ConfigError;

fn default_interval_ns() -> u64 {
    DEFAULT_INTERVAL_NS
}

fn default_stop_timeout_ns() -> u64 {
    5_000_000_000
}

fn default_output_max() -> f64 {
    255.0
}

/// Configuration of one process, tagged by kind.
///
/// Composites carry child configurations; leaves carry their own
/// parameters. Every kind has a `name` (required, unique within its
/// parent) and an `interval_ns` cadence (`0` = driven by parent
/// polls).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessConfig {
    /// Serial composition.
    Pipeline(PipelineConfig),
    /// Parallel coordination.
    System(SystemConfig),
    /// Constant-output controller.
    FixedSpeed(FixedSpeedConfig),
    /// PID controller.
    Pid(PidConfig),
}

impl ProcessConfig {
    /// The configured process name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Pipeline(c) => &c.name,
            Self::System(c) => &c.name,
            Self::FixedSpeed(c) => &c.name,
            Self::Pid(c) => &c.name,
        }
    }

    /// The configured cadence.
    #[must_use]
    pub fn interval_ns(&self) -> u64 {
        match self {
            Self::Pipeline(c) => c.interval_ns,
            Self::System(c) => c.interval_ns,
            Self::FixedSpeed(c) => c.interval_ns,
            Self::Pid(c) => c.interval_ns,
        }
    }

    /// Child configurations, for composites.
    #[must_use]
    pub fn children(&self) -> &[ProcessConfig] {
        match self {
            Self::Pipeline(c) => &c.children,
            Self::System(c) => &c.children,
            Self::FixedSpeed(_) | Self::Pid(_) => &[],
        }
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Deserializes from TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the text is not a valid configuration.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

/// Configuration of a [`Pipeline`](thermand_process::Pipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Unique name within the parent.
    pub name: String,

    /// Tick cadence; children run at this cadence, in order.
    #[serde(default = "default_interval_ns")]
    pub interval_ns: u64,

    /// Ordered child configurations.
    #[serde(default)]
    pub children: Vec<ProcessConfig>,
}

/// Configuration of a [`System`](thermand_process::System).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Unique name within the parent.
    pub name: String,

    /// Own cadence, used only while the system has no children.
    #[serde(default = "default_interval_ns")]
    pub interval_ns: u64,

    /// Child configurations; order defines same-instant tie-breaking.
    #[serde(default)]
    pub children: Vec<ProcessConfig>,
}

/// Configuration of a [`FixedSpeedController`](crate::FixedSpeedController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedSpeedConfig {
    /// Unique name within the parent.
    pub name: String,

    /// Tick cadence; `0` when nested in a pipeline.
    #[serde(default)]
    pub interval_ns: u64,

    /// Actuator name → fixed value.
    #[serde(default)]
    pub settings: BTreeMap<String, f64>,
}

/// Configuration of a [`PidController`](crate::PidController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Unique name within the parent.
    pub name: String,

    /// Tick cadence; `0` when nested in a pipeline.
    #[serde(default)]
    pub interval_ns: u64,

    /// Sensor to read from `"actual"`.
    pub sensor: String,

    /// Actuator to drive.
    pub actuator: String,

    /// Target sensor value.
    pub setpoint: f64,

    /// Proportional gain.
    #[serde(default)]
    pub kp: f64,

    /// Integral gain.
    #[serde(default)]
    pub ki: f64,

    /// Derivative gain.
    #[serde(default)]
    pub kd: f64,

    /// Output clamp, lower bound.
    #[serde(default)]
    pub output_min: f64,

    /// Output clamp, upper bound.
    #[serde(default = "default_output_max")]
    pub output_max: f64,

    /// History retention bounds.
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Which runner drives the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerVariant {
    /// Real time, background thread.
    #[default]
    Standard,

    /// Simulated time, synchronous.
    Fast,
}

/// Configuration of a runner and its root process tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Runner name.
    pub name: String,

    /// Runner variant.
    #[serde(default)]
    pub variant: RunnerVariant,

    /// Bounded wait when joining the execution thread on stop.
    #[serde(default = "default_stop_timeout_ns")]
    pub stop_timeout_ns: u64,

    /// The root process.
    pub root: ProcessConfig,
}

impl RunnerConfig {
    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Deserializes from TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the text is not a valid configuration.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}
