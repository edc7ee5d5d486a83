//! Execution layer for thermand.
//!
//! This crate hosts everything that *drives* the process abstraction
//! defined in [`thermand_process`]:
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`StandardRunner`] | real-time loop in a background thread |
//! | [`FastRunner`] | simulated-time loop for tests and what-if runs |
//! | [`config`] | serializable configuration + TOML + tree builder |
//! | [`MemoryEnvironment`] | in-memory device table environment |
//! | [`FixedSpeedController`], [`PidController`] | built-in controllers |
//!
//! # A Complete Loop
//!
//! ```
//! use thermand_process::{Collection, Pipeline, Process};
//! use thermand_runtime::{FastRunner, MemoryEnvironment, PidController};
//! use thermand_state::Device;
//!
//! let env = MemoryEnvironment::new("env_read", 0, vec![
//!     Device::sensor("cpu_temp").with_value(70.0, 0),
//!     Device::actuator("fan1"),
//! ]);
//! let table = env.alias("env_write");
//!
//! let pid = PidController::new("cpu_pid", 0, "cpu_temp", "fan1", 60.0)
//!     .with_gains(-8.0, 0.0, 0.0)
//!     .with_output_range(0.0, 255.0);
//!
//! let mut pipeline = Pipeline::new("cpu_zone", 100_000_000);
//! pipeline.append(Box::new(env)).unwrap();
//! pipeline.append(Box::new(pid)).unwrap();
//! pipeline.append(Box::new(table.alias("env_apply"))).unwrap();
//!
//! let mut runner = FastRunner::new("sim", Box::new(pipeline));
//! runner.run_for(1_000_000_000).unwrap(); // one simulated second
//!
//! // hot CPU, error −10, proportional gain −8 → fan driven to 80
//! assert_eq!(table.applied("fan1"), Some(80.0));
//! ```

pub mod config;
mod controllers;
mod environments;
mod runner;

pub use config::{BuiltRunner, ConfigError, ProcessConfig, RunnerConfig, RunnerVariant};
pub use controllers::{FixedSpeedController, PidController, PidTerms};
pub use environments::MemoryEnvironment;
pub use runner::{FastRunner, RunnerError, RunnerState, StandardRunner};
