//! Configuration surface.
//!
//! Everything the daemon persists lives here: serializable
//! descriptions of process trees and runners, TOML load/save, and the
//! builder that turns a description into a live tree. Validation is
//! strict and happens entirely at build time - a configuration that
//! builds will not fail structurally at tick time.

mod build;
mod error;
mod types;

pub use build::{build_process, build_runner, validate_process, BuiltRunner};
pub use error::ConfigError;
pub use types::{
    FixedSpeedConfig, PidConfig, PipelineConfig, ProcessConfig, RunnerConfig, RunnerVariant,
    SystemConfig,
};
