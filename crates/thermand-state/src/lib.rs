//! Data model for thermand: devices and the snapshots that carry them.
//!
//! This crate defines the value types that flow between processes:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`Device`] | A named hardware interface point (sensor or actuator) |
//! | [`State`] | An immutable snapshot mapping device name → [`Device`] |
//! | [`StateMap`] | A bundle of named [`State`]s (roles: `"actual"`, `"desired"`, …) |
//!
//! # Immutability
//!
//! States are immutable from the consumer's perspective: there are no
//! in-place mutators. Every modification (`with_device`, `without_device`)
//! returns a fresh value, so a snapshot handed to one process can never
//! be corrupted by another. The same discipline applies to [`Device`]
//! builders and to [`StateMap`].
//!
//! # Data Flow
//!
//! ```text
//! Environment ──▶ StateMap{ "actual": sensors }
//!                       │
//!                       ▼
//! Controller  ──▶ StateMap{ "actual": sensors, actuators′ }
//!                       │
//!                       ▼
//! Environment ──▶ applies actuator values outward
//! ```
//!
//! # Example
//!
//! ```
//! use thermand_state::{Device, State, StateMap};
//!
//! let cpu = Device::sensor("cpu_temp").with_value(52.0, 1_000);
//! let fan = Device::actuator("fan1").with_value(128.0, 1_000);
//!
//! let actual = State::new().with_device(cpu).with_device(fan);
//! let map = StateMap::new().with_actual(actual);
//!
//! assert_eq!(map.actual().and_then(|s| s.device("cpu_temp")).map(|d| d.value()), Some(52.0));
//! ```

mod device;
mod error;
mod property;
mod quality;
mod state;
mod statemap;

pub use device::{Device, DeviceKind};
pub use error::StateError;
pub use property::PropertyValue;
pub use quality::Quality;
pub use state::State;
pub use statemap::StateMap;
