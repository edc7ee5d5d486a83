//! The device-modification permission arbiter.
//!
//! Thermal control depends on one separation of concerns:
//! **Environments own sensor values; Controllers own actuator values.**
//! A controller that rewrites a temperature reading creates false
//! feedback and can drive the loop into thermal runaway; an
//! environment that rewrites a commanded fan speed silently overrides
//! the decision layer. Both are programming bugs, and the arbiter
//! turns them into hard errors instead of latent corruption.
//!
//! # Rule Matrix
//!
//! | Producer | Sensors | Actuator values | Introduce devices | Drop devices |
//! |----------|---------|-----------------|-------------------|--------------|
//! | Environment | full control | carry through only | allowed (discovery) | allowed |
//! | Controller | untouched | full control | forbidden | forbidden |
//! | Neutral | - | - | unconstrained | unconstrained |
//!
//! A device's kind (sensor vs actuator) may never change under any
//! role, and a quality latched to `failed`/`unavailable` may only be
//! lifted by an environment re-attesting the device.
//!
//! # Mechanics
//!
//! The check is a device-by-device comparison of a producer's input
//! and output state maps against its statically advertised
//! [`ProcessRole`]. It runs after every tick, inside
//! [`Process::run`](crate::Process::run). Violations are fatal: they
//! escape the pass-through policy, bubble out of pipelines and
//! systems, and halt the runner.

use serde::{Deserialize, Serialize};
use thermand_state::{Device, StateMap};
use thermand_types::ErrorCode;
use thiserror::Error;

use crate::ProcessRole;

/// A forbidden state transition produced by a process.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PermissionViolation {
    /// An environment changed an actuator's commanded value.
    #[error(
        "environment rewrote actuator '{device}' in role '{role}': {from} -> {to}"
    )]
    ActuatorRewrite {
        /// Role name the device appeared under.
        role: String,
        /// Device name.
        device: String,
        /// Input value.
        from: f64,
        /// Output value.
        to: f64,
    },

    /// A controller changed a sensor's reported value.
    #[error("controller rewrote sensor '{device}' in role '{role}': {from} -> {to}")]
    SensorRewrite {
        /// Role name the device appeared under.
        role: String,
        /// Device name.
        device: String,
        /// Input value.
        from: f64,
        /// Output value.
        to: f64,
    },

    /// A controller emitted a device absent from its input.
    #[error("controller introduced device '{device}' in role '{role}'")]
    DeviceMinted {
        /// Role name the device appeared under.
        role: String,
        /// Device name.
        device: String,
    },

    /// A controller dropped a device its input carried.
    #[error("controller dropped device '{device}' from role '{role}'")]
    DeviceRemoved {
        /// Role name the device was dropped from.
        role: String,
        /// Device name.
        device: String,
    },

    /// A known device name changed kind between input and output.
    #[error("device '{device}' changed kind in role '{role}'")]
    KindChanged {
        /// Role name the device appeared under.
        role: String,
        /// Device name.
        device: String,
    },

    /// A controller lifted a latched (`failed`/`unavailable`) quality.
    #[error("controller lifted latched quality on '{device}' in role '{role}'")]
    QualityLifted {
        /// Role name the device appeared under.
        role: String,
        /// Device name.
        device: String,
    },
}

impl ErrorCode for PermissionViolation {
    fn code(&self) -> &'static str {
        match self {
            Self::ActuatorRewrite { .. } => "PERMISSION_ACTUATOR_REWRITE",
            Self::SensorRewrite { .. } => "PERMISSION_SENSOR_REWRITE",
            Self::DeviceMinted { .. } => "PERMISSION_DEVICE_MINTED",
            Self::DeviceRemoved { .. } => "PERMISSION_DEVICE_REMOVED",
            Self::KindChanged { .. } => "PERMISSION_KIND_CHANGED",
            Self::QualityLifted { .. } => "PERMISSION_QUALITY_LIFTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Bit-exact value comparison: pass-through must preserve NaN payloads
/// without tripping the arbiter.
fn value_changed(a: &Device, b: &Device) -> bool {
    a.value().to_bits() != b.value().to_bits()
}

/// Finds a device by name anywhere in the input map.
fn find_anywhere<'a>(map: &'a StateMap, name: &str) -> Option<&'a Device> {
    map.iter().find_map(|(_, state)| state.device(name))
}

/// Verifies that `output` is a transition `role` is allowed to produce
/// from `input`.
///
/// Runs on every tick for every process; neutral producers return
/// immediately.
///
/// # Errors
///
/// The first violation found, in deterministic (role, device) order.
pub fn check_transition(
    role: ProcessRole,
    input: &StateMap,
    output: &StateMap,
) -> Result<(), PermissionViolation> {
    match role {
        ProcessRole::Neutral => Ok(()),
        ProcessRole::Environment => check_environment(input, output),
        ProcessRole::Controller => check_controller(input, output),
    }
}

fn check_environment(
    input: &StateMap,
    output: &StateMap,
) -> Result<(), PermissionViolation> {
    for (role, out_state) in output.iter() {
        let in_state = input.state(role);
        for device in out_state.iter() {
            // Kind stability against any prior appearance of the name.
            if let Some(prior) = find_anywhere(input, device.name()) {
                if prior.kind() != device.kind() {
                    return Err(PermissionViolation::KindChanged {
                        role: role.to_string(),
                        device: device.name().to_string(),
                    });
                }
            }
            // Actuator values are carried through, never rewritten.
            if let Some(prior) = in_state.and_then(|s| s.device(device.name())) {
                if device.is_actuator() && value_changed(prior, device) {
                    return Err(PermissionViolation::ActuatorRewrite {
                        role: role.to_string(),
                        device: device.name().to_string(),
                        from: prior.value(),
                        to: device.value(),
                    });
                }
            }
            // New names are discovery; removal is hardware vanishing.
        }
    }
    Ok(())
}

fn check_controller(
    input: &StateMap,
    output: &StateMap,
) -> Result<(), PermissionViolation> {
    // Nothing the input carried may disappear.
    for (role, in_state) in input.iter() {
        for device in in_state.iter() {
            let survives = output
                .state(role)
                .is_some_and(|s| s.contains(device.name()));
            if !survives {
                return Err(PermissionViolation::DeviceRemoved {
                    role: role.to_string(),
                    device: device.name().to_string(),
                });
            }
        }
    }

    for (role, out_state) in output.iter() {
        let in_state = input.state(role);
        for device in out_state.iter() {
            let Some(prior_anywhere) = find_anywhere(input, device.name()) else {
                return Err(PermissionViolation::DeviceMinted {
                    role: role.to_string(),
                    device: device.name().to_string(),
                });
            };
            if prior_anywhere.kind() != device.kind() {
                return Err(PermissionViolation::KindChanged {
                    role: role.to_string(),
                    device: device.name().to_string(),
                });
            }

            // Same-role comparison when available, otherwise the
            // device is a copy into a new role and is compared against
            // its origin.
            let prior = in_state
                .and_then(|s| s.device(device.name()))
                .unwrap_or(prior_anywhere);

            if device.is_sensor() && value_changed(prior, device) {
                return Err(PermissionViolation::SensorRewrite {
                    role: role.to_string(),
                    device: device.name().to_string(),
                    from: prior.value(),
                    to: device.value(),
                });
            }

            // Only an environment re-attests a latched device.
            if prior.quality().is_latched() && !device.quality().is_latched() {
                return Err(PermissionViolation::QualityLifted {
                    role: role.to_string(),
                    device: device.name().to_string(),
                });
            }
        }
    }
    Ok(())
}
