//! Immutable device snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Device, StateError};

/// A snapshot of devices at a moment in time.
///
/// A `State` maps device name → [`Device`]. It is unopinionated about
/// meaning; its role (`"actual"`, `"desired"`) is given by the
/// [`StateMap`](crate::StateMap) slot it occupies.
///
/// States are immutable: no public in-place mutators exist, and every
/// modification returns a fresh value. Map keying guarantees that no
/// two devices in one state share a name. Iteration order is the
/// device-name order (the backing map is a `BTreeMap`), which keeps
/// downstream behaviour deterministic.
///
/// # Example
///
/// ```
/// use thermand_state::{Device, State};
///
/// let state = State::new()
///     .with_device(Device::sensor("cpu_temp").with_value(50.0, 100))
///     .with_device(Device::actuator("fan1"));
///
/// assert_eq!(state.len(), 2);
/// assert!(state.contains("fan1"));
///
/// let cooler = state.with_device(
///     Device::sensor("cpu_temp").with_value(45.0, 200),
/// );
/// // the original snapshot is untouched
/// assert_eq!(state.device("cpu_temp").map(|d| d.value()), Some(50.0));
/// assert_eq!(cooler.device("cpu_temp").map(|d| d.value()), Some(45.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    devices: BTreeMap<String, Device>,
}

impl State {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a state from devices, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateDevice`] if two devices share a
    /// name.
    pub fn try_from_devices(
        devices: impl IntoIterator<Item = Device>,
    ) -> Result<Self, StateError> {
        let mut map = BTreeMap::new();
        for device in devices {
            let name = device.name().to_string();
            if map.insert(name.clone(), device).is_some() {
                return Err(StateError::DuplicateDevice(name));
            }
        }
        Ok(Self { devices: map })
    }

    /// Looks up a device by name.
    #[must_use]
    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    /// Returns `true` if a device with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    /// Device names in deterministic (sorted) order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }

    /// Number of devices in this state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if the state holds no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterates devices in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Returns a new state with the device added or replaced.
    #[must_use]
    pub fn with_device(&self, device: Device) -> Self {
        let mut devices = self.devices.clone();
        devices.insert(device.name().to_string(), device);
        Self { devices }
    }

    /// Returns a new state with all given devices added or replaced.
    #[must_use]
    pub fn with_devices(&self, devices: impl IntoIterator<Item = Device>) -> Self {
        let mut map = self.devices.clone();
        for device in devices {
            map.insert(device.name().to_string(), device);
        }
        Self { devices: map }
    }

    /// Returns a new state without the named device.
    ///
    /// Removing an absent name is a no-op.
    #[must_use]
    pub fn without_device(&self, name: &str) -> Self {
        let mut devices = self.devices.clone();
        devices.remove(name);
        Self { devices }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "State({} devices: ", self.len())?;
        for (i, name) in self.devices.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, ")")
    }
}
