//! Hardware interface points: sensors and actuators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thermand_types::EntityId;

use crate::{PropertyValue, Quality};

/// Well-known extension keys. Kept as constants so Environments and
/// frontends agree on spelling.
mod keys {
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const LABEL: &str = "label";
    pub const UNIT: &str = "unit";
    pub const SCALE: &str = "scale";
    pub const LOCATION: &str = "location";
}

/// Whether a device reports the world or commands it.
///
/// The kind is fixed at construction. A device name keeps its kind for
/// the lifetime of a run; the permission arbiter treats a kind change
/// as a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Reports the world: temperatures, tachometer speeds, voltages.
    Sensor,
    /// Commands the world: fan drive level, pump rate, thermal limit.
    Actuator,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sensor => write!(f, "sensor"),
            Self::Actuator => write!(f, "actuator"),
        }
    }
}

/// A named, uniquely identified hardware interface point.
///
/// The required fields every device carries are first-class:
/// `value` (unit implicit per device), `timestamp_ns` (monotonic
/// nanoseconds of the last update), and `quality` (attestation).
/// Everything else - operating limits, labels, scale factors,
/// hardware locators - lives in an open extension map.
///
/// Devices are value types with copy-on-write builders; updating a
/// reading produces a new `Device`, leaving snapshots that hold the
/// old one untouched.
///
/// # Example
///
/// ```
/// use thermand_state::{Device, DeviceKind, Quality};
///
/// let cpu = Device::sensor("cpu_temp")
///     .with_value(51.5, 1_000_000)
///     .with_unit("C")
///     .with_label("CPU package")
///     .with_range(0.0, 100.0);
///
/// assert_eq!(cpu.kind(), DeviceKind::Sensor);
/// assert_eq!(cpu.value(), 51.5);
/// assert_eq!(cpu.quality(), Quality::Valid);
/// assert_eq!(cpu.max(), Some(100.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    name: String,
    id: EntityId,
    kind: DeviceKind,
    value: f64,
    timestamp_ns: u64,
    quality: Quality,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, PropertyValue>,
}

impl Device {
    /// Creates a sensor with value 0, timestamp 0, `Valid` quality.
    ///
    /// The identifier is derived deterministically from the name so a
    /// rediscovered device keeps its identity across restarts.
    #[must_use]
    pub fn sensor(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::Sensor)
    }

    /// Creates an actuator with value 0, timestamp 0, `Valid` quality.
    #[must_use]
    pub fn actuator(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::Actuator)
    }

    fn new(name: impl Into<String>, kind: DeviceKind) -> Self {
        let name = name.into();
        let id = EntityId::stable(&name);
        Self {
            name,
            id,
            kind,
            value: 0.0,
            timestamp_ns: 0,
            quality: Quality::Valid,
            extra: BTreeMap::new(),
        }
    }

    /// The device's name, unique within a [`State`](crate::State).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device's stable identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether this device is a sensor or an actuator.
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Convenience predicate for [`DeviceKind::Sensor`].
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        self.kind == DeviceKind::Sensor
    }

    /// Convenience predicate for [`DeviceKind::Actuator`].
    #[must_use]
    pub fn is_actuator(&self) -> bool {
        self.kind == DeviceKind::Actuator
    }

    /// Current reading (sensor) or commanded setting (actuator).
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Monotonic nanosecond timestamp of the last update.
    #[must_use]
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    /// Attestation quality of the current value.
    #[must_use]
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Returns a copy with a new value and timestamp.
    ///
    /// This is the update every tick performs; timestamps must be
    /// non-decreasing per device across a run.
    #[must_use]
    pub fn with_value(mut self, value: f64, timestamp_ns: u64) -> Self {
        self.value = value;
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Returns a copy with a new quality attestation.
    #[must_use]
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Returns a copy with a new timestamp, value unchanged.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Returns a copy with an arbitrary extension property set.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with a human-readable label.
    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.with_property(keys::LABEL, label.into())
    }

    /// Returns a copy with a measurement unit (`"C"`, `"RPM"`, `"PWM"`).
    #[must_use]
    pub fn with_unit(self, unit: impl Into<String>) -> Self {
        self.with_property(keys::UNIT, unit.into())
    }

    /// Returns a copy with a raw-to-real conversion factor.
    #[must_use]
    pub fn with_scale(self, scale: f64) -> Self {
        self.with_property(keys::SCALE, scale)
    }

    /// Returns a copy with operating range limits.
    #[must_use]
    pub fn with_range(self, min: f64, max: f64) -> Self {
        self.with_property(keys::MIN, min).with_property(keys::MAX, max)
    }

    /// Returns a copy with an implementation locator (e.g. a hardware
    /// monitor filesystem path).
    #[must_use]
    pub fn with_location(self, location: impl Into<String>) -> Self {
        self.with_property(keys::LOCATION, location.into())
    }

    /// Looks up an extension property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.extra.get(key)
    }

    /// Human-readable label, if set.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.property(keys::LABEL).and_then(PropertyValue::as_text)
    }

    /// Measurement unit, if set.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.property(keys::UNIT).and_then(PropertyValue::as_text)
    }

    /// Raw-to-real conversion factor, if set.
    #[must_use]
    pub fn scale(&self) -> Option<f64> {
        self.property(keys::SCALE).and_then(|p| p.as_number())
    }

    /// Lower operating limit, if set.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.property(keys::MIN).and_then(|p| p.as_number())
    }

    /// Upper operating limit, if set.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.property(keys::MAX).and_then(|p| p.as_number())
    }

    /// Implementation locator, if set.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.property(keys::LOCATION).and_then(PropertyValue::as_text)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}={} ({})",
            self.kind, self.name, self.value, self.quality
        )
    }
}
