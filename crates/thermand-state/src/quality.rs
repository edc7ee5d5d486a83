//! Per-device attestation quality.

use serde::{Deserialize, Serialize};

/// How well a device is currently functioning.
///
/// Quality is attested by Environments when they read hardware. It
/// latches downward: once a device is reported `Failed` or
/// `Unavailable`, only an Environment may reset it to `Valid` - a
/// controller deciding a reading "looks fine again" would corrupt the
/// feedback loop.
///
/// | Quality | Meaning | Usable for control |
/// |---------|---------|--------------------|
/// | `Valid` | Fresh, trusted reading | Yes |
/// | `Stale` | Last reading is old but plausible | Yes, cautiously |
/// | `Failed` | Read or write errored | No |
/// | `Unavailable` | Device not present right now | No |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Fresh, trusted reading or setting.
    #[default]
    Valid,

    /// The last update is old; the value may no longer reflect reality.
    Stale,

    /// The last hardware access errored.
    Failed,

    /// The device is known but not currently reachable.
    Unavailable,
}

impl Quality {
    /// Returns `true` if a control algorithm may act on the value.
    ///
    /// ```
    /// use thermand_state::Quality;
    ///
    /// assert!(Quality::Valid.is_usable());
    /// assert!(Quality::Stale.is_usable());
    /// assert!(!Quality::Failed.is_usable());
    /// ```
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Valid | Self::Stale)
    }

    /// Returns `true` if the quality is latched down.
    ///
    /// Latched qualities may only be lifted by an Environment
    /// re-attesting the device.
    #[must_use]
    pub fn is_latched(&self) -> bool {
        matches!(self, Self::Failed | Self::Unavailable)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Stale => write!(f, "stale"),
            Self::Failed => write!(f, "failed"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}
