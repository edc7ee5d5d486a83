//! Identifier types.
//!
//! All identifiers are UUID-based so they stay unique across processes
//! and machines without coordination.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// thermand namespace UUID for deterministic UUID v5 generation.
///
/// Used as the namespace when deriving stable identifiers for
/// hardware-backed entities.
const THERMAND_NAMESPACE: Uuid = uuid!("6f9d2b1c-55e4-4c1f-9a37-2de0c8a41b6e");

/// Identifier for an entity in the thermand system.
///
/// Entities are the identifiable objects of the daemon: devices,
/// processes, runners. Two UUID strategies are supported:
///
/// - **Stable** ([`EntityId::stable`]): UUID v5 derived from a name.
///   Hardware entities (a temperature sensor at a fixed monitor path,
///   a fan controller) need the same identity across daemon restarts
///   so that logs and persisted configuration keep referring to the
///   same physical thing.
/// - **Random** ([`EntityId::random`]): UUID v4. Ephemeral entities
///   (a pipeline assembled from configuration, a test fixture) get a
///   fresh identity per instantiation.
///
/// # Example
///
/// ```
/// use thermand_types::EntityId;
///
/// let cpu1 = EntityId::stable("cpu_temp");
/// let cpu2 = EntityId::stable("cpu_temp");
/// assert_eq!(cpu1, cpu2); // same name, same identity
///
/// let a = EntityId::random();
/// let b = EntityId::random();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new [`EntityId`] with a random UUID v4.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic [`EntityId`] from a name (UUID v5).
    ///
    /// The same name always produces the same identifier:
    ///
    /// ```
    /// use thermand_types::EntityId;
    ///
    /// assert_eq!(EntityId::stable("fan1"), EntityId::stable("fan1"));
    /// assert_ne!(EntityId::stable("fan1"), EntityId::stable("fan2"));
    /// ```
    #[must_use]
    pub fn stable(name: &str) -> Self {
        Self(Uuid::new_v5(&THERMAND_NAMESPACE, name.as_bytes()))
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ent:{}", self.0)
    }
}
