//! Named bundles of states.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::State;

/// A mapping from role name to [`State`].
///
/// The role gives a state its meaning in the control flow:
///
/// | Role | Supplied by | Consumed by |
/// |------|-------------|-------------|
/// | [`StateMap::ACTUAL`] | Environment (fresh readings) | Controllers |
/// | [`StateMap::DESIRED`] | Controllers (commands) | tail Environment |
///
/// Additional roles are permitted; processes that do not recognise a
/// role pass it through untouched.
///
/// A `StateMap` is the per-tick unit of data flow: runners hand an
/// empty one to the root process, pipelines thread one through their
/// children, and buffers store them against timestamps.
///
/// # Example
///
/// ```
/// use thermand_state::{Device, State, StateMap};
///
/// let map = StateMap::new()
///     .with_actual(State::new().with_device(Device::sensor("cpu_temp")))
///     .with_state("forecast", State::new());
///
/// assert!(map.actual().is_some());
/// assert!(map.desired().is_none());
/// assert_eq!(map.roles(), vec!["actual", "forecast"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap {
    states: BTreeMap<String, State>,
}

impl StateMap {
    /// Role carrying current measurements, supplied by an Environment.
    pub const ACTUAL: &'static str = "actual";

    /// Role carrying setpoints/commands, produced by Controllers.
    pub const DESIRED: &'static str = "desired";

    /// Creates an empty state map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a state by role name.
    #[must_use]
    pub fn state(&self, role: &str) -> Option<&State> {
        self.states.get(role)
    }

    /// The `"actual"` state, if present.
    #[must_use]
    pub fn actual(&self) -> Option<&State> {
        self.state(Self::ACTUAL)
    }

    /// The `"desired"` state, if present.
    #[must_use]
    pub fn desired(&self) -> Option<&State> {
        self.state(Self::DESIRED)
    }

    /// Returns `true` if a state exists under the given role.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.states.contains_key(role)
    }

    /// Role names in deterministic (sorted) order.
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        self.states.keys().map(String::as_str).collect()
    }

    /// Number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if no roles are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterates `(role, state)` pairs in role order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &State)> {
        self.states.iter().map(|(role, state)| (role.as_str(), state))
    }

    /// Returns a new map with the state set under the given role.
    #[must_use]
    pub fn with_state(&self, role: impl Into<String>, state: State) -> Self {
        let mut states = self.states.clone();
        states.insert(role.into(), state);
        Self { states }
    }

    /// Returns a new map with the `"actual"` role set.
    #[must_use]
    pub fn with_actual(&self, state: State) -> Self {
        self.with_state(Self::ACTUAL, state)
    }

    /// Returns a new map with the `"desired"` role set.
    #[must_use]
    pub fn with_desired(&self, state: State) -> Self {
        self.with_state(Self::DESIRED, state)
    }

    /// Returns a new map without the given role.
    #[must_use]
    pub fn without_state(&self, role: &str) -> Self {
        let mut states = self.states.clone();
        states.remove(role);
        Self { states }
    }
}

impl std::fmt::Display for StateMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StateMap(")?;
        for (i, (role, state)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{role}: {} devices", state.len())?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Device;

    #[test]
    fn empty_map() {
        let map = StateMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert!(map.actual().is_none());
        assert!(map.desired().is_none());
    }

    #[test]
    fn reserved_role_accessors() {
        let map = StateMap::new()
            .with_actual(State::new().with_device(Device::sensor("cpu_temp")))
            .with_desired(State::new().with_device(Device::actuator("fan1")));

        assert!(map.actual().expect("actual").contains("cpu_temp"));
        assert!(map.desired().expect("desired").contains("fan1"));
        assert_eq!(map.roles(), vec!["actual", "desired"]);
    }

    #[test]
    fn unknown_roles_are_carried() {
        let map = StateMap::new().with_state("forecast", State::new());
        assert!(map.contains("forecast"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn with_state_is_copy_on_write() {
        let original = StateMap::new().with_actual(State::new());
        let extended = original.with_state("forecast", State::new());
        assert_eq!(original.len(), 1);
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn without_state() {
        let map = StateMap::new()
            .with_actual(State::new())
            .with_desired(State::new());
        let trimmed = map.without_state(StateMap::DESIRED);
        assert!(trimmed.desired().is_none());
        assert!(trimmed.actual().is_some());
    }

    #[test]
    fn display_summarises() {
        let map = StateMap::new()
            .with_actual(State::new().with_device(Device::sensor("cpu_temp")));
        assert_eq!(format!("{map}"), "StateMap(actual: 1 devices)");
    }

    #[test]
    fn serde_round_trip() {
        let map = StateMap::new()
            .with_actual(State::new().with_device(Device::sensor("cpu_temp").with_value(50.0, 7)));
        let json = serde_json::to_string(&map).expect("serialize");
        let back: StateMap = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, map);
    }
}
