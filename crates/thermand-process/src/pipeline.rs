//! Serial composition of processes.

use thermand_state::StateMap;
use thermand_types::EntityId;

use crate::{Collection, CollectionError, Identified, Process, ProcessCore, ProcessError, Timing};

/// Serial composition: children run in order, each seeing the previous
/// child's output.
///
/// `execute` folds the state map through the children:
/// `input → child₁ → child₂ → … → output`. An empty pipeline is the
/// identity. The pipeline runs as a unit at its own cadence; its
/// children run every pipeline tick, in append order - never a subset.
///
/// Child failures follow the process-level policy: a child that fails
/// operationally yields its input, so subsequent children still run on
/// usable data. Fatal child errors abort the fold and propagate.
///
/// A typical thermal flow:
///
/// ```text
/// ┌───────────┐    ┌─────────────┐    ┌───────────┐
/// │ read env  │ ─▶ │ controller  │ ─▶ │ write env │
/// │ ("actual")│    │ (actuators) │    │ (outward) │
/// └───────────┘    └─────────────┘    └───────────┘
/// ```
///
/// # Example
///
/// ```
/// use thermand_process::{Collection, Pipeline, Process};
/// use thermand_process::testing::NoopProcess;
/// use thermand_state::StateMap;
///
/// let mut pipeline = Pipeline::new("cpu_zone", 100_000_000);
/// pipeline.append(Box::new(NoopProcess::new("a"))).unwrap();
/// pipeline.append(Box::new(NoopProcess::new("b"))).unwrap();
///
/// pipeline.initialize(0);
/// let out = pipeline.run(StateMap::new()).unwrap();
/// assert!(out.is_empty());
/// ```
pub struct Pipeline {
    core: ProcessCore,
    children: Vec<Box<dyn Process>>,
}

impl Pipeline {
    /// Creates an empty pipeline with the given cadence.
    #[must_use]
    pub fn new(name: impl Into<String>, interval_ns: u64) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            children: Vec::new(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name() == name)
    }

    fn insert_at(
        &mut self,
        index: usize,
        child: Box<dyn Process>,
    ) -> Result<(), CollectionError> {
        if self.has(child.name()) {
            return Err(CollectionError::DuplicateChild(child.name().to_string()));
        }
        self.children.insert(index, child);
        Ok(())
    }
}

impl Identified for Pipeline {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn id(&self) -> EntityId {
        self.core.id()
    }
}

impl Process for Pipeline {
    fn interval_ns(&self) -> u64 {
        self.core.interval_ns()
    }

    fn timing(&self) -> &Timing {
        self.core.timing()
    }

    fn timing_mut(&mut self) -> &mut Timing {
        self.core.timing_mut()
    }

    fn initialize(&mut self, now_ns: u64) {
        self.core.timing_mut().reset(now_ns);
        for child in &mut self.children {
            child.initialize(now_ns);
        }
    }

    fn execute(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let mut states = input;
        for child in &mut self.children {
            states = child.run(states)?;
        }
        Ok(states)
    }
}

impl Collection for Pipeline {
    fn count(&self) -> usize {
        self.children.len()
    }

    fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn child(&self, name: &str) -> Option<&dyn Process> {
        self.position(name).map(|i| self.children[i].as_ref())
    }

    fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name()).collect()
    }

    fn append(&mut self, child: Box<dyn Process>) -> Result<(), CollectionError> {
        let index = self.children.len();
        self.insert_at(index, child)
    }

    fn insert_before(
        &mut self,
        target: &str,
        child: Box<dyn Process>,
    ) -> Result<(), CollectionError> {
        let index = self
            .position(target)
            .ok_or_else(|| CollectionError::ChildNotFound(target.to_string()))?;
        self.insert_at(index, child)
    }

    fn insert_after(
        &mut self,
        target: &str,
        child: Box<dyn Process>,
    ) -> Result<(), CollectionError> {
        let index = self
            .position(target)
            .ok_or_else(|| CollectionError::ChildNotFound(target.to_string()))?;
        self.insert_at(index + 1, child)
    }

    fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }
}
