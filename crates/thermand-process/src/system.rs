//! Parallel coordination of independently timed processes.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use thermand_state::StateMap;
use thermand_types::{time, EntityId};
use tracing::debug;

use crate::{Collection, CollectionError, Identified, Process, ProcessCore, ProcessError, Timing};

/// Parallel composition: children run independently on their own
/// cadences, interleaved cooperatively on one thread.
///
/// A system maintains a min-heap keyed by each child's `next_run_at`,
/// tie-broken by the child's position (insertion order), so execution
/// order at equal instants is deterministic. The system's own
/// `next_run_at` is the earliest next run among its paced children -
/// systems are event-driven and never poll internally. Zero-interval
/// children are always due and ride along on every system tick
/// without driving the wake-up time.
///
/// # Tick Protocol
///
/// When the runner invokes the system at time `now`:
///
/// 1. Pop every entry scheduled at or before `now`. The due set is
///    collected *before* anything runs, so a zero-interval child runs
///    exactly once per system tick.
/// 2. Run each due child with an **empty** state map, in
///    (time, position) order, and re-enqueue it at its new
///    `next_run_at`.
/// 3. Return the input unchanged.
///
/// # Why an empty state map?
///
/// System children represent independent thermal loops (CPU zone at
/// 100 ms, GPU zone at 1 s, ambient at 30 s). Handing each an empty
/// map isolates their per-tick state; cross-zone coupling, when
/// needed, is explicit via a process that exposes aggregates as a
/// device. No locks, no racy cross-child writes.
///
/// # Example
///
/// ```
/// use thermand_process::{Collection, Pipeline, Process, System};
///
/// let mut system = System::new("host");
/// system.append(Box::new(Pipeline::new("cpu_zone", 10_000_000))).unwrap();
/// system.append(Box::new(Pipeline::new("gpu_zone", 30_000_000))).unwrap();
///
/// system.initialize(0);
/// assert_eq!(system.next_run_at(), 10_000_000);
/// ```
pub struct System {
    core: ProcessCore,
    children: Vec<Box<dyn Process>>,
    /// Min-heap of (next run time, child position).
    schedule: BinaryHeap<Reverse<(u64, usize)>>,
    initialized: bool,
}

impl System {
    /// Creates an empty system with the default cadence.
    ///
    /// The own cadence only matters while the system has no children;
    /// with children it always defers to the earliest child.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_interval(name, crate::DEFAULT_INTERVAL_NS)
    }

    /// Creates an empty system with an explicit own cadence.
    #[must_use]
    pub fn with_interval(name: impl Into<String>, interval_ns: u64) -> Self {
        Self {
            core: ProcessCore::new(name, interval_ns),
            children: Vec::new(),
            schedule: BinaryHeap::new(),
            initialized: false,
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name() == name)
    }

    /// Rebuilds the heap from scratch after a structural mutation.
    ///
    /// Heap entries key children by position, and positions shift on
    /// insert/remove.
    fn rebuild_schedule(&mut self) {
        self.schedule.clear();
        for (index, child) in self.children.iter().enumerate() {
            self.schedule.push(Reverse((child.next_run_at(), index)));
        }
    }

    fn insert_at(
        &mut self,
        index: usize,
        mut child: Box<dyn Process>,
    ) -> Result<(), CollectionError> {
        if self.has(child.name()) {
            return Err(CollectionError::DuplicateChild(child.name().to_string()));
        }
        if self.initialized {
            child.initialize(time::now_ns());
        }
        self.children.insert(index, child);
        if self.initialized {
            self.rebuild_schedule();
        }
        Ok(())
    }
}

impl Identified for System {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn id(&self) -> EntityId {
        self.core.id()
    }
}

impl Process for System {
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
        self.initialized = true;
        self.rebuild_schedule();
    }

    /// Earliest next run across paced children; own modulo cadence
    /// when no child is paced.
    ///
    /// Always-due children (a zero-interval leaf, or a composite with
    /// nothing paced inside) report a next run pinned at their own
    /// start time. Excluding them from the wake-up computation keeps
    /// the system's next run in the future - otherwise it would be
    /// pinned to the past and livelock a simulated clock. Such
    /// children still ride along on whichever tick a paced sibling
    /// (or the system's own cadence) causes.
    fn next_run_at(&self) -> u64 {
        self.children
            .iter()
            .filter_map(|child| {
                let at = child.next_run_at();
                (at > child.timing().start_ns()).then_some(at)
            })
            .min()
            .unwrap_or_else(|| self.core.timing().next_run_at(self.core.interval_ns()))
    }

    fn execute(&mut self, input: StateMap) -> Result<StateMap, ProcessError> {
        let now_ns = time::now_ns();

        // Collect the due set before running anything: a child whose
        // new next-run time is still <= now must wait for the next
        // system tick.
        let mut due: Vec<(u64, usize)> = Vec::new();
        while let Some(&Reverse((at, index))) = self.schedule.peek() {
            if at > now_ns {
                break;
            }
            self.schedule.pop();
            due.push((at, index));
        }

        if due.is_empty() && self.children.is_empty() {
            debug!(system = %self.name(), "system has no children configured");
        }

        for (_, index) in due {
            let child = &mut self.children[index];
            // State isolation: every child starts from an empty map.
            // Fatal errors propagate; operational ones were already
            // absorbed inside the child.
            child.run(StateMap::new())?;
            let next = child.next_run_at();
            self.schedule.push(Reverse((next, index)));
        }

        Ok(input)
    }
}

impl Collection for System {
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
                self.rebuild_schedule();
                true
            }
            None => false,
        }
    }
}
