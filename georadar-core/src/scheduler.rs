//! Tick Scheduling
//!
//! The engine never reads a clock. Each sweep asks a [`Scheduler`] to run a
//! task once after a delay, and when that task finishes its tick it asks for
//! the next one. There is no free-running interval, so ticks of the same sweep
//! can never overlap.
//!
//! Tasks capture a weak reference to the sweep they drive; there is no lookup
//! table from ids to radar instances.
//!
//! Two implementations exist:
//!
//! - [`ManualScheduler`] (here): a fake clock advanced explicitly, used by
//!   tests and by hosts that drive the sweep from their own frame loop.
//! - `TokioScheduler` in the server crate.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Work scheduled to run once
pub type Task = Box<dyn FnOnce()>;

/// Handle identifying a scheduled task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// One-shot delayed execution.
///
/// Implementations must not run the task from inside `schedule`; it has to run
/// later, from the host's event loop. After `cancel` returns, the task must
/// never run.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    /// Ordered by due time, then by scheduling order
    queue: BTreeMap<(Duration, u64), Task>,
    due: HashMap<u64, Duration>,
}

/// Scheduler driven by an explicit fake clock.
///
/// Nothing runs until [`advance`](ManualScheduler::advance) is called. Tasks
/// scheduled while advancing run in the same call if they fall due before the
/// target time.
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current fake time
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Take the earliest task due at or before `limit`, moving the clock to it
    fn pop_due(&self, limit: Option<Duration>) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        let key = *state.queue.keys().next()?;
        if limit.is_some_and(|limit| key.0 > limit) {
            return None;
        }
        state.due.remove(&key.1);
        state.now = state.now.max(key.0);
        state.queue.remove(&key)
    }

    /// Move the clock forward by `by`, running every task that falls due.
    ///
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.borrow().now + by;
        let mut ran = 0;

        // The borrow is released before each task runs: it may schedule its successor
        while let Some(task) = self.pop_due(Some(target)) {
            task();
            ran += 1;
        }

        self.state.borrow_mut().now = target;
        ran
    }

    /// Run the next `count` tasks in due order, jumping the clock as needed.
    ///
    /// Returns the number of tasks run, fewer than `count` if the queue ran dry.
    pub fn run_next(&self, count: usize) -> usize {
        let mut ran = 0;
        while ran < count {
            match self.pop_due(None) {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.queue.insert((due, id), task);
        state.due.insert(id, due);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(due) = state.due.remove(&handle.0) {
            state.queue.remove(&(due, handle.0));
        }
    }
}
