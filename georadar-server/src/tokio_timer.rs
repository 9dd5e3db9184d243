//! Tokio implementation of the core `Scheduler` for the native server.
//!
//! Every scheduled task becomes a local tokio task that sleeps for the
//! requested delay and then runs. Cancelling aborts the tokio task, so a
//! cancelled tick never runs even if its delay has already elapsed.
//!
//! Radar state is single-threaded, so tasks are spawned with
//! `tokio::task::spawn_local` and the scheduler must be used from inside a
//! `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use georadar_core::{Scheduler, Task, TimerHandle};
use tokio::task::JoinHandle;

/// Tokio-backed timer driver.
///
/// # Usage
///
/// ```rust,ignore
/// use std::rc::Rc;
/// use georadar_server::tokio_timer::TokioScheduler;
///
/// let local = tokio::task::LocalSet::new();
/// local.run_until(async {
///     let scheduler = Rc::new(TokioScheduler::new());
///     let radar = Radar::new(config, renderer, scheduler.clone())?;
///     radar.add_line_sweep(LineSweepConfig::default())?;
///     tokio::time::sleep(Duration::from_secs(10)).await;
/// }).await;
/// ```
pub struct TokioScheduler {
    /// Next timer handle ID
    next_handle: Cell<u64>,
    /// Pending tokio tasks by handle; a task removes itself when it fires
    timers: Rc<RefCell<HashMap<u64, JoinHandle<()>>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            next_handle: Cell::new(1),
            timers: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn alloc_handle(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }

    /// Number of timers that have neither fired nor been cancelled
    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, timer) in self.timers.borrow_mut().drain() {
            timer.abort();
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let id = self.alloc_handle();
        let timers = Rc::downgrade(&self.timers);

        // The spawned task cannot start before this call returns, so the
        // insert below always happens before the task removes itself.
        let join = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Some(timers) = timers.upgrade() {
                timers.borrow_mut().remove(&id);
            }
            task();
        });
        self.timers.borrow_mut().insert(id, join);
        log::trace!("timer {} scheduled in {:?}", id, delay);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(join) = self.timers.borrow_mut().remove(&handle.0) {
            join.abort();
            log::trace!("timer {} cancelled", handle.0);
        }
    }
}
