use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::error;
use rustc_hash::FxHashMap;
use sakura_ids::TaskID;

/// Fire-and-forget background work on the rayon global pool.
///
/// Task bodies must not touch the scene tree; only completion is tracked.
#[derive(Default)]
pub struct TaskSystem {
    tasks: FxHashMap<TaskID, Arc<AtomicBool>>,
    next: u32,
}

impl TaskSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initiate(&mut self, task: impl FnOnce() + Send + 'static) -> TaskID {
        self.next += 1;
        let id = TaskID::new(self.next);
        let done = Arc::new(AtomicBool::new(false));
        self.tasks.insert(id, done.clone());

        rayon::spawn(move || {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!("task {id} panicked");
            }
            done.store(true, Ordering::Release);
        });
        id
    }

    /// False for unknown or cleared ids.
    pub fn is_complete(&self, id: TaskID) -> bool {
        self.tasks
            .get(&id)
            .is_some_and(|done| done.load(Ordering::Acquire))
    }

    /// Stop tracking `id`. A task still running is left to finish on its own.
    pub fn clear(&mut self, id: TaskID) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Block until `id` completes or `timeout` passes.
    pub fn wait(&self, id: TaskID, timeout: Duration) -> bool {
        let Some(done) = self.tasks.get(&id) else {
            return false;
        };
        let start = Instant::now();
        while !done.load(Ordering::Acquire) {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Tracked tasks that have not finished yet.
    pub fn running(&self) -> usize {
        self.tasks
            .values()
            .filter(|done| !done.load(Ordering::Acquire))
            .count()
    }

    /// Block until every tracked task finishes or `timeout` passes.
    pub fn wait_all(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.running() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
