use std::time::Instant;

use rustc_hash::FxHashMap;

/// Named stopwatches for quick timing from extension code.
#[derive(Default)]
pub struct Checkpoints {
    started: FxHashMap<String, Instant>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the checkpoint `name`.
    pub fn create(&mut self, name: &str) {
        self.started.insert(name.to_string(), Instant::now());
    }

    /// Seconds since `name` was created.
    pub fn time(&self, name: &str) -> Option<f64> {
        self.started
            .get(name)
            .map(|start| start.elapsed().as_secs_f64())
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.started.remove(name).is_some()
    }

    pub fn time_and_dispose(&mut self, name: &str) -> Option<f64> {
        self.started
            .remove(name)
            .map(|start| start.elapsed().as_secs_f64())
    }
}
