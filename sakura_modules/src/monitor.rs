use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use log::{debug, warn};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use sakura_ids::CallbackID;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("`{0}` is not a directory")]
    NotADirectory(PathBuf),

    #[error("`{0}` is not a file")]
    NotAFile(PathBuf),

    #[error("`{0}` is already monitored")]
    AlreadyWatched(PathBuf),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetEvent {
    Created,
    Modified,
    Removed,
    Renamed,
}

impl AssetEvent {
    /// Value passed to native file monitor callbacks.
    pub fn code(self) -> i32 {
        match self {
            Self::Created => 0,
            Self::Modified => 1,
            Self::Removed => 2,
            Self::Renamed => 3,
        }
    }

    /// Metadata-only changes and access events map to `None`.
    fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Renamed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }
}

pub type AssetCallback = Box<dyn FnMut(&Path, AssetEvent)>;

/// Watches asset files and directories and hands changes to callbacks.
///
/// The watcher thread only queues events; callbacks run inside
/// [`AssetMonitor::poll`] on the thread that owns the monitor.
pub struct AssetMonitor {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watched: Vec<PathBuf>,
    callbacks: FxHashMap<CallbackID, AssetCallback>,
    next_callback: u32,
}

impl AssetMonitor {
    pub fn new() -> Result<Self, MonitorError> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        Ok(Self {
            watcher,
            rx,
            watched: Vec::new(),
            callbacks: FxHashMap::default(),
            next_callback: 0,
        })
    }

    /// Watch every file under `path`, recursively.
    pub fn add_directory(&mut self, path: impl AsRef<Path>) -> Result<(), MonitorError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(MonitorError::NotADirectory(path.to_path_buf()));
        }
        self.watch(path, RecursiveMode::Recursive)
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<(), MonitorError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MonitorError::NotAFile(path.to_path_buf()));
        }
        self.watch(path, RecursiveMode::NonRecursive)
    }

    fn watch(&mut self, path: &Path, mode: RecursiveMode) -> Result<(), MonitorError> {
        if self.watched.iter().any(|p| p == path) {
            return Err(MonitorError::AlreadyWatched(path.to_path_buf()));
        }
        self.watcher.watch(path, mode)?;
        debug!("monitoring {}", path.display());
        self.watched.push(path.to_path_buf());
        Ok(())
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    pub fn register_callback(
        &mut self,
        callback: impl FnMut(&Path, AssetEvent) + 'static,
    ) -> CallbackID {
        self.next_callback += 1;
        let id = CallbackID::new(self.next_callback);
        self.callbacks.insert(id, Box::new(callback));
        id
    }

    pub fn unregister_callback(&mut self, id: CallbackID) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    /// Dispatch every queued change. Returns how many (path, event) pairs
    /// were delivered.
    pub fn poll(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(res) = self.rx.try_recv() {
            match res {
                Ok(event) => delivered += self.dispatch(&event),
                Err(err) => warn!("asset monitor error: {err}"),
            }
        }
        delivered
    }

    fn dispatch(&mut self, event: &Event) -> usize {
        let Some(kind) = AssetEvent::from_kind(&event.kind) else {
            return 0;
        };
        let mut delivered = 0;
        for path in &event.paths {
            for callback in self.callbacks.values_mut() {
                callback(path, kind);
            }
            delivered += 1;
        }
        delivered
    }
}
