pub mod log;
pub mod memory;
pub mod monitor;
pub mod profiler;
pub mod tasks;
pub mod variables;

pub use memory::GlobalMemory;
pub use monitor::{AssetCallback, AssetEvent, AssetMonitor, MonitorError};
pub use profiler::Checkpoints;
pub use tasks::TaskSystem;
pub use variables::GlobalVariables;

pub mod prelude {
    pub use crate::log as LogMod;
    pub use crate::memory as MemoryMod;
    pub use crate::monitor as MonitorMod;
    pub use crate::tasks as TaskMod;
}
