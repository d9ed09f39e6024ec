//! Hot reload of extension classes: live instances are packed and swapped
//! for placeholders before a class is unloaded, then rebuilt from their
//! packed form once the new definition is registered.

pub mod error;
pub mod gate;
pub mod protocol;
pub mod registry;
pub mod serializer;
pub mod walker;

#[cfg(test)]
mod mock;

pub use error::{CaptureError, PackError, RegistryError};
pub use gate::HostCapabilityGate;
pub use protocol::{
    FinishOutcome, FinishReport, PendingPolicy, PrepareOutcome, ReloadConfig, ReloadProtocol,
    ReloadState,
};
pub use registry::{BackupRecord, BackupRegistry, RecordHandle};
pub use serializer::{NodeSerializer, PackedNode};
pub use walker::TreeWalker;
