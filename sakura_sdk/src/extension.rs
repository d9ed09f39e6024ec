use std::ffi::{c_char, c_void};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use libloading::Library;
use log::{info, warn};

use crate::exports::{self, with_sdk};
use crate::sdk::ReloadSummary;

/// Name lookup handed to the extension: returns the entry point registered
/// under a name, or null.
pub type LookupFn = unsafe extern "C" fn(*const c_char) -> *const c_void;

/// `bool sakura_extension_init(LookupFn)`; the extension registers its
/// classes through the lookup before returning.
type InitFn = unsafe extern "C" fn(LookupFn) -> bool;

const INIT_SYMBOL: &[u8] = b"sakura_extension_init\0";

/// How long an unload waits for extension tasks before giving up.
pub const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A loaded extension module.
pub struct ExtensionLibrary {
    path: PathBuf,
    lib: Library,
}

impl ExtensionLibrary {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        // SAFETY: loading runs the module's static initializers; extension
        // modules are trusted code built against this bridge.
        let lib = unsafe { Library::new(&path) }
            .with_context(|| format!("failed to load extension `{}`", path.display()))?;
        Ok(Self { path, lib })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Call the module's init entry with the bridge lookup function.
    ///
    /// Must not run while the bridge is borrowed: init calls back into it.
    pub fn initialize(&self) -> anyhow::Result<()> {
        // SAFETY: symbol type is fixed by the extension ABI.
        let init = unsafe { self.lib.get::<InitFn>(INIT_SYMBOL) }.with_context(|| {
            format!(
                "missing `sakura_extension_init` in `{}`",
                self.path.display()
            )
        })?;
        // SAFETY: the lookup function is valid for the lifetime of the process.
        if !unsafe { init(exports::sakura_get_sdk_function) } {
            bail!("extension `{}` failed to initialize", self.path.display());
        }
        Ok(())
    }

    pub fn unload(self) -> anyhow::Result<()> {
        let path = self.path;
        self.lib
            .close()
            .with_context(|| format!("failed to unload extension `{}`", path.display()))
    }
}

impl std::fmt::Debug for ExtensionLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionLibrary")
            .field("path", &self.path)
            .finish()
    }
}

/// Detach the current extension from the bridge and close it.
///
/// Fails without unloading while its tasks are still running.
pub fn unload_extension() -> anyhow::Result<()> {
    let previous = with_sdk(|sdk| sdk.detach_extension(TASK_DRAIN_TIMEOUT))
        .ok_or_else(|| anyhow!("no bridge installed on this thread"))??;
    match previous {
        Some(previous) => previous.unload(),
        None => Ok(()),
    }
}

/// Load `path` into the installed bridge and initialize it. An extension
/// already loaded is closed first, without a reload cycle.
pub fn load_extension(path: impl AsRef<Path>) -> anyhow::Result<()> {
    unload_extension()?;
    let library = ExtensionLibrary::load(path)?;
    library.initialize()?;
    with_sdk(|sdk| sdk.extension = Some(library))
        .ok_or_else(|| anyhow!("bridge released during load"))?;
    Ok(())
}

/// Swap the loaded extension for the module at `path`, carrying every live
/// instance of `classes` across the swap.
///
/// Nothing changes while extension tasks are still running. Otherwise every
/// callback into the old module is dropped before it is closed. Bridge
/// borrows are kept short: unloading and init run outside them, since init
/// registers classes through the exported functions.
pub fn reload_extension(path: impl AsRef<Path>, classes: &[&str]) -> anyhow::Result<ReloadSummary> {
    let path = path.as_ref();
    let (prepared, old) = with_sdk(|sdk| {
        let old = sdk.detach_extension(TASK_DRAIN_TIMEOUT)?;
        anyhow::Ok((sdk.begin_reload(classes), old))
    })
    .ok_or_else(|| anyhow!("no bridge installed on this thread"))??;

    if let Some(old) = old {
        if let Err(err) = old.unload() {
            warn!("[sakura] {err:#}");
        }
    }

    let library = ExtensionLibrary::load(path)?;
    library.initialize()?;

    let finished = with_sdk(|sdk| {
        sdk.extension = Some(library);
        sdk.complete_reload(classes)
    })
    .ok_or_else(|| anyhow!("bridge released during reload"))?;

    info!(
        "[sakura] reloaded extension `{}` ({} classes)",
        path.display(),
        classes.len()
    );
    Ok(ReloadSummary { prepared, finished })
}
