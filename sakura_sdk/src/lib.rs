//! Engine-side bridge for native extension modules.
//!
//! The host owns a [`Sdk`] per thread. Extensions reach it only through the
//! C entry points in [`exports`], resolved by name at init time.

pub mod config;
pub mod exports;
pub mod extension;
pub mod host;
pub mod sdk;

use std::path::Path;

use anyhow::Context;
use log::info;

pub use config::{BridgeConfig, ConfigError, LoggingConfig};
pub use exports::{
    create_sdk_interface, has_sdk_interface, release_sdk_interface, sdk_function, with_sdk,
};
pub use extension::{
    ExtensionLibrary, LookupFn, load_extension, reload_extension, unload_extension,
};
pub use host::{EngineInfo, EngineMode, Host};
pub use sdk::{FileMonitorFn, ReloadSummary, Sdk};

pub mod prelude {
    pub use crate::{BridgeConfig, Host, Sdk};
    pub use sakura_context::prelude::*;
}

/// Install env_logger with `filter` as the default directive. `RUST_LOG`
/// still wins. False when a logger was already set.
pub fn init_logging(filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init()
        .is_ok()
}

/// Read `sakura.toml` under `project_root`, start logging and install a
/// bridge around `host` on the current thread.
pub fn start(project_root: &Path, host: Host) -> anyhow::Result<()> {
    let config = BridgeConfig::load(project_root)
        .with_context(|| format!("loading bridge config in `{}`", project_root.display()))?;
    init_logging(&config.logging.filter);

    let sdk = Sdk::new(host, &config);
    info!(
        "[sakura] bridge ready (reload {})",
        if sdk.reload().is_enabled() { "on" } else { "off" }
    );
    if create_sdk_interface(sdk).is_some() {
        info!("[sakura] replaced an existing bridge");
    }
    Ok(())
}

/// Unload the extension and drop this thread's bridge. The bridge stays
/// installed when extension tasks are still running.
pub fn shutdown() -> anyhow::Result<()> {
    if !has_sdk_interface() {
        return Ok(());
    }
    unload_extension()?;
    release_sdk_interface();
    Ok(())
}
