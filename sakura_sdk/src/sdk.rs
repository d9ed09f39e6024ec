use std::ffi::{CString, c_char};
use std::time::{Duration, Instant};

use anyhow::bail;
use log::{debug, info, warn};
use sakura_context::prelude::*;
use sakura_ids::{CallbackID, NodeID};
use sakura_modules::{
    AssetMonitor, Checkpoints, GlobalMemory, GlobalVariables, MonitorError, TaskSystem,
};
use sakura_reload::{FinishOutcome, HostCapabilityGate, PrepareOutcome, ReloadProtocol};
use sakura_scene::{EventCallback, SceneError};
use sakura_variant::Variant;
use sha2::{Digest, Sha256};

use crate::config::BridgeConfig;
use crate::extension::ExtensionLibrary;
use crate::host::{EngineMode, Host};

/// Per-class results of one reload cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub prepared: Vec<(String, PrepareOutcome)>,
    pub finished: Vec<(String, FinishOutcome)>,
}

/// Native file monitor callback: `(path, event code)`. The path is only valid
/// for the duration of the call.
pub type FileMonitorFn = extern "C" fn(*const c_char, i32);

/// Everything the bridge offers an extension, bundled around one [`Host`].
pub struct Sdk {
    pub host: Host,
    reload: ReloadProtocol,
    memory: GlobalMemory,
    variables: GlobalVariables,
    tasks: TaskSystem,
    checkpoints: Checkpoints,
    monitor: Option<AssetMonitor>,
    /// Native monitor callbacks, keyed by function address.
    monitor_hooks: Vec<(usize, CallbackID)>,
    /// Backing store for the last string handed across the C boundary.
    returned: Option<CString>,
    pub(crate) extension: Option<ExtensionLibrary>,
    started: Instant,
}

impl Sdk {
    pub fn new(host: Host, config: &BridgeConfig) -> Self {
        Self {
            host,
            reload: ReloadProtocol::new(config.reload.clone()),
            memory: GlobalMemory::new(),
            variables: GlobalVariables::new(),
            tasks: TaskSystem::new(),
            checkpoints: Checkpoints::new(),
            monitor: None,
            monitor_hooks: Vec::new(),
            returned: None,
            extension: None,
            started: Instant::now(),
        }
    }

    // ---- engine info ----

    pub fn is_editor(&self) -> bool {
        self.host.is_editor()
    }

    /// Running game in a release build.
    pub fn is_game(&self) -> bool {
        self.host.info().mode == EngineMode::Runtime
    }

    pub fn engine_mode(&self) -> EngineMode {
        self.host.info().mode
    }

    /// Seconds since the bridge was created.
    pub fn get_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    // ---- scene helpers ----

    pub fn node_by_path(&self, path: &str) -> Option<NodeID> {
        self.host.tree()?.get_node(path)
    }

    /// First node named `name`, searching from the tree root.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeID> {
        let tree = self.host.tree()?;
        tree.find_node_by_name(tree.root(), name)
    }

    /// Stable hex id derived from the node's absolute path.
    pub fn node_unique_id(&self, id: NodeID) -> Option<String> {
        let path = self.host.tree()?.node_path(id)?;
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }

    pub fn connect_once(
        &mut self,
        node: NodeID,
        signal: &str,
        callback: EventCallback,
    ) -> Result<(), SceneError> {
        self.host
            .tree_mut()
            .ok_or(SceneError::NoActiveTree)?
            .connect_once(node, signal, callback)
    }

    pub fn emit_signal(&mut self, node: NodeID, signal: &str) -> usize {
        self.host
            .tree_mut()
            .map_or(0, |tree| tree.emit_signal(node, signal))
    }

    // ---- hot reload ----

    pub fn reload(&self) -> &ReloadProtocol {
        &self.reload
    }

    pub fn supports_reload(&self) -> bool {
        self.reload.is_enabled() && HostCapabilityGate::supports_reload(&self.host)
    }

    pub fn prepare_reload(&mut self, class: &str) -> PrepareOutcome {
        self.reload.prepare(&mut self.host, class)
    }

    pub fn finish_reload(&mut self, class: &str) -> FinishOutcome {
        self.reload.finish(&mut self.host, class)
    }

    /// Unregister an extension class. Unknown and core classes are ignored.
    pub fn dispose(&mut self, class: &str) -> bool {
        match self.host.classes_mut().unregister(class) {
            Ok(_) => true,
            Err(err) => {
                warn!("[sakura] dispose `{class}`: {err}");
                false
            }
        }
    }

    /// Back up every instance of `classes` and unregister them.
    pub fn begin_reload(&mut self, classes: &[&str]) -> Vec<(String, PrepareOutcome)> {
        let prepared = classes
            .iter()
            .map(|class| (class.to_string(), self.prepare_reload(class)))
            .collect();
        for class in classes {
            self.dispose(class);
        }
        prepared
    }

    /// Rebuild instances of `classes` once they are registered again.
    pub fn complete_reload(&mut self, classes: &[&str]) -> Vec<(String, FinishOutcome)> {
        classes
            .iter()
            .map(|class| (class.to_string(), self.finish_reload(class)))
            .collect()
    }

    /// Full cycle for classes defined in-process: back up, unregister, let
    /// `reregister` install the new definitions, then rebuild.
    pub fn reload_classes(
        &mut self,
        classes: &[&str],
        reregister: impl FnOnce(&mut Self) -> anyhow::Result<()>,
    ) -> anyhow::Result<ReloadSummary> {
        let prepared = self.begin_reload(classes);
        reregister(self)?;
        let finished = self.complete_reload(classes);
        info!("[sakura] reloaded {} classes", classes.len());
        Ok(ReloadSummary { prepared, finished })
    }

    // ---- storage, tasks, profiling ----

    pub fn memory(&mut self) -> &mut GlobalMemory {
        &mut self.memory
    }

    pub fn variables(&mut self) -> &mut GlobalVariables {
        &mut self.variables
    }

    pub fn tasks(&mut self) -> &mut TaskSystem {
        &mut self.tasks
    }

    pub fn checkpoints(&mut self) -> &mut Checkpoints {
        &mut self.checkpoints
    }

    /// JSON text of a global variable; `null` when unset.
    pub fn variable_json(&self, name: &str) -> String {
        self.variables.get(name).to_json_value().to_string()
    }

    /// Store `json` under `name`. Vectors come back as arrays.
    pub fn set_variable_json(&mut self, name: &str, json: &str) -> serde_json::Result<()> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        self.variables.set(name, Variant::from_json_value(&value));
        Ok(())
    }

    /// Keep `text` alive until the next call and return a C view of it.
    /// Null when `text` holds an interior NUL.
    pub(crate) fn return_c_string(&mut self, text: String) -> *const c_char {
        match CString::new(text) {
            Ok(text) => self.returned.insert(text).as_ptr(),
            Err(_) => std::ptr::null(),
        }
    }

    /// Asset monitor, started on first use.
    pub fn monitor(&mut self) -> Result<&mut AssetMonitor, MonitorError> {
        let monitor = match self.monitor.take() {
            Some(monitor) => monitor,
            None => AssetMonitor::new()?,
        };
        Ok(self.monitor.insert(monitor))
    }

    pub fn watch_directory(&mut self, path: &str) -> Result<(), MonitorError> {
        self.monitor()?.add_directory(path)
    }

    pub fn watch_file(&mut self, path: &str) -> Result<(), MonitorError> {
        self.monitor()?.add_file(path)
    }

    /// Route asset events to a native callback. A callback is registered at
    /// most once.
    pub fn register_monitor_hook(&mut self, callback: FileMonitorFn) -> Result<bool, MonitorError> {
        let key = callback as usize;
        if self.monitor_hooks.iter().any(|(k, _)| *k == key) {
            return Ok(false);
        }
        let id = self.monitor()?.register_callback(move |path, event| {
            if let Ok(path) = CString::new(path.to_string_lossy().into_owned()) {
                callback(path.as_ptr(), event.code());
            }
        });
        self.monitor_hooks.push((key, id));
        Ok(true)
    }

    pub fn unregister_monitor_hook(&mut self, callback: FileMonitorFn) -> bool {
        let key = callback as usize;
        let Some(pos) = self.monitor_hooks.iter().position(|(k, _)| *k == key) else {
            return false;
        };
        let (_, id) = self.monitor_hooks.remove(pos);
        self.monitor
            .as_mut()
            .is_some_and(|monitor| monitor.unregister_callback(id))
    }

    /// Deliver pending asset events. Zero until something is watched.
    pub fn poll_assets(&mut self) -> usize {
        self.monitor.as_mut().map_or(0, AssetMonitor::poll)
    }

    // ---- extension lifetime ----

    /// Disconnect every signal and monitor callback that points into
    /// extension code.
    pub fn release_extension_hooks(&mut self) -> usize {
        let signals = self
            .host
            .tree_mut()
            .map_or(0, |tree| tree.purge_foreign_callbacks());
        let mut monitors = 0;
        for (_, id) in self.monitor_hooks.drain(..) {
            if let Some(monitor) = self.monitor.as_mut() {
                monitors += usize::from(monitor.unregister_callback(id));
            }
        }
        debug!("[sakura] released {signals} signal and {monitors} monitor hooks");
        signals + monitors
    }

    /// Take the loaded extension out so it can be closed. Nothing is touched
    /// while tasks still run after `timeout`; otherwise every hook into the
    /// extension is released first.
    pub fn detach_extension(
        &mut self,
        timeout: Duration,
    ) -> anyhow::Result<Option<ExtensionLibrary>> {
        if !self.tasks.wait_all(timeout) {
            bail!(
                "{} tasks still running, extension left loaded",
                self.tasks.running()
            );
        }
        self.release_extension_hooks();
        Ok(self.extension.take())
    }

    // ---- output ----

    pub fn output(&self, message: &str) {
        sakura_modules::log::output(message);
    }

    pub fn debug_output(&self, message: &str) {
        sakura_modules::log::debug_output(message);
    }
}

#[cfg(all(test, not(feature = "static-sdk")))]
mod tests {
    use super::*;
    use crate::host::EngineInfo;
    use sakura_reload::{FinishReport, ReloadConfig};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn sdk_with(host: Host) -> Sdk {
        Sdk::new(host, &BridgeConfig::default())
    }

    /// root -> Main(Node2D) -> Hero(Player, hp = 7)
    fn game() -> (Sdk, NodeID) {
        let mut sdk = sdk_with(Host::runtime("sakura"));
        sdk.host
            .classes_mut()
            .register_extension("Player", "Node2D")
            .unwrap();
        let tree = sdk.host.tree_mut().unwrap();
        let main = tree.create_node("Node2D", "Main");
        tree.add_child(tree.root(), main).unwrap();
        let hero = tree.create_node("Player", "Hero");
        tree.add_child(main, hero).unwrap();
        tree.get_mut(hero).unwrap().set("hp", 7);
        (sdk, main)
    }

    #[test]
    fn engine_modes() {
        let runtime = sdk_with(Host::runtime("sakura"));
        assert!(runtime.is_game());
        assert!(!runtime.is_editor());

        let editor = sdk_with(Host::editor("sakura"));
        assert!(editor.is_editor());
        assert!(!editor.is_game());

        let debug = sdk_with(Host::new(EngineInfo {
            mode: EngineMode::Debug,
            build: "sakura".into(),
        }));
        assert!(!debug.is_game());
        assert!(!debug.is_editor());
        assert!(debug.get_time() >= 0.0);
    }

    #[test]
    fn node_lookup_and_unique_ids() {
        let (sdk, main) = game();
        let hero = sdk.node_by_path("/root/Main/Hero").unwrap();
        assert_eq!(sdk.find_node_by_name("Hero"), Some(hero));
        assert_eq!(sdk.node_by_path("Main"), Some(main));

        let id = sdk.node_unique_id(hero).unwrap();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sdk.node_unique_id(hero), Some(id.clone()));
        assert_ne!(sdk.node_unique_id(main), Some(id));
        assert_eq!(sdk.node_unique_id(NodeID::new(999)), None);
    }

    #[test]
    fn reload_classes_round_trip() {
        let (mut sdk, main) = game();

        let summary = sdk
            .reload_classes(&["Player"], |sdk| {
                assert!(!sdk.host.classes().class_exists("Player"));
                sdk.host
                    .classes_mut()
                    .register_extension("Player", "Node2D")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(
            summary.prepared,
            [("Player".to_string(), PrepareOutcome::Captured { captured: 1, failed: 0 })]
        );
        assert_eq!(
            summary.finished,
            [(
                "Player".to_string(),
                FinishOutcome::Finished(FinishReport { restored: 1, ..Default::default() })
            )]
        );

        let tree = sdk.host.tree().unwrap();
        let hero = tree.children(main)[0];
        let node = tree.get(hero).unwrap();
        assert_eq!(node.class, "Player");
        assert_eq!(node.get("hp").and_then(|v| v.as_i64()), Some(7));
    }

    #[test]
    fn finish_waits_for_the_class_to_return() {
        let (mut sdk, main) = game();
        sdk.begin_reload(&["Player"]);

        assert_eq!(
            sdk.complete_reload(&["Player"]),
            [("Player".to_string(), FinishOutcome::UnknownClass)]
        );
        let placeholder = sdk.host.tree().unwrap().children(main)[0];
        assert_eq!(sdk.host.tree().unwrap().get(placeholder).unwrap().class, "Node");

        sdk.host
            .classes_mut()
            .register_extension("Player", "Node2D")
            .unwrap();
        sdk.complete_reload(&["Player"]);
        let hero = sdk.find_node_by_name("Hero").unwrap();
        assert_eq!(sdk.host.tree().unwrap().get(hero).unwrap().class, "Player");
    }

    #[test]
    fn reload_support_depends_on_host_and_config() {
        assert!(sdk_with(Host::runtime("stock")).supports_reload());
        assert!(sdk_with(Host::editor("stock")).supports_reload());

        let mut old_editor = Host::editor("stock");
        old_editor.set_open_scene_support(false);
        assert!(!sdk_with(old_editor).supports_reload());

        let config = BridgeConfig {
            reload: ReloadConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!Sdk::new(Host::runtime("sakura"), &config).supports_reload());
    }

    #[test]
    fn dispose_only_touches_extension_classes() {
        let (mut sdk, _) = game();
        assert!(!sdk.dispose("Node"));
        assert!(!sdk.dispose("Ghost"));
        assert!(sdk.dispose("Player"));
        assert!(!sdk.host.classes().class_exists("Player"));
    }

    #[test]
    fn one_shot_signal_callbacks() {
        let (mut sdk, main) = game();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        sdk.connect_once(main, "ready", EventCallback::new(move || h.set(h.get() + 1)))
            .unwrap();

        assert_eq!(sdk.emit_signal(main, "ready"), 1);
        assert_eq!(sdk.emit_signal(main, "ready"), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn storage_is_shared_through_the_sdk() {
        let (mut sdk, _) = game();
        sdk.variables().set("lives", 3);
        assert_eq!(sdk.variables().get("lives").as_i64(), Some(3));

        let block = sdk.memory().allocate("scratch", 32);
        assert_eq!(sdk.memory().get_pointer("scratch"), block);

        sdk.checkpoints().create("boot");
        assert!(sdk.checkpoints().time("boot").is_some());
    }

    #[test]
    fn variables_cross_as_json() {
        let (mut sdk, _) = game();
        assert_eq!(sdk.variable_json("score"), "null");

        sdk.set_variable_json("score", "42").unwrap();
        assert_eq!(sdk.variables().get("score").as_i64(), Some(42));
        sdk.set_variable_json("player", r#"{"name":"Hero","hp":3}"#)
            .unwrap();
        assert_eq!(sdk.variable_json("player"), r#"{"hp":3,"name":"Hero"}"#);

        assert!(sdk.set_variable_json("broken", "{").is_err());
        assert!(!sdk.variables().contains("broken"));
    }

    #[test]
    fn returned_strings_stay_valid_until_the_next_call() {
        let (mut sdk, _) = game();
        let first = sdk.return_c_string("abc".into());
        // SAFETY: the sdk keeps the string alive until the next return.
        let text = unsafe { std::ffi::CStr::from_ptr(first) };
        assert_eq!(text.to_str().unwrap(), "abc");
        assert!(sdk.return_c_string("a\0b".into()).is_null());
    }

    static ASSET_HITS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_asset_event(path: *const c_char, code: i32) {
        if !path.is_null() && (0..=3).contains(&code) {
            ASSET_HITS.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn monitor_hooks_receive_polled_events() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sdk, _) = game();
        assert_eq!(sdk.poll_assets(), 0);

        sdk.watch_directory(dir.path().to_str().unwrap()).unwrap();
        assert!(sdk.register_monitor_hook(count_asset_event).unwrap());
        assert!(!sdk.register_monitor_hook(count_asset_event).unwrap());

        std::fs::write(dir.path().join("icon.png"), b"png").unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while ASSET_HITS.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            sdk.poll_assets();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(ASSET_HITS.load(Ordering::SeqCst) > 0);

        assert!(sdk.unregister_monitor_hook(count_asset_event));
        assert!(!sdk.unregister_monitor_hook(count_asset_event));
    }

    #[test]
    fn detach_refuses_while_tasks_run() {
        let (mut sdk, main) = game();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        sdk.connect_once(main, "ready", EventCallback::new(move || f.set(true)))
            .unwrap();

        let gate = Arc::new(AtomicBool::new(false));
        let open = gate.clone();
        sdk.tasks().initiate(move || {
            while !open.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(1));
            }
        });

        assert!(sdk.detach_extension(Duration::from_millis(20)).is_err());
        gate.store(true, Ordering::Release);
        assert!(sdk.detach_extension(Duration::from_secs(5)).unwrap().is_none());

        // Closures owned by the host are not extension hooks.
        assert_eq!(sdk.emit_signal(main, "ready"), 1);
        assert!(fired.get());
    }
}
