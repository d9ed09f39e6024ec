//! C ABI surface handed to extension modules.
//!
//! Extensions never link against the bridge. They receive
//! [`sakura_get_sdk_function`] at init time and resolve every entry point by
//! name. All entry points act on the bridge installed on the calling thread
//! by [`create_sdk_interface`]; without one they return a neutral value.

use std::cell::RefCell;
use std::ffi::{CStr, c_char, c_void};
use std::ptr;

use log::warn;
use sakura_ids::{NodeID, TaskID};
use sakura_scene::EventCallback;

use crate::sdk::{FileMonitorFn, Sdk};

thread_local! {
    static BRIDGE: RefCell<Option<Sdk>> = const { RefCell::new(None) };
}

/// Install `sdk` as this thread's bridge, returning the one it replaces.
pub fn create_sdk_interface(sdk: Sdk) -> Option<Sdk> {
    BRIDGE.with(|bridge| bridge.borrow_mut().replace(sdk))
}

pub fn release_sdk_interface() -> Option<Sdk> {
    BRIDGE.with(|bridge| bridge.borrow_mut().take())
}

pub fn has_sdk_interface() -> bool {
    BRIDGE.with(|bridge| bridge.borrow().is_some())
}

/// Run `f` against the installed bridge. `None` when there is none or when
/// called re-entrantly from inside another bridge call.
pub fn with_sdk<R>(f: impl FnOnce(&mut Sdk) -> R) -> Option<R> {
    BRIDGE.with(|bridge| match bridge.try_borrow_mut() {
        Ok(mut slot) => slot.as_mut().map(f),
        Err(_) => {
            warn!("[sakura] re-entrant bridge call ignored");
            None
        }
    })
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for `'a`.
unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---- engine ----

pub extern "C" fn sakura_is_editor() -> bool {
    with_sdk(|sdk| sdk.is_editor()).unwrap_or(false)
}

pub extern "C" fn sakura_is_game() -> bool {
    with_sdk(|sdk| sdk.is_game()).unwrap_or(false)
}

pub extern "C" fn sakura_get_time() -> f64 {
    with_sdk(|sdk| sdk.get_time()).unwrap_or(0.0)
}

/// 0 editor, 1 debug, 2 runtime; -1 without a bridge.
pub extern "C" fn sakura_get_engine_mode() -> i32 {
    with_sdk(|sdk| sdk.engine_mode().code()).unwrap_or(-1)
}

/// Node id as `u64`, 0 when not found.
///
/// # Safety
/// `path` must be null or a valid C string.
pub unsafe extern "C" fn sakura_get_node_by_path(path: *const c_char) -> u64 {
    let Some(path) = (unsafe { c_str(path) }) else {
        return 0;
    };
    with_sdk(|sdk| sdk.node_by_path(path))
        .flatten()
        .map_or(0, NodeID::as_u64)
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_find_node_by_name(name: *const c_char) -> u64 {
    let Some(name) = (unsafe { c_str(name) }) else {
        return 0;
    };
    with_sdk(|sdk| sdk.find_node_by_name(name))
        .flatten()
        .map_or(0, NodeID::as_u64)
}

/// Hex id stable across reloads, null for unknown nodes. The string stays
/// valid until the next call that returns a string.
pub extern "C" fn sakura_get_node_unique_id(node: u64) -> *const c_char {
    with_sdk(|sdk| match sdk.node_unique_id(NodeID::from_u64(node)) {
        Some(id) => sdk.return_c_string(id),
        None => ptr::null(),
    })
    .unwrap_or(ptr::null())
}

/// Connect `callback` to `signal` on `node` for a single emission.
///
/// # Safety
/// `signal` must be null or a valid C string.
pub unsafe extern "C" fn sakura_connect_signal_once(
    node: u64,
    signal: *const c_char,
    callback: extern "C" fn(),
) -> bool {
    let Some(signal) = (unsafe { c_str(signal) }) else {
        return false;
    };
    let node = NodeID::from_u64(node);
    with_sdk(|sdk| {
        sdk.connect_once(node, signal, EventCallback::from_raw(callback))
            .is_ok()
    })
    .unwrap_or(false)
}

// ---- hot reload ----

pub extern "C" fn sakura_supports_reload() -> bool {
    with_sdk(|sdk| sdk.supports_reload()).unwrap_or(false)
}

/// # Safety
/// `class` must be null or a valid C string.
pub unsafe extern "C" fn sakura_prepare_reload(class: *const c_char) -> bool {
    let Some(class) = (unsafe { c_str(class) }) else {
        return false;
    };
    with_sdk(|sdk| {
        matches!(
            sdk.prepare_reload(class),
            sakura_reload::PrepareOutcome::Captured { .. }
        )
    })
    .unwrap_or(false)
}

/// # Safety
/// `class` must be null or a valid C string.
pub unsafe extern "C" fn sakura_finish_reload(class: *const c_char) -> bool {
    let Some(class) = (unsafe { c_str(class) }) else {
        return false;
    };
    with_sdk(|sdk| {
        matches!(
            sdk.finish_reload(class),
            sakura_reload::FinishOutcome::Finished(_)
        )
    })
    .unwrap_or(false)
}

/// # Safety
/// `class` must be null or a valid C string.
pub unsafe extern "C" fn sakura_dispose(class: *const c_char) -> bool {
    let Some(class) = (unsafe { c_str(class) }) else {
        return false;
    };
    with_sdk(|sdk| sdk.dispose(class)).unwrap_or(false)
}

/// Register an extension class deriving from `parent`.
///
/// # Safety
/// Both arguments must be null or valid C strings.
pub unsafe extern "C" fn sakura_register_class(
    class: *const c_char,
    parent: *const c_char,
) -> bool {
    let (Some(class), Some(parent)) = (unsafe { c_str(class) }, unsafe { c_str(parent) }) else {
        return false;
    };
    with_sdk(|sdk| {
        sdk.host
            .classes_mut()
            .register_extension(class, parent)
            .is_ok()
    })
    .unwrap_or(false)
}

// ---- global memory ----

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_get_global_pointer(name: *const c_char) -> *mut c_void {
    let Some(name) = (unsafe { c_str(name) }) else {
        return ptr::null_mut();
    };
    with_sdk(|sdk| sdk.memory().get_pointer(name)).unwrap_or(ptr::null_mut())
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_set_global_pointer(
    name: *const c_char,
    pointer: *mut c_void,
) -> *mut c_void {
    let Some(name) = (unsafe { c_str(name) }) else {
        return ptr::null_mut();
    };
    with_sdk(|sdk| sdk.memory().set_pointer(name, pointer)).unwrap_or(ptr::null_mut())
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_delete_global_pointer(name: *const c_char) -> bool {
    let Some(name) = (unsafe { c_str(name) }) else {
        return false;
    };
    with_sdk(|sdk| sdk.memory().delete_pointer(name)).unwrap_or(false)
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_allocate_global_memory(
    name: *const c_char,
    size: usize,
) -> *mut c_void {
    let Some(name) = (unsafe { c_str(name) }) else {
        return ptr::null_mut();
    };
    with_sdk(|sdk| sdk.memory().allocate(name, size)).unwrap_or(ptr::null_mut())
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_free_global_memory(name: *const c_char) -> bool {
    let Some(name) = (unsafe { c_str(name) }) else {
        return false;
    };
    with_sdk(|sdk| sdk.memory().free(name)).unwrap_or(false)
}

// ---- global variables ----

/// Value stored under `name` as JSON text, `null` when unset. The string
/// stays valid until the next call that returns a string.
///
/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_get_global_variable(name: *const c_char) -> *const c_char {
    let Some(name) = (unsafe { c_str(name) }) else {
        return ptr::null();
    };
    with_sdk(|sdk| {
        let json = sdk.variable_json(name);
        sdk.return_c_string(json)
    })
    .unwrap_or(ptr::null())
}

/// Store the JSON value `json` under `name`. False when `json` does not
/// parse.
///
/// # Safety
/// Both arguments must be null or valid C strings.
pub unsafe extern "C" fn sakura_set_global_variable(
    name: *const c_char,
    json: *const c_char,
) -> bool {
    let (Some(name), Some(json)) = (unsafe { c_str(name) }, unsafe { c_str(json) }) else {
        return false;
    };
    with_sdk(|sdk| match sdk.set_variable_json(name, json) {
        Ok(()) => true,
        Err(err) => {
            warn!("[sakura] global variable `{name}`: {err}");
            false
        }
    })
    .unwrap_or(false)
}

pub extern "C" fn sakura_clear_global_variables() {
    with_sdk(|sdk| sdk.variables().clear());
}

// ---- tasks ----

/// Opaque user data moved to a worker thread together with its callback.
struct TaskData(*mut c_void);

// SAFETY: the extension owns the data and promises it may cross threads
// when it hands it to `sakura_initiate_task`.
unsafe impl Send for TaskData {}

impl TaskData {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

/// Run `task(data)` on the worker pool. Returns the task id, 0 without a
/// bridge.
pub extern "C" fn sakura_initiate_task(task: extern "C" fn(*mut c_void), data: *mut c_void) -> u64 {
    let data = TaskData(data);
    with_sdk(move |sdk| {
        sdk.tasks()
            .initiate(move || task(data.get()))
            .as_u64()
    })
    .unwrap_or(0)
}

pub extern "C" fn sakura_is_task_complete(task: u64) -> bool {
    with_sdk(|sdk| sdk.tasks().is_complete(TaskID::from_u64(task))).unwrap_or(false)
}

pub extern "C" fn sakura_clear_task(task: u64) -> bool {
    with_sdk(|sdk| sdk.tasks().clear(TaskID::from_u64(task))).unwrap_or(false)
}

// ---- checkpoints ----

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_create_checkpoint(name: *const c_char) -> bool {
    let Some(name) = (unsafe { c_str(name) }) else {
        return false;
    };
    with_sdk(|sdk| sdk.checkpoints().create(name)).is_some()
}

/// Seconds since the checkpoint was created, negative when unknown.
///
/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_get_checkpoint_time(name: *const c_char) -> f64 {
    let Some(name) = (unsafe { c_str(name) }) else {
        return -1.0;
    };
    with_sdk(|sdk| sdk.checkpoints().time(name))
        .flatten()
        .unwrap_or(-1.0)
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_delete_checkpoint(name: *const c_char) -> bool {
    let Some(name) = (unsafe { c_str(name) }) else {
        return false;
    };
    with_sdk(|sdk| sdk.checkpoints().delete(name)).unwrap_or(false)
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_get_checkpoint_time_and_dispose(name: *const c_char) -> f64 {
    let Some(name) = (unsafe { c_str(name) }) else {
        return -1.0;
    };
    with_sdk(|sdk| sdk.checkpoints().time_and_dispose(name))
        .flatten()
        .unwrap_or(-1.0)
}

// ---- asset monitor ----

/// # Safety
/// `path` must be null or a valid C string.
pub unsafe extern "C" fn sakura_create_directory_monitor(path: *const c_char) -> bool {
    let Some(path) = (unsafe { c_str(path) }) else {
        return false;
    };
    with_sdk(|sdk| match sdk.watch_directory(path) {
        Ok(()) => true,
        Err(err) => {
            warn!("[sakura] {err}");
            false
        }
    })
    .unwrap_or(false)
}

/// # Safety
/// `path` must be null or a valid C string.
pub unsafe extern "C" fn sakura_create_file_monitor(path: *const c_char) -> bool {
    let Some(path) = (unsafe { c_str(path) }) else {
        return false;
    };
    with_sdk(|sdk| match sdk.watch_file(path) {
        Ok(()) => true,
        Err(err) => {
            warn!("[sakura] {err}");
            false
        }
    })
    .unwrap_or(false)
}

/// Deliver asset changes to `callback` on each poll. False when it is
/// already registered.
pub extern "C" fn sakura_register_file_monitor_callback(callback: FileMonitorFn) -> bool {
    with_sdk(|sdk| match sdk.register_monitor_hook(callback) {
        Ok(added) => added,
        Err(err) => {
            warn!("[sakura] {err}");
            false
        }
    })
    .unwrap_or(false)
}

pub extern "C" fn sakura_unregister_file_monitor_callback(callback: FileMonitorFn) -> bool {
    with_sdk(|sdk| sdk.unregister_monitor_hook(callback)).unwrap_or(false)
}

// ---- output ----

/// # Safety
/// `message` must be null or a valid C string.
pub unsafe extern "C" fn sakura_output(message: *const c_char) {
    if let Some(message) = unsafe { c_str(message) } {
        sakura_modules::log::output(message);
    }
}

/// # Safety
/// `message` must be null or a valid C string.
pub unsafe extern "C" fn sakura_debug_output(message: *const c_char) {
    if let Some(message) = unsafe { c_str(message) } {
        sakura_modules::log::debug_output(message);
    }
}

// ---- lookup ----

/// Resolve an exported entry point by name. Null for unknown names.
pub fn sdk_function(name: &str) -> *const c_void {
    match name {
        "IsEditor" => sakura_is_editor as *const c_void,
        "IsGame" => sakura_is_game as *const c_void,
        "GetTime" => sakura_get_time as *const c_void,
        "GetEngineMode" => sakura_get_engine_mode as *const c_void,
        "GetNodeUniqueID" => sakura_get_node_unique_id as *const c_void,
        "GetNodeByPath" => sakura_get_node_by_path as *const c_void,
        "FindNodeByName" => sakura_find_node_by_name as *const c_void,
        "ConnectSignalOnce" => sakura_connect_signal_once as *const c_void,
        "SupportsReload" => sakura_supports_reload as *const c_void,
        "PrepareReload" => sakura_prepare_reload as *const c_void,
        "FinishReload" => sakura_finish_reload as *const c_void,
        "Dispose" => sakura_dispose as *const c_void,
        "RegisterClass" => sakura_register_class as *const c_void,
        "GetGlobalPointer" => sakura_get_global_pointer as *const c_void,
        "SetGlobalPointer" => sakura_set_global_pointer as *const c_void,
        "DeleteGlobalPointer" => sakura_delete_global_pointer as *const c_void,
        "AllocateGlobalMemory" => sakura_allocate_global_memory as *const c_void,
        "FreeGlobalMemory" => sakura_free_global_memory as *const c_void,
        "GetGlobalVariable" => sakura_get_global_variable as *const c_void,
        "SetGlobalVariable" => sakura_set_global_variable as *const c_void,
        "ClearGlobalVariables" => sakura_clear_global_variables as *const c_void,
        "InitiateTask" => sakura_initiate_task as *const c_void,
        "IsTaskComplete" => sakura_is_task_complete as *const c_void,
        "ClearTask" => sakura_clear_task as *const c_void,
        "CreateCheckpoint" => sakura_create_checkpoint as *const c_void,
        "GetCheckpointTime" => sakura_get_checkpoint_time as *const c_void,
        "DeleteCheckpoint" => sakura_delete_checkpoint as *const c_void,
        "GetCheckpointTimeAndDispose" => sakura_get_checkpoint_time_and_dispose as *const c_void,
        "CreateDirectoryMonitor" => sakura_create_directory_monitor as *const c_void,
        "CreateFileMonitor" => sakura_create_file_monitor as *const c_void,
        "RegisterFileMonitorCallback" => sakura_register_file_monitor_callback as *const c_void,
        "UnregisterFileMonitorCallback" => sakura_unregister_file_monitor_callback as *const c_void,
        "Output" => sakura_output as *const c_void,
        "DebugOutput" => sakura_debug_output as *const c_void,
        _ => ptr::null(),
    }
}

/// C entry of [`sdk_function`], handed to extensions at init.
///
/// # Safety
/// `name` must be null or a valid C string.
pub unsafe extern "C" fn sakura_get_sdk_function(name: *const c_char) -> *const c_void {
    match unsafe { c_str(name) } {
        Some(name) => sdk_function(name),
        None => ptr::null(),
    }
}
