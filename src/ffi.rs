//! C entry points
//!
//! The host application drives the core through these exports. Strings go in
//! and out as NUL-terminated UTF-8; every returned string is owned by the
//! caller and must be released with `clashFreeString`. Failures cross the
//! boundary as plain messages, successes as `"success"` or a JSON document.
//!
//! # Safety
//!
//! Pointer arguments must be null or point to a valid NUL-terminated string
//! that stays alive for the duration of the call.

use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use log::{debug, error, warn};
use once_cell::sync::OnceCell;

use crate::bootstrap::{self, BootstrapOptions, BootstrapReport, ConfigSource};
use crate::common::{init_logger, BridgeError, Result};
use crate::config::defaults::SUCCESS;
use crate::config::YamlLoader;
use crate::context::{Core, CorePaths};
use crate::geoip;

static CORE: OnceCell<Core> = OnceCell::new();

/// UI path set before the core exists; picked up by `init_core`
static PENDING_UI_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);

fn core() -> Result<&'static Core> {
    CORE.get().ok_or(BridgeError::NotInitialized)
}

fn init_core() -> Result<Core> {
    let paths = CorePaths::detect()?;
    let core = Core::builder(paths).build()?;

    let pending = PENDING_UI_PATH.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(path) = pending {
        core.set_ui_path(path);
    }
    Ok(core)
}

/// Copy a Rust string into a caller-owned C string
fn into_raw(value: impl Into<String>) -> *mut c_char {
    let mut bytes = value.into().into_bytes();
    bytes.retain(|b| *b != 0);
    match CString::new(bytes) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn status(result: Result<()>) -> *mut c_char {
    match result {
        Ok(()) => into_raw(SUCCESS),
        Err(e) => into_raw(e.to_string()),
    }
}

unsafe fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

unsafe fn read_bytes(ptr: *const c_char) -> Vec<u8> {
    if ptr.is_null() {
        return Vec::new();
    }
    CStr::from_ptr(ptr).to_bytes().to_vec()
}

/// Resolve the home directory and create the core
///
/// Later calls are no-ops.
#[export_name = "initClashCore"]
pub extern "C" fn init_clash_core() {
    init_logger("info");

    if let Err(e) = CORE.get_or_try_init(init_core) {
        error!("Failed to initialize clash core: {}", e);
    }
}

/// Check a configuration document without applying it
///
/// # Safety
///
/// See the module documentation.
#[export_name = "verifyClashConfig"]
pub unsafe extern "C" fn verify_clash_config(content: *const c_char) -> *mut c_char {
    let bytes = read_bytes(content);
    let result = match core() {
        Ok(core) => bootstrap::verify_config(core.loader(), &bytes),
        Err(_) => bootstrap::verify_config(&YamlLoader::new(), &bytes),
    };
    status(result)
}

/// Bootstrap from the default configuration file
///
/// Returns `{"externalController": ..., "secret": ...}` or an error message.
#[export_name = "run"]
pub extern "C" fn run(check_ports: bool, allow_lan: bool) -> *mut c_char {
    let options = BootstrapOptions {
        repair_ports: check_ports,
        allow_lan: Some(allow_lan),
    };

    let result = core()
        .and_then(|core| bootstrap::bootstrap(core, &ConfigSource::Default, options))
        .and_then(|config| BootstrapReport::from(&config).to_json());

    match result {
        Ok(json) => into_raw(json),
        Err(e) => into_raw(e.to_string()),
    }
}

/// Set the dashboard directory served by the next controller start
///
/// May be called before `initClashCore`; the path is kept until then.
///
/// # Safety
///
/// See the module documentation.
#[export_name = "setUIPath"]
pub unsafe extern "C" fn set_ui_path(path: *const c_char) {
    let path = PathBuf::from(read_str(path).unwrap_or_default());
    match core() {
        Ok(core) => core.set_ui_path(path),
        Err(_) => {
            debug!("Core not initialized yet, keeping UI path {}", path.display());
            let mut pending = PENDING_UI_PATH.lock().unwrap_or_else(PoisonError::into_inner);
            *pending = Some(path);
        }
    }
}

/// Reload a configuration file into the running engine
///
/// # Safety
///
/// See the module documentation.
#[export_name = "clashUpdateConfig"]
pub unsafe extern "C" fn clash_update_config(path: *const c_char) -> *mut c_char {
    let path = PathBuf::from(read_str(path).unwrap_or_default());
    status(core().and_then(|core| bootstrap::update_config(core, &path)))
}

/// Current general settings as JSON
#[export_name = "clashGetConfigs"]
pub extern "C" fn clash_get_configs() -> *mut c_char {
    let result = core().and_then(|core| {
        serde_json::to_string(&core.engine().general()).map_err(|e| BridgeError::Other(e.to_string()))
    });

    match result {
        Ok(json) => into_raw(json),
        Err(e) => into_raw(e.to_string()),
    }
}

/// Check that `Country.mmdb` opens and resolves a known address
#[export_name = "verifyGEOIPDataBase"]
pub extern "C" fn verify_geoip_database() -> bool {
    let mmdb = match core() {
        Ok(core) => core.paths().mmdb.clone(),
        Err(_) => match CorePaths::detect() {
            Ok(paths) => paths.mmdb,
            Err(e) => {
                warn!("mmdb fail: {}", e);
                return false;
            }
        },
    };
    geoip::verify_database(&mmdb)
}

/// Release a string returned by any of the exports above
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this library that
/// has not been freed yet.
#[export_name = "clashFreeString"]
pub unsafe extern "C" fn clash_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take(ptr: *mut c_char) -> String {
        let value = CStr::from_ptr(ptr).to_string_lossy().into_owned();
        clash_free_string(ptr);
        value
    }

    #[test]
    fn test_into_raw_strips_nul() {
        unsafe {
            assert_eq!(take(into_raw("a\0b")), "ab");
        }
    }

    #[test]
    fn test_verify_without_core() {
        let valid = CString::new("proxies:\n  - { name: a, type: ss }\n").unwrap();
        let empty = CString::new("port: 7890\n").unwrap();
        unsafe {
            assert_eq!(take(verify_clash_config(valid.as_ptr())), "success");
            assert_eq!(take(verify_clash_config(empty.as_ptr())), "No proxy found in config");
            assert_eq!(take(verify_clash_config(std::ptr::null())), "Configuration is empty");
        }
    }

    #[test]
    fn test_free_null() {
        unsafe { clash_free_string(std::ptr::null_mut()) };
    }
}
