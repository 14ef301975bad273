//! C API for the host
//!
//! Design: the host loads this library, calls `glirc_lua_start` once per
//! client with its entry point table, keeps the returned pointer as the
//! extension state, and calls `glirc_lua_stop` with it on unload. Timer
//! callbacks receive the same pointer.

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;

use glirc_lua_runtime::logging::{self, error};
use glirc_lua_runtime::{Glirc, GlircApi, Host, MessageCode};

use crate::config::ExtensionConfig;
use crate::error::{ExtensionError, Result};
use crate::lua::Extension;

fn config_path(path: *const c_char, len: usize) -> Option<PathBuf> {
    if path.is_null() {
        return None;
    }
    let bytes = unsafe { std::slice::from_raw_parts(path as *const u8, len) };
    Some(PathBuf::from(String::from_utf8_lossy(bytes).into_owned()))
}

fn start(api: *const GlircApi, glirc: *mut Glirc, path: Option<PathBuf>) -> Result<Box<Extension>> {
    // The host keeps its table alive for as long as the library is loaded
    let api: &'static GlircApi = unsafe { api.as_ref() }.ok_or(ExtensionError::NullApi)?;
    let config = match path {
        Some(path) => ExtensionConfig::load(&path)?,
        None => ExtensionConfig::default(),
    };
    logging::init_with_config(config.logging.to_log_config());
    Extension::start(api, glirc, config)
}

/// Start an extension session. `config_path` may be null for defaults.
/// Returns the extension state, or null after reporting the failure
/// through the host's `print`.
///
/// # Safety
/// `api` must point to a table that outlives the session, `glirc` must be
/// the live client, and `config_path` null or `config_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn glirc_lua_start(
    api: *const GlircApi,
    glirc: *mut Glirc,
    config_path_ptr: *const c_char,
    config_len: usize,
) -> *mut c_void {
    let path = config_path(config_path_ptr, config_len);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| start(api, glirc, path)));

    let failure = match outcome {
        Ok(Ok(extension)) => return Box::into_raw(extension) as *mut c_void,
        Ok(Err(err)) => err.to_string(),
        Err(_) => "panic while starting the Lua extension".to_string(),
    };
    error!(error = %failure, "extension failed to start");
    if let Some(host) = api.as_ref().and_then(|api| Host::new(api, glirc)) {
        host.print(MessageCode::Error, failure.as_bytes());
    }
    ptr::null_mut()
}

/// Stop a session started by `glirc_lua_start`. Null is ignored.
///
/// # Safety
/// `state` must be null or a pointer returned by `glirc_lua_start` that
/// has not been stopped yet.
#[no_mangle]
pub unsafe extern "C" fn glirc_lua_stop(state: *mut c_void) {
    if state.is_null() {
        return;
    }
    let extension = Box::from_raw(state as *mut Extension);
    if panic::catch_unwind(AssertUnwindSafe(|| extension.stop())).is_err() {
        error!("panic while stopping the Lua extension");
    }
}
