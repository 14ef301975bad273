//! Extension session - one Lua state bound to one live client
//!
//! The session is boxed and never moves; its address is the opaque state
//! pointer the host passes back to `on_timer`. The host must stop
//! delivering timers once `stop` has been called.

use std::ffi::c_void;
use std::fs;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use mlua::{Function, Lua, RegistryKey};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use glirc_lua_runtime::logging::{self, debug, error, info, warn};
use glirc_lua_runtime::{CallbackRegistry, Glirc, GlircApi, Host, MessageCode, Token};

use super::library::{self, BindingContext};
use crate::config::ExtensionConfig;
use crate::error::{ExtensionError, Result};

/// Runs a closure under `pcall` and reports failure as a message
const TIMER_DISPATCH: &str = r#"
local pcall, tostring = pcall, tostring
return function(callback)
  local ok, err = pcall(callback)
  if not ok then return tostring(err) end
end
"#;

pub struct Extension {
    lua: Lua,
    host: Host<'static>,
    timers: Arc<CallbackRegistry<RegistryKey>>,
    dispatch: RegistryKey,
    config: ExtensionConfig,
    /// Serializes entry into the Lua state; reentrant for host callbacks
    /// delivered while a script is running on the same thread
    gate: ReentrantMutex<()>,
}

impl Extension {
    /// Create a Lua state bound to `glirc`, install the library and run
    /// the configured startup script
    pub fn start(api: &'static GlircApi, glirc: *mut Glirc, config: ExtensionConfig) -> Result<Box<Self>> {
        let host = Host::new(api, glirc).ok_or(ExtensionError::NullClient)?;
        config.validate()?;

        let lua = Lua::new();
        let timers = Arc::new(CallbackRegistry::new());
        lua.set_app_data(BindingContext {
            host,
            timers: Arc::clone(&timers),
        });
        library::install(&lua, &config.global_name)?;

        let dispatch: Function = lua.load(TIMER_DISPATCH).set_name("=glirc.timer").eval()?;
        let dispatch = lua.create_registry_value(dispatch)?;

        let extension = Box::new(Self {
            lua,
            host,
            timers,
            dispatch,
            config,
            gate: ReentrantMutex::new(()),
        });
        info!(global = %extension.config.global_name, "extension started");

        if let Some(path) = extension.config.script.clone() {
            let source = fs::read(&path).map_err(|source| ExtensionError::Script {
                path: path.clone(),
                source,
            })?;
            extension.run_script(&source, &path.display().to_string())?;
        }

        Ok(extension)
    }

    /// Execute a chunk in the session's state
    pub fn run_script(&self, source: &[u8], chunk_name: &str) -> Result<()> {
        let _entered = self.gate.lock();
        debug!(chunk = chunk_name, bytes = source.len(), "running script");
        self.lua.load(source).set_name(format!("@{}", chunk_name)).exec()?;
        Ok(())
    }

    /// The session's Lua state, for embedders that evaluate their own code.
    /// Timer delivery from other threads waits until the guard is dropped.
    pub fn lua(&self) -> LuaGuard<'_> {
        LuaGuard {
            _entered: self.gate.lock(),
            lua: &self.lua,
        }
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Opaque pointer the host passes back to `on_timer`
    pub fn state_ptr(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }

    /// Timers scheduled and not yet delivered
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Invalidate outstanding timers and close the Lua state
    pub fn stop(self: Box<Self>) {
        drop(self);
    }

    fn deliver_timer(&self, glirc: *mut Glirc, raw: *mut c_void) {
        let Some(token) = Token::from_raw(raw) else {
            warn!("timer delivered with a null token");
            return;
        };
        let _entered = self.gate.lock();
        // Report through the client the host handed us with this callback
        let host = Host::new(self.host.api(), glirc).unwrap_or(self.host);

        // Resolving frees the token before the closure runs, so a closure
        // that schedules a new timer may be handed the same slot
        let Some(key) = self.timers.resolve(token) else {
            return;
        };
        let callback: Function = match self.lua.registry_value(&key) {
            Ok(callback) => callback,
            Err(err) => return report(host, token, &err.to_string()),
        };
        if let Err(err) = self.lua.remove_registry_value(key) {
            debug!(error = %err, "failed to release timer closure");
        }

        let outcome = self
            .lua
            .registry_value::<Function>(&self.dispatch)
            .and_then(|dispatch| dispatch.call::<_, Option<mlua::String>>(callback));
        match outcome {
            Ok(None) => {}
            Ok(Some(message)) => report(host, token, &message.to_string_lossy()),
            Err(err) => report(host, token, &err.to_string()),
        }
    }
}

fn report(host: Host<'_>, token: Token, message: &str) {
    logging::log_callback_failure(token, message);
    host.print(MessageCode::Error, message.as_bytes());
}

/// Exclusive access to an extension's Lua state
pub struct LuaGuard<'a> {
    _entered: ReentrantMutexGuard<'a, ()>,
    lua: &'a Lua,
}

impl Deref for LuaGuard<'_> {
    type Target = Lua;

    fn deref(&self) -> &Lua {
        self.lua
    }
}

impl Drop for Extension {
    fn drop(&mut self) {
        let dropped = self.timers.shutdown();
        info!(dropped, "extension stopped");
    }
}

/// Timer entry point handed to the host with every `set_timer`
///
/// # Safety
/// `state` must be the `state_ptr` of a live `Extension`, and `token` the
/// value the host was given with this callback.
pub unsafe extern "C" fn on_timer(glirc: *mut Glirc, state: *mut c_void, token: *mut c_void) {
    let extension = match (state as *const Extension).as_ref() {
        Some(extension) => extension,
        None => {
            warn!("timer delivered without extension state");
            return;
        }
    };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| extension.deliver_timer(glirc, token)));
    if outcome.is_err() {
        error!("panic while delivering timer");
    }
}
