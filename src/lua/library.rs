//! The `glirc` library table
//!
//! Every function fetches the client handle from the state's app data,
//! checks its arguments, calls through the runtime crate and converts the
//! result. Host-owned results are copied into Lua values before their
//! guard drops, so nothing returned to a script aliases host memory.

use std::iter;
use std::sync::Arc;

use mlua::{Function, IntoLuaMulti, Lua, MultiValue, RegistryKey, Table, Value};
use smallvec::SmallVec;

use glirc_lua_runtime::identifier;
use glirc_lua_runtime::logging;
use glirc_lua_runtime::marshal::{self, check_param_count, ForeignString, ForeignStringArray, MAX_PARAMS};
use glirc_lua_runtime::{CallbackRegistry, Host, MessageCode};

use super::args::{error_message, Args, RaiseExt};
use super::extension::on_timer;
use super::format::FORMAT_CODES;

/// Per-state data the library functions run against
pub(crate) struct BindingContext {
    pub(crate) host: Host<'static>,
    pub(crate) timers: Arc<CallbackRegistry<RegistryKey>>,
}

fn host(lua: &Lua) -> mlua::Result<Host<'static>> {
    lua.app_data_ref::<BindingContext>()
        .map(|context| context.host)
        .ok_or_else(unbound)
}

fn timers(lua: &Lua) -> mlua::Result<Arc<CallbackRegistry<RegistryKey>>> {
    lua.app_data_ref::<BindingContext>()
        .map(|context| Arc::clone(&context.timers))
        .ok_or_else(unbound)
}

fn unbound() -> mlua::Error {
    mlua::Error::RuntimeError("glirc library is not bound to a client".to_string())
}

fn import_list<'lua>(lua: &'lua Lua, list: ForeignStringArray) -> mlua::Result<Table<'lua>> {
    let entries = list.import_with(|entry| lua.create_string(entry))?;
    lua.create_sequence_from(entries)
}

fn import_optional<'lua>(lua: &'lua Lua, value: ForeignString) -> mlua::Result<Option<mlua::String<'lua>>> {
    value.import_with(|bytes| lua.create_string(bytes))
}

/// `send_message(network, command, ...)`; at most 15 parameters
fn send_message<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<()> {
    let args = Args::new("send_message", args);
    let network = args.check_string(lua, 1)?;
    let command = args.check_string(lua, 2)?;
    check_param_count(args.len().saturating_sub(2)).raise()?;

    let strings = (3..=args.len())
        .map(|position| args.check_string(lua, position))
        .collect::<mlua::Result<SmallVec<[mlua::String; MAX_PARAMS]>>>()?;
    let params: SmallVec<[&[u8]; MAX_PARAMS]> = strings.iter().map(|s| s.as_bytes()).collect();

    marshal::send_message(&host(lua)?, network.as_bytes(), command.as_bytes(), &params).raise()
}

/// `inject_chat(network, source, target, message)`
fn inject_chat<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<()> {
    let args = Args::new("inject_chat", args);
    let network = args.check_string(lua, 1)?;
    let source = args.check_string(lua, 2)?;
    let target = args.check_string(lua, 3)?;
    let message = args.check_string(lua, 4)?;
    args.check_none(5)?;

    marshal::inject_chat(
        &host(lua)?,
        network.as_bytes(),
        source.as_bytes(),
        target.as_bytes(),
        message.as_bytes(),
    )
    .raise()
}

fn console<'lua>(lua: &'lua Lua, args: Args<'lua>, code: MessageCode) -> mlua::Result<()> {
    let message = args.check_string(lua, 1)?;
    args.check_none(2)?;
    host(lua)?.print(code, message.as_bytes());
    Ok(())
}

/// `print(message)` to the client console
fn print<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<()> {
    console(lua, Args::new("print", args), MessageCode::Normal)
}

/// `error(message)` to the client console, marked as an error
fn error<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<()> {
    console(lua, Args::new("error", args), MessageCode::Error)
}

/// `identifier_cmp(a, b)` → -1, 0 or 1
fn identifier_cmp<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<i64> {
    let args = Args::new("identifier_cmp", args);
    let a = args.check_string(lua, 1)?;
    let b = args.check_string(lua, 2)?;
    args.check_none(3)?;
    Ok(identifier::identifier_cmp_int(a.as_bytes(), b.as_bytes()).into())
}

fn list_networks<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<Table<'lua>> {
    Args::new("list_networks", args).check_none(1)?;
    let list = host(lua)?.list_networks().raise()?;
    import_list(lua, list)
}

fn list_channels<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<Table<'lua>> {
    let args = Args::new("list_channels", args);
    let network = args.check_string(lua, 1)?;
    args.check_none(2)?;
    let list = host(lua)?.list_channels(network.as_bytes()).raise()?;
    import_list(lua, list)
}

fn list_channel_users<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<Table<'lua>> {
    let args = Args::new("list_channel_users", args);
    let network = args.check_string(lua, 1)?;
    let channel = args.check_string(lua, 2)?;
    args.check_none(3)?;
    let list = host(lua)?
        .list_channel_users(network.as_bytes(), channel.as_bytes())
        .raise()?;
    import_list(lua, list)
}

fn my_nick<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<Option<mlua::String<'lua>>> {
    let args = Args::new("my_nick", args);
    let network = args.check_string(lua, 1)?;
    args.check_none(2)?;
    import_optional(lua, host(lua)?.my_nick(network.as_bytes()))
}

fn user_account<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<Option<mlua::String<'lua>>> {
    let args = Args::new("user_account", args);
    let network = args.check_string(lua, 1)?;
    let nick = args.check_string(lua, 2)?;
    args.check_none(3)?;
    import_optional(lua, host(lua)?.user_account(network.as_bytes(), nick.as_bytes()))
}

fn user_channel_modes<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<Option<mlua::String<'lua>>> {
    let args = Args::new("user_channel_modes", args);
    let network = args.check_string(lua, 1)?;
    let channel = args.check_string(lua, 2)?;
    let nick = args.check_string(lua, 3)?;
    args.check_none(4)?;
    let sigils = host(lua)?.user_channel_modes(network.as_bytes(), channel.as_bytes(), nick.as_bytes());
    import_optional(lua, sigils)
}

fn mark_seen<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<()> {
    let args = Args::new("mark_seen", args);
    let network = args.opt_string(lua, 1)?;
    let channel = args.opt_string(lua, 2)?;
    args.check_none(3)?;
    host(lua)?.mark_seen(
        network.as_ref().map(|s| s.as_bytes()),
        channel.as_ref().map(|s| s.as_bytes()),
    );
    Ok(())
}

fn clear_window<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<()> {
    let args = Args::new("clear_window", args);
    let network = args.opt_string(lua, 1)?;
    let channel = args.opt_string(lua, 2)?;
    args.check_none(3)?;
    host(lua)?.clear_window(
        network.as_ref().map(|s| s.as_bytes()),
        channel.as_ref().map(|s| s.as_bytes()),
    );
    Ok(())
}

/// `current_focus()` → network or nil, target or nil
fn current_focus<'lua>(
    lua: &'lua Lua,
    args: MultiValue<'lua>,
) -> mlua::Result<(Option<mlua::String<'lua>>, Option<mlua::String<'lua>>)> {
    Args::new("current_focus", args).check_none(1)?;
    let (network, target) = host(lua)?.current_focus();
    Ok((import_optional(lua, network)?, import_optional(lua, target)?))
}

fn is_logged_on<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<bool> {
    let args = Args::new("is_logged_on", args);
    let network = args.check_string(lua, 1)?;
    let nick = args.check_string(lua, 2)?;
    args.check_none(3)?;
    Ok(host(lua)?.is_logged_on(network.as_bytes(), nick.as_bytes()))
}

fn is_channel<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<bool> {
    let args = Args::new("is_channel", args);
    let network = args.check_string(lua, 1)?;
    let target = args.check_string(lua, 2)?;
    args.check_none(3)?;
    Ok(host(lua)?.is_channel(network.as_bytes(), target.as_bytes()))
}

fn resolve_path<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<Option<mlua::String<'lua>>> {
    let args = Args::new("resolve_path", args);
    let path = args.check_string(lua, 1)?;
    args.check_none(2)?;
    import_optional(lua, host(lua)?.resolve_path(path.as_bytes()))
}

/// `set_timer(millis, closure)`: run `closure` once after `millis`
fn set_timer<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<()> {
    let args = Args::new("set_timer", args);
    let millis = args.check_integer(lua, 1)?;
    let callback = args.check_function(2)?;
    args.check_none(3)?;
    let delay_ms = u64::try_from(millis).map_err(|_| args.fail(1, "delay must not be negative"))?;

    let host = host(lua)?;
    let key = lua.create_registry_value(callback)?;
    let token = timers(lua)?.register(key).raise()?;
    host.set_timer(delay_ms, on_timer, token);
    logging::log_timer_scheduled(token, delay_ms);
    Ok(())
}

/// Library entry point after result conversion
type LibFn = for<'lua> fn(&'lua Lua, MultiValue<'lua>) -> mlua::Result<MultiValue<'lua>>;

macro_rules! entry {
    ($name:ident) => {{
        fn adapter<'lua>(lua: &'lua Lua, args: MultiValue<'lua>) -> mlua::Result<MultiValue<'lua>> {
            $name(lua, args)?.into_lua_multi(lua)
        }
        (stringify!($name), adapter as LibFn)
    }};
}

const FUNCTIONS: [(&str, LibFn); 18] = [
    entry!(send_message),
    entry!(inject_chat),
    entry!(print),
    entry!(error),
    entry!(identifier_cmp),
    entry!(list_networks),
    entry!(list_channels),
    entry!(list_channel_users),
    entry!(my_nick),
    entry!(user_account),
    entry!(user_channel_modes),
    entry!(mark_seen),
    entry!(clear_window),
    entry!(current_focus),
    entry!(is_logged_on),
    entry!(is_channel),
    entry!(resolve_path),
    entry!(set_timer),
];

/// Turns `(true, ...)` into a return and `(false, message)` into a plain
/// string error, the way C library functions raise
const RAISE_SHIM: &str = r#"
local error = error
local function finish(ok, ...)
  if ok then return ... end
  error((...), 0)
end
return function(raw)
  return function(...) return finish(raw(...)) end
end
"#;

fn bind<'lua>(lua: &'lua Lua, shim: &Function<'lua>, function: LibFn) -> mlua::Result<Function<'lua>> {
    let raw = lua.create_function(move |lua, args: MultiValue| match function(lua, args) {
        Ok(values) => Ok(iter::once(Value::Boolean(true)).chain(values).collect::<MultiValue>()),
        Err(err) => (false, error_message(&err)).into_lua_multi(lua),
    })?;
    shim.call(raw)
}

fn version_table(lua: &Lua) -> mlua::Result<Table<'_>> {
    let version = lua.create_table()?;
    version.set("major", env!("CARGO_PKG_VERSION_MAJOR").parse::<i64>().unwrap_or_default())?;
    version.set("minor", env!("CARGO_PKG_VERSION_MINOR").parse::<i64>().unwrap_or_default())?;
    Ok(version)
}

fn format_table(lua: &Lua) -> mlua::Result<Table<'_>> {
    let format = lua.create_table()?;
    for (name, code) in FORMAT_CODES {
        format.set(name, code)?;
    }
    Ok(format)
}

/// Build the library table and bind it to `global_name`
pub fn install<'lua>(lua: &'lua Lua, global_name: &str) -> mlua::Result<Table<'lua>> {
    let shim: Function = lua.load(RAISE_SHIM).set_name("=glirc").eval()?;
    let lib = lua.create_table()?;
    for (name, function) in FUNCTIONS {
        lib.set(name, bind(lua, &shim, function)?)?;
    }
    lib.set("version", version_table(lua)?)?;
    lib.set("format", format_table(lua)?)?;

    lua.globals().set(global_name, lib.clone())?;
    logging::debug!(global = global_name, "installed script library");
    Ok(lib)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_shape_without_host() {
        let lua = Lua::new();
        install(&lua, "irc").unwrap();

        let functions: i64 = lua
            .load("local n = 0 for _, v in pairs(irc) do if type(v) == 'function' then n = n + 1 end end return n")
            .eval()
            .unwrap();
        assert_eq!(functions, 18);

        let (major, bold): (i64, String) = lua.load("return irc.version.major, irc.format.bold").eval().unwrap();
        assert_eq!(major, 0);
        assert_eq!(bold, "\x02");
    }

    #[test]
    fn test_unbound_state_raises() {
        let lua = Lua::new();
        install(&lua, "glirc").unwrap();

        let message: String = lua
            .load("local ok, err = pcall(glirc.print, 'hi') return tostring(err)")
            .eval()
            .unwrap();
        assert_eq!(message, "glirc library is not bound to a client");

        // Argument errors are raised before the host is looked up
        let message: String = lua
            .load("local ok, err = pcall(glirc.identifier_cmp, 'a') return tostring(err)")
            .eval()
            .unwrap();
        assert_eq!(message, "bad argument #2 to 'identifier_cmp' (string expected, got no value)");
    }
}
