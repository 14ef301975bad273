//! glirc Lua extension
//!
//! Embeds a Lua 5.4 state in the glirc IRC client and exposes the client
//! to scripts as the `glirc` library table. All traffic across the host
//! boundary goes through `glirc_lua_runtime`.
//!
//! Architecture:
//! - `lua` - library table, argument checking, session lifecycle
//! - `config` - TOML extension settings
//! - `bindings` - `extern "C"` entry points for the host
//! - `error` - embedder-facing errors

pub mod bindings;
pub mod config;
pub mod error;
pub mod lua;

pub use config::{ExtensionConfig, LoggingConfig};
pub use error::{ConfigError, ExtensionError, Result};
pub use lua::{on_timer, Extension, LuaGuard};

pub use glirc_lua_runtime as runtime;
