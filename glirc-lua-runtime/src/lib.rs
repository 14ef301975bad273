//! glirc Lua runtime - boundary core between the glirc client and scripts
//!
//! This crate carries everything that crosses the host C ABI and nothing
//! that depends on a particular script runtime. The script-facing library
//! lives in the `glirc-lua` crate and drives these types.
//!
//! Architecture:
//! - `host` - `#[repr(C)]` ABI mirror and the per-call `Host` handle
//! - `marshal` - request packing (script → host) and owned-buffer import (host → script)
//! - `callbacks` - token registry for deferred host callbacks (timers)
//! - `identifier` - IRC case-mapped identifier comparison
//! - `error` - boundary error kinds with stable messages
//! - `logging` - structured tracing setup and boundary event helpers

pub mod callbacks;
pub mod error;
pub mod host;
pub mod identifier;
pub mod logging;
pub mod marshal;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export core types
pub use callbacks::{CallbackRegistry, Token};
pub use error::{BindingError, Result};
pub use host::{Glirc, GlircApi, GlircMessage, GlircString, Host, MessageCode, TimerCallback};
pub use identifier::{identifier_cmp, identifier_cmp_int, Identifier};
pub use marshal::{ForeignString, ForeignStringArray, InjectRequest, Request, MAX_PARAMS};
