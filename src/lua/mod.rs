//! Lua surface of the extension
//!
//! - `library` - the `glirc` table and its functions
//! - `args` - argument checking and error conversion
//! - `format` - mIRC formatting codes
//! - `extension` - session lifecycle and timer delivery

mod args;
mod extension;
mod format;
mod library;

pub use extension::{on_timer, Extension, LuaGuard};
pub use format::FORMAT_CODES;
pub use library::install;
