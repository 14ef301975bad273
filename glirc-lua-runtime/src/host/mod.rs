//! Host boundary - the client's C API and the safe per-call handle over it

mod abi;
mod handle;

pub use abi::{Glirc, GlircApi, GlircMessage, GlircString, MessageCode, TimerCallback};
pub use handle::Host;
