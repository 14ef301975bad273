//! Deferred callbacks - host-invoked script closures addressed by token
//!
//! Design: the host never sees a closure. It receives an integer-sized
//! token as its opaque callback context, and the registry maps that token
//! back to the retained closure exactly once.
//!
//! - `token.rs` - `Token` and its pointer-sized encoding
//! - `registry.rs` - `CallbackRegistry` arena with free list and shutdown

mod registry;
mod token;

pub use registry::CallbackRegistry;
pub use token::Token;
