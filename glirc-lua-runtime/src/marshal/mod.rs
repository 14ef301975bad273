//! Marshaling across the host boundary
//!
//! Design: borrow outbound, copy-then-release inbound.
//!
//! - `request.rs` - script strings → host message structures (borrowed, bounded)
//! - `import.rs` - host-owned strings and string arrays → script values (owned, released on drop)

mod import;
mod request;

pub use import::{Entries, ForeignString, ForeignStringArray};
pub use request::{check_param_count, inject_chat, send_message, InjectRequest, Request, MAX_PARAMS};
