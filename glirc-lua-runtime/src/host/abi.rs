//! Host ABI - `#[repr(C)]` mirror of the glirc extension API
//!
//! The host exports its entry points as a table of function pointers.
//! Ownership rules at this layer:
//! - `*const c_char` + `usize` arguments are borrowed for the call only
//! - `*mut c_char` results are owned by the receiver and go back through `free_string`
//! - `*mut *mut c_char` results are null-terminated arrays of NUL-terminated
//!   entries and go back, entries included, through `free_strings`
//! - `c_int` status results are zero on success

use core::ffi::{c_char, c_int, c_void};
use core::marker::{PhantomData, PhantomPinned};
use core::ptr;

/// Opaque live client instance. Only ever seen behind a pointer.
#[repr(C)]
pub struct Glirc {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Bounded string: pointer plus length, not NUL-terminated, may contain NUL
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GlircString {
    pub str: *const c_char,
    pub len: usize,
}

impl GlircString {
    /// Absent value for optional arguments
    pub const NULL: Self = Self { str: ptr::null(), len: 0 };

    /// Borrow a byte slice. The result is only valid while `bytes` is.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            str: bytes.as_ptr() as *const c_char,
            len: bytes.len(),
        }
    }

    #[inline]
    pub fn from_optional(bytes: Option<&[u8]>) -> Self {
        bytes.map_or(Self::NULL, Self::from_bytes)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.str.is_null()
    }

    /// View the referenced bytes
    ///
    /// # Safety
    /// `str` must be null or point to `len` readable bytes for `'a`
    pub unsafe fn as_bytes<'a>(&self) -> Option<&'a [u8]> {
        if self.str.is_null() {
            None
        } else {
            Some(core::slice::from_raw_parts(self.str as *const u8, self.len))
        }
    }
}

/// Outgoing IRC command
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GlircMessage {
    pub network: GlircString,
    pub command: GlircString,
    pub params: *const GlircString,
    pub params_n: usize,
}

/// Console message severity for `print`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCode {
    Normal = 0,
    Error = 1,
}

/// Deferred callback entry point: `(client, extension state, token)`
pub type TimerCallback = unsafe extern "C" fn(*mut Glirc, *mut c_void, *mut c_void);

/// Host entry points
#[repr(C)]
pub struct GlircApi {
    pub send_message: unsafe extern "C" fn(*mut Glirc, *const GlircMessage) -> c_int,
    pub inject_chat: unsafe extern "C" fn(
        *mut Glirc,
        *const c_char,
        usize,
        *const c_char,
        usize,
        *const c_char,
        usize,
        *const c_char,
        usize,
    ) -> c_int,
    pub print: unsafe extern "C" fn(*mut Glirc, MessageCode, *const c_char, usize),
    pub list_networks: unsafe extern "C" fn(*mut Glirc) -> *mut *mut c_char,
    pub list_channels: unsafe extern "C" fn(*mut Glirc, *const c_char, usize) -> *mut *mut c_char,
    pub list_channel_users:
        unsafe extern "C" fn(*mut Glirc, *const c_char, usize, *const c_char, usize) -> *mut *mut c_char,
    pub my_nick: unsafe extern "C" fn(*mut Glirc, *const c_char, usize) -> *mut c_char,
    pub user_account:
        unsafe extern "C" fn(*mut Glirc, *const c_char, usize, *const c_char, usize) -> *mut c_char,
    pub user_channel_modes: unsafe extern "C" fn(
        *mut Glirc,
        *const c_char,
        usize,
        *const c_char,
        usize,
        *const c_char,
        usize,
    ) -> *mut c_char,
    pub resolve_path: unsafe extern "C" fn(*mut Glirc, *const c_char, usize) -> *mut c_char,
    pub mark_seen: unsafe extern "C" fn(*mut Glirc, *const c_char, usize, *const c_char, usize),
    pub clear_window: unsafe extern "C" fn(*mut Glirc, *const c_char, usize, *const c_char, usize),
    pub current_focus:
        unsafe extern "C" fn(*mut Glirc, *mut *mut c_char, *mut usize, *mut *mut c_char, *mut usize),
    pub is_logged_on: unsafe extern "C" fn(*mut Glirc, *const c_char, usize, *const c_char, usize) -> c_int,
    pub is_channel: unsafe extern "C" fn(*mut Glirc, *const c_char, usize, *const c_char, usize) -> c_int,
    pub set_timer: unsafe extern "C" fn(*mut Glirc, u64, TimerCallback, *mut c_void),
    pub free_string: unsafe extern "C" fn(*mut c_char),
    pub free_strings: unsafe extern "C" fn(*mut *mut c_char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_string() {
        assert!(GlircString::NULL.is_null());
        assert_eq!(GlircString::NULL.len, 0);
        assert!(GlircString::from_optional(None).is_null());
    }

    #[test]
    fn test_borrowed_string_keeps_embedded_nul() {
        let bytes = b"a\0b";
        let s = GlircString::from_bytes(bytes);
        assert_eq!(s.len, 3);
        assert_eq!(unsafe { s.as_bytes() }, Some(&bytes[..]));
    }

    #[test]
    fn test_message_code_values() {
        assert_eq!(MessageCode::Normal as i32, 0);
        assert_eq!(MessageCode::Error as i32, 1);
    }
}
