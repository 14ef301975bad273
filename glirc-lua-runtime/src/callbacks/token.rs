//! Callback tokens - integer-sized opaque context handed to the host

use core::ffi::c_void;
use core::fmt;
use core::num::NonZeroUsize;

/// Identifies one registered callback. Never zero, so a null context
/// pointer from the host can never name a live registration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(NonZeroUsize);

impl Token {
    #[inline]
    pub(crate) fn from_slot(index: usize) -> Self {
        Self(NonZeroUsize::MIN.saturating_add(index))
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0.get() - 1
    }

    /// Opaque context pointer for the host
    #[inline]
    pub fn into_raw(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    /// Recover a token from the host's context pointer
    #[inline]
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
