//! Import of host-owned buffers into script-native values
//!
//! Both guards own a host allocation and hand it back to the host exactly
//! once, from `Drop`. Borrowed views are tied to the guard, so nothing read
//! from the buffer can outlive its release, and an early `?` return in the
//! middle of an import still releases everything.

use core::ffi::{c_char, CStr};
use core::ptr::NonNull;

use crate::logging;

/// Owned, null-terminated `char **` returned by the host
pub struct ForeignStringArray {
    list: NonNull<*mut c_char>,
    free: unsafe extern "C" fn(*mut *mut c_char),
}

impl ForeignStringArray {
    /// Take ownership of a host array. Returns `None` for a null pointer,
    /// which the host uses to signal failure.
    ///
    /// # Safety
    /// `list` must be null or a null-terminated array of NUL-terminated
    /// strings that `free` releases, entries included.
    pub unsafe fn from_raw(
        list: *mut *mut c_char,
        free: unsafe extern "C" fn(*mut *mut c_char),
    ) -> Option<Self> {
        NonNull::new(list).map(|list| Self { list, free })
    }

    /// Entries in host order
    pub fn iter(&self) -> Entries<'_> {
        Entries {
            cursor: self.list.as_ptr(),
            _owner: self,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Convert every entry, preserving order. The array is released when
    /// `self` drops, after the last entry is read or at the first error.
    pub fn import_with<T, E>(&self, mut convert: impl FnMut(&[u8]) -> Result<T, E>) -> Result<Vec<T>, E> {
        let mut values = Vec::new();
        for entry in self.iter() {
            values.push(convert(entry)?);
        }
        logging::log_import("string_array", values.len());
        Ok(values)
    }

    pub fn to_vec(&self) -> Vec<Vec<u8>> {
        self.iter().map(<[u8]>::to_vec).collect()
    }
}

impl Drop for ForeignStringArray {
    fn drop(&mut self) {
        logging::log_release("string_array");
        unsafe { (self.free)(self.list.as_ptr()) }
    }
}

impl core::fmt::Debug for ForeignStringArray {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(String::from_utf8_lossy))
            .finish()
    }
}

/// Iterator over the entries of a `ForeignStringArray`
pub struct Entries<'a> {
    cursor: *mut *mut c_char,
    _owner: &'a ForeignStringArray,
}

impl<'a> Iterator for Entries<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        unsafe {
            let entry = *self.cursor;
            if entry.is_null() {
                return None;
            }
            self.cursor = self.cursor.add(1);
            Some(CStr::from_ptr(entry).to_bytes())
        }
    }
}

/// Owned, nullable `char *` returned by the host
pub struct ForeignString {
    ptr: Option<NonNull<c_char>>,
    len: usize,
    free: unsafe extern "C" fn(*mut c_char),
}

impl ForeignString {
    /// Take ownership of a NUL-terminated host string (or null)
    ///
    /// # Safety
    /// `ptr` must be null or a NUL-terminated string that `free` releases
    pub unsafe fn from_raw(ptr: *mut c_char, free: unsafe extern "C" fn(*mut c_char)) -> Self {
        let len = if ptr.is_null() {
            0
        } else {
            CStr::from_ptr(ptr).to_bytes().len()
        };
        Self::from_raw_parts(ptr, len, free)
    }

    /// Take ownership of a host string with an explicit length. `len` is
    /// ignored when `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or point to `len` readable bytes that `free` releases
    pub unsafe fn from_raw_parts(
        ptr: *mut c_char,
        len: usize,
        free: unsafe extern "C" fn(*mut c_char),
    ) -> Self {
        let ptr = NonNull::new(ptr);
        Self {
            len: if ptr.is_some() { len } else { 0 },
            ptr,
            free,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.ptr
            .map(|ptr| unsafe { core::slice::from_raw_parts(ptr.as_ptr() as *const u8, self.len) })
    }

    pub fn to_vec(&self) -> Option<Vec<u8>> {
        self.as_bytes().map(<[u8]>::to_vec)
    }

    /// Convert the value if present. Release still happens in `Drop`.
    pub fn import_with<T, E>(&self, convert: impl FnOnce(&[u8]) -> Result<T, E>) -> Result<Option<T>, E> {
        self.as_bytes().map(convert).transpose()
    }
}

impl Drop for ForeignString {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            logging::log_release("string");
            unsafe { (self.free)(ptr.as_ptr()) }
        }
    }
}

impl core::fmt::Debug for ForeignString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.as_bytes() {
            Some(bytes) => write!(f, "Some({:?})", String::from_utf8_lossy(bytes)),
            None => f.write_str("None"),
        }
    }
}
