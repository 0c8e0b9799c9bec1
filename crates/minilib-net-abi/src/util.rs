//! Shared internal utilities for ABI adapters.

use std::ffi::{c_char, c_int};

/// Scan a C string with an optional hard bound.
///
/// Returns `(len, terminated)` where:
/// - `len` is the byte length before the first NUL or before the bound.
/// - `terminated` indicates whether a NUL byte was observed.
///
/// # Safety
///
/// `ptr` must be valid to read up to the discovered length (and bound when given).
pub unsafe fn scan_c_string(ptr: *const c_char, bound: Option<usize>) -> (usize, bool) {
    match bound {
        Some(limit) => {
            for i in 0..limit {
                if unsafe { *ptr.add(i) } == 0 {
                    return (i, true);
                }
            }
            (limit, false)
        }
        None => {
            let mut i = 0usize;
            while unsafe { *ptr.add(i) } != 0 {
                i += 1;
            }
            (i, true)
        }
    }
}

/// Borrow a NUL-terminated hostname of at most `bound` bytes as `&str`.
///
/// Returns `None` for an unterminated scan or non-UTF-8 bytes.
///
/// # Safety
///
/// `ptr` must be non-null and readable up to the terminator or `bound`.
pub unsafe fn c_str_bounded<'a>(ptr: *const c_char, bound: usize) -> Option<&'a str> {
    // SAFETY: forwarded caller contract.
    let (len, terminated) = unsafe { scan_c_string(ptr, Some(bound)) };
    if !terminated {
        return None;
    }
    // SAFETY: `len` bytes were just read successfully.
    let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };
    core::str::from_utf8(bytes).ok()
}

/// Current thread's errno.
#[inline]
pub fn last_errno(default_errno: c_int) -> c_int {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(default_errno)
}

/// Set the current thread's errno.
#[inline]
pub fn set_errno(val: c_int) {
    // SAFETY: `__errno_location` always returns a valid thread-local pointer.
    unsafe { *libc::__errno_location() = val };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_terminated_within_bound() {
        let s = c"localhost";
        let (len, terminated) = unsafe { scan_c_string(s.as_ptr(), Some(64)) };
        assert_eq!(len, 9);
        assert!(terminated);
    }

    #[test]
    fn scan_hits_bound() {
        let s = c"example.org";
        let (len, terminated) = unsafe { scan_c_string(s.as_ptr(), Some(4)) };
        assert_eq!(len, 4);
        assert!(!terminated);
        assert_eq!(unsafe { c_str_bounded(s.as_ptr(), 4) }, None);
    }

    #[test]
    fn bounded_str_roundtrip() {
        let s = c"10.1.2.3";
        assert_eq!(unsafe { c_str_bounded(s.as_ptr(), 32) }, Some("10.1.2.3"));
    }

    #[test]
    fn errno_set_and_read() {
        set_errno(libc::ERANGE);
        assert_eq!(last_errno(0), libc::ERANGE);
    }
}
