//! Error type for the safe socket and resolver APIs.

use std::ffi::{CStr, c_int};
use std::io;

use minilib_net_core::inet::AddrError;
use minilib_net_core::resolv::{self, HOST_NOT_FOUND, NO_DATA, TRY_AGAIN};
use minilib_net_core::socket::SocketOption;
use thiserror::Error;

// glibc value; not exported by the libc crate on every target.
const EAI_NODATA: c_int = -5;

/// Everything that can go wrong in a helper call.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("invalid hostname")]
    InvalidHostname,
    #[error("{host}: {}", h_message(.h_errno))]
    Resolve { host: String, h_errno: i32 },
    #[error("{host}: {}", gai_message_ref(.code))]
    AddrInfo { host: String, code: i32 },
    #[error("resolver returned {total} addresses, only {written} fit")]
    Truncated { written: usize, total: usize },
    #[error("unsupported address family {0}")]
    UnsupportedFamily(i32),
    #[error("unknown socket option level={level} name={name}")]
    InvalidOption { level: i32, name: i32 },
    #[error("invalid value {value} for {option}")]
    InvalidOptionValue { option: SocketOption, value: i32 },
    #[error(transparent)]
    Address(#[from] AddrError),
    #[error(transparent)]
    Os(#[from] io::Error),
}

impl NetError {
    /// Capture errno after a failed libc call.
    #[must_use]
    pub fn last_os_error() -> Self {
        Self::Os(io::Error::last_os_error())
    }

    /// The errno reported for this error at the C boundary.
    #[must_use]
    pub fn errno(&self) -> c_int {
        match self {
            Self::InvalidHostname => libc::EINVAL,
            Self::Resolve { h_errno, .. } => match *h_errno {
                TRY_AGAIN => libc::EAGAIN,
                HOST_NOT_FOUND | NO_DATA => libc::ENOENT,
                _ => libc::EIO,
            },
            Self::AddrInfo { code, .. } => match *code {
                libc::EAI_AGAIN => libc::EAGAIN,
                libc::EAI_NONAME | EAI_NODATA => libc::ENOENT,
                libc::EAI_MEMORY => libc::ENOMEM,
                libc::EAI_SYSTEM => crate::util::last_errno(libc::EIO),
                _ => libc::EIO,
            },
            Self::Truncated { .. } => libc::ERANGE,
            Self::UnsupportedFamily(_) | Self::Address(AddrError::UnsupportedFamily(_)) => {
                libc::EAFNOSUPPORT
            }
            Self::Address(AddrError::TooShort { .. }) => libc::EINVAL,
            Self::InvalidOption { .. } => libc::ENOPROTOOPT,
            Self::InvalidOptionValue { .. } => libc::EINVAL,
            Self::Os(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// The resolver code for resolution failures, if any.
    #[must_use]
    pub fn h_errno(&self) -> Option<i32> {
        match self {
            Self::Resolve { h_errno, .. } => Some(*h_errno),
            Self::AddrInfo { code, .. } => Some(match *code {
                libc::EAI_AGAIN => TRY_AGAIN,
                EAI_NODATA => NO_DATA,
                libc::EAI_NONAME => HOST_NOT_FOUND,
                _ => resolv::NO_RECOVERY,
            }),
            _ => None,
        }
    }
}

fn h_message(code: &i32) -> &'static str {
    resolv::hstrerror(*code)
}

fn gai_message_ref(code: &i32) -> String {
    gai_message(*code)
}

/// Message text for a `getaddrinfo` error code.
pub fn gai_message(code: i32) -> String {
    // SAFETY: gai_strerror returns a pointer to a static string.
    let ptr = unsafe { libc::gai_strerror(code) };
    if ptr.is_null() {
        return format!("getaddrinfo error {code}");
    }
    // SAFETY: non-null, NUL-terminated static storage.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
