//! `struct sockaddr_in` wrapper.
//!
//! [`SockAddrIn`] has the exact layout of `libc::sockaddr_in`, so a pointer
//! to it can be handed straight to `bind`, `connect` and `accept`. Accessors
//! convert between network and host byte order.

use std::ffi::c_int;
use std::mem::size_of;
use std::net::{Ipv4Addr, SocketAddrV4};

use minilib_net_core::inet::{SockAddrV4, raw_family};
use minilib_net_core::socket::AF_INET;

use crate::error::NetError;
use crate::runtime_policy;

/// An IPv4 socket address in kernel layout.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct SockAddrIn(libc::sockaddr_in);

impl SockAddrIn {
    /// `sizeof(struct sockaddr_in)`.
    pub const LEN: libc::socklen_t = size_of::<libc::sockaddr_in>() as libc::socklen_t;

    #[must_use]
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self(libc::sockaddr_in {
            sin_family: AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr {
                s_addr: u32::from(ip).to_be(),
            },
            sin_zero: [0; 8],
        })
    }

    /// `0.0.0.0:port`.
    #[must_use]
    pub fn any(port: u16) -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED, port)
    }

    /// `127.0.0.1:port`.
    #[must_use]
    pub fn loopback(port: u16) -> Self {
        Self::new(Ipv4Addr::LOCALHOST, port)
    }

    /// A zeroed address for `accept`/`getsockname` to fill in.
    #[must_use]
    pub(crate) fn zeroed() -> Self {
        // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
        Self(unsafe { std::mem::zeroed() })
    }

    #[must_use]
    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_be(self.0.sin_addr.s_addr))
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        u16::from_be(self.0.sin_port)
    }

    #[must_use]
    pub fn family(&self) -> c_int {
        c_int::from(self.0.sin_family)
    }

    pub fn set_ip(&mut self, ip: Ipv4Addr) {
        self.0.sin_addr.s_addr = u32::from(ip).to_be();
    }

    pub fn set_port(&mut self, port: u16) {
        self.0.sin_port = port.to_be();
    }

    /// Pointer suitable for `bind`/`connect`.
    #[must_use]
    pub fn as_ptr(&self) -> *const libc::sockaddr {
        (&self.0 as *const libc::sockaddr_in).cast()
    }

    /// Pointer suitable for `accept`/`getsockname`.
    pub fn as_mut_ptr(&mut self) -> *mut libc::sockaddr {
        (&mut self.0 as *mut libc::sockaddr_in).cast()
    }

    #[must_use]
    pub fn as_raw(&self) -> &libc::sockaddr_in {
        &self.0
    }

    #[must_use]
    pub fn from_core(sa: SockAddrV4) -> Self {
        Self::new(sa.ip(), sa.port())
    }

    #[must_use]
    pub fn to_core(&self) -> SockAddrV4 {
        SockAddrV4::new(self.ip(), self.port())
    }

    /// Interpret a kernel-filled address, dispatching on its family.
    ///
    /// # Safety
    ///
    /// `addr` must be valid for reads of `len` bytes.
    pub unsafe fn from_raw(
        addr: *const libc::sockaddr,
        len: libc::socklen_t,
    ) -> Result<Self, NetError> {
        if addr.is_null() {
            return Err(NetError::Os(std::io::Error::from_raw_os_error(libc::EFAULT)));
        }
        // SAFETY: caller guarantees `len` readable bytes.
        let bytes = unsafe { std::slice::from_raw_parts(addr.cast::<u8>(), len as usize) };
        let family = raw_family(bytes)?;
        if family != AF_INET {
            return Err(NetError::UnsupportedFamily(family));
        }
        Ok(Self::from_core(SockAddrV4::from_bytes(bytes)?))
    }
}

impl Default for SockAddrIn {
    fn default() -> Self {
        Self::any(0)
    }
}

impl PartialEq for SockAddrIn {
    fn eq(&self, other: &Self) -> bool {
        self.family() == other.family() && self.ip() == other.ip() && self.port() == other.port()
    }
}

impl Eq for SockAddrIn {}

impl std::fmt::Debug for SockAddrIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SockAddrIn")
            .field("family", &self.family())
            .field("ip", &self.ip())
            .field("port", &self.port())
            .finish()
    }
}

impl std::fmt::Display for SockAddrIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip(), self.port())
    }
}

impl From<SocketAddrV4> for SockAddrIn {
    fn from(sa: SocketAddrV4) -> Self {
        Self::new(*sa.ip(), sa.port())
    }
}

impl From<SockAddrIn> for SocketAddrV4 {
    fn from(sa: SockAddrIn) -> Self {
        SocketAddrV4::new(sa.ip(), sa.port())
    }
}

impl From<SockAddrV4> for SockAddrIn {
    fn from(sa: SockAddrV4) -> Self {
        Self::from_core(sa)
    }
}

// ---------------------------------------------------------------------------
// extern "C" accessors
// ---------------------------------------------------------------------------

/// Fill `*sin` with `AF_INET`, `addr` (host byte order) and `port`.
///
/// Returns 0, or -1 with `EFAULT` when `sin` is null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minilib_net_sockaddr_in_init(
    sin: *mut libc::sockaddr_in,
    addr: u32,
    port: u16,
) -> c_int {
    let span = runtime_policy::begin("minilib_net_sockaddr_in_init");
    if sin.is_null() {
        let err = NetError::Os(std::io::Error::from_raw_os_error(libc::EFAULT));
        span.err(&err, || serde_json::Value::Null);
        crate::util::set_errno(err.errno());
        return -1;
    }
    let value = SockAddrIn::new(Ipv4Addr::from(addr), port);
    // SAFETY: non-null, caller-owned sockaddr_in storage.
    unsafe { sin.write(value.0) };
    span.ok(minilib_net_core::heal::HealingAction::None, || {
        serde_json::json!({ "addr": value.to_string() })
    });
    0
}

/// IPv4 address of `*sin` in host byte order (0 for a null pointer).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minilib_net_sockaddr_in_addr(sin: *const libc::sockaddr_in) -> u32 {
    if sin.is_null() {
        return 0;
    }
    // SAFETY: non-null caller-provided sockaddr_in.
    u32::from_be(unsafe { (*sin).sin_addr.s_addr })
}

/// Port of `*sin` in host byte order (0 for a null pointer).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minilib_net_sockaddr_in_port(sin: *const libc::sockaddr_in) -> u16 {
    if sin.is_null() {
        return 0;
    }
    // SAFETY: non-null caller-provided sockaddr_in.
    u16::from_be(unsafe { (*sin).sin_port })
}
