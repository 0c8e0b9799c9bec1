//! IPv4 TCP sockets (`<sys/socket.h>`).
//!
//! [`TcpSocket`] owns its descriptor and closes it on drop. The `extern "C"`
//! functions below expose the same operations on raw descriptors with the
//! usual `-1` + errno convention. Both paths share the `sys_*` helpers.

use std::ffi::{c_int, c_void};
use std::io;
use std::mem::size_of;
use std::net::{TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use minilib_net_core::config::{self, RuntimeMode};
use minilib_net_core::heal::{HealingAction, global_healing_policy};
use minilib_net_core::resolv::NO_DATA;
use minilib_net_core::socket::{
    AF_INET, SO_ERROR, SOCK_CLOEXEC, SOCK_STREAM, SOL_SOCKET, SocketOption, valid_backlog,
};

use crate::error::NetError;
use crate::resolv_abi::Resolver;
use crate::runtime_policy;
use crate::sockaddr::SockAddrIn;
use crate::util::set_errno;

#[inline]
fn cvt(rc: c_int) -> Result<c_int, NetError> {
    if rc < 0 {
        Err(NetError::last_os_error())
    } else {
        Ok(rc)
    }
}

#[inline]
fn ret_int(result: Result<c_int, NetError>) -> c_int {
    match result {
        Ok(v) => v,
        Err(err) => {
            set_errno(err.errno());
            -1
        }
    }
}

// ---------------------------------------------------------------------------
// syscall helpers
// ---------------------------------------------------------------------------

fn sys_socket() -> Result<OwnedFd, NetError> {
    // SAFETY: no pointer arguments.
    let fd = cvt(unsafe { libc::socket(AF_INET, SOCK_STREAM | SOCK_CLOEXEC, 0) })?;
    // SAFETY: freshly created descriptor with no other owner.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn sys_bind(fd: RawFd, addr: &SockAddrIn) -> Result<(), NetError> {
    // SAFETY: addr points at a live sockaddr_in of LEN bytes.
    cvt(unsafe { libc::bind(fd, addr.as_ptr(), SockAddrIn::LEN) }).map(drop)
}

fn sys_listen(fd: RawFd, backlog: c_int, mode: RuntimeMode) -> Result<HealingAction, NetError> {
    let clamped = valid_backlog(backlog);
    // SAFETY: no pointer arguments.
    cvt(unsafe { libc::listen(fd, clamped) })?;
    Ok(if mode.heals_enabled() {
        global_healing_policy().heal_backlog(backlog, clamped)
    } else {
        HealingAction::None
    })
}

fn sys_connect(fd: RawFd, addr: &SockAddrIn) -> Result<(), NetError> {
    let mut interrupted = false;
    loop {
        // SAFETY: addr points at a live sockaddr_in of LEN bytes.
        if unsafe { libc::connect(fd, addr.as_ptr(), SockAddrIn::LEN) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => interrupted = true,
            // The interrupted attempt completed in the background.
            Some(libc::EISCONN) if interrupted => return Ok(()),
            _ => return Err(err.into()),
        }
    }
}

/// Accept on an `AF_INET` listener.
///
/// The listener's family is checked before `accept4` so that a connection on
/// a socket of another family stays queued instead of being dequeued and
/// dropped.
fn sys_accept(fd: RawFd) -> Result<(OwnedFd, SockAddrIn), NetError> {
    sys_name(fd, false)?;
    loop {
        let mut addr = SockAddrIn::zeroed();
        let mut len = SockAddrIn::LEN;
        // SAFETY: addr/len describe writable storage of LEN bytes.
        let rc = unsafe { libc::accept4(fd, addr.as_mut_ptr(), &mut len, libc::SOCK_CLOEXEC) };
        if rc >= 0 {
            // SAFETY: freshly accepted descriptor with no other owner.
            let owned = unsafe { OwnedFd::from_raw_fd(rc) };
            // SAFETY: the kernel wrote at most LEN bytes into addr.
            let peer =
                unsafe { SockAddrIn::from_raw(addr.as_ptr(), len.min(SockAddrIn::LEN)) }?;
            return Ok((owned, peer));
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err.into());
        }
    }
}

fn sys_name(fd: RawFd, peer: bool) -> Result<SockAddrIn, NetError> {
    let mut addr = SockAddrIn::zeroed();
    let mut len = SockAddrIn::LEN;
    // SAFETY: addr/len describe writable storage of LEN bytes.
    let rc = unsafe {
        if peer {
            libc::getpeername(fd, addr.as_mut_ptr(), &mut len)
        } else {
            libc::getsockname(fd, addr.as_mut_ptr(), &mut len)
        }
    };
    cvt(rc)?;
    // SAFETY: the kernel wrote at most LEN bytes into addr.
    unsafe { SockAddrIn::from_raw(addr.as_ptr(), len.min(SockAddrIn::LEN)) }
}

/// Hardened mode leaves an invalid buffer size at the kernel default instead
/// of failing. The descriptor is still queried, so a bad `fd` fails either way.
fn sys_setsockopt(
    fd: RawFd,
    option: SocketOption,
    value: c_int,
    mode: RuntimeMode,
) -> Result<HealingAction, NetError> {
    let Some(normalized) = option.validate_value(value) else {
        if mode.heals_enabled() {
            sys_getsockopt(fd, option.level(), option.name())?;
            return Ok(HealingAction::ReturnSafeDefault);
        }
        return Err(NetError::InvalidOptionValue { option, value });
    };
    // SAFETY: optval points at a live c_int of the advertised size.
    cvt(unsafe {
        libc::setsockopt(
            fd,
            option.level(),
            option.name(),
            (&normalized as *const c_int).cast::<c_void>(),
            size_of::<c_int>() as libc::socklen_t,
        )
    })?;
    Ok(HealingAction::None)
}

fn sys_getsockopt(fd: RawFd, level: c_int, name: c_int) -> Result<c_int, NetError> {
    let mut value: c_int = 0;
    let mut len = size_of::<c_int>() as libc::socklen_t;
    // SAFETY: optval/optlen describe a live c_int.
    cvt(unsafe {
        libc::getsockopt(
            fd,
            level,
            name,
            (&mut value as *mut c_int).cast::<c_void>(),
            &mut len,
        )
    })?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// TcpSocket
// ---------------------------------------------------------------------------

/// An owned IPv4 TCP socket.
#[derive(Debug)]
pub struct TcpSocket {
    fd: OwnedFd,
    mode: RuntimeMode,
}

impl TcpSocket {
    /// `socket(AF_INET, SOCK_STREAM | SOCK_CLOEXEC, 0)`.
    pub fn new_v4() -> Result<Self, NetError> {
        Self::new_v4_in(config::runtime_mode())
    }

    /// Like [`TcpSocket::new_v4`], with an explicit runtime mode.
    pub fn new_v4_in(mode: RuntimeMode) -> Result<Self, NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::new_v4", mode);
        let result = sys_socket().map(|fd| Self { fd, mode });
        span.finish_with(&result, || match &result {
            Ok(sock) => serde_json::json!({ "fd": sock.as_raw_fd() }),
            Err(_) => serde_json::Value::Null,
        });
        result
    }

    /// Use `mode` for this socket's own policy decisions.
    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn bind(&self, addr: &SockAddrIn) -> Result<(), NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::bind", self.mode);
        let result = sys_bind(self.as_raw_fd(), addr);
        span.finish_with(&result, || self.details(addr));
        result
    }

    /// Start listening. `backlog` is clamped to `[0, SOMAXCONN]`; hardened
    /// mode counts the clamp as a heal.
    pub fn listen(&self, backlog: i32) -> Result<(), NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::listen", self.mode);
        let details = || serde_json::json!({ "fd": self.as_raw_fd(), "backlog": backlog });
        match sys_listen(self.as_raw_fd(), backlog, self.mode) {
            Ok(heal) => {
                span.ok(heal, details);
                Ok(())
            }
            Err(err) => {
                span.err(&err, details);
                Err(err)
            }
        }
    }

    /// Connect to `addr`, retrying when interrupted by a signal.
    pub fn connect(&self, addr: &SockAddrIn) -> Result<(), NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::connect", self.mode);
        let result = sys_connect(self.as_raw_fd(), addr);
        span.finish_with(&result, || self.details(addr));
        result
    }

    /// Accept one connection. The new descriptor is close-on-exec.
    pub fn accept(&self) -> Result<(TcpSocket, SockAddrIn), NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::accept", self.mode);
        let result = sys_accept(self.as_raw_fd()).map(|(fd, peer)| {
            (
                TcpSocket {
                    fd,
                    mode: self.mode,
                },
                peer,
            )
        });
        span.finish_with(&result, || match &result {
            Ok((conn, peer)) => serde_json::json!({
                "fd": self.as_raw_fd(),
                "conn_fd": conn.as_raw_fd(),
                "peer": peer.to_string(),
            }),
            Err(_) => serde_json::json!({ "fd": self.as_raw_fd() }),
        });
        result
    }

    pub fn set_option(&self, option: SocketOption, value: i32) -> Result<(), NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::set_option", self.mode);
        let details = || {
            serde_json::json!({ "fd": self.as_raw_fd(), "option": option.as_str(), "value": value })
        };
        match sys_setsockopt(self.as_raw_fd(), option, value, self.mode) {
            Ok(heal) => {
                span.ok(heal, details);
                Ok(())
            }
            Err(err) => {
                span.err(&err, details);
                Err(err)
            }
        }
    }

    /// Current value of `option`.
    pub fn option(&self, option: SocketOption) -> Result<i32, NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::option", self.mode);
        let result = sys_getsockopt(self.as_raw_fd(), option.level(), option.name());
        span.finish_with(&result, || {
            serde_json::json!({
                "fd": self.as_raw_fd(),
                "option": option.as_str(),
                "value": result.as_ref().ok(),
            })
        });
        result
    }

    pub fn set_reuse_addr(&self, on: bool) -> Result<(), NetError> {
        self.set_option(SocketOption::ReuseAddr, i32::from(on))
    }

    pub fn set_nodelay(&self, on: bool) -> Result<(), NetError> {
        self.set_option(SocketOption::NoDelay, i32::from(on))
    }

    pub fn set_keepalive(&self, on: bool) -> Result<(), NetError> {
        self.set_option(SocketOption::KeepAlive, i32::from(on))
    }

    pub fn local_addr(&self) -> Result<SockAddrIn, NetError> {
        self.name("TcpSocket::local_addr", false)
    }

    pub fn peer_addr(&self) -> Result<SockAddrIn, NetError> {
        self.name("TcpSocket::peer_addr", true)
    }

    /// Read and clear the pending `SO_ERROR`.
    pub fn take_error(&self) -> Result<Option<io::Error>, NetError> {
        let span = runtime_policy::begin_with_mode("TcpSocket::take_error", self.mode);
        let result = sys_getsockopt(self.as_raw_fd(), SOL_SOCKET, SO_ERROR);
        span.finish_with(&result, || {
            serde_json::json!({ "fd": self.as_raw_fd(), "so_error": result.as_ref().ok() })
        });
        let code = result?;
        Ok((code != 0).then(|| io::Error::from_raw_os_error(code)))
    }

    fn name(&self, symbol: &'static str, peer: bool) -> Result<SockAddrIn, NetError> {
        let span = runtime_policy::begin_with_mode(symbol, self.mode);
        let result = sys_name(self.as_raw_fd(), peer);
        span.finish_with(&result, || match &result {
            Ok(addr) => self.details(addr),
            Err(_) => serde_json::json!({ "fd": self.as_raw_fd() }),
        });
        result
    }

    /// New socket with `SO_REUSEADDR`, bound to `addr` and listening.
    pub fn bind_listener(addr: &SockAddrIn, backlog: i32) -> Result<Self, NetError> {
        Self::bind_listener_in(config::runtime_mode(), addr, backlog)
    }

    /// Like [`TcpSocket::bind_listener`], with an explicit runtime mode.
    pub fn bind_listener_in(
        mode: RuntimeMode,
        addr: &SockAddrIn,
        backlog: i32,
    ) -> Result<Self, NetError> {
        let sock = Self::new_v4_in(mode)?;
        sock.set_reuse_addr(true)?;
        sock.bind(addr)?;
        sock.listen(backlog)?;
        Ok(sock)
    }

    /// Resolve `host` and connect to the first address that accepts.
    ///
    /// Addresses are tried in resolver order; if all fail the last error is
    /// returned.
    pub fn connect_host(host: &str, port: u16) -> Result<Self, NetError> {
        Self::connect_host_with(&Resolver::from_env(), host, port)
    }

    /// Like [`TcpSocket::connect_host`], resolving with `resolver`. The new
    /// socket takes the resolver's runtime mode.
    pub fn connect_host_with(
        resolver: &Resolver,
        host: &str,
        port: u16,
    ) -> Result<Self, NetError> {
        let addrs = resolver.lookup_ipv4(host)?;
        let mut last_err = None;
        for ip in addrs {
            let attempt = Self::new_v4_in(resolver.mode()).and_then(|sock| {
                sock.connect(&SockAddrIn::new(ip, port))?;
                Ok(sock)
            });
            match attempt {
                Ok(sock) => return Ok(sock),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| NetError::Resolve {
            host: host.to_string(),
            h_errno: NO_DATA,
        }))
    }

    fn details(&self, addr: &SockAddrIn) -> serde_json::Value {
        serde_json::json!({ "fd": self.as_raw_fd(), "addr": addr.to_string() })
    }
}

impl AsFd for TcpSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for TcpSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl IntoRawFd for TcpSocket {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}

impl FromRawFd for TcpSocket {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self {
            // SAFETY: the caller transfers ownership of an open descriptor.
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
            mode: config::runtime_mode(),
        }
    }
}

impl From<TcpSocket> for OwnedFd {
    fn from(sock: TcpSocket) -> Self {
        sock.fd
    }
}

impl From<TcpSocket> for TcpStream {
    fn from(sock: TcpSocket) -> Self {
        TcpStream::from(sock.fd)
    }
}

impl From<TcpSocket> for TcpListener {
    fn from(sock: TcpSocket) -> Self {
        TcpListener::from(sock.fd)
    }
}

// ---------------------------------------------------------------------------
// extern "C"
// ---------------------------------------------------------------------------

/// Borrow a caller-provided `sockaddr_in`, checking its family.
///
/// # Safety
///
/// `sin` must be null or valid for reads of `sizeof(struct sockaddr_in)`.
unsafe fn read_sockaddr(sin: *const libc::sockaddr_in) -> Result<SockAddrIn, NetError> {
    // SAFETY: forwarded caller contract.
    unsafe { SockAddrIn::from_raw(sin.cast(), SockAddrIn::LEN) }
}

/// New close-on-exec IPv4 TCP socket; returns the descriptor.
#[unsafe(no_mangle)]
pub extern "C" fn minilib_net_socket_v4() -> c_int {
    let span = runtime_policy::begin("minilib_net_socket_v4");
    let result = sys_socket().map(IntoRawFd::into_raw_fd);
    span.finish_with(&result, || match &result {
        Ok(fd) => serde_json::json!({ "fd": fd }),
        Err(_) => serde_json::Value::Null,
    });
    ret_int(result)
}

/// `bind(fd, sin, sizeof *sin)` for an `AF_INET` address.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minilib_net_bind_v4(fd: c_int, sin: *const libc::sockaddr_in) -> c_int {
    let span = runtime_policy::begin("minilib_net_bind_v4");
    // SAFETY: caller provides a readable sockaddr_in or null.
    let result = unsafe { read_sockaddr(sin) }.and_then(|a| sys_bind(fd, &a).map(|()| a));
    span.finish_with(&result, || addr_details(fd, &result));
    ret_int(result.map(|_| 0))
}

/// `listen(fd, backlog)` with the backlog clamped to `[0, SOMAXCONN]`.
#[unsafe(no_mangle)]
pub extern "C" fn minilib_net_listen(fd: c_int, backlog: c_int) -> c_int {
    let span = runtime_policy::begin("minilib_net_listen");
    let mode = span.mode();
    let details = || serde_json::json!({ "fd": fd, "backlog": backlog });
    match sys_listen(fd, backlog, mode) {
        Ok(heal) => {
            span.ok(heal, details);
            0
        }
        Err(err) => {
            span.err(&err, details);
            set_errno(err.errno());
            -1
        }
    }
}

/// `connect(fd, sin, sizeof *sin)`, retried on `EINTR`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minilib_net_connect_v4(
    fd: c_int,
    sin: *const libc::sockaddr_in,
) -> c_int {
    let span = runtime_policy::begin("minilib_net_connect_v4");
    // SAFETY: caller provides a readable sockaddr_in or null.
    let result = unsafe { read_sockaddr(sin) }.and_then(|a| sys_connect(fd, &a).map(|()| a));
    span.finish_with(&result, || addr_details(fd, &result));
    ret_int(result.map(|_| 0))
}

/// Accept one connection on `fd`. When `sin_out` is non-null it receives the
/// peer address. Returns the new close-on-exec descriptor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minilib_net_accept_v4(
    fd: c_int,
    sin_out: *mut libc::sockaddr_in,
) -> c_int {
    let span = runtime_policy::begin("minilib_net_accept_v4");
    let result = sys_accept(fd);
    span.finish_with(&result, || match &result {
        Ok((conn, peer)) => serde_json::json!({
            "fd": fd,
            "conn_fd": conn.as_raw_fd(),
            "peer": peer.to_string(),
        }),
        Err(_) => serde_json::json!({ "fd": fd }),
    });
    ret_int(result.map(|(conn, peer)| {
        if !sin_out.is_null() {
            // SAFETY: non-null caller-owned sockaddr_in storage.
            unsafe { sin_out.write(*peer.as_raw()) };
        }
        conn.into_raw_fd()
    }))
}

/// `setsockopt` for the integer options in [`SocketOption`].
///
/// Unknown `(level, name)` pairs fail with `ENOPROTOOPT`. A non-positive
/// buffer size fails with `EINVAL` in strict mode and is ignored in hardened
/// mode. Flag values are normalised to 0 or 1.
#[unsafe(no_mangle)]
pub extern "C" fn minilib_net_setsockopt_int(
    fd: c_int,
    level: c_int,
    name: c_int,
    value: c_int,
) -> c_int {
    let span = runtime_policy::begin("minilib_net_setsockopt_int");
    let mode = span.mode();
    let details = || serde_json::json!({ "fd": fd, "level": level, "name": name, "value": value });
    let result = SocketOption::from_raw(level, name)
        .ok_or(NetError::InvalidOption { level, name })
        .and_then(|opt| sys_setsockopt(fd, opt, value, mode));
    match result {
        Ok(heal) => {
            span.ok(heal, details);
            0
        }
        Err(err) => {
            span.err(&err, details);
            set_errno(err.errno());
            -1
        }
    }
}

/// `close(fd)`. Not retried on `EINTR`; the descriptor is gone either way.
#[unsafe(no_mangle)]
pub extern "C" fn minilib_net_close(fd: c_int) -> c_int {
    let span = runtime_policy::begin("minilib_net_close");
    // SAFETY: no pointer arguments; ownership of fd ends here.
    let result = cvt(unsafe { libc::close(fd) });
    span.finish_with(&result, || serde_json::json!({ "fd": fd }));
    ret_int(result)
}

fn addr_details(fd: c_int, addr: &Result<SockAddrIn, NetError>) -> serde_json::Value {
    match addr {
        Ok(a) => serde_json::json!({ "fd": fd, "addr": a.to_string() }),
        Err(_) => serde_json::json!({ "fd": fd }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minilib_net_core::config::ResolverBackend;
    use std::io::{Read, Write};
    use std::net::Ipv4Addr;

    fn loopback_listener() -> (TcpSocket, SockAddrIn) {
        let listener = TcpSocket::bind_listener(&SockAddrIn::loopback(0), 8).unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[test]
    fn new_socket_is_cloexec() {
        let sock = TcpSocket::new_v4().unwrap();
        // SAFETY: querying flags of a live descriptor.
        let flags = unsafe { libc::fcntl(sock.as_raw_fd(), libc::F_GETFD) };
        assert!(flags & libc::FD_CLOEXEC != 0);
    }

    #[test]
    fn bind_assigns_ephemeral_port() {
        let (_listener, addr) = loopback_listener();
        assert_eq!(addr.ip(), Ipv4Addr::LOCALHOST);
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn loopback_round_trip() {
        let (listener, addr) = loopback_listener();
        let client = TcpSocket::new_v4().unwrap();
        client.connect(&addr).unwrap();
        let (conn, peer) = listener.accept().unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
        assert_eq!(conn.peer_addr().unwrap(), peer);

        let mut client = TcpStream::from(client);
        let mut conn = TcpStream::from(conn);
        client.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[test]
    fn options_round_trip() {
        let sock = TcpSocket::new_v4().unwrap();
        sock.set_nodelay(true).unwrap();
        assert_eq!(sock.option(SocketOption::NoDelay).unwrap(), 1);
        sock.set_keepalive(true).unwrap();
        assert_eq!(sock.option(SocketOption::KeepAlive).unwrap(), 1);
        sock.set_reuse_addr(false).unwrap();
        assert_eq!(sock.option(SocketOption::ReuseAddr).unwrap(), 0);
        assert!(sock.take_error().unwrap().is_none());
    }

    #[test]
    fn invalid_buffer_size_rejected() {
        let sock = TcpSocket::new_v4().unwrap().with_mode(RuntimeMode::Strict);
        let err = sock.set_option(SocketOption::SendBuffer, 0).unwrap_err();
        assert!(matches!(
            err,
            NetError::InvalidOptionValue {
                option: SocketOption::SendBuffer,
                value: 0
            }
        ));
        assert_eq!(err.errno(), libc::EINVAL);
    }

    #[test]
    fn hardened_ignores_invalid_buffer_size() {
        let sock = TcpSocket::new_v4().unwrap().with_mode(RuntimeMode::Hardened);
        let before = sock.option(SocketOption::RecvBuffer).unwrap();
        let heals = global_healing_policy().snapshot().safe_defaults;
        sock.set_option(SocketOption::RecvBuffer, -1).unwrap();
        assert_eq!(sock.option(SocketOption::RecvBuffer).unwrap(), before);
        assert!(global_healing_policy().snapshot().safe_defaults > heals);
    }

    #[test]
    fn hardened_invalid_buffer_size_on_bad_fd_fails() {
        let err = sys_setsockopt(-1, SocketOption::SendBuffer, 0, RuntimeMode::Hardened)
            .unwrap_err();
        assert_eq!(err.errno(), libc::EBADF);
    }

    #[test]
    fn explicit_mode_reaches_listener_and_accepted_sockets() {
        for mode in [RuntimeMode::Strict, RuntimeMode::Hardened] {
            let addr = SockAddrIn::loopback(0);
            let listener = TcpSocket::bind_listener_in(mode, &addr, 8).unwrap();
            assert_eq!(listener.mode(), mode);
            let port = listener.local_addr().unwrap().port();
            let resolver = Resolver::new(mode, ResolverBackend::HostByName);
            let client = TcpSocket::connect_host_with(&resolver, "127.0.0.1", port).unwrap();
            assert_eq!(client.mode(), mode);
            let (conn, _peer) = listener.accept().unwrap();
            assert_eq!(conn.mode(), mode);
        }
    }

    #[test]
    fn connect_refused_reports_errno() {
        let (listener, addr) = loopback_listener();
        drop(listener);
        let client = TcpSocket::new_v4().unwrap();
        let err = client.connect(&addr).unwrap_err();
        assert_eq!(err.errno(), libc::ECONNREFUSED);
    }

    #[test]
    fn peer_addr_of_unconnected_socket_fails() {
        let sock = TcpSocket::new_v4().unwrap();
        assert_eq!(sock.peer_addr().unwrap_err().errno(), libc::ENOTCONN);
    }

    #[test]
    fn connect_host_numeric() {
        let (listener, addr) = loopback_listener();
        let client = TcpSocket::connect_host("127.0.0.1", addr.port()).unwrap();
        let (_conn, peer) = listener.accept().unwrap();
        assert_eq!(client.local_addr().unwrap(), peer);
    }

    #[test]
    fn raw_fd_round_trip() {
        let sock = TcpSocket::new_v4().unwrap();
        let fd = sock.into_raw_fd();
        // SAFETY: fd was just released by into_raw_fd.
        let sock = unsafe { TcpSocket::from_raw_fd(fd) };
        assert_eq!(sock.as_raw_fd(), fd);
        let _listener = TcpListener::from(sock);
    }
}
