//! Socket constants and validators.
//!
//! Mirrors the subset of `<sys/socket.h>` and `<netinet/tcp.h>` that the
//! IPv4 TCP helpers need. Actual syscall invocations (`socket`, `bind`,
//! `connect`, `accept`, `setsockopt`) live in the ABI crate.

// ---------------------------------------------------------------------------
// Address families (AF_*)
// ---------------------------------------------------------------------------

/// Unspecified address family.
pub const AF_UNSPEC: i32 = 0;
/// IPv4 Internet protocols.
pub const AF_INET: i32 = 2;
/// IPv6 Internet protocols.
pub const AF_INET6: i32 = 10;

// ---------------------------------------------------------------------------
// Socket types (SOCK_*)
// ---------------------------------------------------------------------------

/// Byte-stream socket.
pub const SOCK_STREAM: i32 = 1;
/// Datagram socket.
pub const SOCK_DGRAM: i32 = 2;

/// Set O_NONBLOCK on the new socket.
pub const SOCK_NONBLOCK: i32 = 0x800;
/// Set FD_CLOEXEC on the new socket.
pub const SOCK_CLOEXEC: i32 = 0x80000;

const SOCK_TYPE_FLAG_MASK: i32 = SOCK_NONBLOCK | SOCK_CLOEXEC;

// ---------------------------------------------------------------------------
// Levels and options
// ---------------------------------------------------------------------------

/// Socket-level options (for `getsockopt`/`setsockopt`).
pub const SOL_SOCKET: i32 = 1;
/// TCP protocol level.
pub const IPPROTO_TCP: i32 = 6;

/// Allow local address reuse.
pub const SO_REUSEADDR: i32 = 2;
/// Socket type (get only).
pub const SO_TYPE: i32 = 3;
/// Pending error (get only).
pub const SO_ERROR: i32 = 4;
/// Send buffer size.
pub const SO_SNDBUF: i32 = 7;
/// Receive buffer size.
pub const SO_RCVBUF: i32 = 8;
/// Enable keep-alive probes.
pub const SO_KEEPALIVE: i32 = 9;
/// Allow several sockets to bind the same port.
pub const SO_REUSEPORT: i32 = 15;

/// Disable Nagle's algorithm.
pub const TCP_NODELAY: i32 = 1;

/// Maximum length of the pending-connection queue for `listen()`.
pub const SOMAXCONN: i32 = 4096;

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Returns `true` if `af` is a recognized address family.
#[inline]
pub fn valid_address_family(af: i32) -> bool {
    matches!(af, AF_UNSPEC | AF_INET | AF_INET6)
}

/// Returns `true` if `stype` encodes a recognized base socket type, after
/// masking off the `SOCK_NONBLOCK` and `SOCK_CLOEXEC` modifier flags.
#[inline]
pub fn valid_socket_type(stype: i32) -> bool {
    let base = stype & !SOCK_TYPE_FLAG_MASK;
    matches!(base, SOCK_STREAM | SOCK_DGRAM)
}

/// Returns `true` for the only combination this layer creates: IPv4 TCP.
#[inline]
pub fn is_ipv4_stream(af: i32, stype: i32) -> bool {
    af == AF_INET && valid_socket_type(stype) && stype & !SOCK_TYPE_FLAG_MASK == SOCK_STREAM
}

/// Clamps `backlog` into the range `[0, SOMAXCONN]`.
#[inline]
pub fn valid_backlog(backlog: i32) -> i32 {
    backlog.clamp(0, SOMAXCONN)
}

// ---------------------------------------------------------------------------
// Socket options
// ---------------------------------------------------------------------------

/// Integer-valued socket options exposed by the TCP helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    ReuseAddr,
    ReusePort,
    KeepAlive,
    SendBuffer,
    RecvBuffer,
    NoDelay,
}

impl SocketOption {
    pub const ALL: [SocketOption; 6] = [
        SocketOption::ReuseAddr,
        SocketOption::ReusePort,
        SocketOption::KeepAlive,
        SocketOption::SendBuffer,
        SocketOption::RecvBuffer,
        SocketOption::NoDelay,
    ];

    /// The `level` argument for `setsockopt`.
    #[must_use]
    pub const fn level(self) -> i32 {
        match self {
            Self::NoDelay => IPPROTO_TCP,
            _ => SOL_SOCKET,
        }
    }

    /// The `optname` argument for `setsockopt`.
    #[must_use]
    pub const fn name(self) -> i32 {
        match self {
            Self::ReuseAddr => SO_REUSEADDR,
            Self::ReusePort => SO_REUSEPORT,
            Self::KeepAlive => SO_KEEPALIVE,
            Self::SendBuffer => SO_SNDBUF,
            Self::RecvBuffer => SO_RCVBUF,
            Self::NoDelay => TCP_NODELAY,
        }
    }

    /// Maps a raw `(level, optname)` pair back to a known option.
    #[must_use]
    pub fn from_raw(level: i32, name: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|opt| opt.level() == level && opt.name() == name)
    }

    /// Returns `true` for on/off flags.
    #[must_use]
    pub const fn is_boolean(self) -> bool {
        !matches!(self, Self::SendBuffer | Self::RecvBuffer)
    }

    /// Normalises a value for this option.
    ///
    /// Flags map any non-zero value to 1. Buffer sizes must be positive.
    pub fn validate_value(self, value: i32) -> Option<i32> {
        if self.is_boolean() {
            Some(i32::from(value != 0))
        } else if value > 0 {
            Some(value)
        } else {
            None
        }
    }

    /// Short name used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReuseAddr => "SO_REUSEADDR",
            Self::ReusePort => "SO_REUSEPORT",
            Self::KeepAlive => "SO_KEEPALIVE",
            Self::SendBuffer => "SO_SNDBUF",
            Self::RecvBuffer => "SO_RCVBUF",
            Self::NoDelay => "TCP_NODELAY",
        }
    }
}

impl core::fmt::Display for SocketOption {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Address family validation ------------------------------------------

    #[test]
    fn valid_af_known_families() {
        assert!(valid_address_family(AF_UNSPEC));
        assert!(valid_address_family(AF_INET));
        assert!(valid_address_family(AF_INET6));
    }

    #[test]
    fn invalid_af_rejects_unknowns() {
        assert!(!valid_address_family(-1));
        assert!(!valid_address_family(1));
        assert!(!valid_address_family(42));
        assert!(!valid_address_family(i32::MAX));
    }

    // -- Socket type validation ---------------------------------------------

    #[test]
    fn socket_type_with_flags() {
        assert!(valid_socket_type(SOCK_STREAM));
        assert!(valid_socket_type(SOCK_STREAM | SOCK_CLOEXEC));
        assert!(valid_socket_type(SOCK_DGRAM | SOCK_NONBLOCK));
        assert!(!valid_socket_type(SOCK_CLOEXEC));
        assert!(!valid_socket_type(3));
    }

    #[test]
    fn ipv4_stream_only() {
        assert!(is_ipv4_stream(AF_INET, SOCK_STREAM));
        assert!(is_ipv4_stream(AF_INET, SOCK_STREAM | SOCK_CLOEXEC));
        assert!(!is_ipv4_stream(AF_INET, SOCK_DGRAM));
        assert!(!is_ipv4_stream(AF_INET6, SOCK_STREAM));
    }

    // -- Backlog clamping ---------------------------------------------------

    #[test]
    fn backlog_clamp() {
        assert_eq!(valid_backlog(0), 0);
        assert_eq!(valid_backlog(128), 128);
        assert_eq!(valid_backlog(-5), 0);
        assert_eq!(valid_backlog(SOMAXCONN + 1), SOMAXCONN);
        assert_eq!(valid_backlog(i32::MAX), SOMAXCONN);
    }

    // -- Options ------------------------------------------------------------

    #[test]
    fn option_levels_and_names() {
        assert_eq!(SocketOption::ReuseAddr.level(), SOL_SOCKET);
        assert_eq!(SocketOption::ReuseAddr.name(), SO_REUSEADDR);
        assert_eq!(SocketOption::NoDelay.level(), IPPROTO_TCP);
        assert_eq!(SocketOption::NoDelay.name(), TCP_NODELAY);
    }

    #[test]
    fn option_from_raw_roundtrip() {
        for opt in SocketOption::ALL {
            assert_eq!(SocketOption::from_raw(opt.level(), opt.name()), Some(opt));
        }
        // TCP_NODELAY shares its number with SOL_SOCKET's SO_DEBUG.
        assert_eq!(SocketOption::from_raw(SOL_SOCKET, TCP_NODELAY), None);
        assert_eq!(SocketOption::from_raw(SOL_SOCKET, SO_ERROR), None);
    }

    #[test]
    fn option_values() {
        assert_eq!(SocketOption::KeepAlive.validate_value(7), Some(1));
        assert_eq!(SocketOption::KeepAlive.validate_value(0), Some(0));
        assert_eq!(SocketOption::SendBuffer.validate_value(4096), Some(4096));
        assert_eq!(SocketOption::RecvBuffer.validate_value(0), None);
        assert_eq!(SocketOption::RecvBuffer.validate_value(-1), None);
    }

    #[test]
    fn constant_values() {
        assert_eq!(AF_INET, 2);
        assert_eq!(SOCK_STREAM, 1);
        assert_eq!(SOCK_CLOEXEC, 0x80000);
        assert_eq!(SOL_SOCKET, 1);
        assert_eq!(SO_REUSEADDR, 2);
        assert_eq!(SO_REUSEPORT, 15);
        assert_eq!(IPPROTO_TCP, 6);
        assert_eq!(TCP_NODELAY, 1);
        assert_eq!(SOMAXCONN, 4096);
    }
}
