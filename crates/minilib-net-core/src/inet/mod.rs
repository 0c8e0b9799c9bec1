//! Internet address manipulation.
//!
//! Byte-order helpers, dotted-quad parsing and the `struct sockaddr_in`
//! byte layout. All logic is safe Rust with no syscalls.

use std::net::{Ipv4Addr, SocketAddrV4};

use thiserror::Error;

use crate::socket::AF_INET;

/// The wildcard address `0.0.0.0`.
pub const INADDR_ANY: u32 = 0;

/// The loopback address `127.0.0.1` (host byte order).
pub const INADDR_LOOPBACK: u32 = 0x7f00_0001;

/// Size of `struct sockaddr_in` on Linux.
pub const SOCKADDR_IN_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Byte-order helpers
// ---------------------------------------------------------------------------

/// Converts a 16-bit value from host byte order to network byte order.
#[inline]
pub fn htons(v: u16) -> u16 {
    v.to_be()
}

/// Converts a 32-bit value from host byte order to network byte order.
#[inline]
pub fn htonl(v: u32) -> u32 {
    v.to_be()
}

/// Converts a 16-bit value from network byte order to host byte order.
#[inline]
pub fn ntohs(v: u16) -> u16 {
    u16::from_be(v)
}

/// Converts a 32-bit value from network byte order to host byte order.
#[inline]
pub fn ntohl(v: u32) -> u32 {
    u32::from_be(v)
}

// ---------------------------------------------------------------------------
// Dotted-quad parsing
// ---------------------------------------------------------------------------

/// Parse a dotted-quad IPv4 text address into exactly 4 bytes.
/// Rejects leading zeros, values > 255, wrong number of parts, and trailing junk.
pub fn parse_ipv4(src: &[u8]) -> Option<[u8; 4]> {
    let s = core::str::from_utf8(src).ok()?;
    let s = s.trim_end_matches('\0');

    if s.is_empty() {
        return None;
    }

    let mut parts = s.splitn(5, '.');
    let mut octets = [0u8; 4];
    for octet in &mut octets {
        let part = parts.next()?;
        if part.is_empty() {
            return None;
        }
        // Leading zeros read as octal to some parsers.
        if part.len() > 1 && part.starts_with('0') {
            return None;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let val: u16 = part.parse().ok()?;
        if val > 255 {
            return None;
        }
        *octet = val as u8;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

// ---------------------------------------------------------------------------
// sockaddr_in layout
// ---------------------------------------------------------------------------

/// Failure to interpret a raw socket address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddrError {
    #[error("socket address too short: {len} bytes, need {need}")]
    TooShort { len: usize, need: usize },
    #[error("unsupported address family {0}")]
    UnsupportedFamily(i32),
}

/// An IPv4 socket address as laid out in `struct sockaddr_in`.
///
/// ```text
/// offset 0  sin_family  u16, native endian
/// offset 2  sin_port    u16, network order
/// offset 4  sin_addr    4 octets, network order
/// offset 8  sin_zero    8 bytes of padding
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SockAddrV4 {
    addr: Ipv4Addr,
    port: u16,
}

impl SockAddrV4 {
    #[must_use]
    pub const fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self { addr, port }
    }

    /// `0.0.0.0:port`.
    #[must_use]
    pub const fn any(port: u16) -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED, port)
    }

    #[must_use]
    pub const fn ip(&self) -> Ipv4Addr {
        self.addr
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub const fn family(&self) -> i32 {
        AF_INET
    }

    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        self.addr.is_unspecified()
    }

    pub fn set_ip(&mut self, addr: Ipv4Addr) {
        self.addr = addr;
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// Encodes the address in `sockaddr_in` layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SOCKADDR_IN_LEN] {
        let mut buf = [0u8; SOCKADDR_IN_LEN];
        buf[0..2].copy_from_slice(&(AF_INET as u16).to_ne_bytes());
        buf[2..4].copy_from_slice(&self.port.to_be_bytes());
        buf[4..8].copy_from_slice(&self.addr.octets());
        buf
    }

    /// Decodes a raw socket address, dispatching on its family field.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, AddrError> {
        let family = raw_family(buf)?;
        if family != AF_INET {
            return Err(AddrError::UnsupportedFamily(family));
        }
        if buf.len() < SOCKADDR_IN_LEN {
            return Err(AddrError::TooShort {
                len: buf.len(),
                need: SOCKADDR_IN_LEN,
            });
        }
        let port = u16::from_be_bytes([buf[2], buf[3]]);
        let addr = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);
        Ok(Self { addr, port })
    }
}

/// Reads the `sa_family` field shared by every `sockaddr` variant.
pub fn raw_family(buf: &[u8]) -> Result<i32, AddrError> {
    match buf {
        [a, b, ..] => Ok(i32::from(u16::from_ne_bytes([*a, *b]))),
        _ => Err(AddrError::TooShort {
            len: buf.len(),
            need: 2,
        }),
    }
}

impl From<SocketAddrV4> for SockAddrV4 {
    fn from(sa: SocketAddrV4) -> Self {
        Self::new(*sa.ip(), sa.port())
    }
}

impl From<SockAddrV4> for SocketAddrV4 {
    fn from(sa: SockAddrV4) -> Self {
        SocketAddrV4::new(sa.addr, sa.port)
    }
}

impl core::fmt::Display for SockAddrV4 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}
