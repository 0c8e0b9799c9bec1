//! Resolve, listen, connect and probe sessions behind the CLI.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, TcpStream};
use std::thread;

use minilib_net_abi::resolv_abi::slots_to_addrs;
use minilib_net_abi::{NetError, Resolver, SockAddrIn, TcpSocket};
use minilib_net_core::config::{self, RuntimeMode};
use minilib_net_core::heal::global_healing_policy;
use minilib_net_core::inet::parse_ipv4;

use crate::error::HarnessError;
use crate::report::{AcceptReport, ConnectReport, ProbeReport, ResolveReport};

/// Backlog used by the echo listener.
pub const LISTEN_BACKLOG: i32 = 16;

/// Message sent by `probe` and by `connect` when none is given.
pub const DEFAULT_MESSAGE: &str = "minilib-net probe";

/// Parse a dotted-quad IPv4 address.
pub fn parse_addr(s: &str) -> Result<Ipv4Addr, HarnessError> {
    parse_ipv4(s.as_bytes())
        .map(Ipv4Addr::from)
        .ok_or_else(|| HarnessError::InvalidAddress(s.to_string()))
}

/// Resolve `host` into `capacity` slots and describe the outcome.
///
/// Resolution failures are part of the report, not an `Err`.
#[must_use]
pub fn resolve(resolver: &Resolver, host: &str, capacity: usize) -> ResolveReport {
    let mut slots = vec![0u64; capacity];
    let result = resolver.resolve_ipv4(host, &mut slots);

    let (total, written) = match &result {
        Ok(summary) => (summary.total, summary.written),
        Err(NetError::Truncated { written, total }) => (*total, *written),
        Err(_) => (0, 0),
    };
    let err = result.as_ref().err();
    ResolveReport {
        host: host.to_string(),
        backend: resolver.backend().as_str().to_string(),
        mode: resolver.mode().as_str().to_string(),
        capacity,
        total,
        written,
        truncated: total > written,
        addresses: slots_to_addrs(&slots[..written])
            .iter()
            .map(ToString::to_string)
            .collect(),
        error: err.map(ToString::to_string),
        errno: err.map(NetError::errno),
        h_errno: err.and_then(NetError::h_errno),
    }
}

/// Bind the echo listener on `ip:port`.
pub fn bind(ip: Ipv4Addr, port: u16) -> Result<TcpSocket, HarnessError> {
    bind_in(config::runtime_mode(), ip, port)
}

/// Bind the echo listener on `ip:port` in `mode`. Accepted connections
/// inherit the mode.
pub fn bind_in(mode: RuntimeMode, ip: Ipv4Addr, port: u16) -> Result<TcpSocket, HarnessError> {
    let addr = SockAddrIn::new(ip, port);
    Ok(TcpSocket::bind_listener_in(mode, &addr, LISTEN_BACKLOG)?)
}

/// Accept one connection, echo everything it sends until EOF, and report.
pub fn echo_once(listener: &TcpSocket) -> Result<AcceptReport, HarnessError> {
    let (conn, peer) = listener.accept()?;
    let local = conn.local_addr()?;
    let mut stream = TcpStream::from(conn);
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    stream.write_all(&buf)?;
    stream.flush()?;
    Ok(AcceptReport {
        local: local.to_string(),
        peer: peer.to_string(),
        bytes_echoed: buf.len(),
        message: String::from_utf8_lossy(&buf).into_owned(),
    })
}

/// Serve echo connections, handing each report to `on_accept`.
///
/// Stops after `limit` connections when given; otherwise runs until an
/// accept fails.
pub fn serve<F>(
    listener: &TcpSocket,
    limit: Option<usize>,
    mut on_accept: F,
) -> Result<(), HarnessError>
where
    F: FnMut(AcceptReport) -> Result<(), HarnessError>,
{
    let mut served = 0usize;
    while limit.is_none_or(|max| served < max) {
        on_accept(echo_once(listener)?)?;
        served += 1;
    }
    Ok(())
}

/// Connect to `host:port`, send `message`, and read the reply until EOF.
pub fn connect(host: &str, port: u16, message: &str) -> Result<ConnectReport, HarnessError> {
    connect_with(&Resolver::from_env(), host, port, message)
}

/// Like [`connect`], resolving with `resolver` and opening the socket in its
/// mode.
pub fn connect_with(
    resolver: &Resolver,
    host: &str,
    port: u16,
    message: &str,
) -> Result<ConnectReport, HarnessError> {
    let sock = TcpSocket::connect_host_with(resolver, host, port)?;
    sock.set_nodelay(true)?;
    let local = sock.local_addr()?;
    let peer = sock.peer_addr()?;

    let mut stream = TcpStream::from(sock);
    stream.write_all(message.as_bytes())?;
    stream.shutdown(Shutdown::Write)?;
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply)?;

    Ok(ConnectReport {
        host: host.to_string(),
        port,
        local: local.to_string(),
        peer: peer.to_string(),
        sent: message.to_string(),
        received: String::from_utf8_lossy(&reply).into_owned(),
    })
}

/// Loopback self-test: resolve, listen, connect, echo. Every step runs in
/// `resolver`'s mode.
pub fn probe(resolver: &Resolver) -> Result<ProbeReport, HarnessError> {
    let resolve_report = resolve(resolver, "127.0.0.1", 4);
    if !resolve_report.succeeded() {
        return Err(HarnessError::ProbeFailed(format!(
            "resolving 127.0.0.1: {}",
            resolve_report.error.as_deref().unwrap_or("unknown error")
        )));
    }

    let listener = bind_in(resolver.mode(), Ipv4Addr::LOCALHOST, 0)?;
    let listen_addr = listener.local_addr()?;
    let server = thread::spawn(move || echo_once(&listener));

    let port = listen_addr.port();
    let connect_report = connect_with(resolver, "127.0.0.1", port, DEFAULT_MESSAGE)?;
    let accept_report = server
        .join()
        .map_err(|_| HarnessError::ProbeFailed("echo thread panicked".to_string()))??;

    let passed = connect_report.echoed()
        && accept_report.bytes_echoed == DEFAULT_MESSAGE.len()
        && resolve_report.addresses.first().map(String::as_str) == Some("127.0.0.1");

    Ok(ProbeReport {
        mode: resolver.mode().as_str().to_string(),
        listen_addr: listen_addr.to_string(),
        resolve: resolve_report,
        connect: connect_report,
        accept: accept_report,
        healing: global_healing_policy().snapshot().into(),
        passed,
    })
}
