//! The global emitter is process-wide, so every test here holds LOG_LOCK.

use std::sync::Mutex;

use minilib_net_abi::structured_log::{
    LogEmitter, LogEntry, LogLevel, Outcome, SharedBuffer, install_emitter, validate_log_line,
};
use minilib_net_abi::{Resolver, SockAddrIn, TcpSocket};
use minilib_net_core::config::{ResolverBackend, RuntimeMode};

static LOG_LOCK: Mutex<()> = Mutex::new(());

fn capture<F: FnOnce()>(f: F) -> Vec<LogEntry> {
    let buffer = SharedBuffer::new();
    let previous = install_emitter(Some(LogEmitter::to_buffer(buffer.clone(), "test")));
    f();
    install_emitter(previous);
    buffer
        .lines()
        .iter()
        .enumerate()
        .map(|(i, line)| {
            validate_log_line(line, i + 1).unwrap_or_else(|errs| {
                panic!("invalid log line {line}: {}", errs[0])
            })
        })
        .collect()
}

#[test]
fn resolve_emits_structured_event() {
    let _guard = LOG_LOCK.lock().unwrap();
    let entries = capture(|| {
        let mut slots = [0u64; 2];
        Resolver::new(RuntimeMode::Strict, ResolverBackend::HostByName)
            .resolve_ipv4("127.0.0.1", &mut slots)
            .unwrap();
    });
    let entry = entries
        .iter()
        .find(|e| e.event == "resolve_ipv4")
        .expect("resolve event");
    assert_eq!(entry.level, LogLevel::Debug);
    assert_eq!(entry.outcome, Some(Outcome::Ok));
    assert_eq!(entry.mode.as_deref(), Some("strict"));
    assert_eq!(entry.symbol.as_deref(), Some("Resolver::resolve_ipv4"));
    assert!(entry.trace_id.starts_with("test::"));
    let details = entry.details.as_ref().expect("details");
    assert_eq!(details["host"], "127.0.0.1");
    assert_eq!(details["backend"], "gethostbyname");
    assert_eq!(details["total"], 1);
    assert_eq!(details["addresses"][0], "127.0.0.1");
}

#[test]
fn hardened_truncation_logs_heal() {
    let _guard = LOG_LOCK.lock().unwrap();
    let entries = capture(|| {
        Resolver::new(RuntimeMode::Hardened, ResolverBackend::AddrInfo)
            .resolve_ipv4("127.0.0.1", &mut [])
            .unwrap();
    });
    let entry = entries
        .iter()
        .find(|e| e.event == "resolve_ipv4")
        .expect("resolve event");
    assert_eq!(entry.level, LogLevel::Warn);
    assert_eq!(entry.outcome, Some(Outcome::Healed));
    assert_eq!(entry.healing_action.as_deref(), Some("truncate_address_list"));
}

#[test]
fn strict_truncation_logs_error_with_errno() {
    let _guard = LOG_LOCK.lock().unwrap();
    let entries = capture(|| {
        let _ = Resolver::new(RuntimeMode::Strict, ResolverBackend::HostByName)
            .resolve_ipv4("127.0.0.1", &mut []);
    });
    let entry = entries
        .iter()
        .find(|e| e.event == "resolve_ipv4")
        .expect("resolve event");
    assert_eq!(entry.outcome, Some(Outcome::Error));
    assert_eq!(entry.errno, Some(libc::ERANGE));
    let details = entry.details.as_ref().expect("details");
    assert!(details["error"].as_str().unwrap().contains("only 0 fit"));
}

#[test]
fn socket_calls_emit_one_event_each() {
    let _guard = LOG_LOCK.lock().unwrap();
    let entries = capture(|| {
        let _listener = TcpSocket::bind_listener(&SockAddrIn::loopback(0), 1).unwrap();
    });
    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
    for expected in ["new_v4", "set_option", "bind", "listen"] {
        assert!(events.contains(&expected), "missing {expected} in {events:?}");
    }
}

#[test]
fn socket_queries_emit_events() {
    let _guard = LOG_LOCK.lock().unwrap();
    let listener = TcpSocket::bind_listener(&SockAddrIn::loopback(0), 1).unwrap();
    let entries = capture(|| {
        let addr = listener.local_addr().unwrap();
        assert!(listener.peer_addr().is_err());
        listener.option(minilib_net_core::socket::SocketOption::ReuseAddr).unwrap();
        assert!(listener.take_error().unwrap().is_none());
        assert_ne!(addr.port(), 0);
    });
    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
    for expected in ["local_addr", "peer_addr", "option", "take_error"] {
        assert!(events.contains(&expected), "missing {expected} in {events:?}");
    }

    let local = entries.iter().find(|e| e.event == "local_addr").unwrap();
    assert_eq!(local.outcome, Some(Outcome::Ok));
    let details = local.details.as_ref().expect("details");
    assert!(details["addr"].as_str().unwrap().starts_with("127.0.0.1:"));

    let peer = entries.iter().find(|e| e.event == "peer_addr").unwrap();
    assert_eq!(peer.outcome, Some(Outcome::Error));
    assert_eq!(peer.errno, Some(libc::ENOTCONN));
}
