use std::net::Ipv4Addr;
use std::thread;

use minilib_net_abi::Resolver;
use minilib_net_core::config::{ResolverBackend, RuntimeMode};
use minilib_net_harness::session;
use minilib_net_harness::{AcceptReport, ResolveReport};

#[test]
fn resolve_report_lists_addresses() {
    for backend in [ResolverBackend::HostByName, ResolverBackend::AddrInfo] {
        let resolver = Resolver::new(RuntimeMode::Strict, backend);
        let report = session::resolve(&resolver, "127.0.0.1", 2);
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(report.addresses, vec!["127.0.0.1".to_string()]);
        assert_eq!(report.backend, backend.as_str());
        assert_eq!(report.mode, "strict");
        assert!(!report.truncated);
    }
}

#[test]
fn hardened_resolve_report_is_truncated_success() {
    let resolver = Resolver::new(RuntimeMode::Hardened, ResolverBackend::HostByName);
    let report = session::resolve(&resolver, "127.0.0.1", 0);
    assert!(report.succeeded());
    assert!(report.truncated);
    assert_eq!(report.written, 0);
    assert_eq!(report.total, 1);
}

#[test]
fn resolve_report_json_omits_empty_error_fields() {
    let resolver = Resolver::new(RuntimeMode::Strict, ResolverBackend::AddrInfo);
    let report = session::resolve(&resolver, "127.0.0.1", 1);
    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("error").is_none());
    assert!(json.get("errno").is_none());
    let back: ResolveReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn serve_and_connect_exchange_message() {
    let listener = session::bind(Ipv4Addr::LOCALHOST, 0).unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let mut reports: Vec<AcceptReport> = Vec::new();
        session::serve(&listener, Some(2), |r| {
            reports.push(r);
            Ok(())
        })
        .map(|()| reports)
    });

    for message in ["first", "second"] {
        let report = session::connect("127.0.0.1", port, message).unwrap();
        assert!(report.echoed(), "{report:?}");
        assert_eq!(report.peer, format!("127.0.0.1:{port}"));
    }

    let reports = server.join().unwrap().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].message, "first");
    assert_eq!(reports[1].bytes_echoed, "second".len());
    assert_eq!(reports[0].local, format!("127.0.0.1:{port}"));
}

#[test]
fn connect_to_closed_port_fails() {
    let listener = session::bind(Ipv4Addr::LOCALHOST, 0).unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    assert!(session::connect("127.0.0.1", port, "x").is_err());
}

#[test]
fn probe_passes_on_loopback() {
    for mode in [RuntimeMode::Strict, RuntimeMode::Hardened] {
        let resolver = Resolver::new(mode, ResolverBackend::HostByName);
        let report = session::probe(&resolver).unwrap();
        assert!(report.passed, "{report:?}");
        assert_eq!(report.mode, mode.as_str());
        assert_eq!(report.accept.message, session::DEFAULT_MESSAGE);
    }
}
