//! CLI entrypoint for the minilib-net probes.

use std::net::Ipv4Addr;

use clap::{Parser, Subcommand};
use minilib_net_abi::Resolver;
use minilib_net_core::config::{self, ResolverBackend, RuntimeMode};
use minilib_net_harness::session::{self, DEFAULT_MESSAGE};
use serde::Serialize;

/// IPv4 TCP and resolver probes.
#[derive(Debug, Parser)]
#[command(name = "minilib-net")]
#[command(about = "Resolve hostnames and exercise IPv4 TCP sockets through minilib-net")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a hostname into a fixed number of address slots.
    Resolve {
        host: String,
        /// Number of address slots.
        #[arg(long, default_value_t = 8)]
        capacity: usize,
        /// Resolver backend (`gethostbyname` or `getaddrinfo`). Defaults to MINILIB_NET_RESOLVER.
        #[arg(long)]
        backend: Option<String>,
        /// Runtime mode (`strict` or `hardened`). Defaults to MINILIB_NET_MODE.
        #[arg(long)]
        mode: Option<String>,
    },
    /// Run an echo listener and report each connection.
    Listen {
        /// Local IPv4 address.
        #[arg(long, default_value = "127.0.0.1", value_parser = parse_ip)]
        addr: Ipv4Addr,
        /// Local port (0 picks an ephemeral port).
        #[arg(long, default_value_t = 0)]
        port: u16,
        /// Exit after the first connection.
        #[arg(long)]
        once: bool,
    },
    /// Connect, send a message and report the echoed reply.
    Connect {
        host: String,
        port: u16,
        /// Message to send.
        #[arg(long, default_value = DEFAULT_MESSAGE)]
        message: String,
    },
    /// Loopback self-test. Exits with status 1 on failure.
    Probe {
        /// Runtime mode for the resolver and every socket (`strict` or `hardened`).
        /// Defaults to MINILIB_NET_MODE.
        #[arg(long)]
        mode: Option<String>,
    },
}

fn parse_ip(s: &str) -> Result<Ipv4Addr, String> {
    session::parse_addr(s).map_err(|e| e.to_string())
}

fn resolver_for(mode: Option<&str>, backend: Option<&str>) -> Resolver {
    let base = config::config();
    let mode = mode.map_or(base.mode, RuntimeMode::from_str_loose);
    let backend = backend.map_or(base.backend, ResolverBackend::from_str_loose);
    Resolver::new(mode, backend).with_scratch_len(base.scratch_len)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Resolve {
            host,
            capacity,
            backend,
            mode,
        } => {
            let resolver = resolver_for(mode.as_deref(), backend.as_deref());
            let report = session::resolve(&resolver, &host, capacity);
            print_json(&report)?;
            if !report.succeeded() {
                std::process::exit(2);
            }
        }
        Command::Listen { addr, port, once } => {
            let listener = session::bind(addr, port)?;
            eprintln!("Listening on {}", listener.local_addr()?);
            let limit = once.then_some(1);
            session::serve(&listener, limit, |report| {
                println!("{}", serde_json::to_string(&report)?);
                Ok(())
            })?;
        }
        Command::Connect {
            host,
            port,
            message,
        } => {
            let report = session::connect(&host, port, &message)?;
            print_json(&report)?;
        }
        Command::Probe { mode } => {
            let resolver = resolver_for(mode.as_deref(), None);
            match session::probe(&resolver) {
                Ok(report) => {
                    print_json(&report)?;
                    if !report.passed {
                        std::process::exit(1);
                    }
                }
                Err(err) => {
                    eprintln!("probe failed: {err}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
