// extern "C" exports take raw pointers from C callers and check them at
// runtime; per-function safety sections would repeat the same contract.
#![allow(clippy::missing_safety_doc)]
//! # minilib-net-abi
//!
//! libc-backed IPv4 TCP sockets and hostname resolution, with a safe Rust API
//! and an `extern "C"` boundary over the same operations.
//!
//! # Architecture
//!
//! ```text
//! caller -> TcpSocket / Resolver / extern "C" entry -> libc -> CallSpan (heal + log)
//!                      \-> minilib-net-core (validation, bookkeeping)
//! ```
//!
//! In **strict** mode a resolver answer that does not fit the caller's
//! buffer is an error (`ERANGE`) after the buffer has been filled.
//!
//! In **hardened** mode the same answer succeeds truncated, and the
//! truncation (or a clamped `listen` backlog) is counted by the healing
//! policy.

pub mod error;
pub mod resolv_abi;
mod runtime_policy;
pub mod sockaddr;
pub mod socket_abi;
pub mod structured_log;
pub mod util;

pub use error::NetError;
pub use minilib_net_core::resolv::ResolveSummary;
pub use resolv_abi::{Resolver, lookup_ipv4, resolve_ipv4};
pub use sockaddr::SockAddrIn;
pub use socket_abi::TcpSocket;
