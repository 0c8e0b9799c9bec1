//! Command-line probes for minilib-net.
//!
//! This crate provides:
//! - Resolve reports: one hostname through either resolver backend
//! - An echo listener that reports each accepted connection
//! - A connect client that reports the exchange
//! - A loopback self-test combining all three

#![forbid(unsafe_code)]

pub mod error;
pub mod report;
pub mod session;

pub use error::HarnessError;
pub use report::{AcceptReport, ConnectReport, HealingReport, ProbeReport, ResolveReport};
