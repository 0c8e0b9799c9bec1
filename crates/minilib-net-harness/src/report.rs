//! JSON reports printed by the CLI.

use minilib_net_core::heal::HealingSnapshot;
use serde::{Deserialize, Serialize};

/// Outcome of resolving one hostname into a fixed number of slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReport {
    pub host: String,
    pub backend: String,
    pub mode: String,
    pub capacity: usize,
    /// Addresses the resolver returned.
    pub total: usize,
    /// Addresses that fit into the slots.
    pub written: usize,
    pub truncated: bool,
    pub addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h_errno: Option<i32>,
}

impl ResolveReport {
    /// True when the call returned success (possibly truncated in hardened mode).
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// One connection served by the echo listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptReport {
    pub local: String,
    pub peer: String,
    pub bytes_echoed: usize,
    pub message: String,
}

/// One client exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectReport {
    pub host: String,
    pub port: u16,
    pub local: String,
    pub peer: String,
    pub sent: String,
    pub received: String,
}

impl ConnectReport {
    #[must_use]
    pub fn echoed(&self) -> bool {
        self.sent == self.received
    }
}

/// Healing counters at the time of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealingReport {
    pub total_heals: u64,
    pub address_truncations: u64,
    pub backlog_clamps: u64,
    pub safe_defaults: u64,
}

impl From<HealingSnapshot> for HealingReport {
    fn from(s: HealingSnapshot) -> Self {
        Self {
            total_heals: s.total_heals,
            address_truncations: s.address_truncations,
            backlog_clamps: s.backlog_clamps,
            safe_defaults: s.safe_defaults,
        }
    }
}

/// Loopback self-test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub mode: String,
    pub listen_addr: String,
    pub resolve: ResolveReport,
    pub connect: ConnectReport,
    pub accept: AcceptReport,
    pub healing: HealingReport,
    pub passed: bool,
}
