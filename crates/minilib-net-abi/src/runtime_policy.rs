//! Runtime policy bridge for helper entrypoints.
//!
//! Every exported operation opens a [`CallSpan`] on entry and closes it with
//! its outcome. Closing records any healing action in the global counters and
//! publishes one structured event when logging is enabled.

use std::time::Instant;

use minilib_net_core::config::{self, RuntimeMode};
use minilib_net_core::heal::{HealingAction, global_healing_policy};

use crate::error::NetError;
use crate::structured_log::{self, LogEntry, LogLevel, Outcome};

/// Per-call bookkeeping for one exported operation.
#[derive(Debug)]
pub(crate) struct CallSpan {
    symbol: &'static str,
    mode: RuntimeMode,
    started: Instant,
}

/// Start observing a call under the process-wide mode.
pub(crate) fn begin(symbol: &'static str) -> CallSpan {
    begin_with_mode(symbol, config::runtime_mode())
}

/// Start observing a call under an explicit mode.
pub(crate) fn begin_with_mode(symbol: &'static str, mode: RuntimeMode) -> CallSpan {
    CallSpan {
        symbol,
        mode,
        started: Instant::now(),
    }
}

impl CallSpan {
    pub(crate) fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Close a successful call.
    pub(crate) fn ok<F>(self, heal: HealingAction, details: F)
    where
        F: FnOnce() -> serde_json::Value,
    {
        let outcome = if heal.is_heal() {
            Outcome::Healed
        } else {
            Outcome::Ok
        };
        self.observe(outcome, None, heal, details);
    }

    /// Close a failed call.
    pub(crate) fn err<F>(self, err: &NetError, details: F)
    where
        F: FnOnce() -> serde_json::Value,
    {
        self.observe(Outcome::Error, Some(err), HealingAction::None, details);
    }

    /// Close a call from its `Result`.
    pub(crate) fn finish_with<T, F>(self, result: &Result<T, NetError>, details: F)
    where
        F: FnOnce() -> serde_json::Value,
    {
        match result {
            Ok(_) => self.ok(HealingAction::None, details),
            Err(err) => self.err(err, details),
        }
    }

    fn observe<F>(self, outcome: Outcome, err: Option<&NetError>, heal: HealingAction, details: F)
    where
        F: FnOnce() -> serde_json::Value,
    {
        if heal.is_heal() {
            global_healing_policy().record(&heal);
        }
        if !structured_log::enabled() {
            return;
        }

        let latency = u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let level = match outcome {
            Outcome::Ok => LogLevel::Debug,
            Outcome::Healed => LogLevel::Warn,
            Outcome::Error => LogLevel::Error,
        };
        let mut entry = LogEntry::new("", level, event_name(self.symbol))
            .with_symbol(self.symbol)
            .with_mode(self.mode.as_str())
            .with_outcome(outcome)
            .with_latency_ns(latency);
        if let Some(err) = err {
            entry = entry.with_errno(err.errno());
            let mut detail = details();
            if let serde_json::Value::Object(map) = &mut detail {
                map.insert("error".to_string(), err.to_string().into());
            } else {
                detail = serde_json::json!({ "error": err.to_string() });
            }
            entry = entry.with_details(detail);
        } else {
            let detail = details();
            if !detail.is_null() {
                entry = entry.with_details(detail);
            }
        }
        if heal.is_heal() {
            entry = entry.with_healing_action(heal.as_str());
        }
        structured_log::emit_global(entry);
    }
}

/// `minilib_net_connect_v4` -> `connect_v4`, `TcpSocket::accept` -> `accept`.
fn event_name(symbol: &str) -> &str {
    let tail = symbol.rsplit("::").next().unwrap_or(symbol);
    tail.strip_prefix("minilib_net_").unwrap_or(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        assert_eq!(event_name("minilib_net_connect_v4"), "connect_v4");
        assert_eq!(event_name("TcpSocket::accept"), "accept");
        assert_eq!(event_name("resolve_ipv4"), "resolve_ipv4");
    }

    #[test]
    fn explicit_mode_is_kept() {
        let span = begin_with_mode("probe", RuntimeMode::Hardened);
        assert_eq!(span.mode(), RuntimeMode::Hardened);
        span.ok(HealingAction::None, || serde_json::Value::Null);
    }
}
