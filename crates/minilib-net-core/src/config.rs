//! Runtime configuration.
//!
//! Read once from the environment and cached for the life of the process:
//! - `MINILIB_NET_MODE`: `strict` (default) or `hardened`.
//!   In strict mode a resolver answer that does not fit the caller's buffer is
//!   reported as `ERANGE` once the buffer has been filled. In hardened mode
//!   the truncated answer is returned as success and recorded as a heal.
//! - `MINILIB_NET_RESOLVER`: `gethostbyname` (default) or `getaddrinfo`.
//! - `MINILIB_NET_RESOLV_BUFSIZE`: initial `gethostbyname_r` scratch size.
//! - `MINILIB_NET_LOG`: `off` (default), `stderr`, or a path for JSONL events.
//!
//! Unknown values fall back to the default rather than failing.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::resolv::{DEFAULT_SCRATCH_LEN, clamp_scratch_len};

pub const MODE_ENV: &str = "MINILIB_NET_MODE";
pub const RESOLVER_ENV: &str = "MINILIB_NET_RESOLVER";
pub const BUFSIZE_ENV: &str = "MINILIB_NET_RESOLV_BUFSIZE";
pub const LOG_ENV: &str = "MINILIB_NET_LOG";

/// How strictly the helpers treat requests they can only partially satisfy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeMode {
    /// POSIX-style: partial results are errors.
    #[default]
    Strict,
    /// Partial results succeed and are counted by the healing policy.
    Hardened,
}

impl RuntimeMode {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "hardened" | "repair" | "lenient" => Self::Hardened,
            _ => Self::Strict,
        }
    }

    /// Returns true if partial results are repaired instead of rejected.
    #[must_use]
    pub const fn heals_enabled(self) -> bool {
        matches!(self, Self::Hardened)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
        }
    }
}

/// Which libc entry point answers hostname queries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverBackend {
    /// `gethostbyname_r(3)`.
    #[default]
    HostByName,
    /// `getaddrinfo(3)` restricted to `AF_INET` / `SOCK_STREAM`.
    AddrInfo,
}

impl ResolverBackend {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "getaddrinfo" | "addrinfo" | "gai" => Self::AddrInfo,
            _ => Self::HostByName,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HostByName => "gethostbyname",
            Self::AddrInfo => "getaddrinfo",
        }
    }
}

/// Destination for structured call events.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum LogTarget {
    #[default]
    Off,
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "off" | "none" | "0" => Self::Off,
            "stderr" | "1" => Self::Stderr,
            _ => Self::File(PathBuf::from(trimmed)),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    pub mode: RuntimeMode,
    pub backend: ResolverBackend,
    /// Initial scratch length for `gethostbyname_r`, already clamped.
    pub scratch_len: usize,
    pub log: LogTarget,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Strict,
            backend: ResolverBackend::HostByName,
            scratch_len: DEFAULT_SCRATCH_LEN,
            log: LogTarget::Off,
        }
    }
}

impl NetConfig {
    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup(MODE_ENV) {
            config.mode = RuntimeMode::from_str_loose(&v);
        }
        if let Some(v) = lookup(RESOLVER_ENV) {
            config.backend = ResolverBackend::from_str_loose(&v);
        }
        if let Some(v) = lookup(BUFSIZE_ENV)
            && let Ok(n) = v.trim().parse::<usize>()
        {
            config.scratch_len = clamp_scratch_len(n);
        }
        if let Some(v) = lookup(LOG_ENV) {
            config.log = LogTarget::from_str_loose(&v);
        }
        config
    }

    /// Build a configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

static CONFIG: OnceLock<NetConfig> = OnceLock::new();

/// Process-wide configuration (reads the environment on first call).
pub fn config() -> &'static NetConfig {
    CONFIG.get_or_init(NetConfig::from_env)
}

/// Shorthand for `config().mode`.
#[must_use]
pub fn runtime_mode() -> RuntimeMode {
    config().mode
}
