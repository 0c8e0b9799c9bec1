//! IPv4 hostname resolution (`<netdb.h>`).
//!
//! Two backends answer queries: `gethostbyname_r` (default) and `getaddrinfo`
//! restricted to `AF_INET`/`SOCK_STREAM`. Either way the answer is copied into
//! caller-supplied `u64` slots by `minilib_net_core::resolv::AddressListWriter`,
//! and an answer larger than the slots is handled according to the runtime
//! mode.

use std::ffi::{CStr, CString, c_char, c_int};
use std::mem::size_of;
use std::net::Ipv4Addr;
use std::{io, ptr};

use minilib_net_core::config::{self, NetConfig, ResolverBackend, RuntimeMode};
use minilib_net_core::heal::{HealingAction, global_healing_policy};
use minilib_net_core::resolv::{
    AddressListWriter, DEFAULT_SCRATCH_LEN, HOST_NOT_FOUND, MAX_HOSTNAME_LEN, ResolveSummary,
    clamp_scratch_len, dedup_preserving_order, next_scratch_len, unpack_ipv4,
};
use minilib_net_core::socket::{AF_INET, SOCK_STREAM};

use crate::error::NetError;
use crate::runtime_policy;
use crate::util::{c_str_bounded, set_errno};

unsafe extern "C" {
    fn gethostbyname_r(
        name: *const c_char,
        ret: *mut libc::hostent,
        buf: *mut c_char,
        buflen: libc::size_t,
        result: *mut *mut libc::hostent,
        h_errnop: *mut c_int,
    ) -> c_int;
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Hostname resolver bound to a mode and backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    mode: RuntimeMode,
    backend: ResolverBackend,
    scratch_len: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(RuntimeMode::Strict, ResolverBackend::HostByName)
    }
}

impl Resolver {
    #[must_use]
    pub fn new(mode: RuntimeMode, backend: ResolverBackend) -> Self {
        Self {
            mode,
            backend,
            scratch_len: DEFAULT_SCRATCH_LEN,
        }
    }

    /// Initial `gethostbyname_r` scratch length, clamped to the allowed range.
    #[must_use]
    pub fn with_scratch_len(mut self, len: usize) -> Self {
        self.scratch_len = clamp_scratch_len(len);
        self
    }

    #[must_use]
    pub fn from_config(config: &NetConfig) -> Self {
        Self::new(config.mode, config.backend).with_scratch_len(config.scratch_len)
    }

    /// Resolver configured from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_config(config::config())
    }

    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    #[must_use]
    pub fn backend(&self) -> ResolverBackend {
        self.backend
    }

    #[must_use]
    pub fn scratch_len(&self) -> usize {
        self.scratch_len
    }

    /// Resolve `host` into `out`, one address per slot.
    ///
    /// Each slot receives the address as its host-order numeric value. When
    /// the answer does not fit, every slot is filled; strict mode then returns
    /// [`NetError::Truncated`], hardened mode returns the truncated summary.
    pub fn resolve_ipv4(&self, host: &str, out: &mut [u64]) -> Result<ResolveSummary, NetError> {
        self.resolve_into("Resolver::resolve_ipv4", host, out)
    }

    /// Resolve `host` and return every address.
    pub fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, NetError> {
        let span = runtime_policy::begin_with_mode("Resolver::lookup_ipv4", self.mode);
        let result = validate_hostname(host).and_then(|c_host| self.query(&c_host));
        match result {
            Ok(addrs) => {
                let addrs: Vec<Ipv4Addr> = addrs.into_iter().map(Ipv4Addr::from).collect();
                span.ok(HealingAction::None, || {
                    serde_json::json!({
                        "host": host,
                        "backend": self.backend.as_str(),
                        "addresses": addrs.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    })
                });
                Ok(addrs)
            }
            Err(err) => {
                span.err(&err, || self.failure_details(host, &err));
                Err(err)
            }
        }
    }

    fn resolve_into(
        &self,
        symbol: &'static str,
        host: &str,
        out: &mut [u64],
    ) -> Result<ResolveSummary, NetError> {
        let span = runtime_policy::begin_with_mode(symbol, self.mode);
        let capacity = out.len();

        let addrs = match validate_hostname(host).and_then(|c_host| self.query(&c_host)) {
            Ok(addrs) => addrs,
            Err(err) => {
                span.err(&err, || self.failure_details(host, &err));
                return Err(err);
            }
        };

        let mut writer = AddressListWriter::new(out);
        writer.extend(addrs.iter().copied());
        let summary = writer.finish();
        let details = || {
            serde_json::json!({
                "host": host,
                "backend": self.backend.as_str(),
                "capacity": capacity,
                "total": summary.total,
                "written": summary.written,
                "addresses": addrs
                    .iter()
                    .take(summary.written)
                    .map(|a| Ipv4Addr::from(*a).to_string())
                    .collect::<Vec<_>>(),
            })
        };

        if !summary.truncated() {
            span.ok(HealingAction::None, details);
            return Ok(summary);
        }

        if self.mode.heals_enabled() {
            let heal = global_healing_policy().heal_address_list(summary.total, capacity);
            span.ok(heal, details);
            Ok(summary)
        } else {
            let err = NetError::Truncated {
                written: summary.written,
                total: summary.total,
            };
            span.err(&err, details);
            Err(err)
        }
    }

    fn query(&self, host: &CStr) -> Result<Vec<[u8; 4]>, NetError> {
        match self.backend {
            ResolverBackend::HostByName => self.query_hostent(host),
            ResolverBackend::AddrInfo => query_addrinfo(host),
        }
    }

    fn query_hostent(&self, host: &CStr) -> Result<Vec<[u8; 4]>, NetError> {
        let mut scratch_len = self.scratch_len;
        loop {
            let mut scratch: Vec<c_char> = vec![0; scratch_len];
            // SAFETY: hostent is plain old data; the resolver fills it in.
            let mut ret: libc::hostent = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::hostent = ptr::null_mut();
            let mut h_errno: c_int = 0;

            // SAFETY: every pointer references live local storage of the
            // advertised size.
            let rc = unsafe {
                gethostbyname_r(
                    host.as_ptr(),
                    &mut ret,
                    scratch.as_mut_ptr(),
                    scratch.len(),
                    &mut result,
                    &mut h_errno,
                )
            };

            if rc == libc::ERANGE {
                match next_scratch_len(scratch_len) {
                    Some(next) => {
                        scratch_len = next;
                        continue;
                    }
                    None => return Err(io::Error::from_raw_os_error(libc::ERANGE).into()),
                }
            }

            if !result.is_null() {
                // SAFETY: on success `result` points at `ret`, whose pointers
                // reference `scratch`, both still alive here.
                return unsafe { collect_hostent(&*result) };
            }

            return Err(match (rc, h_errno) {
                (_, code) if code > 0 => NetError::Resolve {
                    host: host.to_string_lossy().into_owned(),
                    h_errno: code,
                },
                (0, _) => NetError::Resolve {
                    host: host.to_string_lossy().into_owned(),
                    h_errno: HOST_NOT_FOUND,
                },
                (rc, _) => io::Error::from_raw_os_error(rc).into(),
            });
        }
    }

    fn failure_details(&self, host: &str, err: &NetError) -> serde_json::Value {
        serde_json::json!({
            "host": host,
            "backend": self.backend.as_str(),
            "h_errno": err.h_errno(),
        })
    }
}

fn validate_hostname(host: &str) -> Result<CString, NetError> {
    if host.is_empty() || host.len() >= MAX_HOSTNAME_LEN {
        return Err(NetError::InvalidHostname);
    }
    CString::new(host).map_err(|_| NetError::InvalidHostname)
}

/// Copy the IPv4 address list out of a resolver-owned `hostent`.
///
/// # Safety
///
/// `he` and every pointer reachable from `h_addr_list` must be valid.
unsafe fn collect_hostent(he: &libc::hostent) -> Result<Vec<[u8; 4]>, NetError> {
    if he.h_addrtype != AF_INET || he.h_length != 4 {
        return Err(NetError::UnsupportedFamily(he.h_addrtype));
    }
    let mut addrs = Vec::new();
    if he.h_addr_list.is_null() {
        return Ok(addrs);
    }
    let mut i = 0usize;
    loop {
        // SAFETY: h_addr_list is NULL-terminated per the hostent contract.
        let entry = unsafe { *he.h_addr_list.add(i) };
        if entry.is_null() {
            break;
        }
        let mut octets = [0u8; 4];
        // SAFETY: each entry holds h_length (== 4) bytes.
        unsafe { ptr::copy_nonoverlapping(entry.cast::<u8>(), octets.as_mut_ptr(), 4) };
        addrs.push(octets);
        i += 1;
    }
    Ok(addrs)
}

/// Owns a `getaddrinfo` result list.
struct AddrInfoList(*mut libc::addrinfo);

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the list came from getaddrinfo and is freed exactly once.
            unsafe { libc::freeaddrinfo(self.0) };
        }
    }
}

fn query_addrinfo(host: &CStr) -> Result<Vec<[u8; 4]>, NetError> {
    // SAFETY: addrinfo is plain old data; zero is "no preference" for every
    // field we do not set.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = AF_INET;
    hints.ai_socktype = SOCK_STREAM;

    let mut res: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: host is NUL-terminated, hints and res are live locals.
    let rc = unsafe { libc::getaddrinfo(host.as_ptr(), ptr::null(), &hints, &mut res) };
    let list = AddrInfoList(res);
    if rc != 0 {
        return Err(NetError::AddrInfo {
            host: host.to_string_lossy().into_owned(),
            code: rc,
        });
    }

    let mut addrs = Vec::new();
    let mut cur = list.0;
    while !cur.is_null() {
        // SAFETY: nodes of a live getaddrinfo list.
        let ai = unsafe { &*cur };
        if ai.ai_family == AF_INET
            && !ai.ai_addr.is_null()
            && ai.ai_addrlen as usize >= size_of::<libc::sockaddr_in>()
        {
            // SAFETY: AF_INET entries carry a sockaddr_in of the checked size.
            let sin = unsafe { &*ai.ai_addr.cast::<libc::sockaddr_in>() };
            addrs.push(sin.sin_addr.s_addr.to_ne_bytes());
        }
        cur = ai.ai_next;
    }
    dedup_preserving_order(&mut addrs);
    Ok(addrs)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Resolve `host` into `out` using the process-wide configuration.
pub fn resolve_ipv4(host: &str, out: &mut [u64]) -> Result<ResolveSummary, NetError> {
    Resolver::from_env().resolve_ipv4(host, out)
}

/// Resolve `host` to every IPv4 address using the process-wide configuration.
pub fn lookup_ipv4(host: &str) -> Result<Vec<Ipv4Addr>, NetError> {
    Resolver::from_env().lookup_ipv4(host)
}

/// Decode slots filled by [`resolve_ipv4`].
#[must_use]
pub fn slots_to_addrs(slots: &[u64]) -> Vec<Ipv4Addr> {
    slots.iter().filter_map(|s| unpack_ipv4(*s)).collect()
}

// ---------------------------------------------------------------------------
// extern "C"
// ---------------------------------------------------------------------------

/// Resolve `hostname` into `out_addresses[0..capacity]`.
///
/// Returns 0 on success. On failure returns -1 and sets errno:
/// `EINVAL` (null, unterminated or empty hostname), `EFAULT` (null
/// `out_addresses` with non-zero capacity), `ERANGE` (answer truncated in
/// strict mode; the slots are still filled), `ENOENT` (unknown host),
/// `EAGAIN` (temporary resolver failure).
///
/// `*out_total`, when non-null, receives the number of addresses found, also
/// on `ERANGE`. `*out_h_errno`, when non-null, receives the resolver code on
/// resolution failure and 0 otherwise.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minilib_net_resolve_ipaddress_v4(
    hostname: *const c_char,
    out_addresses: *mut u64,
    capacity: usize,
    out_total: *mut usize,
    out_h_errno: *mut c_int,
) -> c_int {
    let resolver = Resolver::from_env();

    let result = if hostname.is_null() {
        Err(NetError::InvalidHostname)
    } else if out_addresses.is_null() && capacity > 0 {
        Err(NetError::Os(io::Error::from_raw_os_error(libc::EFAULT)))
    } else {
        // SAFETY: non-null C string, scanned up to the hostname bound.
        match unsafe { c_str_bounded(hostname, MAX_HOSTNAME_LEN) } {
            None => Err(NetError::InvalidHostname),
            Some(host) => {
                let slots: &mut [u64] = if capacity == 0 {
                    &mut []
                } else {
                    // SAFETY: caller provides `capacity` writable slots.
                    unsafe { std::slice::from_raw_parts_mut(out_addresses, capacity) }
                };
                resolver.resolve_into("minilib_net_resolve_ipaddress_v4", host, slots)
            }
        }
    };

    let (total, h_errno) = match &result {
        Ok(summary) => (summary.total, 0),
        Err(NetError::Truncated { total, .. }) => (*total, 0),
        Err(err) => (0, err.h_errno().unwrap_or(0)),
    };
    if !out_total.is_null() {
        // SAFETY: non-null caller-provided out-parameter.
        unsafe { *out_total = total };
    }
    if !out_h_errno.is_null() {
        // SAFETY: non-null caller-provided out-parameter.
        unsafe { *out_h_errno = h_errno };
    }

    match result {
        Ok(_) => 0,
        Err(err) => {
            set_errno(err.errno());
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_validation() {
        assert!(matches!(validate_hostname(""), Err(NetError::InvalidHostname)));
        assert!(matches!(
            validate_hostname("bad\0host"),
            Err(NetError::InvalidHostname)
        ));
        let long = "a".repeat(MAX_HOSTNAME_LEN);
        assert!(matches!(validate_hostname(&long), Err(NetError::InvalidHostname)));
        assert_eq!(validate_hostname("example.org").unwrap().as_bytes(), b"example.org");
    }

    #[test]
    fn resolver_from_config() {
        let config = NetConfig {
            mode: RuntimeMode::Hardened,
            backend: ResolverBackend::AddrInfo,
            scratch_len: 2048,
            log: config::LogTarget::Off,
        };
        let r = Resolver::from_config(&config);
        assert_eq!(r.mode(), RuntimeMode::Hardened);
        assert_eq!(r.backend(), ResolverBackend::AddrInfo);
        assert_eq!(r.scratch_len(), 2048);
        assert_eq!(Resolver::default().with_scratch_len(1).scratch_len(), 1024);
    }

    #[test]
    fn collect_hostent_reads_addr_list() {
        let mut a = [10u8, 0, 0, 1];
        let mut b = [10u8, 0, 0, 2];
        let mut list = [
            a.as_mut_ptr().cast::<c_char>(),
            b.as_mut_ptr().cast::<c_char>(),
            ptr::null_mut(),
        ];
        // SAFETY: hostent is plain old data.
        let mut he: libc::hostent = unsafe { std::mem::zeroed() };
        he.h_addrtype = AF_INET;
        he.h_length = 4;
        he.h_addr_list = list.as_mut_ptr();
        let addrs = unsafe { collect_hostent(&he) }.unwrap();
        assert_eq!(addrs, vec![[10, 0, 0, 1], [10, 0, 0, 2]]);
    }

    #[test]
    fn collect_hostent_rejects_ipv6() {
        // SAFETY: hostent is plain old data.
        let mut he: libc::hostent = unsafe { std::mem::zeroed() };
        he.h_addrtype = libc::AF_INET6;
        he.h_length = 16;
        let err = unsafe { collect_hostent(&he) }.unwrap_err();
        assert!(matches!(err, NetError::UnsupportedFamily(f) if f == libc::AF_INET6));
    }

    #[test]
    fn slots_decode() {
        assert_eq!(
            slots_to_addrs(&[0x7f00_0001, 1 << 40, 0x0a00_0002]),
            vec![Ipv4Addr::LOCALHOST, Ipv4Addr::new(10, 0, 0, 2)]
        );
    }
}
