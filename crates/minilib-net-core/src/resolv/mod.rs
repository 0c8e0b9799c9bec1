//! Resolver bookkeeping.
//!
//! The system resolver hands back a variable number of raw 4-byte addresses.
//! Callers supply a fixed array of `u64` slots. This module owns the copy
//! between the two: slot encoding, truncation accounting and the sizing of
//! the scratch buffer that `gethostbyname_r` needs.

use std::net::Ipv4Addr;

// ---------------------------------------------------------------------------
// h_errno
// ---------------------------------------------------------------------------

/// The specified host is unknown.
pub const HOST_NOT_FOUND: i32 = 1;
/// A temporary error occurred on an authoritative name server.
pub const TRY_AGAIN: i32 = 2;
/// A nonrecoverable name server error occurred.
pub const NO_RECOVERY: i32 = 3;
/// The name is valid but has no IP address.
pub const NO_DATA: i32 = 4;

/// Text for an `h_errno` value, matching glibc's `hstrerror`.
#[must_use]
pub fn hstrerror(code: i32) -> &'static str {
    match code {
        0 => "Resolver Error 0 (no error)",
        HOST_NOT_FOUND => "Unknown host",
        TRY_AGAIN => "Host name lookup failure",
        NO_RECOVERY => "Unknown server error",
        NO_DATA => "No address associated with name",
        _ => "Unknown resolver error",
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Longest hostname accepted from a C caller, terminator included (`NI_MAXHOST`).
pub const MAX_HOSTNAME_LEN: usize = 1025;

/// Initial scratch space handed to `gethostbyname_r`.
pub const DEFAULT_SCRATCH_LEN: usize = 64 * 1024;

/// Smallest scratch buffer worth trying.
pub const MIN_SCRATCH_LEN: usize = 1024;

/// Upper bound for scratch growth after `ERANGE`.
pub const MAX_SCRATCH_LEN: usize = 1024 * 1024;

/// Clamps a configured scratch length into `[MIN_SCRATCH_LEN, MAX_SCRATCH_LEN]`.
#[must_use]
pub fn clamp_scratch_len(len: usize) -> usize {
    len.clamp(MIN_SCRATCH_LEN, MAX_SCRATCH_LEN)
}

/// Next scratch length after the resolver reported `ERANGE`, or `None` once
/// the maximum has been tried.
#[must_use]
pub fn next_scratch_len(current: usize) -> Option<usize> {
    if current >= MAX_SCRATCH_LEN {
        return None;
    }
    Some(current.saturating_mul(2).clamp(MIN_SCRATCH_LEN, MAX_SCRATCH_LEN))
}

// ---------------------------------------------------------------------------
// Slot encoding
// ---------------------------------------------------------------------------

/// Packs an address into a caller slot: the host-order numeric value of the
/// address in the low 32 bits.
#[inline]
#[must_use]
pub fn pack_ipv4(octets: [u8; 4]) -> u64 {
    u64::from(u32::from_be_bytes(octets))
}

/// Reverses [`pack_ipv4`]. Slots with any of the upper 32 bits set are not
/// addresses.
#[inline]
#[must_use]
pub fn unpack_ipv4(slot: u64) -> Option<Ipv4Addr> {
    u32::try_from(slot).ok().map(Ipv4Addr::from)
}

// ---------------------------------------------------------------------------
// Address list
// ---------------------------------------------------------------------------

/// Outcome of copying a resolver answer into caller slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveSummary {
    /// Slots filled, never more than the caller's capacity.
    pub written: usize,
    /// Addresses the resolver returned.
    pub total: usize,
}

impl ResolveSummary {
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.total > self.written
    }

    /// Addresses that did not fit.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.total - self.written
    }
}

/// Copies addresses into a fixed slot array, counting the ones that do not fit.
///
/// Slots beyond the written prefix are left untouched.
#[derive(Debug)]
pub struct AddressListWriter<'a> {
    slots: &'a mut [u64],
    written: usize,
    total: usize,
}

impl<'a> AddressListWriter<'a> {
    pub fn new(slots: &'a mut [u64]) -> Self {
        Self {
            slots,
            written: 0,
            total: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Records one address. Returns `true` if it landed in a slot.
    pub fn push(&mut self, octets: [u8; 4]) -> bool {
        self.total += 1;
        match self.slots.get_mut(self.written) {
            Some(slot) => {
                *slot = pack_ipv4(octets);
                self.written += 1;
                true
            }
            None => false,
        }
    }

    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = [u8; 4]>,
    {
        for octets in iter {
            self.push(octets);
        }
    }

    #[must_use]
    pub fn finish(self) -> ResolveSummary {
        ResolveSummary {
            written: self.written,
            total: self.total,
        }
    }
}

/// Drops repeated addresses, keeping the first occurrence of each.
///
/// `getaddrinfo` may list an address once per matching socket type.
pub fn dedup_preserving_order(addrs: &mut Vec<[u8; 4]>) {
    let mut seen = Vec::with_capacity(addrs.len());
    addrs.retain(|a| {
        if seen.contains(a) {
            false
        } else {
            seen.push(*a);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hstrerror_known_codes() {
        assert_eq!(hstrerror(HOST_NOT_FOUND), "Unknown host");
        assert_eq!(hstrerror(TRY_AGAIN), "Host name lookup failure");
        assert_eq!(hstrerror(NO_RECOVERY), "Unknown server error");
        assert_eq!(hstrerror(NO_DATA), "No address associated with name");
        assert_eq!(hstrerror(99), "Unknown resolver error");
    }

    #[test]
    fn scratch_growth_doubles_then_stops() {
        assert_eq!(next_scratch_len(1024), Some(2048));
        assert_eq!(next_scratch_len(DEFAULT_SCRATCH_LEN), Some(128 * 1024));
        assert_eq!(next_scratch_len(MAX_SCRATCH_LEN / 2), Some(MAX_SCRATCH_LEN));
        assert_eq!(next_scratch_len(MAX_SCRATCH_LEN), None);
        assert_eq!(next_scratch_len(0), Some(MIN_SCRATCH_LEN));
    }

    #[test]
    fn scratch_clamp() {
        assert_eq!(clamp_scratch_len(0), MIN_SCRATCH_LEN);
        assert_eq!(clamp_scratch_len(4096), 4096);
        assert_eq!(clamp_scratch_len(usize::MAX), MAX_SCRATCH_LEN);
    }

    #[test]
    fn slot_encoding_is_host_order_value() {
        assert_eq!(pack_ipv4([127, 0, 0, 1]), 0x7f00_0001);
        assert_eq!(pack_ipv4([255, 255, 255, 255]), 0xffff_ffff);
        assert_eq!(unpack_ipv4(0x7f00_0001), Some(Ipv4Addr::LOCALHOST));
        assert_eq!(unpack_ipv4(1 << 32), None);
    }

    #[test]
    fn writer_fits_all() {
        let mut slots = [0u64; 4];
        let mut w = AddressListWriter::new(&mut slots);
        w.extend([[10, 0, 0, 1], [10, 0, 0, 2]]);
        let summary = w.finish();
        assert_eq!(summary, ResolveSummary { written: 2, total: 2 });
        assert!(!summary.truncated());
        assert_eq!(slots, [0x0a00_0001, 0x0a00_0002, 0, 0]);
    }

    #[test]
    fn writer_truncates_and_counts() {
        let mut slots = [u64::MAX; 2];
        let mut w = AddressListWriter::new(&mut slots);
        assert!(w.push([1, 1, 1, 1]));
        assert!(w.push([2, 2, 2, 2]));
        assert!(!w.push([3, 3, 3, 3]));
        let summary = w.finish();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.total, 3);
        assert!(summary.truncated());
        assert_eq!(summary.dropped(), 1);
        assert_eq!(slots, [0x0101_0101, 0x0202_0202]);
    }

    #[test]
    fn writer_zero_capacity() {
        let mut slots: [u64; 0] = [];
        let mut w = AddressListWriter::new(&mut slots);
        assert_eq!(w.capacity(), 0);
        w.push([8, 8, 8, 8]);
        let summary = w.finish();
        assert_eq!(summary, ResolveSummary { written: 0, total: 1 });
    }

    #[test]
    fn writer_leaves_tail_untouched() {
        let mut slots = [7u64; 3];
        let mut w = AddressListWriter::new(&mut slots);
        w.push([1, 2, 3, 4]);
        let _ = w.finish();
        assert_eq!(slots[1..], [7, 7]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut addrs = vec![[1, 1, 1, 1], [2, 2, 2, 2], [1, 1, 1, 1], [3, 3, 3, 3]];
        dedup_preserving_order(&mut addrs);
        assert_eq!(addrs, vec![[1, 1, 1, 1], [2, 2, 2, 2], [3, 3, 3, 3]]);
    }
}
