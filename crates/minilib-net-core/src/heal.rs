//! Healing counters.
//!
//! In hardened mode a request the helpers can only partially satisfy is
//! repaired rather than rejected. Each repair is recorded here so callers and
//! the CLI can report how often it happened.

use std::sync::atomic::{AtomicU64, Ordering};

/// A repair applied instead of returning an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealingAction {
    /// The resolver answer did not fit the caller's slots.
    TruncateAddressList { total: usize, written: usize },
    /// `listen` backlog was outside `[0, SOMAXCONN]`.
    ClampBacklog { requested: i32, clamped: i32 },
    /// A safe default was used in place of an invalid argument.
    ReturnSafeDefault,
    /// No healing needed.
    None,
}

impl HealingAction {
    #[must_use]
    pub const fn is_heal(&self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TruncateAddressList { .. } => "truncate_address_list",
            Self::ClampBacklog { .. } => "clamp_backlog",
            Self::ReturnSafeDefault => "return_safe_default",
            Self::None => "none",
        }
    }
}

/// Counters of applied healing actions.
pub struct HealingPolicy {
    pub total_heals: AtomicU64,
    pub address_truncations: AtomicU64,
    pub backlog_clamps: AtomicU64,
    pub safe_defaults: AtomicU64,
}

/// Point-in-time copy of [`HealingPolicy`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealingSnapshot {
    pub total_heals: u64,
    pub address_truncations: u64,
    pub backlog_clamps: u64,
    pub safe_defaults: u64,
}

impl HealingPolicy {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total_heals: AtomicU64::new(0),
            address_truncations: AtomicU64::new(0),
            backlog_clamps: AtomicU64::new(0),
            safe_defaults: AtomicU64::new(0),
        }
    }

    pub fn record(&self, action: &HealingAction) {
        if action.is_heal() {
            self.total_heals.fetch_add(1, Ordering::Relaxed);
        }

        match action {
            HealingAction::TruncateAddressList { .. } => {
                self.address_truncations.fetch_add(1, Ordering::Relaxed);
            }
            HealingAction::ClampBacklog { .. } => {
                self.backlog_clamps.fetch_add(1, Ordering::Relaxed);
            }
            HealingAction::ReturnSafeDefault => {
                self.safe_defaults.fetch_add(1, Ordering::Relaxed);
            }
            HealingAction::None => {}
        }
    }

    /// Healing for a resolver answer copied into `capacity` slots.
    #[must_use]
    pub fn heal_address_list(&self, total: usize, capacity: usize) -> HealingAction {
        if total > capacity {
            HealingAction::TruncateAddressList {
                total,
                written: capacity,
            }
        } else {
            HealingAction::None
        }
    }

    /// Healing for a `listen` backlog.
    #[must_use]
    pub fn heal_backlog(&self, requested: i32, clamped: i32) -> HealingAction {
        if requested != clamped {
            HealingAction::ClampBacklog { requested, clamped }
        } else {
            HealingAction::None
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> HealingSnapshot {
        HealingSnapshot {
            total_heals: self.total_heals.load(Ordering::Relaxed),
            address_truncations: self.address_truncations.load(Ordering::Relaxed),
            backlog_clamps: self.backlog_clamps.load(Ordering::Relaxed),
            safe_defaults: self.safe_defaults.load(Ordering::Relaxed),
        }
    }
}

impl Default for HealingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_POLICY: HealingPolicy = HealingPolicy::new();

/// The process-wide healing counters.
pub fn global_healing_policy() -> &'static HealingPolicy {
    &GLOBAL_POLICY
}
