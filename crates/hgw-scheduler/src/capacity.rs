//! Capacity scanner — free worker slots per host.

use tracing::trace;

use hgw_core::config::SlotsConfig;

use crate::env::Environment;

/// Free worker slots on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSlots {
    pub hostname: String,
    pub free: u32,
}

impl HostSlots {
    pub fn new(hostname: impl Into<String>, free: u32) -> Self {
        Self {
            hostname: hostname.into(),
            free,
        }
    }
}

/// Hosts we can launch on, ordered by descending free slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacitySnapshot {
    pub hosts: Vec<HostSlots>,
}

impl CapacitySnapshot {
    /// Build a snapshot from raw slot counts, restoring the descending order.
    pub fn from_slots(mut hosts: Vec<HostSlots>) -> Self {
        // Stable sort keeps discovery order among equally sized hosts.
        hosts.sort_by(|a, b| b.free.cmp(&a.free));
        Self { hosts }
    }

    /// Saturates at `u32::MAX`.
    pub fn total_free(&self) -> u32 {
        self.hosts
            .iter()
            .fold(0u32, |total, h| total.saturating_add(h.free))
    }
}

/// Read every reachable host under our control and count its free slots.
pub fn scan<E: Environment>(env: &E, slots: &SlotsConfig) -> CapacitySnapshot {
    let hosts = env
        .list_reachable_hosts()
        .into_iter()
        .filter(|h| h.has_control_access)
        .map(|h| {
            let free = h.free_slots(slots.ram_per_thread, slots.reserve_for(&h.hostname));
            trace!(
                host = %h.hostname,
                free,
                used = h.used_slots(slots.ram_per_thread),
                "host capacity"
            );
            HostSlots::new(h.hostname, free)
        })
        .collect();
    CapacitySnapshot::from_slots(hosts)
}
