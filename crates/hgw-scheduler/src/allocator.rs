//! Thread allocator — splits the slot pool between waves and hands out
//! threads host by host.
//!
//! Grow fills the biggest hosts first so large contiguous blocks go to the
//! operation that benefits from them; weaken walks the same list backwards
//! and soaks up the fragments grow left behind.

use tracing::debug;

use crate::capacity::HostSlots;

/// Weaken receives one thread in this many.
const WEAKEN_SHARE_DIVISOR: u32 = 10;

/// Thread counts for one weaken/grow pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSplit {
    pub weaken: u32,
    pub grow: u32,
}

impl ThreadSplit {
    /// `weaken = ceil(total / 10)`, `grow = total - weaken`.
    pub fn from_total(total: u32) -> Self {
        let weaken = total.div_ceil(WEAKEN_SHARE_DIVISOR);
        Self {
            weaken,
            grow: total - weaken,
        }
    }

    pub fn total(&self) -> u32 {
        self.weaken + self.grow
    }
}

/// Direction in which hosts are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOrder {
    /// Front to back of a descending list.
    LargestFirst,
    /// Back to front of a descending list.
    SmallestFirst,
}

/// Threads assigned to one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub hostname: String,
    pub threads: u32,
}

/// Result of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    pub assignments: Vec<Assignment>,
    /// Threads that found no host.
    pub residual: u32,
}

impl Allocation {
    pub fn assigned(&self) -> u32 {
        self.assignments.iter().map(|a| a.threads).sum()
    }
}

/// Assign `threads` across `hosts`, consuming their free slots.
///
/// `hosts` is expected in descending free-slot order. Each host's `free`
/// count is reduced by what it receives, so a later call on the same slice
/// only sees what is left. Hosts with no free slots are skipped.
pub fn allocate(hosts: &mut [HostSlots], threads: u32, order: FillOrder) -> Allocation {
    let mut remaining = threads;
    let mut assignments = Vec::new();

    let mut assign = |host: &mut HostSlots| {
        if remaining == 0 || host.free == 0 {
            return;
        }
        let take = remaining.min(host.free);
        host.free -= take;
        remaining -= take;
        debug!(host = %host.hostname, threads = take, "threads assigned");
        assignments.push(Assignment {
            hostname: host.hostname.clone(),
            threads: take,
        });
    };

    match order {
        FillOrder::LargestFirst => hosts.iter_mut().for_each(&mut assign),
        FillOrder::SmallestFirst => hosts.iter_mut().rev().for_each(&mut assign),
    }

    Allocation {
        assignments,
        residual: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(free: &[(&str, u32)]) -> Vec<HostSlots> {
        free.iter().map(|(n, f)| HostSlots::new(*n, *f)).collect()
    }

    #[test]
    fn split_of_hundred_is_ten_ninety() {
        assert_eq!(ThreadSplit::from_total(100), ThreadSplit { weaken: 10, grow: 90 });
    }

    #[test]
    fn split_always_sums_to_total() {
        for total in 0..=1_000 {
            let split = ThreadSplit::from_total(total);
            assert_eq!(split.total(), total);
            assert_eq!(split.weaken, total.div_ceil(10));
        }
    }

    #[test]
    fn split_of_small_pools_favours_weaken() {
        assert_eq!(ThreadSplit::from_total(1), ThreadSplit { weaken: 1, grow: 0 });
        assert_eq!(ThreadSplit::from_total(11), ThreadSplit { weaken: 2, grow: 9 });
        assert_eq!(ThreadSplit::from_total(0), ThreadSplit { weaken: 0, grow: 0 });
    }

    #[test]
    fn grow_fills_largest_hosts_first() {
        // Discovery order [50, 30, 0, 20], sorted descending by the scanner.
        let mut pool = hosts(&[("a", 50), ("b", 30), ("d", 20), ("c", 0)]);
        let alloc = allocate(&mut pool, 70, FillOrder::LargestFirst);

        assert_eq!(
            alloc.assignments,
            vec![
                Assignment { hostname: "a".into(), threads: 50 },
                Assignment { hostname: "b".into(), threads: 20 },
            ]
        );
        assert_eq!(alloc.residual, 0);
        assert_eq!(pool[1].free, 10);
    }

    #[test]
    fn weaken_fills_smallest_hosts_first() {
        let mut pool = hosts(&[("a", 50), ("b", 30), ("c", 5), ("d", 0)]);
        let alloc = allocate(&mut pool, 10, FillOrder::SmallestFirst);

        assert_eq!(
            alloc.assignments,
            vec![
                Assignment { hostname: "c".into(), threads: 5 },
                Assignment { hostname: "b".into(), threads: 5 },
            ]
        );
        assert_eq!(alloc.residual, 0);
    }

    #[test]
    fn shortfall_becomes_residual() {
        let mut pool = hosts(&[("a", 4), ("b", 3)]);
        let alloc = allocate(&mut pool, 10, FillOrder::LargestFirst);

        assert_eq!(alloc.assigned(), 7);
        assert_eq!(alloc.residual, 3);
        assert!(pool.iter().all(|h| h.free == 0));
    }

    #[test]
    fn never_exceeds_host_free_slots_and_conserves_threads() {
        let initial = [("a", 17), ("b", 9), ("c", 9), ("d", 1), ("e", 0)];
        for requested in [0, 1, 9, 18, 35, 36, 100] {
            for order in [FillOrder::LargestFirst, FillOrder::SmallestFirst] {
                let mut pool = hosts(&initial);
                let alloc = allocate(&mut pool, requested, order);

                for a in &alloc.assignments {
                    let (_, free) = initial.iter().find(|(n, _)| *n == a.hostname).unwrap();
                    assert!(a.threads <= *free);
                    assert!(a.threads > 0);
                }
                assert_eq!(alloc.assigned() + alloc.residual, requested);
            }
        }
    }

    #[test]
    fn second_pass_sees_remaining_capacity() {
        let mut pool = hosts(&[("big", 90), ("mid", 12), ("small", 3)]);
        let split = ThreadSplit::from_total(105);

        let grow = allocate(&mut pool, split.grow, FillOrder::LargestFirst);
        let weaken = allocate(&mut pool, split.weaken, FillOrder::SmallestFirst);

        assert_eq!(grow.residual, 0);
        assert_eq!(weaken.residual, 0);
        assert_eq!(weaken.assignments[0].hostname, "small");
        assert!(pool.iter().all(|h| h.free == 0));
    }
}
