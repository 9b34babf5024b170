//! Shared types used across HGW crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Capabilities ───────────────────────────────────────────────────

/// The operations a worker process can perform against a target.
///
/// This is the closed capability table: every operation the scheduler can
/// launch is listed here, together with its timing characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Hack,
    Grow,
    Weaken,
}

impl ScriptKind {
    pub const ALL: [ScriptKind; 3] = [ScriptKind::Hack, ScriptKind::Grow, ScriptKind::Weaken];

    /// Operation duration relative to the target's hack time.
    pub fn duration_multiplier(self) -> f64 {
        match self {
            ScriptKind::Hack => 1.0,
            ScriptKind::Grow => 3.2,
            ScriptKind::Weaken => 4.0,
        }
    }

    /// Safety margin added to a wave's ETA before rounding.
    pub fn default_margin_ms(self) -> u64 {
        match self {
            ScriptKind::Hack => 0,
            ScriptKind::Grow => 30,
            ScriptKind::Weaken => 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKind::Hack => "hack",
            ScriptKind::Grow => "grow",
            ScriptKind::Weaken => "weaken",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ScriptKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| CoreError::UnknownScriptKind(name.to_ascii_lowercase()))
    }
}

// ── Hosts ──────────────────────────────────────────────────────────

/// Snapshot of a reachable host as reported by network discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    /// Total RAM in GB.
    pub max_ram: f64,
    /// RAM currently in use in GB.
    pub used_ram: f64,
    /// Whether we hold root on this host and may launch workers there.
    pub has_control_access: bool,
}

impl HostInfo {
    /// Number of worker threads that fit into the unused RAM.
    ///
    /// `reserve` is RAM (GB) that must stay free on this host.
    pub fn free_slots(&self, ram_per_thread: f64, reserve: f64) -> u32 {
        if ram_per_thread <= 0.0 {
            return 0;
        }
        let free = self.max_ram - self.used_ram - reserve;
        if free <= 0.0 {
            return 0;
        }
        (free / ram_per_thread).floor().min(f64::from(u32::MAX)) as u32
    }

    /// Number of worker threads worth of RAM currently in use.
    pub fn used_slots(&self, ram_per_thread: f64) -> u32 {
        if ram_per_thread <= 0.0 || self.used_ram <= 0.0 {
            return 0;
        }
        (self.used_ram / ram_per_thread).ceil().min(f64::from(u32::MAX)) as u32
    }
}

/// Identifier of a launched worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid-{}", self.0)
    }
}

/// A single worker launch, as handed to the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub kind: ScriptKind,
    /// Script file executed for this kind.
    pub script: String,
    /// Host the worker runs on.
    pub host: String,
    pub threads: u32,
    /// Server the worker operates against.
    pub target: String,
    /// Natural duration of the operation at launch time.
    pub natural_duration_ms: f64,
    /// Absolute timestamp the wave should complete at.
    pub eta_ms: u64,
    /// Extra delay the worker waits before starting its operation.
    pub delay_ms: u64,
}

// ── Target ─────────────────────────────────────────────────────────

/// Security and money readings of a target server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    pub security: f64,
    pub min_security: f64,
    pub money: f64,
    pub max_money: f64,
}

impl TargetState {
    /// Security at its floor and money at its ceiling.
    pub fn is_optimal(&self) -> bool {
        self.security <= self.min_security && self.money >= self.max_money
    }
}

// ── Run reports ────────────────────────────────────────────────────

/// Summary of one optimizer invocation against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub target: String,
    /// Whether this was a single non-blocking pass.
    pub forced: bool,
    pub iterations: u32,
    /// Total weaken threads successfully launched.
    pub weaken_threads: u64,
    /// Total grow threads successfully launched.
    pub grow_threads: u64,
    /// Threads requested but never placed on a host.
    pub residual_threads: u64,
    pub launch_failures: u32,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub final_state: TargetState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(max: f64, used: f64) -> HostInfo {
        HostInfo {
            hostname: "n00dles".to_string(),
            max_ram: max,
            used_ram: used,
            has_control_access: true,
        }
    }

    #[test]
    fn script_kind_parses_case_insensitively() {
        assert_eq!("Weaken".parse::<ScriptKind>().unwrap(), ScriptKind::Weaken);
        assert_eq!(" grow ".parse::<ScriptKind>().unwrap(), ScriptKind::Grow);
        assert!(matches!(
            "share".parse::<ScriptKind>(),
            Err(CoreError::UnknownScriptKind(_))
        ));
    }

    #[test]
    fn display_matches_table_name() {
        for kind in ScriptKind::ALL {
            assert_eq!(kind.to_string().parse::<ScriptKind>().unwrap(), kind);
        }
    }

    #[test]
    fn weaken_is_slowest_operation() {
        assert!(ScriptKind::Weaken.duration_multiplier() > ScriptKind::Grow.duration_multiplier());
        assert!(ScriptKind::Grow.duration_multiplier() > ScriptKind::Hack.duration_multiplier());
    }

    #[test]
    fn free_slots_floors_partial_threads() {
        assert_eq!(host(8.0, 0.0).free_slots(1.75, 0.0), 4);
        assert_eq!(host(8.0, 1.0).free_slots(1.75, 0.0), 4);
        assert_eq!(host(8.0, 2.0).free_slots(1.75, 0.0), 3);
    }

    #[test]
    fn free_slots_respects_reserve() {
        assert_eq!(host(32.0, 0.0).free_slots(2.0, 8.0), 12);
        assert_eq!(host(32.0, 30.0).free_slots(2.0, 8.0), 0);
    }

    #[test]
    fn free_slots_zero_for_degenerate_slot_size() {
        assert_eq!(host(32.0, 0.0).free_slots(0.0, 0.0), 0);
    }

    #[test]
    fn used_slots_rounds_up() {
        assert_eq!(host(8.0, 2.0).used_slots(1.75), 2);
        assert_eq!(host(8.0, 0.0).used_slots(1.75), 0);
    }

    #[test]
    fn optimal_requires_both_bounds() {
        let mut state = TargetState {
            security: 5.0,
            min_security: 5.0,
            money: 1000.0,
            max_money: 1000.0,
        };
        assert!(state.is_optimal());

        state.security = 5.1;
        assert!(!state.is_optimal());

        state.security = 5.0;
        state.money = 999.0;
        assert!(!state.is_optimal());
    }
}
