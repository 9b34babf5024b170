//! The environment the scheduler drives.
//!
//! Everything the scheduler knows about the network comes through this
//! trait: capacity, operation durations, target readings, process
//! liveness, and the launch primitive itself. The scheduler never mutates
//! host state directly.

use std::future::Future;

use hgw_core::{HostInfo, LaunchRequest, ProcessId, ScriptKind, TargetState};

pub trait Environment {
    /// Current wall-clock time, epoch milliseconds.
    fn now_ms(&self) -> u64;

    /// Every host discovery can reach, with capacity figures.
    fn list_reachable_hosts(&self) -> Vec<HostInfo>;

    fn server_exists(&self, hostname: &str) -> bool;

    /// Natural duration of `kind` against `target` right now, in ms.
    fn operation_duration(&self, target: &str, kind: ScriptKind) -> f64;

    /// Launch one worker process with `request.threads` threads.
    ///
    /// Returns `None` when the launch is refused.
    fn launch_worker(&self, request: &LaunchRequest) -> Option<ProcessId>;

    fn is_process_live(&self, pid: ProcessId) -> bool;

    fn target_state(&self, target: &str) -> TargetState;

    /// Suspend the caller for `ms` milliseconds.
    fn sleep(&self, ms: u64) -> impl Future<Output = ()>;
}
