//! Simulated network — a deterministic [`Environment`] on a virtual clock.
//!
//! Used by the CLI dry run and by tests. `sleep` advances the clock
//! instead of waiting, completing every process whose finish time has
//! passed. The effects applied on completion are deliberately simple
//! (linear weaken/grow) and are not a model of any real game formula.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use hgw_core::config::{SimTargetConfig, SimulationConfig};
use hgw_core::{HostInfo, LaunchRequest, ProcessId, ScriptKind, TargetState};

use crate::env::Environment;

/// Security removed per completed weaken thread.
const WEAKEN_PER_THREAD: f64 = 0.05;
/// Security added per completed grow thread.
const GROW_SECURITY_PER_THREAD: f64 = 0.002;
/// Security added per completed hack thread.
const HACK_SECURITY_PER_THREAD: f64 = 0.002;

#[derive(Debug, Clone)]
struct SimHost {
    max_ram: f64,
    used_ram: f64,
    rooted: bool,
}

#[derive(Debug, Clone)]
struct SimTarget {
    hack_time_ms: f64,
    state: TargetState,
    growth_per_thread: f64,
}

#[derive(Debug, Clone)]
struct SimProcess {
    kind: ScriptKind,
    host: String,
    target: String,
    threads: u32,
    ram: f64,
    finishes_at: u64,
}

#[derive(Debug)]
struct SimState {
    now_ms: u64,
    ram_per_thread: f64,
    hosts: BTreeMap<String, SimHost>,
    targets: BTreeMap<String, SimTarget>,
    processes: BTreeMap<ProcessId, SimProcess>,
    next_pid: u64,
    failing_hosts: HashSet<String>,
    launches: Vec<LaunchRequest>,
    sleeps: Vec<u64>,
}

pub struct SimulatedNetwork {
    inner: Mutex<SimState>,
}

impl SimulatedNetwork {
    pub fn new(start_ms: u64, ram_per_thread: f64) -> Self {
        Self {
            inner: Mutex::new(SimState {
                now_ms: start_ms,
                ram_per_thread,
                hosts: BTreeMap::new(),
                targets: BTreeMap::new(),
                processes: BTreeMap::new(),
                next_pid: 1,
                failing_hosts: HashSet::new(),
                launches: Vec::new(),
                sleeps: Vec::new(),
            }),
        }
    }

    /// Build a network from the `[simulation]` config section.
    pub fn from_config(config: &SimulationConfig, ram_per_thread: f64) -> Self {
        let mut sim = Self::new(config.start_ms, ram_per_thread);
        for host in &config.hosts {
            sim = sim.insert_host(&host.hostname, host.max_ram, host.used_ram, host.rooted);
        }
        for target in &config.targets {
            sim = sim.with_target_config(target);
        }
        sim
    }

    pub fn with_host(self, hostname: &str, max_ram: f64, used_ram: f64) -> Self {
        self.insert_host(hostname, max_ram, used_ram, true)
    }

    /// A host discovery can see but we have no root on.
    pub fn with_locked_host(self, hostname: &str, max_ram: f64) -> Self {
        self.insert_host(hostname, max_ram, 0.0, false)
    }

    pub fn with_target(
        self,
        hostname: &str,
        hack_time_ms: f64,
        security: f64,
        min_security: f64,
        money: f64,
        max_money: f64,
    ) -> Self {
        self.with_target_config(&SimTargetConfig {
            hostname: hostname.to_string(),
            hack_time_ms,
            security,
            min_security,
            money,
            max_money,
            growth_per_thread: 1_000.0,
        })
    }

    pub fn with_target_config(self, target: &SimTargetConfig) -> Self {
        self.lock().targets.insert(
            target.hostname.clone(),
            SimTarget {
                hack_time_ms: target.hack_time_ms,
                state: TargetState {
                    security: target.security,
                    min_security: target.min_security,
                    money: target.money,
                    max_money: target.max_money,
                },
                growth_per_thread: target.growth_per_thread,
            },
        );
        self
    }

    /// Refuse every launch on `hostname`.
    pub fn failing_launches_on(self, hostname: &str) -> Self {
        self.lock().failing_hosts.insert(hostname.to_string());
        self
    }

    fn insert_host(self, hostname: &str, max_ram: f64, used_ram: f64, rooted: bool) -> Self {
        self.lock().hosts.insert(
            hostname.to_string(),
            SimHost {
                max_ram,
                used_ram,
                rooted,
            },
        );
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock only happens inside a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Inspection ─────────────────────────────────────────────────

    /// Every accepted launch, in order.
    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.lock().launches.clone()
    }

    /// Every wait requested through [`Environment::sleep`], in order.
    pub fn sleeps(&self) -> Vec<u64> {
        self.lock().sleeps.clone()
    }

    pub fn live_processes(&self) -> usize {
        self.lock().processes.len()
    }

    /// Overwrite a target's readings.
    pub fn set_target_state(&self, hostname: &str, state: TargetState) {
        if let Some(target) = self.lock().targets.get_mut(hostname) {
            target.state = state;
        }
    }

    /// Terminate a process without applying its effect.
    pub fn kill(&self, pid: ProcessId) -> bool {
        let mut state = self.lock();
        match state.processes.remove(&pid) {
            Some(process) => {
                release_ram(&mut state, &process);
                true
            }
            None => false,
        }
    }

    // ── Clock ──────────────────────────────────────────────────────

    /// Move the clock forward, completing processes in finish order.
    pub fn advance(&self, ms: u64) {
        let mut state = self.lock();
        let until = state.now_ms + ms;

        let mut due: Vec<(ProcessId, SimProcess)> = state
            .processes
            .iter()
            .filter(|(_, p)| p.finishes_at <= until)
            .map(|(pid, p)| (*pid, p.clone()))
            .collect();
        // Same-tick completions land hack, then grow, then weaken.
        due.sort_by_key(|(pid, p)| (p.finishes_at, kind_rank(p.kind), *pid));

        for (pid, process) in due {
            state.processes.remove(&pid);
            state.now_ms = process.finishes_at.max(state.now_ms);
            release_ram(&mut state, &process);
            apply_effect(&mut state, &process);
            trace!(%pid, kind = %process.kind, target = %process.target, "process finished");
        }
        state.now_ms = until;
    }
}

fn kind_rank(kind: ScriptKind) -> u8 {
    match kind {
        ScriptKind::Hack => 0,
        ScriptKind::Grow => 1,
        ScriptKind::Weaken => 2,
    }
}

fn release_ram(state: &mut SimState, process: &SimProcess) {
    if let Some(host) = state.hosts.get_mut(&process.host) {
        host.used_ram = (host.used_ram - process.ram).max(0.0);
    }
}

fn apply_effect(state: &mut SimState, process: &SimProcess) {
    let Some(target) = state.targets.get_mut(&process.target) else {
        return;
    };
    let threads = f64::from(process.threads);
    let s = &mut target.state;
    match process.kind {
        ScriptKind::Weaken => {
            s.security = (s.security - WEAKEN_PER_THREAD * threads).max(s.min_security);
        }
        ScriptKind::Grow => {
            s.money = (s.money + target.growth_per_thread * threads).min(s.max_money);
            s.security += GROW_SECURITY_PER_THREAD * threads;
        }
        ScriptKind::Hack => {
            s.money = (s.money * (1.0 - 0.01 * threads).max(0.0)).max(0.0);
            s.security += HACK_SECURITY_PER_THREAD * threads;
        }
    }
}

impl Environment for SimulatedNetwork {
    fn now_ms(&self) -> u64 {
        self.lock().now_ms
    }

    fn list_reachable_hosts(&self) -> Vec<HostInfo> {
        self.lock()
            .hosts
            .iter()
            .map(|(name, h)| HostInfo {
                hostname: name.clone(),
                max_ram: h.max_ram,
                used_ram: h.used_ram,
                has_control_access: h.rooted,
            })
            .collect()
    }

    fn server_exists(&self, hostname: &str) -> bool {
        let state = self.lock();
        state.hosts.contains_key(hostname) || state.targets.contains_key(hostname)
    }

    fn operation_duration(&self, target: &str, kind: ScriptKind) -> f64 {
        self.lock()
            .targets
            .get(target)
            .map(|t| t.hack_time_ms * kind.duration_multiplier())
            .unwrap_or(0.0)
    }

    fn launch_worker(&self, request: &LaunchRequest) -> Option<ProcessId> {
        let mut state = self.lock();
        if request.threads == 0 || state.failing_hosts.contains(&request.host) {
            return None;
        }
        let ram = state.ram_per_thread * f64::from(request.threads);
        let host = state.hosts.get_mut(&request.host)?;
        if !host.rooted || host.max_ram - host.used_ram < ram {
            return None;
        }
        host.used_ram += ram;

        let pid = ProcessId(state.next_pid);
        state.next_pid += 1;
        let finishes_at =
            state.now_ms + request.delay_ms + request.natural_duration_ms.max(0.0).ceil() as u64;
        state.processes.insert(
            pid,
            SimProcess {
                kind: request.kind,
                host: request.host.clone(),
                target: request.target.clone(),
                threads: request.threads,
                ram,
                finishes_at,
            },
        );
        state.launches.push(request.clone());
        Some(pid)
    }

    fn is_process_live(&self, pid: ProcessId) -> bool {
        self.lock().processes.contains_key(&pid)
    }

    fn target_state(&self, target: &str) -> TargetState {
        self.lock()
            .targets
            .get(target)
            .map(|t| t.state)
            .unwrap_or(TargetState {
                security: 0.0,
                min_security: 0.0,
                money: 0.0,
                max_money: 0.0,
            })
    }

    fn sleep(&self, ms: u64) -> impl Future<Output = ()> {
        async move {
            self.lock().sleeps.push(ms);
            self.advance(ms);
            tokio::task::yield_now().await;
        }
    }
}
