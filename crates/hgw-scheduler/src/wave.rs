//! Waves — coordinated batches of same-kind workers sharing one ETA.

use tracing::debug;

use hgw_core::{ProcessId, ScriptKind};

use crate::env::Environment;

/// A launched worker and the threads it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: ProcessId,
    pub threads: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveState {
    /// No live process recorded; the wave may be re-armed.
    Idle,
    /// At least one recorded process is still running.
    Running,
}

#[derive(Debug, Clone)]
pub struct Wave {
    kind: ScriptKind,
    label: String,
    eta_ms: u64,
    processes: Vec<ProcessHandle>,
}

impl Wave {
    pub fn new(kind: ScriptKind, target: &str) -> Self {
        Self {
            kind,
            label: format!("{kind} {target}"),
            eta_ms: 0,
            processes: Vec::new(),
        }
    }

    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn eta_ms(&self) -> u64 {
        self.eta_ms
    }

    pub fn processes(&self) -> &[ProcessHandle] {
        &self.processes
    }

    pub fn state(&self) -> WaveState {
        if self.processes.is_empty() {
            WaveState::Idle
        } else {
            WaveState::Running
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == WaveState::Idle
    }

    /// Threads held by the recorded processes.
    pub fn committed_threads(&self) -> u32 {
        self.processes
            .iter()
            .fold(0u32, |total, p| total.saturating_add(p.threads))
    }

    /// Drop every process the environment no longer reports as running and
    /// return the threads still committed.
    pub fn reconcile<E: Environment>(&mut self, env: &E) -> u32 {
        let before = self.processes.len();
        self.processes.retain(|p| env.is_process_live(p.pid));
        let finished = before - self.processes.len();
        if finished > 0 {
            debug!(wave = %self.label, finished, live = self.processes.len(), "wave processes finished");
        }
        self.committed_threads()
    }

    /// Start a fresh wave targeting `eta_ms`.
    pub fn rearm(&mut self, eta_ms: u64) {
        self.processes.clear();
        self.eta_ms = eta_ms;
    }

    pub fn record(&mut self, handle: ProcessHandle) {
        self.processes.push(handle);
    }
}
