//! Wave dispatcher — launches an allocation as worker processes.
//!
//! Launches are best effort. A refused launch is logged and its threads
//! join the residual; the wave goes ahead with whatever did start.

use tracing::{debug, warn};

use hgw_core::LaunchRequest;

use crate::allocator::Allocation;
use crate::env::Environment;
use crate::eta::dispatch_delay;
use crate::wave::{ProcessHandle, Wave};

/// What one dispatch actually achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Threads running after the dispatch.
    pub launched: u32,
    /// Threads requested but not running: allocator residual plus refused launches.
    pub residual: u32,
    /// Number of refused launches.
    pub failures: u32,
}

/// Launch every assignment of `allocation` into `wave`.
///
/// Each process gets its own start delay, computed against the wave's ETA
/// at the moment it is launched.
pub fn dispatch<E: Environment>(
    env: &E,
    wave: &mut Wave,
    script: &str,
    target: &str,
    natural_duration_ms: f64,
    allocation: &Allocation,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome {
        residual: allocation.residual,
        ..DispatchOutcome::default()
    };
    let eta_ms = wave.eta_ms();

    for assignment in &allocation.assignments {
        if assignment.threads == 0 {
            continue;
        }
        let now = env.now_ms();
        let request = LaunchRequest {
            kind: wave.kind(),
            script: script.to_string(),
            host: assignment.hostname.clone(),
            threads: assignment.threads,
            target: target.to_string(),
            natural_duration_ms,
            eta_ms,
            delay_ms: dispatch_delay(eta_ms, now, natural_duration_ms),
        };

        match env.launch_worker(&request) {
            Some(pid) => {
                debug!(
                    wave = %wave.label(),
                    host = %request.host,
                    threads = request.threads,
                    delay_ms = request.delay_ms,
                    %pid,
                    "worker launched"
                );
                wave.record(ProcessHandle {
                    pid,
                    threads: request.threads,
                });
                outcome.launched += request.threads;
            }
            None => {
                warn!(
                    wave = %wave.label(),
                    host = %request.host,
                    threads = request.threads,
                    "worker launch refused, threads carried as residual"
                );
                outcome.residual += request.threads;
                outcome.failures += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Assignment;
    use crate::sim::SimulatedNetwork;
    use hgw_core::ScriptKind;

    fn allocation(parts: &[(&str, u32)], residual: u32) -> Allocation {
        Allocation {
            assignments: parts
                .iter()
                .map(|(h, t)| Assignment {
                    hostname: h.to_string(),
                    threads: *t,
                })
                .collect(),
            residual,
        }
    }

    fn env() -> SimulatedNetwork {
        SimulatedNetwork::new(10_000, 1.0)
            .with_host("home", 64.0, 0.0)
            .with_host("foodnstuff", 16.0, 0.0)
            .with_target("n00dles", 1_000.0, 10.0, 1.0, 0.0, 1_000.0)
    }

    #[test]
    fn launches_each_assignment_with_wave_arguments() {
        let env = env();
        let mut wave = Wave::new(ScriptKind::Weaken, "n00dles");
        wave.rearm(14_100);

        let outcome = dispatch(
            &env,
            &mut wave,
            "/hgw/weaken.js",
            "n00dles",
            4_000.0,
            &allocation(&[("home", 30), ("foodnstuff", 10)], 0),
        );

        assert_eq!(outcome, DispatchOutcome { launched: 40, residual: 0, failures: 0 });
        assert_eq!(wave.committed_threads(), 40);

        let launches = env.launches();
        assert_eq!(launches.len(), 2);
        for l in &launches {
            assert_eq!(l.kind, ScriptKind::Weaken);
            assert_eq!(l.target, "n00dles");
            assert_eq!(l.eta_ms, 14_100);
            assert_eq!(l.natural_duration_ms, 4_000.0);
            assert_eq!(l.delay_ms, 100);
        }
        assert_eq!(launches[0].host, "home");
        assert_eq!(launches[0].threads, 30);
    }

    #[test]
    fn refused_launch_becomes_residual() {
        let env = env().failing_launches_on("foodnstuff");
        let mut wave = Wave::new(ScriptKind::Grow, "n00dles");
        wave.rearm(13_300);

        let outcome = dispatch(
            &env,
            &mut wave,
            "/hgw/grow.js",
            "n00dles",
            3_200.0,
            &allocation(&[("home", 20), ("foodnstuff", 6)], 4),
        );

        assert_eq!(outcome, DispatchOutcome { launched: 20, residual: 10, failures: 1 });
        assert_eq!(wave.processes().len(), 1);
    }

    #[test]
    fn unknown_host_does_not_abort_wave() {
        let env = env();
        let mut wave = Wave::new(ScriptKind::Grow, "n00dles");
        wave.rearm(13_300);

        let outcome = dispatch(
            &env,
            &mut wave,
            "/hgw/grow.js",
            "n00dles",
            3_200.0,
            &allocation(&[("ghost", 5), ("home", 5)], 0),
        );

        assert_eq!(outcome.launched, 5);
        assert_eq!(outcome.residual, 5);
        assert_eq!(outcome.failures, 1);
    }

    #[test]
    fn late_wave_gets_zero_delay() {
        let env = env();
        let mut wave = Wave::new(ScriptKind::Weaken, "n00dles");
        wave.rearm(12_000);

        dispatch(
            &env,
            &mut wave,
            "/hgw/weaken.js",
            "n00dles",
            4_000.0,
            &allocation(&[("home", 1)], 0),
        );

        assert_eq!(env.launches()[0].delay_ms, 0);
    }
}
