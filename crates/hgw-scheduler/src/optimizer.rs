//! Optimizer — drives a target to minimum security and maximum money.
//!
//! Each pass of the convergence loop:
//!
//! ```text
//! reconcile waves ─▶ scan capacity ─▶ split slots 1:9 ─▶ for each idle wave:
//!                                                          new ETA, allocate, dispatch
//! ```
//!
//! then sleeps until the nearest upcoming ETA (capped by the poll
//! interval). A running wave is never re-dispatched; its threads count as
//! reserved capacity when the pool is split.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use hgw_core::{HgwConfig, OptimizeReport, ScriptKind};

use crate::allocator::{self, FillOrder, ThreadSplit};
use crate::capacity;
use crate::dispatcher::{self, DispatchOutcome};
use crate::env::Environment;
use crate::error::{SchedulerError, SchedulerResult};
use crate::eta;
use crate::wave::Wave;

/// How far a call to [`Optimizer::run`] goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Loop until the target is optimal, then drain in-flight waves.
    Converge,
    /// One allocation pass, no waiting.
    ForceRun,
}

/// The pair of waves kept for one target across calls.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub weaken: Wave,
    pub grow: Wave,
}

impl Campaign {
    fn new(target: &str) -> Self {
        Self {
            weaken: Wave::new(ScriptKind::Weaken, target),
            grow: Wave::new(ScriptKind::Grow, target),
        }
    }

    /// ETAs of waves with processes recorded. An armed wave that launched
    /// nothing has nothing to wait for.
    fn in_flight_etas(&self) -> impl Iterator<Item = u64> {
        [&self.weaken, &self.grow]
            .into_iter()
            .filter(|wave| !wave.is_idle())
            .map(|wave| wave.eta_ms())
    }

    /// Latest ETA of the waves in flight.
    pub fn latest_eta(&self) -> Option<u64> {
        self.in_flight_etas().max()
    }

    /// Nearest in-flight ETA strictly after `now_ms`, if any.
    pub fn next_eta_after(&self, now_ms: u64) -> Option<u64> {
        self.in_flight_etas().filter(|eta| *eta > now_ms).min()
    }
}

/// Running totals for one call.
#[derive(Debug, Default)]
struct Tally {
    weaken_threads: u64,
    grow_threads: u64,
    residual_threads: u64,
    launch_failures: u32,
}

impl Tally {
    fn add(&mut self, kind: ScriptKind, outcome: DispatchOutcome) {
        match kind {
            ScriptKind::Weaken => self.weaken_threads += u64::from(outcome.launched),
            ScriptKind::Grow => self.grow_threads += u64::from(outcome.launched),
            ScriptKind::Hack => {}
        }
        self.residual_threads += u64::from(outcome.residual);
        self.launch_failures += outcome.failures;
    }
}

pub struct Optimizer<E> {
    env: E,
    config: HgwConfig,
    campaigns: HashMap<String, Campaign>,
}

impl<E: Environment> Optimizer<E> {
    pub fn new(env: E, config: HgwConfig) -> SchedulerResult<Self> {
        config.validate()?;
        Ok(Self {
            env,
            config,
            campaigns: HashMap::new(),
        })
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn config(&self) -> &HgwConfig {
        &self.config
    }

    /// Waves currently tracked for `target`.
    pub fn campaign(&self, target: &str) -> Option<&Campaign> {
        self.campaigns.get(target)
    }

    /// Loop until `target` is at minimum security and maximum money.
    pub async fn optimize(&mut self, target: &str) -> SchedulerResult<OptimizeReport> {
        self.run(target, RunMode::Converge).await
    }

    /// Soak up idle capacity with one pass and return immediately.
    pub async fn force_run(&mut self, target: &str) -> SchedulerResult<OptimizeReport> {
        self.run(target, RunMode::ForceRun).await
    }

    pub async fn run(&mut self, target: &str, mode: RunMode) -> SchedulerResult<OptimizeReport> {
        let Self {
            env,
            config,
            campaigns,
        } = self;

        if !env.server_exists(target) {
            return Err(SchedulerError::TargetNotFound(target.to_string()));
        }

        let started_at_ms = env.now_ms();
        let campaign = campaigns
            .entry(target.to_string())
            .or_insert_with(|| Campaign::new(target));
        let mut tally = Tally::default();
        let mut iterations: u32 = 0;

        info!(%target, ?mode, "optimizing target");

        match mode {
            RunMode::ForceRun => {
                run_pass(env, config, campaign, target, &mut tally);
                iterations = 1;
            }
            RunMode::Converge => {
                loop {
                    let state = env.target_state(target);
                    if state.is_optimal() {
                        debug!(%target, iterations, "target reached optimal bounds");
                        break;
                    }
                    if config
                        .timing
                        .max_iterations
                        .is_some_and(|max| iterations >= max)
                    {
                        warn!(%target, iterations, "iteration limit reached before convergence");
                        break;
                    }

                    run_pass(env, config, campaign, target, &mut tally);
                    iterations += 1;

                    let wait = next_wait(campaign, env.now_ms(), config);
                    debug!(
                        %target,
                        security = state.security,
                        min_security = state.min_security,
                        money = state.money,
                        max_money = state.max_money,
                        wait_ms = wait,
                        "waiting for next wave"
                    );
                    env.sleep(wait).await;
                }

                // Let in-flight waves land before reporting.
                let drain = campaign
                    .latest_eta()
                    .map_or(0, |eta| eta.saturating_sub(env.now_ms()));
                debug!(%target, drain_ms = drain, "draining in-flight waves");
                env.sleep(drain).await;
            }
        }

        let final_state = env.target_state(target);
        let report = OptimizeReport {
            target: target.to_string(),
            forced: mode == RunMode::ForceRun,
            iterations,
            weaken_threads: tally.weaken_threads,
            grow_threads: tally.grow_threads,
            residual_threads: tally.residual_threads,
            launch_failures: tally.launch_failures,
            started_at_ms,
            finished_at_ms: env.now_ms(),
            final_state,
        };

        info!(
            %target,
            iterations,
            weaken_threads = report.weaken_threads,
            grow_threads = report.grow_threads,
            residual = report.residual_threads,
            failures = report.launch_failures,
            optimal = final_state.is_optimal(),
            "optimization finished"
        );
        Ok(report)
    }
}

/// One scan → calculate → allocate → dispatch pass.
fn run_pass<E: Environment>(
    env: &E,
    config: &HgwConfig,
    campaign: &mut Campaign,
    target: &str,
    tally: &mut Tally,
) {
    // Prune processes that ended, including ones that died early.
    let weaken_live = campaign.weaken.reconcile(env);
    let grow_live = campaign.grow.reconcile(env);

    let mut snapshot = capacity::scan(env, &config.slots);
    let free = snapshot.total_free();
    let split = ThreadSplit::from_total(free.saturating_add(weaken_live).saturating_add(grow_live));
    debug!(
        %target,
        free,
        weaken_live,
        grow_live,
        weaken = split.weaken,
        grow = split.grow,
        "slot pool split"
    );

    let now = env.now_ms();
    let hack_time = env.operation_duration(target, ScriptKind::Hack);

    // Grow first: it takes the large hosts, weaken gets the fragments.
    let waves = [
        (&mut campaign.grow, split.grow, FillOrder::LargestFirst),
        (&mut campaign.weaken, split.weaken, FillOrder::SmallestFirst),
    ];
    for (wave, threads, order) in waves {
        if !wave.is_idle() {
            continue;
        }
        let kind = wave.kind();
        let eta_ms = eta::wave_eta(now, hack_time, kind, &config.timing);
        wave.rearm(eta_ms);

        let allocation = allocator::allocate(&mut snapshot.hosts, threads, order);
        let natural = env.operation_duration(target, kind);
        let outcome = dispatcher::dispatch(
            env,
            wave,
            config.workers.script_for(kind),
            target,
            natural,
            &allocation,
        );
        info!(
            wave = %wave.label(),
            eta_ms,
            requested = threads,
            launched = outcome.launched,
            residual = outcome.residual,
            "wave armed"
        );
        tally.add(kind, outcome);
    }
}

/// Time until the nearest upcoming ETA, capped by the poll interval.
fn next_wait(campaign: &Campaign, now_ms: u64, config: &HgwConfig) -> u64 {
    match campaign.next_eta_after(now_ms) {
        Some(eta) => (eta - now_ms).min(config.timing.max_poll_interval_ms),
        None => {
            warn!(
                weaken_eta = campaign.weaken.eta_ms(),
                grow_eta = campaign.grow.eta_ms(),
                now_ms,
                "no wave ETA ahead, using fallback wait"
            );
            config.timing.fallback_wait_ms
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedNetwork;
    use crate::wave::ProcessHandle;
    use hgw_core::{ProcessId, TargetState};

    const START: u64 = 1_000_000;

    fn config() -> HgwConfig {
        let mut config = HgwConfig::default();
        config.slots.ram_per_thread = 1.0;
        config.timing.max_iterations = Some(500);
        config
    }

    fn optimal() -> TargetState {
        TargetState {
            security: 1.0,
            min_security: 1.0,
            money: 100_000.0,
            max_money: 100_000.0,
        }
    }

    fn network() -> SimulatedNetwork {
        SimulatedNetwork::new(START, 1.0)
            .with_host("home", 70.0, 0.0)
            .with_host("foodnstuff", 30.0, 0.0)
            .with_target("n00dles", 1_000.0, 3.0, 1.0, 0.0, 100_000.0)
    }

    #[tokio::test]
    async fn unknown_target_is_fatal() {
        let mut optimizer = Optimizer::new(network(), config()).unwrap();
        let result = optimizer.optimize("nowhere").await;
        assert!(matches!(result, Err(SchedulerError::TargetNotFound(_))));
        assert!(optimizer.env().launches().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.timing.rounding_ms = 0;
        assert!(matches!(
            Optimizer::new(network(), config),
            Err(SchedulerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn force_run_dispatches_once_without_waiting() {
        let mut optimizer = Optimizer::new(network(), config()).unwrap();
        let report = optimizer.force_run("n00dles").await.unwrap();

        assert!(report.forced);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.weaken_threads, 10);
        assert_eq!(report.grow_threads, 90);
        assert_eq!(report.residual_threads, 0);
        assert!(optimizer.env().sleeps().is_empty());
        assert_eq!(optimizer.env().now_ms(), START);
    }

    #[tokio::test]
    async fn force_run_treats_running_waves_as_reserved() {
        let mut optimizer = Optimizer::new(network(), config()).unwrap();
        optimizer.force_run("n00dles").await.unwrap();
        let second = optimizer.force_run("n00dles").await.unwrap();

        assert_eq!(second.weaken_threads, 0);
        assert_eq!(second.grow_threads, 0);
        assert_eq!(optimizer.env().launches().len(), 3);
    }

    #[tokio::test]
    async fn force_run_fills_small_hosts_with_weaken() {
        let mut optimizer = Optimizer::new(network(), config()).unwrap();
        optimizer.force_run("n00dles").await.unwrap();

        let launches = optimizer.env().launches();
        // Grow: 70 on home, 20 on foodnstuff. Weaken: remaining 10 on foodnstuff.
        let grow: Vec<(&str, u32)> = launches
            .iter()
            .filter(|l| l.kind == ScriptKind::Grow)
            .map(|l| (l.host.as_str(), l.threads))
            .collect();
        assert_eq!(grow, vec![("home", 70), ("foodnstuff", 20)]);

        let weaken: Vec<(&str, u32)> = launches
            .iter()
            .filter(|l| l.kind == ScriptKind::Weaken)
            .map(|l| (l.host.as_str(), l.threads))
            .collect();
        assert_eq!(weaken, vec![("foodnstuff", 10)]);
    }

    #[tokio::test]
    async fn waves_target_rounded_etas() {
        let mut optimizer = Optimizer::new(network(), config()).unwrap();
        optimizer.force_run("n00dles").await.unwrap();

        for launch in optimizer.env().launches() {
            let expected = match launch.kind {
                ScriptKind::Grow => START + 3_300,
                ScriptKind::Weaken => START + 4_100,
                ScriptKind::Hack => unreachable!(),
            };
            assert_eq!(launch.eta_ms, expected);
            assert_eq!(launch.delay_ms, 100);
        }
    }

    #[tokio::test]
    async fn already_optimal_target_only_drains() {
        let env = network();
        env.set_target_state("n00dles", optimal());
        let mut optimizer = Optimizer::new(env, config()).unwrap();

        let report = optimizer.optimize("n00dles").await.unwrap();
        assert_eq!(report.iterations, 0);
        assert!(optimizer.env().launches().is_empty());
        assert_eq!(optimizer.env().sleeps(), vec![0]);
        assert!(report.final_state.is_optimal());
    }

    #[tokio::test]
    async fn loop_stops_on_first_optimal_reading() {
        let mut optimizer = Optimizer::new(network(), config()).unwrap();
        optimizer.force_run("n00dles").await.unwrap();

        // The stub flips to optimal before the loop's first check.
        optimizer.env().set_target_state("n00dles", optimal());
        let report = optimizer.optimize("n00dles").await.unwrap();

        assert_eq!(report.iterations, 0);
        // Drain waits for the weaken wave from the forced pass.
        assert_eq!(optimizer.env().sleeps(), vec![4_100]);
        assert_eq!(optimizer.env().live_processes(), 0);
    }

    #[tokio::test]
    async fn waits_for_nearest_eta() {
        let mut config = config();
        config.timing.max_iterations = Some(1);
        let mut optimizer = Optimizer::new(network(), config).unwrap();

        optimizer.optimize("n00dles").await.unwrap();
        let sleeps = optimizer.env().sleeps();
        // First wait reaches the grow ETA, then the drain reaches weaken's.
        assert_eq!(sleeps, vec![3_300, 800]);
    }

    #[tokio::test]
    async fn poll_interval_caps_wait() {
        let mut config = config();
        config.timing.max_iterations = Some(1);
        config.timing.max_poll_interval_ms = 1_000;
        let mut optimizer = Optimizer::new(network(), config).unwrap();

        optimizer.optimize("n00dles").await.unwrap();
        assert_eq!(optimizer.env().sleeps()[0], 1_000);
    }

    fn handle(pid: u64) -> ProcessHandle {
        ProcessHandle {
            pid: ProcessId(pid),
            threads: 1,
        }
    }

    #[test]
    fn stale_etas_use_fallback_wait() {
        let mut campaign = Campaign::new("n00dles");
        campaign.weaken.rearm(5_000);
        campaign.weaken.record(handle(1));
        campaign.grow.rearm(4_000);
        campaign.grow.record(handle(2));
        let config = config();

        assert_eq!(next_wait(&campaign, 4_500, &config), 500);
        assert_eq!(next_wait(&campaign, 6_000, &config), 3_000);
        assert_eq!(next_wait(&campaign, 5_000, &config), 3_000);
    }

    #[test]
    fn armed_waves_without_processes_have_no_eta() {
        let mut campaign = Campaign::new("n00dles");
        campaign.weaken.rearm(5_000);
        campaign.grow.rearm(4_000);
        campaign.grow.record(handle(1));

        assert_eq!(campaign.latest_eta(), Some(4_000));
        assert_eq!(campaign.next_eta_after(4_000), None);
        assert_eq!(next_wait(&campaign, 1_000, &config()), 3_000);
    }

    #[tokio::test]
    async fn nothing_launched_means_no_drain() {
        let env = SimulatedNetwork::new(START, 1.0)
            .with_target("n00dles", 1_000.0, 3.0, 1.0, 0.0, 100.0);
        let mut config = config();
        config.timing.max_iterations = Some(1);
        let mut optimizer = Optimizer::new(env, config).unwrap();

        optimizer.optimize("n00dles").await.unwrap();
        assert!(optimizer.env().launches().is_empty());
        // One fallback wait, then a zero-length drain.
        assert_eq!(optimizer.env().sleeps(), vec![3_000, 0]);
    }

    #[tokio::test]
    async fn no_capacity_still_reaches_exit_checks() {
        let env = SimulatedNetwork::new(START, 1.0)
            .with_target("n00dles", 1_000.0, 3.0, 1.0, 0.0, 100.0);
        let mut config = config();
        config.timing.max_iterations = Some(3);
        let mut optimizer = Optimizer::new(env, config).unwrap();

        let report = optimizer.optimize("n00dles").await.unwrap();
        assert_eq!(report.iterations, 3);
        assert_eq!(report.weaken_threads + report.grow_threads, 0);
        assert!(optimizer.env().launches().is_empty());
    }
}
