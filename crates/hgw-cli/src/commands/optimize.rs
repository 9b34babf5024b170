use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use hgw_core::{HgwConfig, OptimizeReport};
use hgw_scheduler::{Optimizer, RunMode, SimulatedNetwork};
use hgw_state::SettingsStore;

use super::open_store;

pub struct OptimizeArgs {
    pub target: String,
    pub config: Option<PathBuf>,
    pub force_run: bool,
    pub save_config: bool,
    pub format: String,
}

pub async fn run(data_dir: &Path, args: OptimizeArgs) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let config = resolve_config(&store, args.config.as_deref())?;
    if args.save_config {
        store.save_config(&config)?;
    }

    let mode = if args.force_run {
        RunMode::ForceRun
    } else {
        RunMode::Converge
    };
    let report = optimize(config, &args.target, mode).await?;
    let key = store.record_run(&report)?;
    info!(%key, "run recorded");

    print_report(&report, &args.format)
}

/// Config precedence: explicit file, then the stored config, then the scaffold.
fn resolve_config(store: &SettingsStore, path: Option<&Path>) -> anyhow::Result<HgwConfig> {
    if let Some(path) = path {
        return HgwConfig::from_file(path);
    }
    if let Some(config) = store.load_config()? {
        info!("using stored config");
        return Ok(config);
    }
    info!("no config given, using the scaffold network");
    Ok(HgwConfig::scaffold())
}

async fn optimize(config: HgwConfig, target: &str, mode: RunMode) -> anyhow::Result<OptimizeReport> {
    let simulation = config
        .simulation
        .as_ref()
        .context("config has no [simulation] section to run against")?;
    let env = SimulatedNetwork::from_config(simulation, config.slots.ram_per_thread);

    let mut optimizer = Optimizer::new(env, config)?;
    let report = optimizer.run(target, mode).await?;
    Ok(report)
}

pub fn runs(data_dir: &Path, target: &str) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let runs = store.list_runs(target)?;
    if runs.is_empty() {
        println!("No recorded runs for {target}");
        return Ok(());
    }

    println!(
        "{:<16} {:>6} {:>10} {:>10} {:>9} {:>8}",
        "FINISHED", "ITERS", "GROW", "WEAKEN", "RESIDUAL", "FAILED"
    );
    for r in &runs {
        println!(
            "{:<16} {:>6} {:>10} {:>10} {:>9} {:>8}",
            r.finished_at_ms, r.iterations, r.grow_threads, r.weaken_threads, r.residual_threads,
            r.launch_failures
        );
    }
    Ok(())
}

fn print_report(report: &OptimizeReport, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        _ => {
            let state = &report.final_state;
            let outcome = if report.forced {
                "single pass"
            } else if state.is_optimal() {
                "optimal"
            } else {
                "stopped early"
            };
            println!("Target: {} ({outcome})", report.target);
            println!(
                "  Iterations:  {} over {} ms",
                report.iterations,
                report.finished_at_ms.saturating_sub(report.started_at_ms)
            );
            println!("  Grow:        {} threads", report.grow_threads);
            println!("  Weaken:      {} threads", report.weaken_threads);
            if report.residual_threads > 0 || report.launch_failures > 0 {
                println!(
                    "  Unplaced:    {} threads, {} refused launches",
                    report.residual_threads, report.launch_failures
                );
            }
            println!(
                "  Security:    {:.3} (min {:.3})",
                state.security, state.min_security
            );
            println!("  Money:       {:.0} / {:.0}", state.money, state.max_money);
        }
    }
    Ok(())
}
