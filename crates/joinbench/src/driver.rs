use anyhow::Context;
use joinbench_core::{
    BenchmarkHarness, BenchmarkRun, DatasetSize, JoinStore, JsonReport, MockJoinStore,
    PresenterChain, SummaryPrinter, VariantKind,
};
use joinbench_postgres::PgJoinStore;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::chart::ChartPresenter;
use crate::config::Config;

/// Runs every configured variant for every dataset size.
///
/// A failed run is logged and the remaining runs still execute. The first
/// failure is returned once everything has finished.
pub async fn run(config: &Config) -> anyhow::Result<Vec<BenchmarkRun>> {
    let presenters = build_presenters(config);
    let mut runs = Vec::new();
    let mut failure: Option<anyhow::Error> = None;

    for &employees in &config.dataset.employees {
        for &kind in &config.benchmark.variants {
            match run_variant(config, kind, employees, &presenters).await {
                Ok(run) => runs.push(run),
                Err(e) => {
                    error!(variant = %kind, employees, "benchmark failed: {:#}", e);
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(command) = &config.database.purge_command {
            match run_purge_command(command).await {
                Ok(true) => info!("Purge command finished"),
                Ok(false) => warn!(command = %command, "purge command exited unsuccessfully"),
                Err(e) => warn!(command = %command, "purge command could not run: {:#}", e),
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(runs),
    }
}

async fn run_variant(
    config: &Config,
    kind: VariantKind,
    employees: usize,
    presenters: &PresenterChain,
) -> anyhow::Result<BenchmarkRun> {
    let size = DatasetSize::new(employees, config.dataset.departments)?;
    let harness = BenchmarkHarness::new(kind.config(), size)
        .with_join_methods(config.benchmark.join_methods.clone())?
        .with_seed(config.dataset.seed);

    info!(variant = %kind, employees, "starting benchmark");
    let mut store = open_store(config).await?;
    let run = execute_and_close(&harness, store.as_mut(), presenters)
        .await
        .with_context(|| format!("{} benchmark with {} employees", kind, employees))?;
    Ok(run)
}

/// Runs the harness, then closes the store whatever the outcome. A failed
/// close is logged and does not fail the run.
async fn execute_and_close(
    harness: &BenchmarkHarness,
    store: &mut dyn JoinStore,
    presenters: &PresenterChain,
) -> joinbench_core::Result<BenchmarkRun> {
    let outcome = harness.execute(&mut *store, presenters).await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close store");
    }
    outcome
}

async fn open_store(config: &Config) -> anyhow::Result<Box<dyn JoinStore>> {
    if config.benchmark.dry_run {
        info!("Dry run, using the in-memory store");
        return Ok(Box::new(MockJoinStore::new()));
    }
    let store = PgJoinStore::connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    Ok(Box::new(store))
}

fn build_presenters(config: &Config) -> PresenterChain {
    let output = &config.output;
    let mut chain = PresenterChain::new().with(SummaryPrinter {
        print_plans: output.print_plans,
    });
    if output.chart {
        chain = chain.with(ChartPresenter::new(output.dir.clone()));
    }
    if output.json {
        chain = chain.with(JsonReport::new(output.dir.clone()));
    }
    chain
}

/// Runs `command` through `sh -c`. Returns whether it exited successfully.
pub async fn run_purge_command(command: &str) -> anyhow::Result<bool> {
    info!(command = %command, "running purge command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .with_context(|| format!("Failed to spawn purge command '{}'", command))?;
    Ok(status.success())
}
