mod chart;
mod config;
mod driver;

use clap::Parser;
use joinbench_core::{JoinMethod, VariantKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Compare nested-loop, hash and merge joins on PostgreSQL.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PostgreSQL connection URL
    #[arg(long, env = "JOINBENCH_DATABASE_URL")]
    db_url: Option<String>,

    /// Employee count, repeat for several dataset sizes
    #[arg(short, long)]
    employees: Vec<usize>,

    #[arg(short, long)]
    departments: Option<usize>,

    /// plain, indexed, pattern, range or catalogue
    #[arg(long = "variant")]
    variants: Vec<VariantKind>,

    /// nestloop, hashjoin or mergejoin
    #[arg(long = "join-method")]
    join_methods: Vec<JoinMethod>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    no_chart: bool,

    #[arg(long)]
    no_json: bool,

    /// Leave execution plans out of the printed summary
    #[arg(long)]
    no_plans: bool,

    /// Run against the in-memory store instead of PostgreSQL
    #[arg(long)]
    dry_run: bool,

    /// Shell command run after each dataset size
    #[arg(long)]
    purge_command: Option<String>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(url) = self.db_url {
            config.database.url = url;
        }
        if let Some(command) = self.purge_command {
            config.database.purge_command = Some(command);
        }
        if !self.employees.is_empty() {
            config.dataset.employees = self.employees;
        }
        if let Some(departments) = self.departments {
            config.dataset.departments = departments;
        }
        if self.seed.is_some() {
            config.dataset.seed = self.seed;
        }
        if !self.variants.is_empty() {
            config.benchmark.variants = self.variants;
        }
        if !self.join_methods.is_empty() {
            config.benchmark.join_methods = self.join_methods;
        }
        if self.dry_run {
            config.benchmark.dry_run = true;
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = dir;
        }
        if self.no_chart {
            config.output.chart = false;
        }
        if self.no_json {
            config.output.json = false;
        }
        if self.no_plans {
            config.output.print_plans = false;
        }
        if let Some(level) = self.log_level {
            config.general.log_level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runs = driver::run(&config).await?;
    info!("Completed {} benchmark runs", runs.len());
    Ok(())
}
