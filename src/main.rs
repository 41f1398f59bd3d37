//! cluster-getter
//!
//! Builds cluster connection state once and runs concurrent workers that
//! parse the same manifest against it.
//!
//! # Architecture Overview
//!
//! ```text
//!   --config / env ──▶ config ──▶ cluster::ClusterSource
//!                                        │
//!                                        ▼
//!                              provider::ConfigProvider
//!                          (build once, share or clone)
//!                           │            │            │
//!                           ▼            ▼            ▼
//!                       worker 0     worker 1  ...  worker N-1
//!                           │            │            │
//!                           ▼            ▼            ▼
//!                   manifest::ResourceBuilder (one per worker)
//!                           │            │            │
//!                           └────────────┴────────────┘
//!                                        ▼
//!                              worker::PoolReport ──▶ stdout, exit code
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cluster_getter::cluster::ClusterSource;
use cluster_getter::config::validation::validate_config;
use cluster_getter::config::{load_config, ConfigError, RuntimeConfig};
use cluster_getter::observability::logging;
use cluster_getter::provider::{ConfigProvider, SharePolicy};
use cluster_getter::worker::{BuilderOptions, ManifestTask, WorkerPool};

#[derive(Parser)]
#[command(name = "cluster-getter")]
#[command(about = "Parse a manifest from concurrent workers sharing one cluster configuration", long_about = None)]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Manifest every worker parses
    #[arg(short, long, default_value = "objects.yaml")]
    manifest: PathBuf,

    /// Hand every worker its own copy of the connection state
    #[arg(long)]
    clone_config: bool,

    /// Build fresh connection state for every caller instead of caching it
    #[arg(long, conflicts_with = "clone_config")]
    uncached: bool,

    /// Number of concurrent workers
    #[arg(short, long)]
    parallelism: Option<usize>,

    /// Re-normalize the type mapping in place before resolving
    #[arg(long)]
    normalize_mapping: bool,

    /// Report every bad document instead of stopping at the first
    #[arg(long)]
    continue_on_error: bool,

    /// Expand List documents into their items
    #[arg(long)]
    flatten: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = resolve_config(&args)?;
    logging::init(&config.observability.log_level);

    tracing::info!(
        server = %config.cluster.server,
        namespace = %config.cluster.namespace,
        parallelism = config.workers.parallelism,
        "Configuration loaded"
    );

    let source = ClusterSource::from_config(&config);
    let provider = if args.uncached {
        ConfigProvider::uncached(source)
    } else {
        ConfigProvider::new(source, config.workers.policy)
    };
    let pool = WorkerPool::new(config.workers.parallelism);
    let mode = if provider.is_cached() {
        provider.policy().to_string()
    } else {
        "uncached".to_string()
    };
    println!(
        "policy={} parallelism={} manifest={}",
        mode,
        pool.concurrency(),
        args.manifest.display()
    );

    let task = ManifestTask::new(
        args.manifest,
        BuilderOptions {
            flatten: args.flatten,
            continue_on_error: args.continue_on_error,
            normalize_mapping: args.normalize_mapping,
        },
    );
    let report = pool
        .run(&provider, move |ctx| {
            let task = task.clone();
            async move { task.run(ctx).await }
        })
        .await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(parsed) => println!("worker {}: ok, {} resources", outcome.worker, parsed.infos.len()),
            Err(e) => println!("worker {}: failed: {}", outcome.worker, e),
        }
    }
    println!("{} (builds: {})", report, provider.build_count());

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Load the configuration file, apply command-line overrides, then validate
/// the result so overrides get the same checks as the file.
fn resolve_config(args: &Args) -> Result<RuntimeConfig, ConfigError> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(parallelism) = args.parallelism {
        config.workers.parallelism = parallelism;
    }
    if args.clone_config {
        config.workers.policy = SharePolicy::from_clone_flag(true);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
