//! # arcset Generator Binary
//!
//! Worker process. Attaches to a running `arcset_supervisor` and keeps
//! submitting random feedback arc sets of the given graph until the
//! supervisor finishes or the process receives `SIGINT` / `SIGTERM`.
//!
//! # Usage
//!
//! ```bash
//! # Graph with edges 0->1, 1->2, 2->0
//! arcset_generator 0-1 1-2 2-0
//!
//! # Reproducible candidates, stop after 1000 submissions
//! arcset_generator --seed 7 --max-submissions 1000 0-1 1-2 2-0
//! ```

use arcset::config::AppConfig;
use arcset::consts::BUFFER_CAPACITY;
use arcset::graph::Graph;
use arcset_generator::{GeneratorError, GeneratorResult, RandomOrdering, Worker};
use arcset_shm::{Producer, Role, SignalManager};
use clap::Parser;
use std::path::PathBuf;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// arcset generator - proposes feedback arc sets to the supervisor
#[derive(Parser, Debug)]
#[command(name = "arcset_generator")]
#[command(version)]
#[command(about = "Worker process proposing random feedback arc sets")]
#[command(long_about = None)]
struct Args {
    /// Graph edges as `<uint>-<uint>` tokens
    #[arg(value_name = "EDGE")]
    edges: Vec<String>,

    /// Path to configuration file (arcset.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many successful submissions
    #[arg(long, value_name = "N")]
    max_submissions: Option<u64>,

    /// Seed for reproducible candidate generation
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = AppConfig::load_or_default(args.config.as_deref());

    let level = config
        .as_ref()
        .map(|c| Level::from(c.shared.log_level))
        .unwrap_or(Level::INFO);
    setup_tracing(&args, level);

    let result = config
        .map_err(GeneratorError::from)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("{}: {}", Role::Worker, e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: &AppConfig) -> GeneratorResult<()> {
    // Input is validated before any shared resource is touched.
    let graph = Graph::from_tokens(&args.edges)?;
    debug!(
        "Graph: {} edges over vertices 0..={}",
        graph.edges().len(),
        graph.max_vertex()
    );

    let source = match args.seed {
        Some(seed) => RandomOrdering::with_seed(&graph, seed),
        None => RandomOrdering::new(&graph),
    };

    let signals =
        SignalManager::install(Role::Worker, &config.exchange).map_err(GeneratorError::Setup)?;
    let mut producer =
        Producer::<BUFFER_CAPACITY>::attach(&config.exchange).map_err(GeneratorError::Setup)?;
    info!(
        "Worker {} attached to {}",
        std::process::id(),
        config.exchange.region
    );

    let mut worker = Worker::new(source).with_max_submissions(args.max_submissions);
    let outcome = worker.run(&producer, &signals.token());

    signals.begin_shutdown();
    producer.teardown();
    signals.mark_terminated();

    let report = outcome.map_err(GeneratorError::Runtime)?;
    info!(
        "Worker done: {} submitted, {} discarded, {} interrupted",
        report.submitted, report.discarded, report.interrupted
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, configured: Level) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
