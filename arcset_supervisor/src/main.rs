//! # arcset Supervisor Binary
//!
//! Coordinator process. Creates the shared ring, then drains candidate arc
//! sets from any number of `arcset_generator` workers, printing every
//! improvement on stdout. Exits when the graph turns out to be acyclic or on
//! `SIGINT` / `SIGTERM`; either way all shared resources are removed.
//!
//! # Usage
//!
//! ```bash
//! arcset_supervisor
//!
//! # JSON solution lines, custom object names
//! arcset_supervisor --json --config config/arcset.toml
//!
//! # Remove names left behind by a crashed run first
//! arcset_supervisor --reclaim
//! ```

use arcset::config::AppConfig;
use arcset::consts::BUFFER_CAPACITY;
use arcset_shm::{Consumer, Exchange, Role, SignalManager};
use arcset_supervisor::{ConsoleReporter, Coordinator, SupervisorError, SupervisorResult};
use clap::Parser;
use std::path::PathBuf;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// arcset supervisor - keeps the best feedback arc set proposed by workers
#[derive(Parser, Debug)]
#[command(name = "arcset_supervisor")]
#[command(version)]
#[command(about = "Coordinator process collecting feedback arc sets")]
#[command(long_about = None)]
struct Args {
    /// Path to configuration file (arcset.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unlink region and semaphores left by a dead supervisor before starting
    #[arg(long)]
    reclaim: bool,

    /// Print solutions and logs as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
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
        .map_err(SupervisorError::from)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("{}: {}", Role::Coordinator, e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: &AppConfig) -> SupervisorResult<()> {
    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Termination handlers first so no signal can leave the objects linked.
    let signals = SignalManager::install_termination().map_err(SupervisorError::Setup)?;

    if args.reclaim {
        let reclaimed = Exchange::<BUFFER_CAPACITY>::reclaim_stale(&config.exchange)
            .map_err(SupervisorError::Setup)?;
        if reclaimed {
            warn!("Removed stale region {}", config.exchange.region);
        }
    }

    let consumer =
        Consumer::<BUFFER_CAPACITY>::create(&config.exchange).map_err(SupervisorError::Setup)?;
    // Armed only once the names are ours; the fault path unlinks them.
    signals
        .arm_fault_handlers(Role::Coordinator, &config.exchange)
        .map_err(SupervisorError::Setup)?;
    match consumer.snapshot() {
        Ok(s) => debug!(
            "Semaphores: free={} used={} mutex={}",
            s.free, s.used, s.mutex
        ),
        Err(e) => debug!("Semaphore snapshot unavailable: {}", e),
    }
    info!(
        "Supervisor {} ready on {} ({} slots)",
        std::process::id(),
        config.exchange.region,
        BUFFER_CAPACITY
    );

    let mut coordinator = Coordinator::new(consumer);
    let mut reporter = ConsoleReporter::stdout(env!("CARGO_BIN_NAME"), args.json);
    let outcome = coordinator.run(&signals.token(), &mut reporter);

    signals.begin_shutdown();
    coordinator.teardown();
    signals.mark_terminated();

    let summary = outcome.map_err(SupervisorError::Runtime)?;
    if !summary.acyclic {
        match summary.best {
            Some(best) => info!("Best solution has {} edges", best.len()),
            None => info!("No solution received"),
        }
    }
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
