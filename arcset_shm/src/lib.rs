//! # arcset Shared Memory Ring
//!
//! Bounded multi-producer / single-consumer exchange between processes on one
//! host: a fixed-capacity ring of [`Record`](arcset::arcset::Record) slots in
//! a named POSIX shared memory region, synchronized by three named counting
//! semaphores.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐                                  ┌─────────────────┐
//! │   Worker 1      │    ┌──────────────────────┐      │  Coordinator    │
//! │ Producer::submit├───►│  SharedRegion<N>     │      │                 │
//! └─────────────────┘    │ [Header|slot0..slotN]├─────►│ Consumer::drain │
//! ┌─────────────────┐    │  status flag  ◄──────┼──────┤ set_terminating │
//! │   Worker K      ├───►│                      │      └─────────────────┘
//! │ Producer::submit│    └──────────────────────┘
//! └─────────────────┘     free_slots | used_slots | write_mutex
//! ```
//!
//! - The coordinator creates every resource exclusively and is the only
//!   process that unlinks them.
//! - Workers attach, validate the region header, and never create anything.
//! - Blocking waits are interruptible: cancellation is reported as
//!   [`Outcome::Interrupted`], never as an error, and leaves no side effects.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arcset_shm::{CancelToken, Consumer, Outcome, Producer};
//! use arcset::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExchangeConfig::default();
//! let cancel = CancelToken::new();
//!
//! let mut consumer = Consumer::<4>::create(&config)?;
//! let producer = Producer::<4>::attach(&config)?;
//!
//! let record = Record::from_edges(&["1-0".parse()?])?;
//! producer.submit(&record, &cancel)?;
//! if let Outcome::Completed(best) = consumer.drain(&cancel)? {
//!     println!("{best}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod exchange;
pub mod lifecycle;
pub mod platform;
pub mod region;
pub mod ring;
pub mod semaphore;

pub use error::{ShmError, ShmResult};
pub use exchange::{Exchange, Role};
pub use lifecycle::{CancelToken, ProcessPhase, SignalManager};
pub use region::{RingStatus, SharedRegion};
pub use ring::{Consumer, Outcome, Producer};
pub use semaphore::{NamedSemaphore, SemaphoreSnapshot, SemaphoreTriplet, WaitOutcome};

/// Install a default stderr subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
