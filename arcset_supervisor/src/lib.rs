//! # arcset Supervisor Library
//!
//! Coordinator side of the arcset run: the single consumer of the ring. It
//! keeps the smallest feedback arc set any worker proposed, reports each
//! improvement, and stops every worker once the graph is shown acyclic or
//! the process is asked to terminate.
//!
//! # Module Structure
//!
//! - [`coordinator`] - Drain loop, best-known tracking and run summary
//! - [`report`] - `SolutionSink` trait and the console reporter
//! - [`error`] - Fatal error classification for the binary

#![deny(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod report;

pub use crate::coordinator::{BestKnown, Coordinator, RunSummary};
pub use crate::error::{SupervisorError, SupervisorResult};
pub use crate::report::{ConsoleReporter, SolutionSink};
