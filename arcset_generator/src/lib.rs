//! # arcset Generator Library
//!
//! Worker side of the arcset run: turns a parsed [`Graph`](arcset::graph::Graph)
//! into a stream of candidate feedback arc sets and submits the ones that
//! fit a ring slot to the supervisor.
//!
//! # Module Structure
//!
//! - [`candidate`] - `CandidateSource` trait and the random-ordering generator
//! - [`worker`] - Worker loop and its report
//! - [`error`] - Fatal error classification for the binary

#![deny(missing_docs)]

pub mod candidate;
pub mod error;
pub mod worker;

pub use crate::candidate::{Candidate, CandidateSource, RandomOrdering};
pub use crate::error::{GeneratorError, GeneratorResult};
pub use crate::worker::{Worker, WorkerReport};
