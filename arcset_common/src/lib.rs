//! arcset Common Library
//!
//! Shared value types, constants and configuration loading used by every
//! crate of the arcset workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Ring geometry and default resource names
//! - [`arcset`] - `Edge` and `Record` (candidate arc set) value types
//! - [`graph`] - Command-line graph parsing
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! arcset = { package = "arcset_common", path = "../arcset_common" }
//! ```
//!
//! ```rust
//! use arcset_common::prelude::*;
//!
//! let edge: Edge = "0-1".parse().unwrap();
//! let record = Record::from_edges(&[edge]).unwrap();
//! assert_eq!(record.len(), 1);
//! ```

pub mod arcset;
pub mod config;
pub mod consts;
pub mod graph;
pub mod prelude;
