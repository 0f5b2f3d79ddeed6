//! Prelude module for common re-exports.
//!
//! ```rust
//! use arcset_common::prelude::*;
//! ```

// ─── Value types ────────────────────────────────────────────────────
pub use crate::arcset::{CapacityExceeded, Edge, Record};
pub use crate::graph::{Graph, InputError};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    AppConfig, ConfigError, ConfigLoader, ExchangeConfig, LogLevel, SharedConfig,
};

// ─── Ring geometry ──────────────────────────────────────────────────
pub use crate::consts::{BUFFER_CAPACITY, CAPACITY_MAX};
