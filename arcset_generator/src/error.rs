//! Worker failure classification.

use arcset::config::ConfigError;
use arcset::graph::InputError;
use arcset_shm::ShmError;
use thiserror::Error;

/// Fatal worker errors. The display form is `"<kind>: <detail>"`.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Malformed or missing edge tokens. No resource has been touched.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// Configuration file missing, unparsable or invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Attaching to the supervisor's region or semaphores failed.
    #[error("setup failure: {0}")]
    Setup(#[source] ShmError),

    /// A semaphore or region operation failed while running.
    #[error("runtime failure: {0}")]
    Runtime(#[source] ShmError),
}

/// Result type for worker operations
pub type GeneratorResult<T> = Result<T, GeneratorError>;
