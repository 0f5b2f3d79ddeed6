//! Supervisor failure classification.

use arcset::config::ConfigError;
use arcset_shm::ShmError;
use thiserror::Error;

/// Fatal supervisor errors. The display form is `"<kind>: <detail>"`.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Configuration file missing, unparsable or invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Creating (or reclaiming) the region or semaphores failed.
    #[error("setup failure: {0}")]
    Setup(#[source] ShmError),

    /// A semaphore or region operation failed while draining.
    #[error("runtime failure: {0}")]
    Runtime(#[source] ShmError),
}

/// Result type for supervisor operations
pub type SupervisorResult<T> = Result<T, SupervisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_display() {
        let err = SupervisorError::Setup(ShmError::AlreadyExists {
            name: "/graphresult".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "setup failure: Object already exists: /graphresult"
        );
    }
}
