//! Error types for shared memory operations

use arcset::config::ConfigError;
use nix::errno::Errno;
use thiserror::Error;

/// Errors that can occur while setting up, using or tearing down the ring.
///
/// A cancelled wait is not an error: it is reported as
/// [`Outcome::Interrupted`](crate::ring::Outcome::Interrupted).
#[derive(Error, Debug)]
pub enum ShmError {
    /// Object already exists (another supervisor, or a stale run)
    #[error("Object already exists: {name}")]
    AlreadyExists {
        /// Object name
        name: String,
    },

    /// Object not found (supervisor not running)
    #[error("Object not found: {name}")]
    NotFound {
        /// Object name
        name: String,
    },

    /// Permission denied
    #[error("Permission denied accessing object: {name}")]
    PermissionDenied {
        /// Object name
        name: String,
    },

    /// Object name rejected by the kernel or by validation
    #[error("Invalid object name: {name}")]
    InvalidName {
        /// Object name
        name: String,
    },

    /// Region layout does not match the layout compiled into this process
    #[error("Region {name} layout mismatch: {reason}")]
    LayoutMismatch {
        /// Region name
        name: String,
        /// What did not match
        reason: String,
    },

    /// Refusing to reclaim a region whose owner is still running
    #[error("Region {name} is owned by live process {pid}")]
    OwnerAlive {
        /// Region name
        name: String,
        /// Owner process ID
        pid: u32,
    },

    /// Refusing to reclaim a region whose header names no owner
    #[error("Region {name} has no readable owner; it may still be initialising")]
    OwnerUnknown {
        /// Region name
        name: String,
    },

    /// Semaphore operation failed
    #[error("Semaphore {name} failed: {source}")]
    Semaphore {
        /// Semaphore name
        name: String,
        /// Underlying errno
        source: Errno,
    },

    /// Handle used after teardown
    #[error("Shared resources already torn down")]
    Detached,

    /// Invalid exchange configuration
    #[error("Configuration error: {source}")]
    Config {
        /// Source configuration error
        #[from]
        source: ConfigError,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

impl ShmError {
    /// Classify an errno returned by an open/create call on `name`.
    pub fn from_errno(name: &str, errno: Errno) -> Self {
        let name = name.to_string();
        match errno {
            Errno::EEXIST => ShmError::AlreadyExists { name },
            Errno::ENOENT => ShmError::NotFound { name },
            Errno::EACCES | Errno::EPERM => ShmError::PermissionDenied { name },
            Errno::EINVAL | Errno::ENAMETOOLONG => ShmError::InvalidName { name },
            source => ShmError::Nix { source },
        }
    }
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_classification() {
        assert!(matches!(
            ShmError::from_errno("/x", Errno::EEXIST),
            ShmError::AlreadyExists { .. }
        ));
        assert!(matches!(
            ShmError::from_errno("/x", Errno::ENOENT),
            ShmError::NotFound { .. }
        ));
        assert!(matches!(
            ShmError::from_errno("/x", Errno::EACCES),
            ShmError::PermissionDenied { .. }
        ));
        assert!(matches!(
            ShmError::from_errno("/x", Errno::ENAMETOOLONG),
            ShmError::InvalidName { .. }
        ));
        assert!(matches!(
            ShmError::from_errno("/x", Errno::ENOMEM),
            ShmError::Nix { .. }
        ));
    }

    #[test]
    fn test_display_names_object() {
        let err = ShmError::NotFound {
            name: "/graphresult".to_string(),
        };
        assert_eq!(err.to_string(), "Object not found: /graphresult");
    }
}
