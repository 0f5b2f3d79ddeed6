//! Ring geometry and default resource names.
//!
//! These constants are the single source of truth for every crate in the
//! workspace. The ring capacity used by the binaries lives here; library
//! code takes the capacity as a const generic so tests can shrink it.

/// Maximum number of edges a single candidate record can carry.
///
/// Candidates with more edges are discarded by the worker before they ever
/// reach the shared ring.
pub const CAPACITY_MAX: usize = 8;

/// Number of record slots in the ring used by the shipped binaries.
pub const BUFFER_CAPACITY: usize = 50;

/// Default name of the shared memory region.
pub const DEFAULT_REGION_NAME: &str = "/graphresult";

/// Default name of the semaphore counting occupied, unread slots.
pub const DEFAULT_USED_SEM: &str = "/fb_arc_set_used_sem";

/// Default name of the semaphore counting free slots.
pub const DEFAULT_FREE_SEM: &str = "/fb_arc_set_free_sem";

/// Default name of the binary semaphore guarding the write critical section.
pub const DEFAULT_MUTEX_SEM: &str = "/fb_arc_set_mutex_sem";

/// Default length of one bounded semaphore wait slice, in milliseconds.
///
/// Blocked waiters re-check their stop condition at this interval.
pub const DEFAULT_WAIT_POLL_MS: u64 = 100;

/// Longest POSIX object name accepted, leading slash included.
pub const MAX_NAME_LEN: usize = 250;
