//! Platform-specific helpers. Only Linux is supported.

pub mod linux;

pub use linux::{deadline_after, get_current_pid, is_process_alive};
