//! Named POSIX counting semaphores.
//!
//! [`NamedSemaphore`] wraps `sem_open` / `sem_timedwait` / `sem_post` with
//! an interruptible [`acquire`](NamedSemaphore::acquire): the wait runs in
//! bounded slices and gives up with [`WaitOutcome::Interrupted`] when a
//! signal interrupts it or the caller's stop predicate turns true. An
//! interrupted acquire never decrements the count.
//!
//! [`SemaphoreTriplet`] groups the three semaphores of the bounded-buffer
//! discipline: `free_slots`, `used_slots` and `write_mutex`.

use crate::error::{ShmError, ShmResult};
use crate::platform::deadline_after;
use arcset::config::ExchangeConfig;
use nix::errno::Errno;
use std::ffi::CString;
use std::ptr::NonNull;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a blocking acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The count was decremented.
    Acquired,
    /// The wait was abandoned; the count is unchanged.
    Interrupted,
}

/// Handle on a named counting semaphore.
pub struct NamedSemaphore {
    name: String,
    handle: Option<NonNull<libc::sem_t>>,
    owned: bool,
    poll: Duration,
}

// SAFETY: a `sem_t` opened with `sem_open` lives in a shared mapping and all
// operations on it are thread-safe.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Exclusively create `name` with count `initial`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken.
    pub fn create(name: &str, initial: u32, poll: Duration) -> ShmResult<Self> {
        let c_name = c_name(name)?;
        // SAFETY: valid C string; mode and value are passed as `c_uint` as
        // the variadic ABI of sem_open expects.
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        let handle = check_open(name, sem)?;
        debug!("Created semaphore {} = {}", name, initial);
        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
            owned: true,
            poll,
        })
    }

    /// Open an existing semaphore. Never creates it.
    ///
    /// # Errors
    ///
    /// `NotFound` if no coordinator created it.
    pub fn open(name: &str, poll: Duration) -> ShmResult<Self> {
        let c_name = c_name(name)?;
        // SAFETY: valid C string, no O_CREAT so no variadic arguments.
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        let handle = check_open(name, sem)?;
        debug!("Opened semaphore {}", name);
        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
            owned: false,
            poll,
        })
    }

    fn handle(&self) -> ShmResult<NonNull<libc::sem_t>> {
        self.handle.ok_or(ShmError::Detached)
    }

    fn failure(&self, source: Errno) -> ShmError {
        ShmError::Semaphore {
            name: self.name.clone(),
            source,
        }
    }

    /// Decrement the count, blocking while it is zero.
    ///
    /// `stop` is evaluated before every wait slice; once it returns `true`
    /// the wait is abandoned. A signal delivered during the wait also ends
    /// it. Both cases yield [`WaitOutcome::Interrupted`] with the count
    /// untouched.
    pub fn acquire<F: Fn() -> bool>(&self, stop: F) -> ShmResult<WaitOutcome> {
        let sem = self.handle()?;
        loop {
            if stop() {
                return Ok(WaitOutcome::Interrupted);
            }
            let deadline = deadline_after(self.poll)?;
            // SAFETY: `sem` stays open for the lifetime of `self`.
            if unsafe { libc::sem_timedwait(sem.as_ptr(), deadline.as_ref()) } == 0 {
                return Ok(WaitOutcome::Acquired);
            }
            match Errno::last() {
                Errno::ETIMEDOUT => continue,
                Errno::EINTR => return Ok(WaitOutcome::Interrupted),
                errno => return Err(self.failure(errno)),
            }
        }
    }

    /// Decrement the count if it is positive, without blocking.
    pub fn try_acquire(&self) -> ShmResult<bool> {
        let sem = self.handle()?;
        // SAFETY: `sem` stays open for the lifetime of `self`.
        if unsafe { libc::sem_trywait(sem.as_ptr()) } == 0 {
            return Ok(true);
        }
        match Errno::last() {
            Errno::EAGAIN | Errno::EINTR => Ok(false),
            errno => Err(self.failure(errno)),
        }
    }

    /// Increment the count, waking one waiter.
    pub fn release(&self) -> ShmResult<()> {
        let sem = self.handle()?;
        // SAFETY: `sem` stays open for the lifetime of `self`.
        if unsafe { libc::sem_post(sem.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(self.failure(Errno::last()))
        }
    }

    /// Current count (peek; may be stale by the time it is returned).
    pub fn value(&self) -> ShmResult<u32> {
        let sem = self.handle()?;
        let mut value: libc::c_int = 0;
        // SAFETY: `sem` stays open; `value` is a valid out pointer.
        if unsafe { libc::sem_getvalue(sem.as_ptr(), &mut value) } == 0 {
            // glibc never reports waiters as a negative count
            Ok(value.max(0) as u32)
        } else {
            Err(self.failure(Errno::last()))
        }
    }

    /// Semaphore name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` if this process created the semaphore.
    pub fn is_owner(&self) -> bool {
        self.owned
    }

    /// `true` until [`close`](Self::close) has run.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Close this process's handle. Returns `Ok(false)` if it was already
    /// closed, so repeated calls never double-close.
    pub fn close(&mut self) -> ShmResult<bool> {
        let Some(sem) = self.handle.take() else {
            return Ok(false);
        };
        // SAFETY: `sem` came from sem_open and is closed exactly once here.
        if unsafe { libc::sem_close(sem.as_ptr()) } == 0 {
            Ok(true)
        } else {
            Err(self.failure(Errno::last()))
        }
    }

    /// Remove the name if this process created it. Subsequent calls are
    /// no-ops.
    pub fn unlink(&mut self) -> ShmResult<()> {
        if !self.owned {
            return Ok(());
        }
        self.owned = false;
        Self::unlink_name(&self.name)
    }

    /// Remove a semaphore name regardless of who created it.
    pub fn unlink_name(name: &str) -> ShmResult<()> {
        let c_name = c_name(name)?;
        // SAFETY: valid C string.
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(ShmError::from_errno(name, Errno::last()))
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close semaphore {}: {}", self.name, e);
        }
        if let Err(e) = self.unlink() {
            warn!("Failed to unlink semaphore {}: {}", self.name, e);
        }
    }
}

fn c_name(name: &str) -> ShmResult<CString> {
    CString::new(name).map_err(|_| ShmError::InvalidName {
        name: name.to_string(),
    })
}

fn check_open(name: &str, sem: *mut libc::sem_t) -> ShmResult<NonNull<libc::sem_t>> {
    if sem == libc::SEM_FAILED {
        return Err(ShmError::from_errno(name, Errno::last()));
    }
    NonNull::new(sem).ok_or_else(|| ShmError::from_errno(name, Errno::last()))
}

/// Point-in-time counts of the three semaphores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreSnapshot {
    /// Free slots.
    pub free: u32,
    /// Occupied, undrained slots.
    pub used: u32,
    /// Write mutex (1 = unlocked).
    pub mutex: u32,
}

/// The three semaphores of the bounded buffer.
pub struct SemaphoreTriplet {
    /// Counts unoccupied slots; starts at the ring capacity.
    pub free_slots: NamedSemaphore,
    /// Counts occupied, unread slots; starts at zero.
    pub used_slots: NamedSemaphore,
    /// Binary exclusion for the write critical section; starts at one.
    pub write_mutex: NamedSemaphore,
}

impl SemaphoreTriplet {
    /// Exclusively create all three semaphores for a ring of `capacity`
    /// slots. If one creation fails, the ones already created are closed
    /// and unlinked on return.
    pub fn create(config: &ExchangeConfig, capacity: u32) -> ShmResult<Self> {
        let poll = config.wait_poll();
        let used_slots = NamedSemaphore::create(&config.used_semaphore, 0, poll)?;
        let free_slots = NamedSemaphore::create(&config.free_semaphore, capacity, poll)?;
        let write_mutex = NamedSemaphore::create(&config.mutex_semaphore, 1, poll)?;
        Ok(Self {
            free_slots,
            used_slots,
            write_mutex,
        })
    }

    /// Open all three existing semaphores.
    pub fn open(config: &ExchangeConfig) -> ShmResult<Self> {
        let poll = config.wait_poll();
        Ok(Self {
            used_slots: NamedSemaphore::open(&config.used_semaphore, poll)?,
            free_slots: NamedSemaphore::open(&config.free_semaphore, poll)?,
            write_mutex: NamedSemaphore::open(&config.mutex_semaphore, poll)?,
        })
    }

    /// Read all three counts.
    pub fn snapshot(&self) -> ShmResult<SemaphoreSnapshot> {
        Ok(SemaphoreSnapshot {
            free: self.free_slots.value()?,
            used: self.used_slots.value()?,
            mutex: self.write_mutex.value()?,
        })
    }

    fn each_mut(&mut self) -> [&mut NamedSemaphore; 3] {
        [
            &mut self.free_slots,
            &mut self.used_slots,
            &mut self.write_mutex,
        ]
    }

    /// Close every handle that is still open. Failures are logged and do
    /// not stop the remaining closes.
    pub fn close_all(&mut self) {
        for sem in self.each_mut() {
            if let Err(e) = sem.close() {
                warn!("Failed to close semaphore {}: {}", sem.name(), e);
            }
        }
    }

    /// Unlink every semaphore this process created.
    pub fn unlink_all(&mut self) {
        for sem in self.each_mut() {
            if let Err(e) = sem.unlink() {
                warn!("Failed to unlink semaphore {}: {}", sem.name(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(10);

    fn test_name(tag: &str) -> String {
        format!("/arcset_sem_{}_{}", tag, std::process::id())
    }

    #[test]
    fn test_create_acquire_release() {
        let sem = NamedSemaphore::create(&test_name("basic"), 2, POLL).unwrap();
        assert_eq!(sem.value().unwrap(), 2);
        assert_eq!(sem.acquire(|| false).unwrap(), WaitOutcome::Acquired);
        assert_eq!(sem.value().unwrap(), 1);
        sem.release().unwrap();
        assert_eq!(sem.value().unwrap(), 2);
    }

    #[test]
    fn test_create_is_exclusive() {
        let name = test_name("excl");
        let _first = NamedSemaphore::create(&name, 0, POLL).unwrap();
        assert!(matches!(
            NamedSemaphore::create(&name, 0, POLL),
            Err(ShmError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_open_missing() {
        assert!(matches!(
            NamedSemaphore::open(&test_name("missing"), POLL),
            Err(ShmError::NotFound { .. })
        ));
    }

    #[test]
    fn test_opened_handle_shares_count() {
        let name = test_name("shared");
        let owner = NamedSemaphore::create(&name, 0, POLL).unwrap();
        let other = NamedSemaphore::open(&name, POLL).unwrap();
        assert!(!other.is_owner());
        owner.release().unwrap();
        assert!(other.try_acquire().unwrap());
        assert!(!other.try_acquire().unwrap());
    }

    #[test]
    fn test_stop_predicate_interrupts_without_decrement() {
        let sem = NamedSemaphore::create(&test_name("stop"), 0, POLL).unwrap();
        assert_eq!(sem.acquire(|| true).unwrap(), WaitOutcome::Interrupted);
        assert_eq!(sem.value().unwrap(), 0);
    }

    #[test]
    fn test_stop_predicate_checked_between_slices() {
        let sem = NamedSemaphore::create(&test_name("slices"), 0, POLL).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let setter = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                stop.store(true, Ordering::SeqCst);
            })
        };

        let start = Instant::now();
        let outcome = sem.acquire(|| stop.load(Ordering::SeqCst)).unwrap();
        setter.join().unwrap();

        assert_eq!(outcome, WaitOutcome::Interrupted);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(sem.value().unwrap(), 0);
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        let sem = Arc::new(NamedSemaphore::create(&test_name("wake"), 0, POLL).unwrap());
        let poster = {
            let sem = Arc::clone(&sem);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                sem.release().unwrap();
            })
        };
        assert_eq!(sem.acquire(|| false).unwrap(), WaitOutcome::Acquired);
        poster.join().unwrap();
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut sem = NamedSemaphore::create(&test_name("close"), 1, POLL).unwrap();
        assert!(sem.close().unwrap());
        assert!(!sem.close().unwrap());
        assert!(!sem.is_open());
        assert!(matches!(sem.value(), Err(ShmError::Detached)));
        sem.unlink().unwrap();
        sem.unlink().unwrap();
    }

    #[test]
    fn test_triplet_initial_counts() {
        let config = ExchangeConfig::namespaced(&format!("arcset_triplet_{}", std::process::id()));
        let triplet = SemaphoreTriplet::create(&config, 4).unwrap();
        assert_eq!(
            triplet.snapshot().unwrap(),
            SemaphoreSnapshot {
                free: 4,
                used: 0,
                mutex: 1
            }
        );
    }

    #[test]
    fn test_triplet_partial_failure_releases_created() {
        let config = ExchangeConfig::namespaced(&format!("arcset_partial_{}", std::process::id()));
        // Occupy the mutex name so the third creation fails.
        let _squatter = NamedSemaphore::create(&config.mutex_semaphore, 1, POLL).unwrap();

        assert!(matches!(
            SemaphoreTriplet::create(&config, 4),
            Err(ShmError::AlreadyExists { .. })
        ));
        assert!(matches!(
            NamedSemaphore::open(&config.used_semaphore, POLL),
            Err(ShmError::NotFound { .. })
        ));
        assert!(matches!(
            NamedSemaphore::open(&config.free_semaphore, POLL),
            Err(ShmError::NotFound { .. })
        ));
    }
}
