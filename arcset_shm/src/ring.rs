//! Bounded multi-producer / single-consumer ring.
//!
//! ```text
//!  Producer::submit                       Consumer::drain
//!  ───────────────                        ───────────────
//!  acquire free_slots ─┐                  acquire used_slots
//!  acquire write_mutex │ undo free on     copy slots[read_cursor]
//!  slots[write_cursor] │ interrupt        release free_slots
//!  advance write_cursor┘                  read_cursor += 1 (mod N)
//!  release write_mutex
//!  release used_slots
//! ```
//!
//! Each `submit` / `drain` is atomic with respect to interruption: it either
//! completes or returns [`Outcome::Interrupted`] with semaphore counts and
//! both cursors unchanged.

use crate::error::ShmResult;
use crate::exchange::Exchange;
use crate::lifecycle::CancelToken;
use crate::region::RingStatus;
use crate::semaphore::{SemaphoreSnapshot, SemaphoreTriplet, WaitOutcome};
use arcset::arcset::Record;
use arcset::config::ExchangeConfig;

/// Result of a blocking ring operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Operation finished.
    Completed(T),
    /// A wait was abandoned; nothing changed.
    Interrupted,
}

impl<T> Outcome<T> {
    /// `true` for [`Outcome::Interrupted`].
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Outcome::Interrupted)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Interrupted => None,
        }
    }
}

/// Worker side of the ring.
pub struct Producer<const N: usize> {
    exchange: Exchange<N>,
}

impl<const N: usize> Producer<N> {
    /// Attach to a running coordinator's ring.
    pub fn attach(config: &ExchangeConfig) -> ShmResult<Self> {
        Ok(Self {
            exchange: Exchange::attach(config)?,
        })
    }

    /// `true` if the token is cancelled or the coordinator published
    /// `Terminating`. A detached exchange also counts as stopped.
    pub fn should_stop(&self, cancel: &CancelToken) -> bool {
        cancel.is_cancelled()
            || !matches!(self.exchange.status(), Ok(RingStatus::Running))
    }

    /// Copy `record` into the next free slot.
    ///
    /// Blocks while the ring is full. Returns `Interrupted` if the token is
    /// cancelled, the run is terminating, or a signal arrives while waiting.
    pub fn submit(&self, record: &Record, cancel: &CancelToken) -> ShmResult<Outcome<()>> {
        let layout = self.exchange.region().layout()?;
        let sems = self.exchange.semaphores();
        let stop = || self.should_stop(cancel);

        if sems.free_slots.acquire(stop)? == WaitOutcome::Interrupted {
            return Ok(Outcome::Interrupted);
        }
        match sems.write_mutex.acquire(stop) {
            Ok(WaitOutcome::Acquired) => {}
            Ok(WaitOutcome::Interrupted) => {
                sems.free_slots.release()?;
                return Ok(Outcome::Interrupted);
            }
            Err(e) => {
                sems.free_slots.release()?;
                return Err(e);
            }
        }

        // SAFETY: holding write_mutex and one free-slot permit.
        unsafe { layout.write_and_advance(record) };

        publish(sems)?;
        Ok(Outcome::Completed(()))
    }

    /// Shared run status.
    pub fn status(&self) -> ShmResult<RingStatus> {
        self.exchange.status()
    }

    /// Underlying exchange.
    pub fn exchange(&self) -> &Exchange<N> {
        &self.exchange
    }

    /// Unmap and close. Never unlinks.
    pub fn teardown(&mut self) {
        self.exchange.teardown();
    }
}

/// Leave the write section and publish the slot. Both releases are
/// attempted; the first failure is returned.
fn publish(sems: &SemaphoreTriplet) -> ShmResult<()> {
    let unlocked = sems.write_mutex.release();
    let published = sems.used_slots.release();
    unlocked.and(published)
}

/// Coordinator side of the ring.
///
/// Creating a consumer creates the region and semaphores exclusively, so at
/// most one consumer can exist per set of names.
pub struct Consumer<const N: usize> {
    exchange: Exchange<N>,
    read_cursor: usize,
}

impl<const N: usize> Consumer<N> {
    /// Create the ring and become its only reader.
    pub fn create(config: &ExchangeConfig) -> ShmResult<Self> {
        Ok(Self {
            exchange: Exchange::create(config)?,
            read_cursor: 0,
        })
    }

    /// Take the oldest undrained record.
    ///
    /// Blocks while the ring is empty. Returns `Interrupted` if the token is
    /// cancelled or a signal arrives while waiting.
    pub fn drain(&mut self, cancel: &CancelToken) -> ShmResult<Outcome<Record>> {
        let layout = self.exchange.region().layout()?;
        let sems = self.exchange.semaphores();

        if sems.used_slots.acquire(|| cancel.is_cancelled())? == WaitOutcome::Interrupted {
            return Ok(Outcome::Interrupted);
        }

        // SAFETY: one used-slot permit covers `read_cursor`; only this
        // consumer reads.
        let record = unsafe { layout.read(self.read_cursor) };
        sems.free_slots.release()?;
        self.read_cursor = (self.read_cursor + 1) % N;
        Ok(Outcome::Completed(record))
    }

    /// Publish `Terminating` to every worker.
    pub fn set_terminating(&self) -> ShmResult<()> {
        self.exchange.set_terminating()
    }

    /// Shared run status.
    pub fn status(&self) -> ShmResult<RingStatus> {
        self.exchange.status()
    }

    /// Next slot this consumer will read.
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Current semaphore counts.
    pub fn snapshot(&self) -> ShmResult<SemaphoreSnapshot> {
        self.exchange.semaphores().snapshot()
    }

    /// Underlying exchange.
    pub fn exchange(&self) -> &Exchange<N> {
        &self.exchange
    }

    /// Unmap, close and unlink everything.
    pub fn teardown(&mut self) {
        self.exchange.teardown();
    }
}
