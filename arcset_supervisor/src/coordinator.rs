//! Coordinator role loop.
//!
//! Drains the ring, reports every new smallest arc set and ends the run
//! once an empty arc set has been reported. Whichever way the loop ends, the status
//! flag is set to `Terminating` first so workers stop as well.

use crate::report::SolutionSink;
use arcset::arcset::Record;
use arcset_shm::{CancelToken, Consumer, Outcome, ShmResult};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Best solution seen so far. Starts above any legitimate size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestKnown {
    best: Option<Record>,
}

impl BestKnown {
    /// Nothing seen yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `record` if it is strictly smaller than the current best.
    /// Returns `true` if it was kept.
    pub fn offer(&mut self, record: &Record) -> bool {
        match self.best {
            Some(best) if best.len() <= record.len() => false,
            _ => {
                self.best = Some(*record);
                true
            }
        }
    }

    /// Current best, if any.
    pub fn best(&self) -> Option<&Record> {
        self.best.as_ref()
    }

    /// `true` once an empty arc set has been kept.
    pub fn is_acyclic(&self) -> bool {
        self.best.is_some_and(|best| best.is_empty())
    }
}

/// What a finished run amounted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records taken from the ring.
    pub drained: u64,
    /// Times the best solution improved.
    pub improvements: u64,
    /// Final best solution.
    pub best: Option<Record>,
    /// The graph was found to be acyclic.
    pub acyclic: bool,
}

/// Single consumer of the ring plus best-known tracking.
pub struct Coordinator<const N: usize> {
    consumer: Consumer<N>,
    best: BestKnown,
}

impl<const N: usize> Coordinator<N> {
    /// Coordinator over an already created ring.
    pub fn new(consumer: Consumer<N>) -> Self {
        Self {
            consumer,
            best: BestKnown::new(),
        }
    }

    /// Drain until the graph is shown acyclic or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Semaphore or region failures. `Terminating` is still published on
    /// this path.
    pub fn run(
        &mut self,
        cancel: &CancelToken,
        sink: &mut dyn SolutionSink,
    ) -> ShmResult<RunSummary> {
        let mut summary = RunSummary::default();
        let result = self.drain_loop(cancel, sink, &mut summary);

        if let Err(e) = self.consumer.set_terminating() {
            warn!("Failed to publish terminating status: {}", e);
        }
        result?;

        summary.best = self.best.best().copied();
        info!(
            "Coordinator done: {} drained, {} improvements",
            summary.drained, summary.improvements
        );
        Ok(summary)
    }

    fn drain_loop(
        &mut self,
        cancel: &CancelToken,
        sink: &mut dyn SolutionSink,
        summary: &mut RunSummary,
    ) -> ShmResult<()> {
        while !cancel.is_cancelled() {
            let record = match self.consumer.drain(cancel)? {
                Outcome::Completed(record) => record,
                Outcome::Interrupted => continue,
            };
            summary.drained += 1;

            if !self.best.offer(&record) {
                continue;
            }
            summary.improvements += 1;
            debug!("New best with {} edges", record.len());

            if let Err(e) = sink.improved(&record) {
                warn!("Failed to report result: {}", e);
            }
            if record.is_empty() {
                summary.acyclic = true;
                if let Err(e) = sink.acyclic() {
                    warn!("Failed to report result: {}", e);
                }
                break;
            }
        }
        Ok(())
    }

    /// Best solution so far.
    pub fn best(&self) -> &BestKnown {
        &self.best
    }

    /// The underlying consumer.
    pub fn consumer(&self) -> &Consumer<N> {
        &self.consumer
    }

    /// Unmap, close and unlink the ring.
    pub fn teardown(&mut self) {
        self.consumer.teardown();
    }
}
