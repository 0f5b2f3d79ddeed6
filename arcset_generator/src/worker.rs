//! Worker role loop.

use crate::candidate::{Candidate, CandidateSource};
use arcset_shm::{CancelToken, Outcome, Producer, ShmResult};
use tracing::{debug, trace};

/// Counters reported when a worker leaves its loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Records placed in the ring.
    pub submitted: u64,
    /// Oversized candidates dropped locally.
    pub discarded: u64,
    /// Submits abandoned because the run was stopping.
    pub interrupted: u64,
}

/// Producer loop: generate, filter, submit, until told to stop.
pub struct Worker<S> {
    source: S,
    max_submissions: Option<u64>,
}

impl<S: CandidateSource> Worker<S> {
    /// Worker drawing candidates from `source`, running until stopped.
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_submissions: None,
        }
    }

    /// Also stop after `limit` successful submits.
    pub fn with_max_submissions(mut self, limit: Option<u64>) -> Self {
        self.max_submissions = limit;
        self
    }

    /// Run until the token is cancelled, the coordinator publishes
    /// `Terminating`, or the submission limit is reached.
    ///
    /// # Errors
    ///
    /// Only semaphore or region failures; interruptions end the loop
    /// silently at the next check.
    pub fn run<const N: usize>(
        &mut self,
        producer: &Producer<N>,
        cancel: &CancelToken,
    ) -> ShmResult<WorkerReport> {
        let mut report = WorkerReport::default();

        while !producer.should_stop(cancel) {
            if self
                .max_submissions
                .is_some_and(|limit| report.submitted >= limit)
            {
                debug!("Submission limit reached");
                break;
            }

            let record = match self.source.next_candidate() {
                Candidate::Fits(record) => record,
                Candidate::Oversized => {
                    report.discarded += 1;
                    continue;
                }
            };

            match producer.submit(&record, cancel)? {
                Outcome::Completed(()) => {
                    report.submitted += 1;
                    trace!("Submitted candidate with {} edges", record.len());
                }
                Outcome::Interrupted => report.interrupted += 1,
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcset::arcset::{Edge, Record};
    use arcset::config::ExchangeConfig;
    use arcset_shm::Consumer;

    struct Fixed(Candidate);

    impl CandidateSource for Fixed {
        fn next_candidate(&mut self) -> Candidate {
            self.0
        }
    }

    fn config(tag: &str) -> ExchangeConfig {
        let mut config =
            ExchangeConfig::namespaced(&format!("arcset_worker_{}_{}", tag, std::process::id()));
        config.wait_poll_ms = 10;
        config
    }

    #[test]
    fn test_submission_limit() {
        let config = config("limit");
        let mut consumer = Consumer::<4>::create(&config).unwrap();
        let producer = Producer::<4>::attach(&config).unwrap();
        let cancel = CancelToken::new();

        let record = Record::from_edges(&[Edge::new(1, 0)]).unwrap();
        let mut worker = Worker::new(Fixed(Candidate::Fits(record))).with_max_submissions(Some(3));
        let report = worker.run(&producer, &cancel).unwrap();

        assert_eq!(report.submitted, 3);
        for _ in 0..3 {
            assert_eq!(consumer.drain(&cancel).unwrap(), Outcome::Completed(record));
        }
    }

    #[test]
    fn test_stops_immediately_when_cancelled() {
        let config = config("cancel");
        let _consumer = Consumer::<4>::create(&config).unwrap();
        let producer = Producer::<4>::attach(&config).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut worker = Worker::new(Fixed(Candidate::Oversized));
        assert_eq!(
            worker.run(&producer, &cancel).unwrap(),
            WorkerReport::default()
        );
    }
}
