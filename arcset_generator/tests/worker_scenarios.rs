//! Worker loop against a live ring.

use arcset::arcset::{Edge, Record};
use arcset::config::ExchangeConfig;
use arcset::graph::Graph;
use arcset_generator::{Candidate, CandidateSource, RandomOrdering, Worker};
use arcset_shm::{CancelToken, Consumer, Outcome, Producer};
use std::collections::VecDeque;
use std::time::Duration;

const CAPACITY: usize = 4;

fn config(tag: &str) -> ExchangeConfig {
    let mut config =
        ExchangeConfig::namespaced(&format!("arcset_gen_{}_{}", tag, std::process::id()));
    config.wait_poll_ms = 10;
    config
}

/// Replays a fixed list of candidates, then cancels the run.
struct Scripted {
    queue: VecDeque<Candidate>,
    cancel: CancelToken,
}

impl CandidateSource for Scripted {
    fn next_candidate(&mut self) -> Candidate {
        self.queue.pop_front().unwrap_or_else(|| {
            self.cancel.cancel();
            Candidate::Oversized
        })
    }
}

#[test]
fn oversized_candidate_is_never_drained() {
    let config = config("oversized");
    let mut consumer = Consumer::<CAPACITY>::create(&config).unwrap();
    let producer = Producer::<CAPACITY>::attach(&config).unwrap();
    let cancel = CancelToken::new();

    let nine: Vec<Edge> = (0..9).map(|i| Edge::new(i + 1, i)).collect();
    let small = Record::from_edges(&[Edge::new(1, 0)]).unwrap();
    let source = Scripted {
        queue: VecDeque::from([Candidate::from_edges(&nine), Candidate::Fits(small)]),
        cancel: cancel.clone(),
    };

    let report = Worker::new(source).run(&producer, &cancel).unwrap();
    assert_eq!(report.submitted, 1);
    assert!(report.discarded >= 1);

    let drain_cancel = CancelToken::new();
    assert_eq!(
        consumer.drain(&drain_cancel).unwrap(),
        Outcome::Completed(small)
    );
    assert_eq!(consumer.snapshot().unwrap().used, 0);
}

#[test]
fn graph_needing_nine_edges_submits_nothing() {
    let config = config("nine");
    let consumer = Consumer::<CAPACITY>::create(&config).unwrap();
    let producer = Producer::<CAPACITY>::attach(&config).unwrap();

    // Nine disjoint two-cycles: every candidate has exactly nine edges.
    let tokens: Vec<String> = (0..9u32)
        .flat_map(|i| [format!("{}-{}", 2 * i, 2 * i + 1), format!("{}-{}", 2 * i + 1, 2 * i)])
        .collect();
    let graph = Graph::from_tokens(&tokens).unwrap();

    let cancel = CancelToken::new();
    let canceller = {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        })
    };
    let report = Worker::new(RandomOrdering::with_seed(&graph, 11))
        .run(&producer, &cancel)
        .unwrap();
    canceller.join().unwrap();

    assert_eq!(report.submitted, 0);
    assert!(report.discarded > 0);
    assert_eq!(consumer.snapshot().unwrap().used, 0);
}

#[test]
fn worker_leaves_when_coordinator_terminates() {
    let config = config("terminate");
    let consumer = Consumer::<CAPACITY>::create(&config).unwrap();
    let producer = Producer::<CAPACITY>::attach(&config).unwrap();
    let graph = Graph::from_tokens(["0-1", "1-2", "2-0"]).unwrap();

    let worker = std::thread::spawn(move || {
        Worker::new(RandomOrdering::with_seed(&graph, 5)).run(&producer, &CancelToken::new())
    });
    std::thread::sleep(Duration::from_millis(50));
    consumer.set_terminating().unwrap();

    let report = worker.join().unwrap().unwrap();
    // Ring of four fills up, then the blocked submit is released.
    assert_eq!(report.submitted, CAPACITY as u64);
    assert_eq!(consumer.snapshot().unwrap().used, CAPACITY as u32);
}
