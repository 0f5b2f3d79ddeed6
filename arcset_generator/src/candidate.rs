//! Candidate feedback arc sets.
//!
//! [`RandomOrdering`] draws a random vertex ordering and proposes every edge
//! that points backwards in it. Removing those edges leaves only edges that
//! agree with the ordering, so the rest of the graph is acyclic.

use arcset::arcset::{Edge, Record};
use arcset::consts::CAPACITY_MAX;
use arcset::graph::Graph;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// One proposal from a [`CandidateSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Fits in a ring slot.
    Fits(Record),
    /// Needs more than `CAPACITY_MAX` edges; never submitted.
    Oversized,
}

impl Candidate {
    /// Classify an explicit edge list.
    pub fn from_edges(edges: &[Edge]) -> Self {
        match Record::from_edges(edges) {
            Ok(record) => Candidate::Fits(record),
            Err(_) => Candidate::Oversized,
        }
    }
}

/// Anything that can keep proposing candidates.
pub trait CandidateSource {
    /// Produce the next candidate.
    fn next_candidate(&mut self) -> Candidate;
}

/// Random-permutation candidate generator.
///
/// Vertices are renumbered densely at construction, so sparse identifiers
/// like `0-4000000000` cost two slots rather than four billion.
pub struct RandomOrdering<R: Rng = StdRng> {
    edges: Vec<(Edge, usize, usize)>,
    order: Vec<usize>,
    position: Vec<usize>,
    rng: R,
}

impl RandomOrdering<StdRng> {
    /// Generator seeded from the OS.
    pub fn new(graph: &Graph) -> Self {
        Self::with_rng(graph, StdRng::from_entropy())
    }

    /// Deterministic generator.
    pub fn with_seed(graph: &Graph, seed: u64) -> Self {
        Self::with_rng(graph, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomOrdering<R> {
    /// Generator drawing from `rng`.
    pub fn with_rng(graph: &Graph, rng: R) -> Self {
        let mut dense: HashMap<u32, usize> = HashMap::new();
        let mut index = |vertex: u32| {
            let next = dense.len();
            *dense.entry(vertex).or_insert(next)
        };
        let edges: Vec<_> = graph
            .edges()
            .iter()
            .map(|&edge| (edge, index(edge.a), index(edge.b)))
            .collect();

        let vertices = dense.len();
        Self {
            edges,
            order: (0..vertices).collect(),
            position: vec![0; vertices],
            rng,
        }
    }

    /// Number of distinct vertices being ordered.
    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }
}

impl<R: Rng> CandidateSource for RandomOrdering<R> {
    fn next_candidate(&mut self) -> Candidate {
        self.order.shuffle(&mut self.rng);
        for (rank, &vertex) in self.order.iter().enumerate() {
            self.position[vertex] = rank;
        }

        let mut chosen: heapless::Vec<Edge, CAPACITY_MAX> = heapless::Vec::new();
        for &(edge, a, b) in &self.edges {
            // Self-loops compare equal and are never chosen.
            if self.position[b] < self.position[a] && chosen.push(edge).is_err() {
                return Candidate::Oversized;
            }
        }
        Candidate::Fits(Record::from(chosen))
    }
}
