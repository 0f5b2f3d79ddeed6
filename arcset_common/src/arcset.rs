//! Candidate arc set value types.
//!
//! [`Edge`] and [`Record`] are plain `#[repr(C)]` values: they are copied by
//! value into and out of shared memory slots, so their layout must be
//! identical in every process attached to the ring.

use crate::consts::CAPACITY_MAX;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use static_assertions::const_assert_eq;
use std::fmt;
use thiserror::Error;

/// Directed edge `a -> b` between two vertex identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct Edge {
    /// Source vertex.
    pub a: u32,
    /// Destination vertex.
    pub b: u32,
}

impl Edge {
    /// Create an edge `a -> b`.
    #[inline]
    pub const fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }

    /// Returns `true` for an edge whose endpoints coincide.
    #[inline]
    pub const fn is_self_loop(&self) -> bool {
        self.a == self.b
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// A candidate would hold more edges than a record slot can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("candidate has {edges} edges, a record holds at most {CAPACITY_MAX}")]
pub struct CapacityExceeded {
    /// Number of edges the candidate needed.
    pub edges: usize,
}

/// Candidate feedback arc set: at most [`CAPACITY_MAX`] edges.
///
/// The only way to build a `Record` is through constructors that enforce
/// `size <= CAPACITY_MAX`, so every value that reaches the ring is valid.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Record {
    size: u32,
    edges: [Edge; CAPACITY_MAX],
}

const_assert_eq!(core::mem::size_of::<Edge>(), 8);
const_assert_eq!(core::mem::size_of::<Record>(), 4 + 8 * CAPACITY_MAX);

impl Record {
    /// Record with no edges. Draining one means the graph is acyclic.
    pub const fn empty() -> Self {
        Self {
            size: 0,
            edges: [Edge::new(0, 0); CAPACITY_MAX],
        }
    }

    /// Build a record from a slice of edges.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceeded`] if `edges.len() > CAPACITY_MAX`.
    pub fn from_edges(edges: &[Edge]) -> Result<Self, CapacityExceeded> {
        if edges.len() > CAPACITY_MAX {
            return Err(CapacityExceeded { edges: edges.len() });
        }
        let mut record = Self::empty();
        record.edges[..edges.len()].copy_from_slice(edges);
        record.size = edges.len() as u32;
        Ok(record)
    }

    /// Append one edge.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceeded`] when the record is already full; the
    /// record is left unchanged.
    pub fn try_push(&mut self, edge: Edge) -> Result<(), CapacityExceeded> {
        let len = self.len();
        if len == CAPACITY_MAX {
            return Err(CapacityExceeded { edges: len + 1 });
        }
        self.edges[len] = edge;
        self.size += 1;
        Ok(())
    }

    /// Number of edges in the record.
    ///
    /// Clamped to [`CAPACITY_MAX`] so that a corrupted slot read from shared
    /// memory can never index out of bounds.
    #[inline]
    pub fn len(&self) -> usize {
        (self.size as usize).min(CAPACITY_MAX)
    }

    /// Returns `true` if the record carries no edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The edges of the record.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges[..self.len()]
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<heapless::Vec<Edge, CAPACITY_MAX>> for Record {
    fn from(edges: heapless::Vec<Edge, CAPACITY_MAX>) -> Self {
        let mut record = Self::empty();
        record.edges[..edges.len()].copy_from_slice(&edges);
        record.size = edges.len() as u32;
        record
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("size", &self.size)
            .field("edges", &self.edges())
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, edge) in self.edges().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{edge}")?;
        }
        Ok(())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Record", 2)?;
        state.serialize_field("size", &self.len())?;
        state.serialize_field("edges", self.edges())?;
        state.end()
    }
}
