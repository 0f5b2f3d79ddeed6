//! Command-line graph parsing.
//!
//! A graph is given as one token per edge, `"<a>-<b>"`, where both vertex
//! identifiers are non-negative decimal integers.

use crate::arcset::Edge;
use std::str::FromStr;
use thiserror::Error;

/// Malformed graph input. Always fatal, reported before any shared
/// resource is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// A token is not of the form `<uint>-<uint>`.
    #[error("malformed edge token {token:?}, expected <uint>-<uint>")]
    MalformedEdge {
        /// Offending token.
        token: String,
    },

    /// No edge token was supplied.
    #[error("no edges supplied, expected at least one <uint>-<uint> token")]
    NoEdges,
}

impl FromStr for Edge {
    type Err = InputError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let malformed = || InputError::MalformedEdge {
            token: token.to_string(),
        };
        let (a, b) = token.split_once('-').ok_or_else(malformed)?;
        Ok(Edge::new(
            parse_vertex(a).ok_or_else(malformed)?,
            parse_vertex(b).ok_or_else(malformed)?,
        ))
    }
}

/// Digits only: `u32::from_str` would also accept a leading `+`.
fn parse_vertex(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Directed graph as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    edges: Vec<Edge>,
    max_vertex: u32,
}

impl Graph {
    /// Parse a graph from edge tokens.
    ///
    /// # Errors
    ///
    /// - [`InputError::NoEdges`] if `tokens` is empty
    /// - [`InputError::MalformedEdge`] for the first token that does not parse
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let edges = tokens
            .into_iter()
            .map(|t| t.as_ref().parse::<Edge>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_edges(edges)
    }

    /// Build a graph from already parsed edges.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::NoEdges`] if `edges` is empty.
    pub fn from_edges(edges: Vec<Edge>) -> Result<Self, InputError> {
        let max_vertex = edges
            .iter()
            .map(|e| e.a.max(e.b))
            .max()
            .ok_or(InputError::NoEdges)?;
        Ok(Self { edges, max_vertex })
    }

    /// Edges in input order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Largest vertex identifier appearing in any edge.
    pub fn max_vertex(&self) -> u32 {
        self.max_vertex
    }

    /// Number of vertices `0..=max_vertex`.
    pub fn vertex_count(&self) -> usize {
        self.max_vertex as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_edge() {
        assert_eq!("0-1".parse::<Edge>().unwrap(), Edge::new(0, 1));
        assert_eq!("12-7".parse::<Edge>().unwrap(), Edge::new(12, 7));
    }

    #[test]
    fn test_parse_edge_rejects_malformed() {
        for token in ["", "1", "1-", "-1", "-1-2", "1-2-3", "a-b", "+1-2", "1- 2", "1-2x"] {
            assert!(
                matches!(token.parse::<Edge>(), Err(InputError::MalformedEdge { .. })),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_edge_rejects_overflow() {
        assert!("4294967296-0".parse::<Edge>().is_err());
        assert!("4294967295-0".parse::<Edge>().is_ok());
    }

    #[test]
    fn test_graph_from_tokens() {
        let graph = Graph::from_tokens(["0-1", "1-2", "2-0"]).unwrap();
        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.max_vertex(), 2);
        assert_eq!(graph.vertex_count(), 3);
    }

    #[test]
    fn test_graph_requires_edges() {
        let empty: [&str; 0] = [];
        assert_eq!(Graph::from_tokens(empty), Err(InputError::NoEdges));
    }

    #[test]
    fn test_graph_reports_first_bad_token() {
        let err = Graph::from_tokens(["0-1", "x-2", "y"]).unwrap_err();
        assert_eq!(
            err,
            InputError::MalformedEdge {
                token: "x-2".to_string()
            }
        );
    }

    proptest! {
        #[test]
        fn prop_edge_display_parses_back(a in any::<u32>(), b in any::<u32>()) {
            let edge = Edge::new(a, b);
            prop_assert_eq!(edge.to_string().parse::<Edge>().unwrap(), edge);
        }

        #[test]
        fn prop_garbage_never_panics(token in "\\PC*") {
            let _ = token.parse::<Edge>();
        }
    }
}
