//! Comparison topology
//!
//! Named participants and the ordered consistency obligations between them.
//! The topology is fixed for the duration of an audit run; it may form an
//! open chain or a closed cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::signal::Signal;

/// Ordered pair of node names asserting that both ends report the same state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Node set plus ordered edge list for one audit run.
///
/// Nodes hold plain numeric vectors so the auditor can detect dimension
/// mismatches instead of silently assuming signal shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    nodes: BTreeMap<String, Vec<f64>>,
    edges: Vec<Edge>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Topology::insert_node`].
    pub fn with_node(mut self, name: impl Into<String>, vector: Vec<f64>) -> Self {
        self.insert_node(name, vector);
        self
    }

    /// Builder form of [`Topology::push_edge`].
    pub fn with_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.push_edge(Edge::new(from, to));
        self
    }

    pub fn insert_node(&mut self, name: impl Into<String>, vector: Vec<f64>) {
        self.nodes.insert(name.into(), vector);
    }

    /// Insert a node holding a validated signal's numeric fields.
    pub fn insert_signal(&mut self, name: impl Into<String>, signal: &Signal) {
        self.insert_node(name, signal.vector().as_array().to_vec());
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Append edges linking `names` in order, closing the loop back to the
    /// first name. Nodes are not created here; unknown names are reported at
    /// audit time.
    pub fn link_cycle<S: AsRef<str>>(&mut self, names: &[S]) {
        for pair in names.windows(2) {
            self.push_edge(Edge::new(pair[0].as_ref(), pair[1].as_ref()));
        }
        if names.len() > 1 {
            let last = names[names.len() - 1].as_ref();
            let first = names[0].as_ref();
            self.push_edge(Edge::new(last, first));
        }
    }

    /// Append edges linking `names` in order without closing the loop.
    pub fn link_chain<S: AsRef<str>>(&mut self, names: &[S]) {
        for pair in names.windows(2) {
            self.push_edge(Edge::new(pair[0].as_ref(), pair[1].as_ref()));
        }
    }

    pub fn node(&self, name: &str) -> Option<&[f64]> {
        self.nodes.get(name).map(Vec::as_slice)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.nodes.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
