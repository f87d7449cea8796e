//! # Deferred Edge Resolver
//!
//! Phase two of graph construction.
//!
//! Child and incoming-reference edges are recorded as plain data while the
//! datoms are ingested and only attached once every entity exists. Edges
//! whose target never materialized as a block are dropped and counted.

use crate::graph::Graph;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};

/// Which adjacency list an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `source` lists `target` in its `:block/parents`.
    Child,
    /// `source` lists `target` in its `:block/refs`.
    IncomingRef,
}

/// An edge intent recorded during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdge {
    pub kind: EdgeKind,
    /// Entity that receives the edge.
    pub target: EntityId,
    /// Entity whose fact declared the edge.
    pub source: EntityId,
}

impl PendingEdge {
    /// `source` declares `target` as an ancestor.
    #[must_use]
    pub const fn child(target: EntityId, source: EntityId) -> Self {
        Self {
            kind: EdgeKind::Child,
            target,
            source,
        }
    }

    /// `source` references `target`.
    #[must_use]
    pub const fn incoming_ref(target: EntityId, source: EntityId) -> Self {
        Self {
            kind: EdgeKind::IncomingRef,
            target,
            source,
        }
    }
}

/// Counts of attached and dropped edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    pub children_attached: usize,
    pub children_dropped: usize,
    pub refs_attached: usize,
    pub refs_dropped: usize,
}

impl ResolveStats {
    /// Total number of dropped edges.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.children_dropped.saturating_add(self.refs_dropped)
    }
}

/// Attach every pending edge to its target block, in recording order.
pub fn resolve_edges(graph: &mut Graph, edges: Vec<PendingEdge>) -> ResolveStats {
    let mut stats = ResolveStats::default();

    for edge in &edges {
        let attached = graph.attach_edge(edge);
        let counter = match (edge.kind, attached) {
            (EdgeKind::Child, true) => &mut stats.children_attached,
            (EdgeKind::Child, false) => &mut stats.children_dropped,
            (EdgeKind::IncomingRef, true) => &mut stats.refs_attached,
            (EdgeKind::IncomingRef, false) => &mut stats.refs_dropped,
        };
        *counter = counter.saturating_add(1);
    }

    stats
}

// =============================================================================
// TESTS
// =============================================================================
