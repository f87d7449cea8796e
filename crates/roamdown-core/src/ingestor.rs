//! # Ingestor Module
//!
//! Phase one of graph construction.
//!
//! - Single linear pass over the datoms, in export order
//! - Lazily creates one entity per id and appends every fact to it
//! - Establishes block identity (`:block/uid`) and page identity (`:node/title`)
//! - Records `:block/parents` and `:block/refs` as pending edges, because
//!   their targets may not exist yet
//!
//! [`Ingestor::finish`] hands the pending edges to the resolver (phase two).

use crate::formats::Snapshot;
use crate::graph::Graph;
use crate::primitives::{ATTR_BLOCK_PARENTS, ATTR_BLOCK_REFS, ATTR_BLOCK_UID, ATTR_NODE_TITLE};
use crate::resolver::{self, PendingEdge};
use crate::types::{Datom, EntityId, FactValue, Keyword, RoamError, SchemaEntry};
use std::collections::BTreeMap;

/// Identity effect of one datom, decided before the fact is stored.
enum Effect {
    None,
    Block(String),
    Page(String),
    Edge(PendingEdge),
}

/// The Ingestor builds the entity arena and queues deferred edges.
pub struct Ingestor {
    graph: Graph,
    pending: Vec<PendingEdge>,
}

impl Ingestor {
    /// Create an ingestor for a snapshot with the given schema table.
    #[must_use]
    pub fn new(schema: BTreeMap<Keyword, SchemaEntry>) -> Self {
        Self {
            graph: Graph::with_schema(schema),
            pending: Vec::new(),
        }
    }

    /// Run both construction phases over a decoded snapshot.
    pub fn build(snapshot: Snapshot) -> Result<Graph, RoamError> {
        let mut ingestor = Self::new(snapshot.schema);
        ingestor.ingest_all(snapshot.datoms)?;
        Ok(ingestor.finish())
    }

    /// Ingest a single datom.
    ///
    /// Returns `InvalidFactValue` if a specially handled attribute carries a
    /// value of the wrong type, and `ConflictingBlockUid`/`DuplicateBlockUid`
    /// if block identity would become ambiguous.
    pub fn ingest(&mut self, datom: Datom) -> Result<(), RoamError> {
        let (entity, fact) = datom.into_fact();
        let effect = Self::classify(entity, &fact.attribute, &fact.value)?;

        // Get or create the entity, then record the fact
        self.graph.entity_mut_or_insert(entity).push_fact(fact);

        match effect {
            Effect::None => {}
            Effect::Block(uid) => self.graph.bind_block(entity, &uid)?,
            Effect::Page(title) => self.graph.insert_page(&title, entity),
            Effect::Edge(edge) => self.pending.push(edge),
        }

        Ok(())
    }

    /// Ingest a sequence of datoms in order, stopping at the first error.
    pub fn ingest_all(
        &mut self,
        datoms: impl IntoIterator<Item = Datom>,
    ) -> Result<(), RoamError> {
        for datom in datoms {
            self.ingest(datom)?;
        }
        Ok(())
    }

    /// Edges waiting for phase two, in the order they were recorded.
    #[must_use]
    pub fn pending_edges(&self) -> &[PendingEdge] {
        &self.pending
    }

    /// Resolve pending edges and return the finished, read-only graph.
    #[must_use]
    pub fn finish(self) -> Graph {
        let Self { mut graph, pending } = self;
        let stats = resolver::resolve_edges(&mut graph, pending);
        graph.set_resolve_stats(stats);
        graph
    }

    fn classify(
        entity: EntityId,
        attribute: &Keyword,
        value: &FactValue,
    ) -> Result<Effect, RoamError> {
        let expect = |expected: &'static str| RoamError::InvalidFactValue {
            entity,
            attribute: attribute.clone(),
            expected,
            found: value.type_name(),
        };

        let effect = match attribute.as_str() {
            ATTR_BLOCK_UID => {
                let uid = value.as_str().ok_or_else(|| expect("string"))?;
                Effect::Block(uid.to_string())
            }
            ATTR_NODE_TITLE => {
                let title = value.as_str().ok_or_else(|| expect("string"))?;
                Effect::Page(title.to_string())
            }
            ATTR_BLOCK_PARENTS => {
                let target = value.as_entity().ok_or_else(|| expect("integer"))?;
                Effect::Edge(PendingEdge::child(target, entity))
            }
            ATTR_BLOCK_REFS => {
                let target = value.as_entity().ok_or_else(|| expect("integer"))?;
                Effect::Edge(PendingEdge::incoming_ref(target, entity))
            }
            _ => Effect::None,
        };
        Ok(effect)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::EdgeKind;
    use crate::types::TransactionId;

    fn datom(entity: i64, attr: &str, value: FactValue) -> Datom {
        Datom::new(EntityId(entity), Keyword::new(attr), value, TransactionId(1))
    }

    fn text(s: &str) -> FactValue {
        FactValue::Str(s.to_string())
    }

    #[test]
    fn ingest_creates_entity_lazily() {
        let mut ingestor = Ingestor::new(BTreeMap::new());
        ingestor
            .ingest(datom(7, "block/string", text("hello")))
            .expect("ingest");
        ingestor
            .ingest(datom(7, "block/order", FactValue::Int(3)))
            .expect("ingest");

        let graph = ingestor.finish();
        assert_eq!(graph.entity_count(), 1);
        assert_eq!(
            graph.entity(EntityId(7)).expect("entity").facts().len(),
            2
        );
        assert_eq!(graph.block_count(), 0);
    }

    #[test]
    fn ingest_queues_edges_in_order() {
        let mut ingestor = Ingestor::new(BTreeMap::new());
        ingestor
            .ingest(datom(5, "block/parents", FactValue::Int(3)))
            .expect("ingest");
        ingestor
            .ingest(datom(5, "block/refs", FactValue::Int(1)))
            .expect("ingest");

        let pending = ingestor.pending_edges();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].kind, EdgeKind::Child);
        assert_eq!(pending[0].target, EntityId(3));
        assert_eq!(pending[0].source, EntityId(5));
        assert_eq!(pending[1].kind, EdgeKind::IncomingRef);
    }

    #[test]
    fn repeated_uid_on_same_entity_is_noop() {
        let mut ingestor = Ingestor::new(BTreeMap::new());
        ingestor
            .ingest(datom(1, "block/uid", text("a")))
            .expect("first");
        ingestor
            .ingest(datom(1, "block/uid", text("a")))
            .expect("second");
        assert_eq!(ingestor.finish().block_count(), 1);
    }

    #[test]
    fn conflicting_uid_is_rejected() {
        let mut ingestor = Ingestor::new(BTreeMap::new());
        ingestor
            .ingest(datom(1, "block/uid", text("a")))
            .expect("first");
        let err = ingestor
            .ingest(datom(1, "block/uid", text("b")))
            .expect_err("conflict");
        assert!(matches!(err, RoamError::ConflictingBlockUid { .. }));
    }

    #[test]
    fn duplicate_uid_across_entities_is_rejected() {
        let mut ingestor = Ingestor::new(BTreeMap::new());
        ingestor
            .ingest(datom(1, "block/uid", text("a")))
            .expect("first");
        let err = ingestor
            .ingest(datom(2, "block/uid", text("a")))
            .expect_err("duplicate");
        assert!(matches!(
            err,
            RoamError::DuplicateBlockUid { existing: EntityId(1), incoming: EntityId(2), .. }
        ));
    }

    #[test]
    fn wrong_value_types_are_rejected() {
        let mut ingestor = Ingestor::new(BTreeMap::new());
        assert!(matches!(
            ingestor.ingest(datom(1, "block/uid", FactValue::Int(4))),
            Err(RoamError::InvalidFactValue { expected: "string", .. })
        ));
        assert!(matches!(
            ingestor.ingest(datom(1, "block/parents", text("x"))),
            Err(RoamError::InvalidFactValue { expected: "integer", .. })
        ));
    }
}
