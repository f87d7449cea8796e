//! # Block Graph
//!
//! The immutable entity/block/page arena reconstructed from a snapshot.
//!
//! All storage uses `BTreeMap` for deterministic ordering. Adjacency between
//! blocks is stored as entity ids and resolved by lookup; no block owns
//! another. The graph is only mutable inside the crate while the
//! [`Ingestor`](crate::ingestor::Ingestor) and the resolver run.

use crate::formats::{Snapshot, decode_snapshot};
use crate::ingestor::Ingestor;
use crate::primitives::{
    ATTR_BLOCK_ORDER, ATTR_BLOCK_PARENTS, ATTR_BLOCK_REFS, ATTR_BLOCK_STRING,
};
use crate::resolver::{EdgeKind, PendingEdge, ResolveStats};
use crate::types::{EntityId, Fact, FactValue, Keyword, RoamError, SchemaEntry};
use std::collections::BTreeMap;

// =============================================================================
// ENTITY
// =============================================================================

/// An entity and every fact recorded on it, in export order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    facts: Vec<Fact>,
    block_uid: Option<String>,
}

impl Entity {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            facts: Vec::new(),
            block_uid: None,
        }
    }

    /// The entity identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// All facts, duplicates included.
    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// The block uid, once a `:block/uid` fact has been seen.
    #[must_use]
    pub fn block_uid(&self) -> Option<&str> {
        self.block_uid.as_deref()
    }

    /// Values of one attribute, in export order.
    pub fn values<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a FactValue> + 'a {
        self.facts
            .iter()
            .filter(move |fact| fact.attribute.as_str() == attribute)
            .map(|fact| &fact.value)
    }

    pub(crate) fn push_fact(&mut self, fact: Fact) {
        self.facts.push(fact);
    }
}

// =============================================================================
// BLOCK & PAGE
// =============================================================================

/// A block: the view over one entity keyed by its `:block/uid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    uid: String,
    entity: EntityId,
    /// Entities whose `:block/parents` names this block.
    children: Vec<EntityId>,
    /// Entities whose `:block/refs` names this block.
    incoming_refs: Vec<EntityId>,
}

impl Block {
    fn new(uid: String, entity: EntityId) -> Self {
        Self {
            uid,
            entity,
            children: Vec::new(),
            incoming_refs: Vec::new(),
        }
    }

    /// The block uid.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The entity this block is a view over.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Raw child edges in resolution order.
    #[must_use]
    pub fn child_entities(&self) -> &[EntityId] {
        &self.children
    }

    /// Raw incoming reference edges in resolution order.
    #[must_use]
    pub fn incoming_ref_entities(&self) -> &[EntityId] {
        &self.incoming_refs
    }
}

/// A page title aliasing the entity that carries the `:node/title` fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    title: String,
    entity: EntityId,
}

impl Page {
    /// The page title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The titled entity.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// The reconstructed block graph.
///
/// Built once from a snapshot; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Attribute -> schema declaration, as exported.
    schema: BTreeMap<Keyword, SchemaEntry>,

    /// EntityId -> Entity
    entities: BTreeMap<EntityId, Entity>,

    /// Block uid -> Block
    blocks: BTreeMap<String, Block>,

    /// Page title -> Page
    pages: BTreeMap<String, Page>,

    /// Outcome of deferred edge resolution.
    stats: ResolveStats,
}

impl Graph {
    /// Build a graph from decoded snapshot data.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, RoamError> {
        Ingestor::build(snapshot)
    }

    /// Decode snapshot text and build its graph.
    pub fn parse(text: &str) -> Result<Self, RoamError> {
        Self::from_snapshot(decode_snapshot(text)?)
    }

    pub(crate) fn with_schema(schema: BTreeMap<Keyword, SchemaEntry>) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    // -------------------------------------------------------------------------
    // Counts & iteration
    // -------------------------------------------------------------------------

    /// Number of distinct entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Schema table of the export.
    #[must_use]
    pub fn schema(&self) -> &BTreeMap<Keyword, SchemaEntry> {
        &self.schema
    }

    /// Statistics of deferred edge resolution.
    #[must_use]
    pub fn resolve_stats(&self) -> ResolveStats {
        self.stats
    }

    /// All entities ordered by id.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All blocks ordered by uid.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// All pages ordered by title.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Lookup an entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Lookup a block by uid.
    #[must_use]
    pub fn find_block(&self, uid: &str) -> Option<&Block> {
        self.blocks.get(uid)
    }

    /// Lookup a block by uid, failing with `BlockNotFound`.
    pub fn block(&self, uid: &str) -> Result<&Block, RoamError> {
        self.find_block(uid)
            .ok_or_else(|| RoamError::BlockNotFound(uid.to_string()))
    }

    /// The block view of an entity, if it has one.
    #[must_use]
    pub fn block_of(&self, entity: EntityId) -> Option<&Block> {
        self.entities
            .get(&entity)
            .and_then(Entity::block_uid)
            .and_then(|uid| self.blocks.get(uid))
    }

    /// Lookup a page by title.
    #[must_use]
    pub fn page(&self, title: &str) -> Option<&Page> {
        self.pages.get(title)
    }

    /// The block behind a page title.
    pub fn page_block(&self, title: &str) -> Result<&Block, RoamError> {
        let page = self
            .page(title)
            .ok_or_else(|| RoamError::PageNotFound(title.to_string()))?;
        self.block_of(page.entity)
            .ok_or_else(|| RoamError::PageWithoutBlock(title.to_string()))
    }

    // -------------------------------------------------------------------------
    // Block accessors
    // -------------------------------------------------------------------------

    /// Values of an attribute on a block's entity, in export order.
    pub fn attribute<'a>(
        &'a self,
        block: &Block,
        attribute: &'a str,
    ) -> impl Iterator<Item = &'a FactValue> + use<'a> {
        self.entities
            .get(&block.entity)
            .into_iter()
            .flat_map(move |entity| entity.values(attribute))
    }

    /// Text of a block (`:block/string`).
    pub fn text(&self, block: &Block) -> Result<&str, RoamError> {
        let value = self.single_value(block, ATTR_BLOCK_STRING)?;
        value
            .as_str()
            .ok_or_else(|| type_error(block, ATTR_BLOCK_STRING, "string", value))
    }

    /// Sibling order of a block (`:block/order`).
    pub fn order(&self, block: &Block) -> Result<i64, RoamError> {
        let value = self.single_value(block, ATTR_BLOCK_ORDER)?;
        value
            .as_int()
            .ok_or_else(|| type_error(block, ATTR_BLOCK_ORDER, "integer", value))
    }

    /// Ancestor chain of a block, root first, direct parent last.
    pub fn parents(&self, block: &Block) -> Result<Vec<&Block>, RoamError> {
        self.referenced_blocks(block, ATTR_BLOCK_PARENTS)
    }

    /// Blocks this block references (`:block/refs`).
    pub fn outgoing_refs(&self, block: &Block) -> Result<Vec<&Block>, RoamError> {
        self.referenced_blocks(block, ATTR_BLOCK_REFS)
    }

    /// Blocks that declare this block as an ancestor.
    pub fn children(&self, block: &Block) -> Result<Vec<&Block>, RoamError> {
        block
            .children
            .iter()
            .map(|&entity| self.resolve_block(entity))
            .collect()
    }

    /// Blocks that reference this block.
    pub fn incoming_refs(&self, block: &Block) -> Result<Vec<&Block>, RoamError> {
        block
            .incoming_refs
            .iter()
            .map(|&entity| self.resolve_block(entity))
            .collect()
    }

    fn referenced_blocks<'a>(
        &'a self,
        block: &Block,
        attribute: &'a str,
    ) -> Result<Vec<&'a Block>, RoamError> {
        self.attribute(block, attribute)
            .map(|value| {
                let entity = value
                    .as_entity()
                    .ok_or_else(|| type_error(block, attribute, "integer", value))?;
                self.resolve_block(entity)
            })
            .collect()
    }

    fn resolve_block(&self, entity: EntityId) -> Result<&Block, RoamError> {
        if !self.entities.contains_key(&entity) {
            return Err(RoamError::EntityNotFound(entity));
        }
        self.block_of(entity).ok_or(RoamError::NotABlock(entity))
    }

    fn single_value<'a>(
        &'a self,
        block: &Block,
        attribute: &'a str,
    ) -> Result<&'a FactValue, RoamError> {
        self.attribute(block, attribute)
            .next()
            .ok_or_else(|| RoamError::MissingAttribute {
                uid: block.uid.clone(),
                attribute: Keyword::new(attribute),
            })
    }

    // -------------------------------------------------------------------------
    // Construction (crate-internal)
    // -------------------------------------------------------------------------

    pub(crate) fn entity_mut_or_insert(&mut self, id: EntityId) -> &mut Entity {
        self.entities.entry(id).or_insert_with(|| Entity::new(id))
    }

    /// Give an entity its block identity.
    ///
    /// Repeating the same uid is a no-op. A second uid on one entity, or one
    /// uid on two entities, is rejected.
    pub(crate) fn bind_block(&mut self, entity: EntityId, uid: &str) -> Result<(), RoamError> {
        if let Some(existing) = self.entities.get(&entity).and_then(Entity::block_uid) {
            if existing == uid {
                return Ok(());
            }
            return Err(RoamError::ConflictingBlockUid {
                entity,
                existing: existing.to_string(),
                incoming: uid.to_string(),
            });
        }

        if let Some(block) = self.blocks.get(uid) {
            return Err(RoamError::DuplicateBlockUid {
                uid: uid.to_string(),
                existing: block.entity,
                incoming: entity,
            });
        }

        self.blocks
            .insert(uid.to_string(), Block::new(uid.to_string(), entity));
        self.entity_mut_or_insert(entity).block_uid = Some(uid.to_string());
        Ok(())
    }

    pub(crate) fn insert_page(&mut self, title: &str, entity: EntityId) {
        self.pages.insert(
            title.to_string(),
            Page {
                title: title.to_string(),
                entity,
            },
        );
    }

    /// Attach one deferred edge. Returns `false` if the target is not a block.
    pub(crate) fn attach_edge(&mut self, edge: &PendingEdge) -> bool {
        let Some(uid) = self
            .entities
            .get(&edge.target)
            .and_then(|entity| entity.block_uid.as_deref())
        else {
            return false;
        };
        let Some(block) = self.blocks.get_mut(uid) else {
            return false;
        };

        match edge.kind {
            EdgeKind::Child => block.children.push(edge.source),
            EdgeKind::IncomingRef => block.incoming_refs.push(edge.source),
        }
        true
    }

    pub(crate) fn set_resolve_stats(&mut self, stats: ResolveStats) {
        self.stats = stats;
    }
}

fn type_error(block: &Block, attribute: &str, expected: &'static str, found: &FactValue) -> RoamError {
    RoamError::AttributeType {
        uid: block.uid.clone(),
        attribute: Keyword::new(attribute),
        expected,
        found: found.type_name(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
