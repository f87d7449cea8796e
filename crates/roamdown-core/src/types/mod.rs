//! # Core Type Definitions
//!
//! This module contains all core types for the roamdown snapshot engine:
//! - Identifiers (`EntityId`, `TransactionId`, `Keyword`)
//! - Fact representation (`FactValue`, `Fact`, `Datom`, `SchemaEntry`)
//! - Error types (`RoamError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` so they can key `BTreeMap`s.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque identifier of an entity in the exported database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the transaction that asserted a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

/// A namespaced EDN keyword, stored without its leading colon.
///
/// `Keyword::new("block/uid")` displays as `:block/uid`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Keyword(pub String);

impl Keyword {
    /// Create a keyword from its name. A leading colon is dropped.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        match s.strip_prefix(':') {
            Some(stripped) => Self(stripped.to_string()),
            None => Self(s),
        }
    }

    /// Get the keyword name without the colon.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace part (`block` for `:block/uid`), if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once('/').map(|(ns, _)| ns)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

// =============================================================================
// FACTS
// =============================================================================

/// Value component of a fact.
///
/// Closed over the four value shapes a Datascript export carries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FactValue {
    /// Integer, also used for entity references.
    Int(i64),
    /// String.
    Str(String),
    /// Keyword.
    Keyword(Keyword),
    /// Boolean.
    Bool(bool),
}

impl FactValue {
    /// Integer payload, if this is an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// String payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Entity reference, if this is an integer.
    #[must_use]
    pub fn as_entity(&self) -> Option<EntityId> {
        self.as_int().map(EntityId)
    }

    /// Short name of the value shape, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
            Self::Keyword(_) => "keyword",
            Self::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Keyword(k) => write!(f, "{k}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// An attribute/value pair recorded on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// The attribute of this fact.
    pub attribute: Keyword,
    /// The value asserted for the attribute.
    pub value: FactValue,
    /// Transaction that asserted the fact.
    pub transaction: TransactionId,
}

/// One decoded `[entity attribute value transaction]` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datom {
    pub entity: EntityId,
    pub attribute: Keyword,
    pub value: FactValue,
    pub transaction: TransactionId,
}

impl Datom {
    /// Create a new datom.
    #[must_use]
    pub fn new(
        entity: EntityId,
        attribute: Keyword,
        value: FactValue,
        transaction: TransactionId,
    ) -> Self {
        Self {
            entity,
            attribute,
            value,
            transaction,
        }
    }

    /// Split into the owning entity and the fact it carries.
    #[must_use]
    pub fn into_fact(self) -> (EntityId, Fact) {
        (
            self.entity,
            Fact {
                attribute: self.attribute,
                value: self.value,
                transaction: self.transaction,
            },
        )
    }
}

/// Schema declaration for one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// `:db/cardinality`, e.g. `:db.cardinality/many`.
    pub cardinality: Option<Keyword>,
    /// `:db/valueType`, e.g. `:db.type/ref`.
    pub value_type: Option<Keyword>,
    /// `:db/unique`, e.g. `:db.unique/identity`.
    pub unique: Option<Keyword>,
}

impl SchemaEntry {
    /// Whether the attribute may hold several values per entity.
    #[must_use]
    pub fn is_many(&self) -> bool {
        self.cardinality
            .as_ref()
            .is_some_and(|k| k.as_str() == "db.cardinality/many")
    }

    /// Whether the attribute holds entity references.
    #[must_use]
    pub fn is_ref(&self) -> bool {
        self.value_type
            .as_ref()
            .is_some_and(|k| k.as_str() == "db.type/ref")
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Broad category of a [`RoamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed snapshot; raised before any graph exists.
    Parse,
    /// A page, block, entity or attribute that was asked for is missing.
    Lookup,
    /// A document tree could not be assembled.
    Assembly,
    /// Filesystem or configuration failure.
    Io,
}

/// Errors that can occur in roamdown.
///
/// - No silent failures except dropped dangling edges
/// - Use `Result<T, RoamError>` for fallible operations
/// - The CORE never panics on input data
#[derive(Debug, Error)]
pub enum RoamError {
    /// The snapshot text is not valid EDN.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// The snapshot map or its schema table has the wrong shape.
    #[error("Invalid snapshot schema: {0}")]
    InvalidSchema(String),

    /// A datom record has the wrong arity or field types.
    #[error("Malformed datom #{index} {record}: {reason}")]
    MalformedDatom {
        index: usize,
        record: String,
        reason: String,
    },

    /// A specially handled attribute carries a value of the wrong type.
    #[error("Entity {entity}: {attribute} expects a {expected} value, got {found}")]
    InvalidFactValue {
        entity: EntityId,
        attribute: Keyword,
        expected: &'static str,
        found: &'static str,
    },

    /// An entity received a second, different `:block/uid`.
    #[error("Entity {entity} already has block uid {existing:?}, refusing {incoming:?}")]
    ConflictingBlockUid {
        entity: EntityId,
        existing: String,
        incoming: String,
    },

    /// Two entities claim the same `:block/uid`.
    #[error("Block uid {uid:?} claimed by entity {existing} and entity {incoming}")]
    DuplicateBlockUid {
        uid: String,
        existing: EntityId,
        incoming: EntityId,
    },

    /// No page carries the requested title.
    #[error("Page not found: {0:?}")]
    PageNotFound(String),

    /// The page entity never received a `:block/uid`.
    #[error("Page {0:?} has no block")]
    PageWithoutBlock(String),

    /// No block carries the requested uid.
    #[error("Block not found: {0:?}")]
    BlockNotFound(String),

    /// A referenced entity never appeared in the snapshot.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A referenced entity exists but has no `:block/uid`.
    #[error("Entity {0} is not a block")]
    NotABlock(EntityId),

    /// A block lacks a required single-valued attribute.
    #[error("Block {uid:?} has no {attribute} value")]
    MissingAttribute { uid: String, attribute: Keyword },

    /// A block attribute has an unexpected value type.
    #[error("Block {uid:?}: {attribute} expects a {expected} value, got {found}")]
    AttributeType {
        uid: String,
        attribute: Keyword,
        expected: &'static str,
        found: &'static str,
    },

    /// A document block has an empty ancestor chain.
    #[error("Block {0:?} has no ancestors to attach under")]
    MissingAncestors(String),

    /// A document block's direct parent is not part of the document.
    #[error("Block {uid:?} names parent {parent:?}, which is outside the document")]
    ParentOutsideDocument { uid: String, parent: String },

    /// A document block cannot be reached from the root (ancestor cycle).
    #[error("Block {0:?} is not reachable from the document root")]
    DetachedBlock(String),

    /// A document nests deeper than the configured bound.
    #[error("Document {uid:?} nests deeper than {limit} levels")]
    DocumentTooDeep { uid: String, limit: usize },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl RoamError {
    /// Category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_)
            | Self::InvalidSchema(_)
            | Self::MalformedDatom { .. }
            | Self::InvalidFactValue { .. }
            | Self::ConflictingBlockUid { .. }
            | Self::DuplicateBlockUid { .. } => ErrorKind::Parse,
            Self::PageNotFound(_)
            | Self::PageWithoutBlock(_)
            | Self::BlockNotFound(_)
            | Self::EntityNotFound(_)
            | Self::NotABlock(_)
            | Self::MissingAttribute { .. }
            | Self::AttributeType { .. } => ErrorKind::Lookup,
            Self::MissingAncestors(_)
            | Self::ParentOutsideDocument { .. }
            | Self::DetachedBlock(_)
            | Self::DocumentTooDeep { .. } => ErrorKind::Assembly,
            Self::ConfigError(_) | Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// Whether the error only concerns the post being rendered.
    ///
    /// The graph is shared, so parse and I/O failures always abort the run.
    #[must_use]
    pub fn is_post_local(&self) -> bool {
        matches!(self.kind(), ErrorKind::Lookup | ErrorKind::Assembly)
    }
}

impl From<std::io::Error> for RoamError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_drops_leading_colon() {
        let kw = Keyword::new(":block/uid");
        assert_eq!(kw.as_str(), "block/uid");
        assert_eq!(kw.to_string(), ":block/uid");
        assert_eq!(kw.namespace(), Some("block"));
    }

    #[test]
    fn keyword_without_namespace() {
        assert_eq!(Keyword::new("schema").namespace(), None);
    }

    #[test]
    fn fact_value_accessors() {
        assert_eq!(FactValue::Int(7).as_entity(), Some(EntityId(7)));
        assert_eq!(FactValue::Str("x".into()).as_int(), None);
        assert_eq!(FactValue::Str("x".into()).as_str(), Some("x"));
        assert_eq!(FactValue::Bool(true).type_name(), "boolean");
    }

    #[test]
    fn schema_entry_flags() {
        let entry = SchemaEntry {
            cardinality: Some(Keyword::new("db.cardinality/many")),
            value_type: Some(Keyword::new("db.type/ref")),
            unique: None,
        };
        assert!(entry.is_many());
        assert!(entry.is_ref());
        assert!(!SchemaEntry::default().is_many());
    }

    #[test]
    fn error_kinds_partition_post_local() {
        assert!(!RoamError::InvalidSchema("x".into()).is_post_local());
        assert!(RoamError::BlockNotFound("x".into()).is_post_local());
        assert!(RoamError::DetachedBlock("x".into()).is_post_local());
        assert!(!RoamError::IoError("x".into()).is_post_local());
        assert_eq!(
            RoamError::PageNotFound("publish".into()).kind(),
            ErrorKind::Lookup
        );
    }

    #[test]
    fn datom_into_fact_keeps_fields() {
        let datom = Datom::new(
            EntityId(3),
            Keyword::new("block/order"),
            FactValue::Int(1),
            TransactionId(99),
        );
        let (entity, fact) = datom.into_fact();
        assert_eq!(entity, EntityId(3));
        assert_eq!(fact.attribute.as_str(), "block/order");
        assert_eq!(fact.transaction, TransactionId(99));
    }
}
