//! # roamdown-core
//!
//! The deterministic snapshot-to-Markdown engine for roamdown.
//!
//! This crate reconstructs a block graph from a Datascript export and
//! renders tagged blocks as Markdown documents.
//!
//! ## Pipeline
//!
//! - `formats` decodes the EDN export into typed datoms
//! - `ingestor` builds entities, blocks and pages in one linear pass
//! - `resolver` attaches deferred child and reference edges
//! - `assembler` rebuilds one document tree per root block
//! - `markdown` serializes the tree
//! - `publisher` finds tagged roots and isolates per-post failures
//!
//! ## Architectural Constraints
//!
//! - The graph is immutable once built
//! - All storage is `BTreeMap`/`Vec`, so every traversal is deterministic
//! - No I/O, no logging, no async: file access lives in the app layer

// =============================================================================
// MODULES
// =============================================================================

pub mod assembler;
pub mod formats;
pub mod graph;
pub mod ingestor;
pub mod markdown;
pub mod primitives;
pub mod publisher;
pub mod resolver;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Datom, EntityId, ErrorKind, Fact, FactValue, Keyword, RoamError, SchemaEntry, TransactionId,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use assembler::{Assembler, DocumentNode, DocumentTree, FlatEntry};
pub use graph::{Block, Entity, Graph, Page};
pub use ingestor::Ingestor;
pub use markdown::{process_text, render_document, render_list_item};
pub use publisher::{Post, PublishMarker, PublishReport, Publisher, SkippedPost};
pub use resolver::{EdgeKind, PendingEdge, ResolveStats};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{Snapshot, decode_snapshot};
