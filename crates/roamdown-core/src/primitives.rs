//! # Innate Primitives
//!
//! Hardcoded constants for the roamdown CORE.
//!
//! These cover three areas:
//!
//! 1. **Snapshot format**: the type tag and the attribute keywords that the
//!    graph builder treats specially.
//! 2. **Rendering**: indentation and the default publish tag.
//! 3. **Bounds**: limits that keep decoding, assembly and rendering
//!    computationally bounded on malformed input.

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Tag name (without `#`) of a Datascript database export.
pub const DATASCRIPT_TAG: &str = "datascript/DB";

/// Attribute that gives an entity its block identity.
pub const ATTR_BLOCK_UID: &str = "block/uid";

/// Attribute that holds the text of a block.
pub const ATTR_BLOCK_STRING: &str = "block/string";

/// Attribute that orders a block among its siblings.
pub const ATTR_BLOCK_ORDER: &str = "block/order";

/// Attribute listing the ancestor chain of a block, root first.
pub const ATTR_BLOCK_PARENTS: &str = "block/parents";

/// Attribute listing the entities a block references.
pub const ATTR_BLOCK_REFS: &str = "block/refs";

/// Attribute that turns a block into a page.
pub const ATTR_NODE_TITLE: &str = "node/title";

// =============================================================================
// RENDERING
// =============================================================================

/// Extra indentation added per nesting level of a Markdown list.
pub const LIST_INDENT: &str = "  ";

/// Tag used to select posts when none is configured.
pub const DEFAULT_PUBLISH_TAG: &str = "publish";

// =============================================================================
// BOUNDS
// =============================================================================

/// Maximum EDN nesting accepted before parsing (collections plus `#` prefixes).
///
/// Real exports nest four levels deep; anything near this limit is corrupt.
pub const MAX_EDN_NESTING: usize = 256;

/// Maximum depth of an assembled document tree.
///
/// Applies to both assembly and rendering.
pub const MAX_DOCUMENT_DEPTH: usize = 100;
