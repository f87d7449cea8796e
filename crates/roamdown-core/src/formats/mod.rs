//! # Snapshot Formats
//!
//! Reading of Datascript exports.
//!
//! - `edn`: EDN parsing through `edn-format`, with a nesting bound
//! - `snapshot`: decoding of the `#datascript/DB` map into typed datoms
//!
//! File I/O operations are in the app layer.

pub mod edn;
pub mod snapshot;

pub use snapshot::{Snapshot, decode_snapshot};
