//! # EDN Adapter
//!
//! Snapshot text is parsed by `edn-format` into its [`Value`] tree. This
//! module adds the accessors the snapshot decoder needs on top of it and
//! converts library keywords into [`Keyword`].
//!
//! The library reader is recursive, so the text is scanned once for nesting
//! before it is handed over. Collections and `#` prefixes (tags and `#_`
//! discards) both count toward [`MAX_EDN_NESTING`].

use crate::primitives::MAX_EDN_NESTING;
use crate::types::{Keyword, RoamError};

pub use edn_format::Value;

// =============================================================================
// PARSING
// =============================================================================

/// Parse one EDN form from `source`.
pub fn parse(source: &str) -> Result<Value, RoamError> {
    check_nesting(source)?;
    edn_format::parse_str(source).map_err(|e| RoamError::Syntax(format!("{e:?}")))
}

/// Reject input whose forms nest deeper than [`MAX_EDN_NESTING`].
///
/// Strings, character literals and comments are skipped. Every `#tag` or
/// `#_` prefix counts one level until the form it applies to is complete.
fn check_nesting(source: &str) -> Result<(), RoamError> {
    let bytes = source.as_bytes();
    let mut open: Vec<usize> = Vec::new();
    let mut depth = 0usize;
    let mut prefixes = 0usize;
    let mut pos = 0usize;

    while pos < bytes.len() {
        match bytes[pos] {
            b';' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'"' => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != b'"' {
                    pos += if bytes[pos] == b'\\' { 2 } else { 1 };
                }
                pos += 1;
                prefixes = 0;
            }
            b'\\' => {
                pos = skip_token(bytes, pos + 2);
                prefixes = 0;
            }
            b'(' | b'[' | b'{' => {
                let levels = prefixes + 1;
                depth += levels;
                if depth > MAX_EDN_NESTING {
                    return Err(too_deep(source, pos));
                }
                open.push(levels);
                prefixes = 0;
                pos += 1;
            }
            b')' | b']' | b'}' => {
                depth -= open.pop().unwrap_or(0);
                prefixes = 0;
                pos += 1;
            }
            b'#' => match bytes.get(pos + 1) {
                // `#{` opens a set; the brace is handled on the next turn.
                Some(b'{') => pos += 1,
                Some(b'_') => {
                    prefixes += 1;
                    pos += 2;
                }
                _ => {
                    prefixes += 1;
                    pos = skip_token(bytes, pos + 1);
                }
            },
            b' ' | b'\t' | b'\n' | b'\r' | b',' => pos += 1,
            _ => {
                pos = skip_token(bytes, pos);
                prefixes = 0;
            }
        }

        if depth + prefixes > MAX_EDN_NESTING {
            return Err(too_deep(source, pos.min(bytes.len())));
        }
    }

    Ok(())
}

/// Advance past a symbol, number or literal body.
fn skip_token(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && !is_delimiter(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'\t' | b'\n' | b'\r' | b',' | b'(' | b')' | b'[' | b']' | b'{' | b'}' | b'"' | b';'
    )
}

fn too_deep(source: &str, offset: usize) -> RoamError {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    RoamError::Syntax(format!(
        "nesting deeper than {} at {}:{}",
        MAX_EDN_NESTING, line, column
    ))
}

// =============================================================================
// ACCESSORS
// =============================================================================

/// Short name of a form, used in error messages.
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Character(_) => "character",
        Value::Keyword(_) => "keyword",
        Value::Symbol(_) => "symbol",
        Value::List(_) => "list",
        Value::Vector(_) => "vector",
        Value::Map(_) => "map",
        Value::Set(_) => "set",
        Value::TaggedElement(..) => "tagged literal",
        _ => "literal",
    }
}

/// Look up a keyword key in a map form.
#[must_use]
pub fn get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let Value::Map(entries) = value else {
        return None;
    };
    entries.iter().find_map(|(k, v)| match k {
        Value::Keyword(kw) if keyword(kw).as_str() == key => Some(v),
        _ => None,
    })
}

/// Elements of a list or vector.
#[must_use]
pub fn as_seq(value: &Value) -> Option<&[Value]> {
    match value {
        Value::List(items) | Value::Vector(items) => Some(items.as_slice()),
        _ => None,
    }
}

/// Convert a parsed keyword, keeping its namespace.
#[must_use]
pub fn keyword(kw: &edn_format::Keyword) -> Keyword {
    Keyword::new(qualified(kw.namespace(), kw.name()))
}

/// Full name of a tag symbol, `ns/name` or `name`.
#[must_use]
pub fn symbol_name(symbol: &edn_format::Symbol) -> String {
    qualified(symbol.namespace(), symbol.name())
}

/// EDN text of a form, for error messages.
#[must_use]
pub fn display(value: &Value) -> String {
    edn_format::emit_str(value)
}

fn qualified(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}/{}", ns, name),
        None => name.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
