//! # Markdown Renderer
//!
//! Pure recursive serialization of a [`DocumentTree`].
//!
//! The root becomes a `#` heading, every other node a list item indented by
//! [`LIST_INDENT`] per level. Siblings are sorted by `order` at render time;
//! the tree itself is never modified, so rendering twice gives the same bytes.

use crate::assembler::{DocumentNode, DocumentTree};
use crate::primitives::{LIST_INDENT, MAX_DOCUMENT_DEPTH};
use crate::types::RoamError;

/// Render a whole document: heading, blank line, nested list.
pub fn render_document(tree: &DocumentTree) -> Result<String, RoamError> {
    let mut out = String::new();
    out.push_str("# ");
    out.push_str(&process_text(tree.title(), ""));
    out.push_str("\n\n");

    for child in tree.sorted_children(tree.root()) {
        render_item(tree, child, "", 1, &mut out)?;
    }

    Ok(out)
}

/// Render one node and its subtree as list lines starting at `prefix`.
pub fn render_list_item(
    tree: &DocumentTree,
    node: &DocumentNode,
    prefix: &str,
) -> Result<String, RoamError> {
    let mut out = String::new();
    render_item(tree, node, prefix, 1, &mut out)?;
    Ok(out)
}

fn render_item(
    tree: &DocumentTree,
    node: &DocumentNode,
    prefix: &str,
    depth: usize,
    out: &mut String,
) -> Result<(), RoamError> {
    if depth > MAX_DOCUMENT_DEPTH {
        return Err(RoamError::DocumentTooDeep {
            uid: tree.uid().to_string(),
            limit: MAX_DOCUMENT_DEPTH,
        });
    }

    out.push_str(prefix);
    out.push_str("- ");
    out.push_str(&process_text(node.text(), prefix));
    out.push('\n');

    let nested = format!("{prefix}{LIST_INDENT}");
    for child in tree.sorted_children(node) {
        render_item(tree, child, &nested, depth.saturating_add(1), out)?;
    }
    Ok(())
}

/// Transform block text for output.
///
/// A `[[x]]` opened at bracket depth 0 collapses to `_x_`. Every other
/// bracket moves the depth counter and is copied as-is; unbalanced input
/// leaves the counter off for the rest of the scan. Newlines are followed by
/// `prefix` so continuation lines stay under their list item.
#[must_use]
pub fn process_text(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut depth: i64 = 0;
    let mut link_open = false;

    while let Some(c) = chars.next() {
        match c {
            '[' if depth == 0 && chars.peek() == Some(&'[') => {
                chars.next();
                depth = 2;
                link_open = true;
                out.push('_');
            }
            ']' if link_open && depth == 2 && chars.peek() == Some(&']') => {
                chars.next();
                depth = 0;
                link_open = false;
                out.push('_');
            }
            '[' => {
                depth = depth.saturating_add(1);
                out.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                out.push(c);
            }
            '\n' => {
                out.push('\n');
                out.push_str(prefix);
            }
            _ => out.push(c),
        }
    }

    out
}

// =============================================================================
// TESTS
// =============================================================================
