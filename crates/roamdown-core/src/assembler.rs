//! # Document Assembler
//!
//! Rebuilds a strict document tree under one root block.
//!
//! Every descendant carries its full ancestor chain in `:block/parents`, so
//! the flat child set of the root can be assembled without walking the graph:
//! each node attaches under the last element of its own chain. The lookup
//! used for attachment spans exactly the root and its child set; a parent
//! outside that set is reported, never guessed.

use crate::graph::{Block, Graph};
use crate::primitives::MAX_DOCUMENT_DEPTH;
use crate::types::RoamError;
use std::collections::BTreeMap;

// =============================================================================
// DOCUMENT TREE
// =============================================================================

/// One node of an assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    uid: String,
    order: i64,
    text: String,
    /// Indices into the owning tree's node list, in attachment order.
    children: Vec<usize>,
}

impl DocumentNode {
    fn new(uid: String, order: i64, text: String) -> Self {
        Self {
            uid,
            order,
            text,
            children: Vec::new(),
        }
    }

    /// Block uid of the node.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Sibling order key.
    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    /// Raw block text (the stripped title for the root).
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of direct children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// An assembled document: an arena of nodes, root at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    nodes: Vec<DocumentNode>,
}

impl DocumentTree {
    /// The root node.
    #[must_use]
    pub fn root(&self) -> &DocumentNode {
        // The constructor always places the root first.
        &self.nodes[0]
    }

    /// Uid of the root block.
    #[must_use]
    pub fn uid(&self) -> &str {
        self.root().uid()
    }

    /// Title of the document (root text with the publish marker removed).
    #[must_use]
    pub fn title(&self) -> &str {
        self.root().text()
    }

    /// Total number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by block uid.
    #[must_use]
    pub fn find(&self, uid: &str) -> Option<&DocumentNode> {
        self.nodes.iter().find(|node| node.uid == uid)
    }

    /// Direct children of a node in attachment order.
    pub fn children<'a>(
        &'a self,
        node: &'a DocumentNode,
    ) -> impl Iterator<Item = &'a DocumentNode> + 'a {
        node.children.iter().filter_map(|&i| self.nodes.get(i))
    }

    /// Direct children of a node sorted by `order`.
    ///
    /// The sort is stable: equal keys keep attachment order.
    #[must_use]
    pub fn sorted_children<'a>(&'a self, node: &'a DocumentNode) -> Vec<&'a DocumentNode> {
        let mut children: Vec<_> = self.children(node).collect();
        children.sort_by_key(|child| child.order);
        children
    }

    /// Check that every node hangs under the root within the depth bound.
    fn check_reachable(&self) -> Result<(), RoamError> {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![(0usize, 0usize)];

        while let Some((index, depth)) = stack.pop() {
            if depth > MAX_DOCUMENT_DEPTH {
                return Err(RoamError::DocumentTooDeep {
                    uid: self.uid().to_string(),
                    limit: MAX_DOCUMENT_DEPTH,
                });
            }
            let Some(seen) = visited.get_mut(index) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;

            if let Some(node) = self.nodes.get(index) {
                for &child in &node.children {
                    stack.push((child, depth.saturating_add(1)));
                }
            }
        }

        match visited.iter().position(|seen| !seen) {
            Some(index) => Err(RoamError::DetachedBlock(self.nodes[index].uid.clone())),
            None => Ok(()),
        }
    }
}

// =============================================================================
// ASSEMBLER
// =============================================================================

/// A descendant block reduced to what assembly needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    pub uid: String,
    pub order: i64,
    pub text: String,
    /// Ancestor uids, root first, direct parent last.
    pub ancestors: Vec<String>,
}

/// The Assembler turns a root block and its flat child set into a tree.
pub struct Assembler;

impl Assembler {
    /// Assemble the document rooted at `root`, titled `title`.
    ///
    /// Reads text, order and ancestor chain of every block in the root's
    /// `children` index; any missing attribute fails the whole document.
    pub fn assemble(graph: &Graph, root: &Block, title: &str) -> Result<DocumentTree, RoamError> {
        let children = graph.children(root)?;
        let mut entries = Vec::with_capacity(children.len());

        for child in children {
            let ancestors = graph
                .parents(child)?
                .into_iter()
                .map(|block| block.uid().to_string())
                .collect();

            entries.push(FlatEntry {
                uid: child.uid().to_string(),
                order: graph.order(child)?,
                text: graph.text(child)?.to_string(),
                ancestors,
            });
        }

        Self::assemble_flat(root.uid(), title, entries)
    }

    /// Assemble a tree from plain entries.
    ///
    /// Entries repeating a uid already present (including the root's) are
    /// admitted once. Each remaining entry attaches under the last uid of its
    /// ancestor chain.
    pub fn assemble_flat(
        root_uid: &str,
        title: &str,
        entries: Vec<FlatEntry>,
    ) -> Result<DocumentTree, RoamError> {
        let mut nodes = vec![DocumentNode::new(
            root_uid.to_string(),
            0,
            title.to_string(),
        )];
        let mut index = BTreeMap::from([(root_uid.to_string(), 0usize)]);
        let mut chains = Vec::with_capacity(entries.len());

        for entry in entries {
            if index.contains_key(&entry.uid) {
                continue;
            }
            let position = nodes.len();
            index.insert(entry.uid.clone(), position);
            chains.push((position, entry.ancestors));
            nodes.push(DocumentNode::new(entry.uid, entry.order, entry.text));
        }

        for (position, ancestors) in chains {
            let uid = &nodes[position].uid;
            let parent_uid = ancestors
                .last()
                .ok_or_else(|| RoamError::MissingAncestors(uid.clone()))?;
            let parent = *index
                .get(parent_uid)
                .ok_or_else(|| RoamError::ParentOutsideDocument {
                    uid: uid.clone(),
                    parent: parent_uid.clone(),
                })?;
            nodes[parent].children.push(position);
        }

        let tree = DocumentTree { nodes };
        tree.check_reachable()?;
        Ok(tree)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(uid: &str, order: i64, ancestors: &[&str]) -> FlatEntry {
        FlatEntry {
            uid: uid.to_string(),
            order,
            text: format!("text of {uid}"),
            ancestors: ancestors.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn child_uids<'a>(tree: &'a DocumentTree, uid: &str) -> Vec<&'a str> {
        let node = tree.find(uid).expect("node");
        tree.children(node).map(DocumentNode::uid).collect()
    }

    #[test]
    fn attaches_under_direct_parent() {
        let tree = Assembler::assemble_flat(
            "root",
            "Title",
            vec![
                entry("leaf-child", 0, &["page", "root", "mid", "leaf"]),
                entry("mid", 0, &["page", "root"]),
                entry("leaf", 0, &["page", "root", "mid"]),
            ],
        )
        .expect("assemble");

        assert_eq!(tree.len(), 4);
        assert_eq!(child_uids(&tree, "root"), vec!["mid"]);
        assert_eq!(child_uids(&tree, "mid"), vec!["leaf"]);
        assert_eq!(child_uids(&tree, "leaf"), vec!["leaf-child"]);
        assert_eq!(tree.title(), "Title");
        assert_eq!(tree.uid(), "root");
    }

    #[test]
    fn sorted_children_follow_order() {
        let tree = Assembler::assemble_flat(
            "root",
            "T",
            vec![
                entry("c", 2, &["root"]),
                entry("a", 0, &["root"]),
                entry("b", 1, &["root"]),
            ],
        )
        .expect("assemble");

        let sorted: Vec<_> = tree
            .sorted_children(tree.root())
            .into_iter()
            .map(DocumentNode::uid)
            .collect();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_orders_keep_attachment_order() {
        let tree = Assembler::assemble_flat(
            "root",
            "T",
            vec![entry("x", 0, &["root"]), entry("y", 0, &["root"])],
        )
        .expect("assemble");
        let sorted: Vec<_> = tree
            .sorted_children(tree.root())
            .into_iter()
            .map(DocumentNode::uid)
            .collect();
        assert_eq!(sorted, vec!["x", "y"]);
    }

    #[test]
    fn repeated_entries_are_admitted_once() {
        let tree = Assembler::assemble_flat(
            "root",
            "T",
            vec![
                entry("a", 0, &["root"]),
                entry("a", 5, &["root"]),
                entry("root", 0, &["page"]),
            ],
        )
        .expect("assemble");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.find("a").map(DocumentNode::order), Some(0));
    }

    #[test]
    fn parent_outside_document_is_reported() {
        let err = Assembler::assemble_flat(
            "root",
            "T",
            vec![entry("deep", 0, &["root", "elsewhere"])],
        )
        .expect_err("outside");
        assert!(matches!(
            err,
            RoamError::ParentOutsideDocument { ref uid, ref parent }
                if uid == "deep" && parent == "elsewhere"
        ));
        assert!(err.is_post_local());
    }

    #[test]
    fn empty_chain_is_reported() {
        let err = Assembler::assemble_flat("root", "T", vec![entry("orphan", 0, &[])])
            .expect_err("orphan");
        assert!(matches!(err, RoamError::MissingAncestors(uid) if uid == "orphan"));
    }

    #[test]
    fn ancestor_cycle_is_reported() {
        let err = Assembler::assemble_flat(
            "root",
            "T",
            vec![
                entry("ok", 0, &["root"]),
                entry("a", 0, &["root", "b"]),
                entry("b", 0, &["root", "a"]),
            ],
        )
        .expect_err("cycle");
        assert!(matches!(err, RoamError::DetachedBlock(_)));
    }

    #[test]
    fn self_parent_is_reported() {
        let err = Assembler::assemble_flat("root", "T", vec![entry("me", 0, &["root", "me"])])
            .expect_err("self");
        assert!(matches!(err, RoamError::DetachedBlock(uid) if uid == "me"));
    }

    #[test]
    fn depth_is_bounded() {
        let mut entries = Vec::new();
        let mut chain = vec!["root".to_string()];
        for i in 0..=MAX_DOCUMENT_DEPTH {
            let uid = format!("n{i}");
            entries.push(FlatEntry {
                uid: uid.clone(),
                order: 0,
                text: String::new(),
                ancestors: chain.clone(),
            });
            chain.push(uid);
        }

        let err = Assembler::assemble_flat("root", "T", entries).expect_err("too deep");
        assert!(matches!(err, RoamError::DocumentTooDeep { .. }));
    }
}
